//! [`PageSink`] that assembles the report as a PDF document.
//!
//! Layout arrives in millimetres from the top-left corner of the page; PDF
//! user space is points from the bottom-left, so every coordinate is flipped
//! on the way in. Chart images are decoded to RGB and stored Flate-compressed.
//! The document is built in memory; [`PdfSink::bytes`] hands it out after
//! [`PageSink::finish`].

use miniz_oxide::deflate::compress_to_vec_zlib;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str, TextStr};
use tracing::debug;

use crate::RenderError;
use crate::export::{PageGeometry, PageSink, Placement, RasterImage, decode_png};

const POINTS_PER_MM: f64 = 72.0 / 25.4;
const TITLE_FONT: Name<'static> = Name(b"F1");
const TITLE_FONT_FACE: Name<'static> = Name(b"Helvetica-Bold");
const DEFLATE_LEVEL: u8 = 6;

#[allow(clippy::cast_possible_truncation)]
fn points(mm: f64) -> f32 {
    (mm * POINTS_PER_MM) as f32
}

fn image_name(index: usize) -> String {
    format!("Im{}", index + 1)
}

fn to_i32<T>(value: T, what: &str) -> Result<i32, RenderError>
where
    T: TryInto<i32> + Copy + std::fmt::Display,
{
    value
        .try_into()
        .map_err(|_| RenderError::Document(format!("too many {what}: {value}")))
}

#[derive(Debug, Clone, PartialEq)]
enum PageItem {
    Title {
        text: String,
        font_size: f64,
        x_mm: f64,
        y_mm: f64,
    },
    Image {
        index: usize,
        placement: Placement,
    },
}

/// Decoded chart pixels, zlib-compressed 8-bit RGB.
#[derive(Debug, Clone)]
struct EmbeddedImage {
    width_px: u32,
    height_px: u32,
    data: Vec<u8>,
}

/// Draws report pages into a PDF with the page size of `geometry`.
#[derive(Debug, Clone)]
pub struct PdfSink {
    width_mm: f64,
    height_mm: f64,
    /// The first page exists before any `add_page`.
    pages: Vec<Vec<PageItem>>,
    images: Vec<EmbeddedImage>,
    document: Option<Vec<u8>>,
}

impl PdfSink {
    #[must_use]
    pub fn new(geometry: &PageGeometry) -> Self {
        Self {
            width_mm: geometry.width_mm,
            height_mm: geometry.height_mm,
            pages: vec![Vec::new()],
            images: Vec::new(),
            document: None,
        }
    }

    /// The finished document; `None` until [`PageSink::finish`] ran.
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        self.document.as_deref()
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn current_page(&mut self) -> &mut Vec<PageItem> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn page_content(&self, items: &[PageItem]) -> Vec<u8> {
        let page_height = points(self.height_mm);
        let mut content = Content::new();
        for item in items {
            match item {
                PageItem::Title {
                    text,
                    font_size,
                    x_mm,
                    y_mm,
                } => {
                    #[allow(clippy::cast_possible_truncation)]
                    let size = *font_size as f32;
                    content.begin_text();
                    content.set_font(TITLE_FONT, size);
                    content.next_line(points(*x_mm), page_height - points(*y_mm));
                    content.show(Str(text.as_bytes()));
                    content.end_text();
                }
                PageItem::Image { index, placement } => {
                    let width = points(placement.width_mm);
                    let height = points(placement.height_mm);
                    let x = points(placement.x_mm);
                    let y = page_height - points(placement.y_mm + placement.height_mm);
                    content.save_state();
                    content.transform([width, 0.0, 0.0, height, x, y]);
                    content.x_object(Name(image_name(*index).as_bytes()));
                    content.restore_state();
                }
            }
        }
        content.finish()
    }

    fn assemble(&self, name: &str) -> Result<Vec<u8>, RenderError> {
        let mut next_id = Ref::new(1);
        let catalog_id = next_id.bump();
        let tree_id = next_id.bump();
        let info_id = next_id.bump();
        let font_id = next_id.bump();
        let image_ids: Vec<Ref> = self.images.iter().map(|_| next_id.bump()).collect();
        let page_ids: Vec<(Ref, Ref)> = self
            .pages
            .iter()
            .map(|_| (next_id.bump(), next_id.bump()))
            .collect();

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(tree_id);
        pdf.document_info(info_id).title(TextStr(name));
        pdf.pages(tree_id)
            .kids(page_ids.iter().map(|(page_id, _)| *page_id))
            .count(to_i32(page_ids.len(), "pages")?);
        pdf.type1_font(font_id).base_font(TITLE_FONT_FACE);

        for (image, id) in self.images.iter().zip(&image_ids) {
            let mut xobject = pdf.image_xobject(*id, &image.data);
            xobject.filter(Filter::FlateDecode);
            xobject.width(to_i32(image.width_px, "pixels")?);
            xobject.height(to_i32(image.height_px, "pixels")?);
            xobject.color_space().device_rgb();
            xobject.bits_per_component(8);
            xobject.finish();
        }

        let media_box = Rect::new(0.0, 0.0, points(self.width_mm), points(self.height_mm));
        for (items, (page_id, content_id)) in self.pages.iter().zip(&page_ids) {
            let mut page = pdf.page(*page_id);
            page.media_box(media_box);
            page.parent(tree_id);
            page.contents(*content_id);
            let mut resources = page.resources();
            resources.fonts().pair(TITLE_FONT, font_id);
            let mut x_objects = resources.x_objects();
            for item in items {
                if let PageItem::Image { index, .. } = item {
                    x_objects.pair(Name(image_name(*index).as_bytes()), image_ids[*index]);
                }
            }
            x_objects.finish();
            resources.finish();
            page.finish();

            let content = self.page_content(items);
            pdf.stream(*content_id, &content);
        }

        Ok(pdf.finish())
    }
}

impl PageSink for PdfSink {
    fn add_page(&mut self) -> Result<(), RenderError> {
        self.pages.push(Vec::new());
        Ok(())
    }

    fn draw_title(
        &mut self,
        text: &str,
        font_size: f64,
        x_mm: f64,
        y_mm: f64,
    ) -> Result<(), RenderError> {
        self.current_page().push(PageItem::Title {
            text: text.to_string(),
            font_size,
            x_mm,
            y_mm,
        });
        Ok(())
    }

    fn draw_image(
        &mut self,
        title: &str,
        image: &RasterImage,
        placement: Placement,
    ) -> Result<(), RenderError> {
        let pixels = decode_png(&image.png)?;
        let index = self.images.len();
        self.images.push(EmbeddedImage {
            width_px: pixels.width(),
            height_px: pixels.height(),
            data: compress_to_vec_zlib(pixels.as_raw(), DEFLATE_LEVEL),
        });
        debug!(chart = title, index, "image embedded");
        self.current_page().push(PageItem::Image { index, placement });
        Ok(())
    }

    fn finish(&mut self, name: &str) -> Result<(), RenderError> {
        let document = self.assemble(name)?;
        debug!(document = name, bytes = document.len(), pages = self.pages.len(), "pdf assembled");
        self.document = Some(document);
        Ok(())
    }
}
