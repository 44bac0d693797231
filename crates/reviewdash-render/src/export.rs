//! PDF report export pipeline.
//!
//! Charts are rasterized one at a time, strictly in [`export_plan`] order, and
//! placed onto A4 pages by a small layout cursor:
//!
//! - a title is drawn at the cursor, which then advances by [`TITLE_ADVANCE_MM`];
//! - the image spans the page width minus both margins, height scaled by the
//!   image aspect ratio, followed by [`CHART_GAP_MM`];
//! - a new page starts when the cursor is past `page_break_at_mm` before a chart;
//! - the grouped bar charts and the priority matrix always start a new page.
//!
//! A chart that fails to rasterize is logged and skipped; the rest of the
//! document is still produced. Sink failures abort the export.
//!
//! [`LayoutRecorder`] keeps the drawing operations as data;
//! [`crate::pdf::PdfSink`] turns the same operations into a PDF.

use image::{ImageFormat, RgbImage};
use reviewdash_core::config::ExportConfig;
use reviewdash_core::model::{FileRecord, Polarity};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chart::{ChartKind, ChartSpec, Charts, GROUPED_CATEGORIES};
use crate::RenderError;

/// Vertical advance after a section title.
pub const TITLE_ADVANCE_MM: f64 = 10.0;

/// Vertical gap after each chart image.
pub const CHART_GAP_MM: f64 = 10.0;

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// One chart in the exported document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    #[serde(serialize_with = "serialize_kind")]
    pub kind: ChartKind,
    /// Start a fresh page before this section.
    pub page_break_before: bool,
}

fn serialize_kind<S: serde::Serializer>(kind: &ChartKind, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(kind)
}

/// The fixed section order of a report.
#[must_use]
pub fn export_plan() -> Vec<Section> {
    let mut plan = vec![
        section("Weighted Score", ChartKind::Weighted, false),
        section(
            "Positive Sentiment %",
            ChartKind::Sentiment(Polarity::Positive),
            false,
        ),
        section(
            "Negative Sentiment %",
            ChartKind::Sentiment(Polarity::Negative),
            false,
        ),
        section("Review Mentions", ChartKind::Mentions, false),
    ];
    for (i, category) in GROUPED_CATEGORIES.into_iter().enumerate() {
        plan.push(section(
            &format!("{} Sentiment", category.label()),
            ChartKind::Grouped(category),
            i == 0,
        ));
    }
    plan.push(section("Priority Matrix", ChartKind::Priority, true));
    plan
}

fn section(title: &str, kind: ChartKind, page_break_before: bool) -> Section {
    Section {
        title: title.to_string(),
        kind,
        page_break_before,
    }
}

/// Deterministic output name for a file's report.
#[must_use]
pub fn report_file_name(record: &FileRecord) -> String {
    format!("Report_{}.pdf", record.file_name)
}

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// A rasterized chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub png: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

impl RasterImage {
    /// Wrap encoded PNG bytes, reading the size from the decoded image.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidImage`] if `png` does not decode.
    pub fn from_png(png: Vec<u8>) -> Result<Self, RenderError> {
        let pixels = decode_png(&png)?;
        Ok(Self {
            width_px: pixels.width(),
            height_px: pixels.height(),
            png,
        })
    }
}

/// Decode PNG bytes to 8-bit RGB.
pub(crate) fn decode_png(png: &[u8]) -> Result<RgbImage, RenderError> {
    image::load_from_memory_with_format(png, ImageFormat::Png)
        .map(|decoded| decoded.to_rgb8())
        .map_err(|err| RenderError::InvalidImage(err.to_string()))
}

/// Turns a chart spec into a bitmap.
pub trait Rasterizer {
    /// Render `spec` at `scale` × its nominal size.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when the chart cannot be rendered.
    fn rasterize(&mut self, spec: &ChartSpec, scale: f64) -> Result<RasterImage, RenderError>;
}

/// Position of an image on a page, in millimetres from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    /// Zero-based page index.
    pub page: usize,
    pub x_mm: f64,
    pub y_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
}

/// Receives the laid-out document, one drawing operation at a time.
pub trait PageSink {
    /// Start a new page.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the sink cannot accept more output.
    fn add_page(&mut self) -> Result<(), RenderError>;

    /// Draw a section title with its baseline at `(x_mm, y_mm)`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the sink cannot accept more output.
    fn draw_title(&mut self, text: &str, font_size: f64, x_mm: f64, y_mm: f64)
    -> Result<(), RenderError>;

    /// Draw a chart image.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the sink cannot accept more output.
    fn draw_image(
        &mut self,
        title: &str,
        image: &RasterImage,
        placement: Placement,
    ) -> Result<(), RenderError>;

    /// Finalize the document under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the document cannot be written.
    fn finish(&mut self, name: &str) -> Result<(), RenderError>;
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Page geometry in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    pub width_mm: f64,
    pub height_mm: f64,
    pub margin_mm: f64,
    pub page_break_at_mm: f64,
    pub title_font_size: f64,
    pub raster_scale: f64,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::from(&ExportConfig::default())
    }
}

impl From<&ExportConfig> for PageGeometry {
    fn from(config: &ExportConfig) -> Self {
        Self {
            width_mm: config.page_width_mm,
            height_mm: config.page_height_mm,
            margin_mm: config.margin_mm,
            page_break_at_mm: config.page_break_at_mm,
            title_font_size: config.title_font_size,
            raster_scale: config.raster_scale,
        }
    }
}

impl PageGeometry {
    /// Width available to a chart image.
    #[must_use]
    pub fn content_width_mm(&self) -> f64 {
        self.width_mm - 2.0 * self.margin_mm
    }
}

/// Current page and vertical offset.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cursor {
    page: usize,
    y_mm: f64,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// A chart that made it onto a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedChart {
    pub title: String,
    pub title_y_mm: f64,
    pub placement: Placement,
}

/// A chart left out of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedChart {
    pub title: String,
    pub reason: String,
}

/// Summary of an export run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportReport {
    pub document: String,
    pub pages: usize,
    pub placed: Vec<PlacedChart>,
    pub skipped: Vec<SkippedChart>,
}

/// Lay out and emit a full report for `record`.
///
/// Sections with nothing to draw, and sections whose chart fails to
/// rasterize, are skipped and listed in [`ExportReport::skipped`].
///
/// # Errors
///
/// Returns [`RenderError`] only when the sink rejects output.
pub fn export_report<R, S>(
    record: &FileRecord,
    charts: &Charts<'_>,
    geometry: &PageGeometry,
    rasterizer: &mut R,
    sink: &mut S,
) -> Result<ExportReport, RenderError>
where
    R: Rasterizer + ?Sized,
    S: PageSink + ?Sized,
{
    let document = report_file_name(record);
    info!(id = %record.id, document = %document, "exporting report");

    let mut cursor = Cursor {
        page: 0,
        y_mm: geometry.margin_mm,
    };
    let mut placed = Vec::new();
    let mut skipped = Vec::new();

    for section in export_plan() {
        if section.page_break_before {
            new_page(sink, &mut cursor, geometry)?;
        }

        let spec = charts.build(section.kind);
        if spec.is_empty() {
            debug!(chart = %section.title, "nothing to draw");
            skipped.push(SkippedChart {
                title: section.title,
                reason: "no data".to_string(),
            });
            continue;
        }

        let image = match rasterizer
            .rasterize(&spec, geometry.raster_scale)
            .and_then(validate_image)
        {
            Ok(image) => image,
            Err(err) => {
                warn!(chart = %section.title, code = %err.error_code(), error = %err, "skipping chart");
                skipped.push(SkippedChart {
                    title: section.title,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        if cursor.y_mm > geometry.page_break_at_mm {
            new_page(sink, &mut cursor, geometry)?;
        }

        let title_y_mm = cursor.y_mm;
        sink.draw_title(
            &section.title,
            geometry.title_font_size,
            geometry.margin_mm,
            title_y_mm,
        )?;
        cursor.y_mm += TITLE_ADVANCE_MM;

        let width_mm = geometry.content_width_mm();
        let placement = Placement {
            page: cursor.page,
            x_mm: geometry.margin_mm,
            y_mm: cursor.y_mm,
            width_mm,
            height_mm: f64::from(image.height_px) * width_mm / f64::from(image.width_px),
        };
        sink.draw_image(&section.title, &image, placement)?;
        cursor.y_mm += placement.height_mm + CHART_GAP_MM;

        placed.push(PlacedChart {
            title: section.title,
            title_y_mm,
            placement,
        });
    }

    sink.finish(&document)?;
    let report = ExportReport {
        document,
        pages: cursor.page + 1,
        placed,
        skipped,
    };
    info!(
        pages = report.pages,
        placed = report.placed.len(),
        skipped = report.skipped.len(),
        "report exported"
    );
    Ok(report)
}

fn new_page<S: PageSink + ?Sized>(
    sink: &mut S,
    cursor: &mut Cursor,
    geometry: &PageGeometry,
) -> Result<(), RenderError> {
    sink.add_page()?;
    cursor.page += 1;
    cursor.y_mm = geometry.margin_mm;
    Ok(())
}

fn validate_image(image: RasterImage) -> Result<RasterImage, RenderError> {
    if image.width_px == 0 || image.height_px == 0 {
        return Err(RenderError::InvalidImage(format!(
            "{}x{} image",
            image.width_px, image.height_px
        )));
    }
    Ok(image)
}

// ---------------------------------------------------------------------------
// Layout recorder
// ---------------------------------------------------------------------------

/// One drawing operation, as recorded by [`LayoutRecorder`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PageOp {
    AddPage,
    Title {
        text: String,
        font_size: f64,
        x_mm: f64,
        y_mm: f64,
    },
    Image {
        title: String,
        width_px: u32,
        height_px: u32,
        placement: Placement,
    },
    Finish {
        name: String,
    },
}

/// A [`PageSink`] that keeps the operation list instead of drawing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutRecorder {
    pub ops: Vec<PageOp>,
}

impl LayoutRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pages recorded so far (the first page is implicit).
    #[must_use]
    pub fn pages(&self) -> usize {
        1 + self
            .ops
            .iter()
            .filter(|op| matches!(op, PageOp::AddPage))
            .count()
    }
}

impl PageSink for LayoutRecorder {
    fn add_page(&mut self) -> Result<(), RenderError> {
        self.ops.push(PageOp::AddPage);
        Ok(())
    }

    fn draw_title(
        &mut self,
        text: &str,
        font_size: f64,
        x_mm: f64,
        y_mm: f64,
    ) -> Result<(), RenderError> {
        self.ops.push(PageOp::Title {
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
        self.ops.push(PageOp::Image {
            title: title.to_string(),
            width_px: image.width_px,
            height_px: image.height_px,
            placement,
        });
        Ok(())
    }

    fn finish(&mut self, name: &str) -> Result<(), RenderError> {
        self.ops.push(PageOp::Finish {
            name: name.to_string(),
        });
        Ok(())
    }
}
