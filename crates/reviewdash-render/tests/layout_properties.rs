//! Property tests for export pagination.

use proptest::prelude::*;
use reviewdash_core::model::{Category, FileId, FileRecord, Review, Sentiment};
use reviewdash_render::export::{Placement, export_report};
use reviewdash_render::{ChartSpec, Charts, LayoutRecorder, PageGeometry, RasterImage, Rasterizer, RenderError};

/// Replays a fixed list of image sizes, cycling when it runs out.
struct SizedRasterizer {
    sizes: Vec<(u32, u32)>,
    next: usize,
}

impl Rasterizer for SizedRasterizer {
    fn rasterize(&mut self, _spec: &ChartSpec, _scale: f64) -> Result<RasterImage, RenderError> {
        let (width_px, height_px) = self.sizes[self.next % self.sizes.len()];
        self.next += 1;
        Ok(RasterImage {
            png: Vec::new(),
            width_px,
            height_px,
        })
    }
}

fn record() -> FileRecord {
    let mut record = FileRecord::new(FileId(1), "q1.xlsx");
    record.results = Some(vec![
        Review::new("1 Elm, Alpha").with_mention(Category::Price, Sentiment::Negative, 3.0),
        Review::new("2 Oak, Beta").with_mention(Category::Crowding, Sentiment::Positive, 1.0),
    ]);
    record
}

proptest! {
    #[test]
    fn placements_respect_margins_and_order(
        sizes in prop::collection::vec((1u32..4000, 1u32..4000), 1..8),
    ) {
        let record = record();
        let charts = Charts::new(record.reviews());
        let geometry = PageGeometry::default();
        let mut rasterizer = SizedRasterizer { sizes, next: 0 };
        let mut sink = LayoutRecorder::new();

        let report = export_report(&record, &charts, &geometry, &mut rasterizer, &mut sink)
            .expect("recorder never fails");

        prop_assert_eq!(report.placed.len(), 8);
        prop_assert_eq!(report.pages, sink.pages());

        let mut previous: Option<Placement> = None;
        for placed in &report.placed {
            let placement = placed.placement;
            prop_assert!((placement.x_mm - geometry.margin_mm).abs() < f64::EPSILON);
            prop_assert!((placement.width_mm - geometry.content_width_mm()).abs() < f64::EPSILON);
            prop_assert!(placement.height_mm > 0.0);
            prop_assert!(placed.title_y_mm <= geometry.page_break_at_mm);

            if let Some(prev) = previous {
                prop_assert!(placement.page >= prev.page);
                if placement.page == prev.page {
                    prop_assert!(placement.y_mm > prev.y_mm + prev.height_mm);
                }
            }
            previous = Some(placement);
        }
    }
}
