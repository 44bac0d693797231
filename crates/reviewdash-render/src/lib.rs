#![forbid(unsafe_code)]
//! reviewdash-render library.
//!
//! Turns aggregated review data into Vega-Lite chart specifications, grid
//! rows for the uploaded-files table, and paginated report exports.

pub mod chart;
pub mod export;
pub mod grid;
pub mod pdf;

use reviewdash_core::error::ErrorCode;

pub use chart::{ChartKind, ChartSpec, Charts, UnknownChartKind};
pub use export::{
    ExportReport, LayoutRecorder, PageGeometry, PageSink, RasterImage, Rasterizer, export_plan,
    export_report, report_file_name,
};
pub use grid::{GridRow, grid_rows};
pub use pdf::PdfSink;

/// Errors raised while rendering or exporting charts.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("rasterizer '{command}' failed: {reason}")]
    Rasterize { command: String, reason: String },

    #[error("rasterizer produced an unusable image: {0}")]
    InvalidImage(String),

    #[error("could not encode chart spec: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("could not assemble document: {0}")]
    Document(String),

    #[error("could not write {}: {source}", .path.display())]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Rasterize { .. } | Self::InvalidImage(_) | Self::Encode(_) => {
                ErrorCode::ChartRenderFailed
            }
            Self::Document(_) | Self::Write { .. } => ErrorCode::ExportWriteFailed,
        }
    }
}
