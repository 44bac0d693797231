#![forbid(unsafe_code)]
//! reviewdash-core library.
//!
//! Data model, sentiment aggregation, and live reconciliation of uploaded
//! review files against server push notifications.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums at module seams, each mapping to an
//!   [`error::ErrorCode`]; `anyhow::Result` for config/file glue.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod aggregate;
pub mod config;
pub mod error;
pub mod model;
pub mod report;
pub mod sync;
pub mod transport;

pub use aggregate::{
    DerivedMatrix, compute_mention_frequency, compute_priority_ranking, compute_review_counts,
    compute_sentiment_counts, compute_sentiment_percentage, compute_weighted_score,
};
pub use model::{Category, FileId, FileRecord, FileStatus, Polarity, Review, Sentiment};
pub use report::ReportModel;
