//! Review rows, file records, and the fixed category catalog.

pub mod file;
pub mod review;

pub use file::{FileId, FileRecord, FileStatus};
pub use review::{
    Category, CategoryMention, Polarity, Review, ReviewError, Sentiment, UnknownCategory,
    UnknownPolarity, UnknownSentiment, location_label,
};
