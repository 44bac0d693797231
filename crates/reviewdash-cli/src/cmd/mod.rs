pub mod chart;
pub mod completions;
pub mod export;
pub mod list;
pub mod report;
pub mod upload;
pub mod watch;

use std::path::Path;

use anyhow::{Context, Result};
use reviewdash_core::model::{FileId, FileRecord, Review};
use serde_json::Value;

/// Load a file record from `path`.
///
/// Accepts a full record (`{"id": .., "results": [..]}`) or a bare array of
/// review rows; the latter becomes record 0 named after the file stem.
pub fn load_record(path: &Path) -> Result<FileRecord> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    if value.is_array() {
        let reviews: Vec<Review> = serde_json::from_value(value)
            .with_context(|| format!("invalid review rows in {}", path.display()))?;
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();
        let mut record = FileRecord::new(FileId(0), name);
        record.results = Some(reviews);
        return Ok(record);
    }

    serde_json::from_value(value)
        .with_context(|| format!("invalid file record in {}", path.display()))
}

/// Load just the review rows from `path`; see [`load_record`].
pub fn load_reviews(path: &Path) -> Result<Vec<Review>> {
    Ok(load_record(path)?.results.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reviewdash_core::model::Category;

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).expect("write fixture");
        path
    }

    #[test]
    fn bare_row_array_becomes_record_zero() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(
            dir.path(),
            "march.json",
            r#"[{"PLACE ADDRESS": "1 Elm, Alpha", "customer_service_sentiment": "negative", "customer_service_intensity": 4}]"#,
        );
        let record = load_record(&path).expect("load");
        assert_eq!(record.id, FileId(0));
        assert_eq!(record.file_name, "march");
        let reviews = record.reviews();
        assert_eq!(reviews.len(), 1);
        assert!(reviews[0].sentiment(Category::CustomerService).is_mention());
    }

    #[test]
    fn full_record_keeps_its_metadata() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(
            dir.path(),
            "record.json",
            r#"{"id": 7, "file": "uploads/march.xlsx", "status": "Completed", "results": []}"#,
        );
        let record = load_record(&path).expect("load");
        assert_eq!(record.id, FileId(7));
        assert_eq!(record.file_name, "march.xlsx");
        assert!(load_reviews(&path).expect("reviews").is_empty());
    }

    #[test]
    fn invalid_json_names_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(dir.path(), "broken.json", "{not json");
        let err = load_record(&path).expect_err("invalid");
        assert!(format!("{err:#}").contains("broken.json"));
    }
}
