//! Uploaded-file records as served by the listing endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::review::Review;

/// Server-assigned identifier of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub u64);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for FileId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Processing status of an uploaded file.
///
/// Wire values are `Pending`, `Processing`, `Completed`, `Failed`. Parsing is
/// case-insensitive and folds the job-runner vocabulary onto these four:
///
/// | input | status |
/// |---|---|
/// | `started`, `retry` | `Processing` |
/// | `done`, `success` | `Completed` |
/// | `error`, `failure`, `revoked` | `Failed` |
///
/// Anything else is kept verbatim as [`FileStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FileStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Other(String),
}

impl FileStatus {
    /// Parse a status string. Never fails; see the type docs for aliases.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "processing" | "started" | "retry" => Self::Processing,
            "completed" | "done" | "success" => Self::Completed,
            "failed" | "error" | "failure" | "revoked" => Self::Failed,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Other(raw) => raw,
        }
    }

    /// `Completed` and `Failed` never change again on the server side.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FileStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FileStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// One uploaded spreadsheet and, once processed, its review rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    pub id: FileId,
    /// Server-side storage path of the upload, e.g. `uploads/reviews.xlsx`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub file_name: String,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub status: FileStatus,
    pub job_id: Option<String>,
    /// Download URI of the annotated spreadsheet.
    pub results_excel: Option<String>,
    pub results: Option<Vec<Review>>,
}

impl FileRecord {
    /// A freshly uploaded file: pending, no results.
    #[must_use]
    pub fn new(id: FileId, file_name: impl Into<String>) -> Self {
        Self {
            id,
            file: None,
            file_name: file_name.into(),
            uploaded_at: None,
            status: FileStatus::Pending,
            job_id: None,
            results_excel: None,
            results: None,
        }
    }

    /// Review rows, or an empty slice while the file is unprocessed.
    #[must_use]
    pub fn reviews(&self) -> &[Review] {
        self.results.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn has_results(&self) -> bool {
        self.results.as_ref().is_some_and(|rows| !rows.is_empty())
    }
}

/// Last `/`-separated segment of a storage path.
#[must_use]
pub fn file_name_from_path(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

impl<'de> Deserialize<'de> for FileRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        /// Listing rows carry `file` (a storage path); push payloads and our
        /// own serialized records carry `file_name` directly.
        #[derive(Deserialize)]
        struct FileRecordRaw {
            id: FileId,
            #[serde(default)]
            file: Option<String>,
            #[serde(default)]
            file_name: Option<String>,
            #[serde(default)]
            uploaded_at: Option<DateTime<Utc>>,
            #[serde(default)]
            status: FileStatus,
            #[serde(default)]
            job_id: Option<String>,
            #[serde(default)]
            results_excel: Option<String>,
            #[serde(default)]
            results: Option<Vec<Review>>,
        }

        let raw = FileRecordRaw::deserialize(deserializer)?;
        let file_name = raw
            .file_name
            .or_else(|| raw.file.as_deref().map(|p| file_name_from_path(p).to_string()))
            .unwrap_or_default();

        Ok(Self {
            id: raw.id,
            file: raw.file,
            file_name,
            uploaded_at: raw.uploaded_at,
            status: raw.status,
            job_id: raw.job_id,
            results_excel: raw.results_excel,
            results: raw.results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::review::{Category, Sentiment};

    #[test]
    fn status_parse_folds_aliases() {
        assert_eq!(FileStatus::parse("Pending"), FileStatus::Pending);
        assert_eq!(FileStatus::parse("STARTED"), FileStatus::Processing);
        assert_eq!(FileStatus::parse("done"), FileStatus::Completed);
        assert_eq!(FileStatus::parse("Completed"), FileStatus::Completed);
        assert_eq!(FileStatus::parse("error"), FileStatus::Failed);
        assert_eq!(FileStatus::parse("revoked"), FileStatus::Failed);
        assert_eq!(
            FileStatus::parse("Queued"),
            FileStatus::Other("Queued".to_string())
        );
    }

    #[test]
    fn status_terminal_states() {
        assert!(FileStatus::Completed.is_terminal());
        assert!(FileStatus::Failed.is_terminal());
        assert!(!FileStatus::Pending.is_terminal());
        assert!(!FileStatus::Processing.is_terminal());
        assert!(!FileStatus::Other("x".to_string()).is_terminal());
    }

    #[test]
    fn status_display_uses_wire_values() {
        assert_eq!(FileStatus::Processing.to_string(), "Processing");
        assert_eq!(FileStatus::Other("Queued".to_string()).to_string(), "Queued");
    }

    #[test]
    fn listing_row_derives_file_name_from_path() {
        let record: FileRecord = serde_json::from_str(
            r#"{
                "id": 12,
                "file": "uploads/reviews_march.xlsx",
                "uploaded_at": "2024-03-01T10:15:00.123456+00:00",
                "status": "Completed",
                "job_id": "c0ffee",
                "results_excel": "/media/results/file_results_12.xlsx",
                "results": [
                    {"PLACE ADDRESS": "1 Elm, Shelbyville", "price_sentiment": "negative", "price_intensity": 3}
                ]
            }"#,
        )
        .expect("listing row should decode");

        assert_eq!(record.id, FileId(12));
        assert_eq!(record.file_name, "reviews_march.xlsx");
        assert_eq!(record.status, FileStatus::Completed);
        assert_eq!(record.job_id.as_deref(), Some("c0ffee"));
        assert!(record.uploaded_at.is_some());
        assert_eq!(record.reviews().len(), 1);
        assert_eq!(record.reviews()[0].sentiment(Category::Price), Sentiment::Negative);
        assert!(record.has_results());
    }

    #[test]
    fn minimal_row_uses_defaults() {
        let record: FileRecord = serde_json::from_str(r#"{"id": 3}"#).expect("decode");
        assert_eq!(record.status, FileStatus::Pending);
        assert_eq!(record.file_name, "");
        assert!(record.results.is_none());
        assert!(record.reviews().is_empty());
        assert!(!record.has_results());
    }

    #[test]
    fn serialized_record_decodes_back() {
        let mut record = FileRecord::new(FileId(5), "march.xlsx");
        record.status = FileStatus::Failed;
        let text = serde_json::to_string(&record).expect("serialize");
        let back: FileRecord = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, record);
    }

    #[test]
    fn file_name_from_path_handles_bare_names() {
        assert_eq!(file_name_from_path("uploads/a/b.xlsx"), "b.xlsx");
        assert_eq!(file_name_from_path("b.xlsx"), "b.xlsx");
    }
}
