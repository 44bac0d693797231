//! Rows of the uploaded-files grid.

use chrono::{DateTime, Utc};
use reviewdash_core::model::{FileId, FileRecord, FileStatus};
use reviewdash_core::report::ReportModel;
use serde::Serialize;

/// Column headers, in display order.
pub const GRID_COLUMNS: [&str; 4] = ["ID", "File Name", "Uploaded At", "Status"];

/// One grid row plus its two row actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridRow {
    pub id: FileId,
    pub file_name: String,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub status: FileStatus,
    /// Target of "download reviewed file"; absent until processing produced one.
    pub download_url: Option<String>,
    /// Whether "export report as PDF" has anything to export.
    pub can_export: bool,
}

impl GridRow {
    /// Build a row, resolving a relative `results_excel` against `base_url`.
    #[must_use]
    pub fn from_record(record: &FileRecord, base_url: Option<&str>) -> Self {
        Self {
            id: record.id,
            file_name: record.file_name.clone(),
            uploaded_at: record.uploaded_at,
            status: record.status.clone(),
            download_url: record
                .results_excel
                .as_deref()
                .filter(|uri| !uri.trim().is_empty())
                .map(|uri| resolve_url(base_url, uri)),
            can_export: record.has_results(),
        }
    }

    /// Upload time as shown in the grid.
    #[must_use]
    pub fn uploaded_at_display(&self) -> String {
        self.uploaded_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default()
    }
}

/// Grid rows for every record, newest first.
#[must_use]
pub fn grid_rows(model: &ReportModel, base_url: Option<&str>) -> Vec<GridRow> {
    model
        .list()
        .map(|record| GridRow::from_record(record, base_url))
        .collect()
}

fn resolve_url(base_url: Option<&str>, uri: &str) -> String {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        return uri.to_string();
    }
    match base_url {
        Some(base) => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            uri.trim_start_matches('/')
        ),
        None => uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use reviewdash_core::model::Review;

    fn record(id: u64) -> FileRecord {
        FileRecord::new(FileId(id), format!("f{id}.xlsx"))
    }

    #[test]
    fn rows_follow_model_order() {
        let model = ReportModel::from_records([record(1), record(3), record(2)]);
        let ids: Vec<u64> = grid_rows(&model, None).iter().map(|row| row.id.0).collect();
        assert_eq!(ids, [3, 2, 1]);
    }

    #[test]
    fn pending_record_has_no_actions() {
        let row = GridRow::from_record(&record(1), Some("http://localhost:8000"));
        assert_eq!(row.status, FileStatus::Pending);
        assert!(row.download_url.is_none());
        assert!(!row.can_export);
        assert_eq!(row.uploaded_at_display(), "");
    }

    #[test]
    fn processed_record_exposes_download_and_export() {
        let mut processed = record(4);
        processed.status = FileStatus::Completed;
        processed.uploaded_at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).single();
        processed.results_excel = Some("/media/results/file_results_4.xlsx".to_string());
        processed.results = Some(vec![Review::new("1 Elm, Alpha")]);

        let row = GridRow::from_record(&processed, Some("http://localhost:8000/"));
        assert_eq!(
            row.download_url.as_deref(),
            Some("http://localhost:8000/media/results/file_results_4.xlsx")
        );
        assert!(row.can_export);
        assert_eq!(row.uploaded_at_display(), "2024-03-01 10:15");
    }

    #[test]
    fn absolute_download_url_is_kept() {
        let mut processed = record(5);
        processed.results_excel = Some("https://cdn.example.com/r.xlsx".to_string());
        let row = GridRow::from_record(&processed, Some("http://localhost:8000"));
        assert_eq!(row.download_url.as_deref(), Some("https://cdn.example.com/r.xlsx"));
    }
}
