//! The in-memory collection of uploaded-file records.
//!
//! [`ReportModel`] is the only shared mutable state in a dashboard session. It
//! is owned by the application root and lent by reference to the reconciler
//! and renderers; all mutation goes through its methods.

use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{FileId, FileRecord, FileStatus};

/// Outcome of [`ReportModel::insert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// No record with this id existed.
    Inserted,
    /// A record with this id was replaced in place.
    Replaced,
}

/// Outcome of [`ReportModel::update_status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    /// The record existed; only its status changed.
    Updated {
        /// Status before the update.
        previous: FileStatus,
    },
    /// The id was unknown; a new pending-shaped record was inserted.
    Inserted,
}

/// Uploaded-file records keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportModel {
    records: BTreeMap<FileId, FileRecord>,
}

impl ReportModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a model from a listing response.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = FileRecord>) -> Self {
        let mut model = Self::new();
        model.seed(records);
        model
    }

    /// Replace every record with a fresh listing.
    pub fn seed(&mut self, records: impl IntoIterator<Item = FileRecord>) {
        self.records = records.into_iter().map(|r| (r.id, r)).collect();
        debug!(count = self.records.len(), "report model seeded");
    }

    /// Insert a record, replacing any existing record with the same id.
    pub fn insert(&mut self, record: FileRecord) -> InsertOutcome {
        match self.records.insert(record.id, record) {
            Some(_) => InsertOutcome::Replaced,
            None => InsertOutcome::Inserted,
        }
    }

    /// Set the status of `id`, leaving every other field untouched.
    ///
    /// An unknown id becomes an insert of a minimal record carrying `status`.
    pub fn update_status(&mut self, id: FileId, status: FileStatus) -> StatusUpdate {
        if let Some(record) = self.records.get_mut(&id) {
            let previous = std::mem::replace(&mut record.status, status);
            return StatusUpdate::Updated { previous };
        }

        let mut record = FileRecord::new(id, String::new());
        record.status = status;
        self.records.insert(id, record);
        StatusUpdate::Inserted
    }

    #[must_use]
    pub fn get(&self, id: FileId) -> Option<&FileRecord> {
        self.records.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: FileId) -> bool {
        self.records.contains_key(&id)
    }

    /// Records in display order: newest (highest id) first.
    pub fn list(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values().rev()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
