//! Merge-by-id reconciliation of status events into the report model.

use std::fmt;

use tracing::{debug, trace, warn};

use super::event::{Frame, StatusEvent, decode_envelope};
use crate::model::{FileId, FileStatus};
use crate::report::ReportModel;

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// What one applied event did to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The file was unknown and has been inserted.
    Added { id: FileId, status: FileStatus },
    /// The file's status was overwritten in place.
    Updated { id: FileId, status: FileStatus },
}

impl Notification {
    #[must_use]
    pub const fn id(&self) -> FileId {
        match self {
            Self::Added { id, .. } | Self::Updated { id, .. } => *id,
        }
    }

    #[must_use]
    pub const fn status(&self) -> &FileStatus {
        match self {
            Self::Added { status, .. } | Self::Updated { status, .. } => status,
        }
    }

    /// Toast text shown to the user.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added { id, status } => write!(f, "File ID {id} added: {status}"),
            Self::Updated { id, status } => write!(f, "File ID {id} processed: {status}"),
        }
    }
}

/// Apply one status event to the model.
///
/// A known id has only its status overwritten; an unknown id is inserted as
/// a record synthesized from the event. Applying the same event twice leaves
/// the model as applying it once.
pub fn reconcile(model: &mut ReportModel, event: &StatusEvent) -> Notification {
    if model.contains(event.id) {
        model.update_status(event.id, event.status.clone());
        Notification::Updated {
            id: event.id,
            status: event.status.clone(),
        }
    } else {
        model.insert(event.to_record());
        Notification::Added {
            id: event.id,
            status: event.status.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Observers
// ---------------------------------------------------------------------------

/// Receives every notification after the model has been updated.
pub trait ModelObserver {
    fn notify(&mut self, notification: &Notification, model: &ReportModel);
}

impl<F> ModelObserver for F
where
    F: FnMut(&Notification, &ReportModel),
{
    fn notify(&mut self, notification: &Notification, model: &ReportModel) {
        self(notification, model);
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Running totals for one reconciliation session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReconcileStats {
    /// Events applied to the model (`inserted + updated`).
    pub applied: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Malformed frames dropped without touching the model.
    pub dropped: usize,
    pub keep_alive: usize,
}

/// Stateful front of [`reconcile`]: decodes frames, keeps statistics, and fans
/// notifications out to observers.
#[derive(Default)]
pub struct Reconciler {
    observers: Vec<Box<dyn ModelObserver>>,
    stats: ReconcileStats,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("observers", &self.observers.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_observer(mut self, observer: impl ModelObserver + 'static) -> Self {
        self.add_observer(observer);
        self
    }

    pub fn add_observer(&mut self, observer: impl ModelObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    #[must_use]
    pub const fn stats(&self) -> ReconcileStats {
        self.stats
    }

    /// Apply a decoded event and notify observers.
    pub fn apply(&mut self, model: &mut ReportModel, event: &StatusEvent) -> Notification {
        let notification = reconcile(model, event);
        self.stats.applied += 1;
        match notification {
            Notification::Added { .. } => self.stats.inserted += 1,
            Notification::Updated { .. } => self.stats.updated += 1,
        }
        debug!(id = %event.id, status = %event.status, "{notification}");

        for observer in &mut self.observers {
            observer.notify(&notification, model);
        }
        notification
    }

    /// Decode and apply one raw push-channel frame.
    ///
    /// Malformed frames are logged and dropped; keep-alives are ignored. Both
    /// return `None` and leave the model untouched.
    pub fn handle_frame(&mut self, model: &mut ReportModel, raw: &str) -> Option<Notification> {
        match decode_envelope(raw) {
            Ok(Frame::Status(event)) => Some(self.apply(model, &event)),
            Ok(Frame::KeepAlive) => {
                self.stats.keep_alive += 1;
                trace!("push channel keep-alive");
                None
            }
            Err(err) => {
                self.stats.dropped += 1;
                warn!(code = %err.error_code(), error = %err, "dropping malformed push event");
                None
            }
        }
    }
}
