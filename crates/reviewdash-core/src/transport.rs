//! Request/response transports to the file server.
//!
//! The upload and listing calls are abstracted behind [`UploadTransport`] and
//! [`ListingTransport`] so the workflow functions here stay independent of any
//! HTTP client. A failed call never mutates the report model.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::error::ErrorCode;
use crate::model::{FileId, FileRecord, FileStatus};
use crate::report::ReportModel;

/// Spreadsheet extensions the server will process.
pub const ACCEPTED_EXTENSIONS: [&str; 2] = ["xls", "xlsx"];

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("'{name}' is not an .xls or .xlsx spreadsheet")]
    UnsupportedFileType { name: String },

    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode file listing: {0}")]
    Decode(String),
}

impl TransportError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedFileType { .. } => ErrorCode::UploadRejected,
            Self::Decode(_) => ErrorCode::ListingDecodeFailed,
            Self::Io { .. } | Self::Request { .. } | Self::Status { .. } => {
                ErrorCode::TransportFailed
            }
        }
    }
}

/// Server acknowledgement of an upload.
///
/// The body is kept verbatim; `id` and `status` are lifted out when the server
/// echoes the created record.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadAck {
    pub id: Option<FileId>,
    pub status: Option<FileStatus>,
    pub body: Value,
}

impl UploadAck {
    #[must_use]
    pub fn from_body(body: Value) -> Self {
        let id = body.get("id").and_then(Value::as_u64).map(FileId);
        let status = body
            .get("status")
            .and_then(Value::as_str)
            .map(FileStatus::parse);
        Self { id, status, body }
    }
}

pub trait UploadTransport {
    /// Send one file as the single multipart field.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on connection failure or a non-success
    /// response.
    fn upload(&mut self, file_name: &str, bytes: &[u8]) -> Result<UploadAck, TransportError>;
}

pub trait ListingTransport {
    /// Fetch every file record the server knows about.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on connection failure or an undecodable body.
    fn list(&mut self) -> Result<Vec<FileRecord>, TransportError>;
}

/// Reject anything but `.xls`/`.xlsx` before touching the network.
///
/// # Errors
///
/// Returns [`TransportError::UnsupportedFileType`] for other extensions.
pub fn validate_upload_name(name: &str) -> Result<(), TransportError> {
    let accepted = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        });

    if accepted {
        Ok(())
    } else {
        Err(TransportError::UnsupportedFileType {
            name: name.to_string(),
        })
    }
}

/// Validate, read and upload a spreadsheet from disk.
///
/// # Errors
///
/// Returns [`TransportError`] if validation, the read, or the upload fails.
pub fn upload_file<T: UploadTransport + ?Sized>(
    transport: &mut T,
    path: &Path,
) -> Result<UploadAck, TransportError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    validate_upload_name(&file_name)?;

    let bytes = std::fs::read(path).map_err(|source| TransportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(file = %file_name, bytes = bytes.len(), "uploading spreadsheet");

    let ack = transport.upload(&file_name, &bytes)?;
    info!(file = %file_name, id = ?ack.id, "upload accepted");
    Ok(ack)
}

/// Decode a listing response body.
///
/// # Errors
///
/// Returns [`TransportError::Decode`] if the body is not an array of records.
pub fn decode_listing(body: &str) -> Result<Vec<FileRecord>, TransportError> {
    serde_json::from_str(body).map_err(|err| TransportError::Decode(err.to_string()))
}

/// Re-seed `model` from the listing transport.
///
/// The model is left untouched when the call fails.
///
/// # Errors
///
/// Propagates the transport's [`TransportError`].
pub fn refresh<T: ListingTransport + ?Sized>(
    transport: &mut T,
    model: &mut ReportModel,
) -> Result<usize, TransportError> {
    let records = transport.list()?;
    model.seed(records);
    Ok(model.len())
}
