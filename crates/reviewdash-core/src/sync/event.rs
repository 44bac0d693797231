//! Push-channel envelope decoding.
//!
//! The server wraps each status change in an envelope whose `message` field
//! is itself a JSON-encoded string:
//!
//! ```text
//! {"message": "{\"id\": 7, \"status\": \"Completed\"}"}
//! ```
//!
//! [`decode_envelope`] also accepts the flattened form where `message` is the
//! payload object directly. [`encode_envelope`] always emits the double-encoded
//! form.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::ErrorCode;
use crate::model::file::file_name_from_path;
use crate::model::{FileId, FileRecord, FileStatus};

/// Keep-alive message text; never reaches the reconciler.
pub const KEEP_ALIVE: &str = "pong";

/// Errors raised while decoding a push-channel frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("envelope has no 'message' field")]
    MissingMessage,

    #[error("message payload is not valid JSON: {0}")]
    InvalidPayload(String),

    #[error("message payload must be a JSON object, found {0}")]
    NotAnObject(String),

    #[error("event is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("event field '{field}' has invalid value {value}")]
    InvalidField {
        field: &'static str,
        value: String,
    },
}

impl EventError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        ErrorCode::MalformedEvent
    }
}

/// A status change for one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub id: FileId,
    pub status: FileStatus,
    pub job_id: Option<String>,
    pub file_name: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl StatusEvent {
    #[must_use]
    pub const fn new(id: FileId, status: FileStatus) -> Self {
        Self {
            id,
            status,
            job_id: None,
            file_name: None,
            uploaded_at: None,
        }
    }

    /// The record synthesized when this event names an unknown file.
    #[must_use]
    pub fn to_record(&self) -> FileRecord {
        let mut record = FileRecord::new(self.id, self.file_name.clone().unwrap_or_default());
        record.status = self.status.clone();
        record.job_id.clone_from(&self.job_id);
        record.uploaded_at = self.uploaded_at;
        record
    }

    fn to_payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("id".to_string(), Value::from(self.id.0));
        payload.insert(
            "status".to_string(),
            Value::from(self.status.as_str().to_string()),
        );
        if let Some(job_id) = &self.job_id {
            payload.insert("job_id".to_string(), Value::from(job_id.clone()));
        }
        if let Some(file_name) = &self.file_name {
            payload.insert("file_name".to_string(), Value::from(file_name.clone()));
        }
        if let Some(uploaded_at) = self.uploaded_at {
            payload.insert(
                "uploaded_at".to_string(),
                Value::from(uploaded_at.to_rfc3339()),
            );
        }
        Value::Object(payload)
    }
}

/// One decoded push-channel frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Status(StatusEvent),
    KeepAlive,
}

/// Decode one raw frame from the push channel.
///
/// # Errors
///
/// Returns [`EventError`] when the frame is not a JSON envelope, the payload
/// cannot be decoded, or `id`/`status` are missing or mistyped.
pub fn decode_envelope(raw: &str) -> Result<Frame, EventError> {
    let envelope: Value =
        serde_json::from_str(raw).map_err(|err| EventError::InvalidJson(err.to_string()))?;

    let message = envelope
        .as_object()
        .and_then(|object| object.get("message"))
        .ok_or(EventError::MissingMessage)?;

    let payload = match message {
        Value::String(text) if text.trim().eq_ignore_ascii_case(KEEP_ALIVE) => {
            return Ok(Frame::KeepAlive);
        }
        Value::String(text) => serde_json::from_str::<Value>(text)
            .map_err(|err| EventError::InvalidPayload(err.to_string()))?,
        other => other.clone(),
    };

    let fields = match payload {
        Value::Object(fields) => fields,
        other => return Err(EventError::NotAnObject(other.to_string())),
    };

    decode_payload(&fields).map(Frame::Status)
}

/// Encode an event in the double-encoded envelope form.
#[must_use]
pub fn encode_envelope(event: &StatusEvent) -> String {
    let mut envelope = Map::new();
    envelope.insert(
        "message".to_string(),
        Value::from(event.to_payload().to_string()),
    );
    Value::Object(envelope).to_string()
}

fn decode_payload(fields: &Map<String, Value>) -> Result<StatusEvent, EventError> {
    let id = match fields.get("id") {
        None | Some(Value::Null) => return Err(EventError::MissingField("id")),
        Some(Value::Number(number)) => number.as_u64(),
        Some(Value::String(text)) => text.trim().parse::<u64>().ok(),
        Some(_) => None,
    }
    .map(FileId)
    .ok_or_else(|| invalid("id", fields.get("id")))?;

    let status = match fields.get("status") {
        None | Some(Value::Null) => return Err(EventError::MissingField("status")),
        Some(Value::String(text)) if !text.trim().is_empty() => FileStatus::parse(text),
        other => return Err(invalid("status", other)),
    };

    let stored_path = optional_str(fields, "file")?;
    let file_name = optional_str(fields, "file_name")?
        .map(str::to_string)
        .or_else(|| stored_path.map(|path| file_name_from_path(path).to_string()));

    let uploaded_at = optional_str(fields, "uploaded_at")?
        .map(|text| {
            DateTime::parse_from_rfc3339(text)
                .map(|at| at.with_timezone(&Utc))
                .map_err(|_| invalid("uploaded_at", fields.get("uploaded_at")))
        })
        .transpose()?;

    Ok(StatusEvent {
        id,
        status,
        job_id: optional_str(fields, "job_id")?.map(str::to_string),
        file_name,
        uploaded_at,
    })
}

fn optional_str<'a>(
    fields: &'a Map<String, Value>,
    field: &'static str,
) -> Result<Option<&'a str>, EventError> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.as_str())),
        other => Err(invalid(field, other)),
    }
}

fn invalid(field: &'static str, value: Option<&Value>) -> EventError {
    EventError::InvalidField {
        field,
        value: value.map_or_else(|| "null".to_string(), Value::to_string),
    }
}
