//! Blocking HTTP transports for the file server.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reviewdash_core::config::ServerConfig;
use reviewdash_core::model::FileRecord;
use reviewdash_core::transport::{
    ListingTransport, TransportError, UploadAck, UploadTransport, decode_listing,
};
use serde_json::Value;
use tracing::debug;

const USER_AGENT: &str = concat!("reviewdash-cli/", env!("CARGO_PKG_VERSION"));
const TIMEOUT: Duration = Duration::from_secs(30);

/// `ureq`-backed client for the `files_path` endpoint.
#[derive(Debug)]
pub struct HttpTransport {
    agent: ureq::Agent,
    files_url: String,
    upload_field: String,
}

impl HttpTransport {
    pub fn new(server: &ServerConfig) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(TIMEOUT).build(),
            files_url: server.files_url(),
            upload_field: server.upload_field.clone(),
        }
    }

    pub fn files_url(&self) -> &str {
        &self.files_url
    }

    fn map_error(&self, err: ureq::Error) -> TransportError {
        match err {
            ureq::Error::Status(status, response) => TransportError::Status {
                status,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => TransportError::Request {
                url: self.files_url.clone(),
                reason: transport.to_string(),
            },
        }
    }
}

impl ListingTransport for HttpTransport {
    fn list(&mut self) -> Result<Vec<FileRecord>, TransportError> {
        debug!(url = %self.files_url, "fetching file listing");
        let response = self
            .agent
            .get(&self.files_url)
            .set("Accept", "application/json")
            .set("User-Agent", USER_AGENT)
            .call()
            .map_err(|err| self.map_error(err))?;

        let body = response
            .into_string()
            .map_err(|err| TransportError::Decode(err.to_string()))?;
        decode_listing(&body)
    }
}

impl UploadTransport for HttpTransport {
    fn upload(&mut self, file_name: &str, bytes: &[u8]) -> Result<UploadAck, TransportError> {
        let boundary = boundary();
        let body = multipart_body(&boundary, &self.upload_field, file_name, bytes);
        debug!(url = %self.files_url, bytes = body.len(), "posting multipart upload");

        let response = self
            .agent
            .post(&self.files_url)
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={boundary}"),
            )
            .set("Accept", "application/json")
            .set("User-Agent", USER_AGENT)
            .send_bytes(&body)
            .map_err(|err| self.map_error(err))?;

        let body = response
            .into_json::<Value>()
            .map_err(|err| TransportError::Decode(err.to_string()))?;
        Ok(UploadAck::from_body(body))
    }
}

fn boundary() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos());
    format!("----reviewdash{nanos:x}")
}

fn content_type(file_name: &str) -> &'static str {
    if file_name.to_ascii_lowercase().ends_with(".xlsx") {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    } else {
        "application/vnd.ms-excel"
    }
}

/// A `multipart/form-data` body with one file part.
fn multipart_body(boundary: &str, field: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let escaped = file_name.replace('"', "%22");
    let mut body = Vec::with_capacity(bytes.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{escaped}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type(file_name)).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_body_wraps_one_file_part() {
        let body = multipart_body("XYZ", "file", "march.xlsx", b"PK\x03\x04");
        let text = String::from_utf8_lossy(&body);
        assert!(text.starts_with("--XYZ\r\n"));
        assert!(text.contains("name=\"file\"; filename=\"march.xlsx\""));
        assert!(text.contains("spreadsheetml.sheet\r\n\r\nPK"));
        assert!(text.ends_with("\r\n--XYZ--\r\n"));
    }

    #[test]
    fn legacy_excel_content_type() {
        assert_eq!(content_type("OLD.XLS"), "application/vnd.ms-excel");
        assert!(content_type("new.XLSX").contains("openxmlformats"));
    }

    #[test]
    fn quotes_in_file_names_are_escaped() {
        let body = multipart_body("b", "upload", "a\"b.xls", b"");
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("name=\"upload\"; filename=\"a%22b.xls\""));
    }

    #[test]
    fn transport_targets_configured_endpoint() {
        let server = ServerConfig {
            base_url: "http://example.test:9000/".to_string(),
            ..ServerConfig::default()
        };
        let transport = HttpTransport::new(&server);
        assert_eq!(transport.files_url(), server.files_url());
        assert!(boundary().starts_with("----reviewdash"));
    }
}
