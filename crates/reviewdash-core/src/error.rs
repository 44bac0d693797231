use std::fmt;

/// Machine-readable error codes shared by the library crates and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InvalidReviewRow,
    MalformedEvent,
    TransportFailed,
    UploadRejected,
    ListingDecodeFailed,
    ChartRenderFailed,
    ExportWriteFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InvalidReviewRow => "E2002",
            Self::MalformedEvent => "E3001",
            Self::TransportFailed => "E4001",
            Self::UploadRejected => "E4002",
            Self::ListingDecodeFailed => "E4003",
            Self::ChartRenderFailed => "E5001",
            Self::ExportWriteFailed => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidReviewRow => "Invalid review row",
            Self::MalformedEvent => "Malformed push-channel event",
            Self::TransportFailed => "Server request failed",
            Self::UploadRejected => "Upload rejected",
            Self::ListingDecodeFailed => "File listing could not be decoded",
            Self::ChartRenderFailed => "Chart rendering failed",
            Self::ExportWriteFailed => "Export output write failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .reviewdash/config.toml and retry."),
            Self::InvalidReviewRow => {
                Some("Results must be an array of JSON objects, one per review.")
            }
            Self::MalformedEvent | Self::ChartRenderFailed => None,
            Self::TransportFailed => Some("Check the server URL and that the server is running."),
            Self::UploadRejected => Some("Only .xls and .xlsx spreadsheets can be uploaded."),
            Self::ListingDecodeFailed => {
                Some("Check that the server and client versions are compatible.")
            }
            Self::ExportWriteFailed => Some("Check disk space and write permissions."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
