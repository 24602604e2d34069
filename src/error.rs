use std::fmt;

use thiserror::Error;

/// Closed set of failure kinds a download can end with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidUrl,
    InvalidVideoId,
    NetworkError,
    CredentialExtractionFailed,
    /// Not produced by the default flow: player-info failures collapse into `NoSubtitlesAvailable`
    CaptionTracksNotFound,
    NoSubtitlesAvailable,
    LanguageNotAvailable,
    TranscriptDownloadFailed,
    TranscriptParseFailed,
    UnknownError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidUrl => "invalid URL",
            ErrorKind::InvalidVideoId => "invalid video id",
            ErrorKind::NetworkError => "network error",
            ErrorKind::CredentialExtractionFailed => "credential extraction failed",
            ErrorKind::CaptionTracksNotFound => "caption tracks not found",
            ErrorKind::NoSubtitlesAvailable => "no subtitles available",
            ErrorKind::LanguageNotAvailable => "language not available",
            ErrorKind::TranscriptDownloadFailed => "transcript download failed",
            ErrorKind::TranscriptParseFailed => "transcript parse failed",
            ErrorKind::UnknownError => "unknown error",
        };
        write!(f, "{name}")
    }
}

/// Error half of a [`SubtitleOutcome`](crate::SubtitleOutcome).
///
/// `kind` is what callers branch on. `source` carries the technical cause for
/// diagnostics only.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct SubtitleError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl SubtitleError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Failures from a single remote call
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed player response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Status code of a non-2xx response, if that is what failed
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Request(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode(_) => None,
        }
    }
}

/// Document-level transcript parse failures
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("error parsing caption XML at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("caption document has no root element")]
    NoRootElement,

    #[error("caption document ended with {depth} unclosed element(s)")]
    UnclosedElement { depth: usize },
}

/// Durable credential store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential record is unreadable: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("no cache directory available on this platform")]
    NoCacheDir,
}
