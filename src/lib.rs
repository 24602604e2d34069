pub mod cache;
pub mod client;
pub mod config;
pub mod downloader;
pub mod error;
pub mod logging;
pub mod parser;
pub mod select;
pub mod store;
pub mod url;

pub use cache::{Credential, CredentialCache};
pub use client::{ApiClient, ClientConfig, YouTubeClient};
pub use config::Config;
pub use downloader::SubtitleDownloader;
pub use error::{ApiError, ErrorKind, ParseError, StoreError, SubtitleError};
pub use store::{CredentialStore, FileStore, MemoryStore, StoredCredential};

/// Preference order used when the caller supplies none
pub const DEFAULT_LANGUAGE_PREFERENCES: [&str; 3] = ["en", "hi", "auto"];

/// Preference token that matches any auto-generated track
pub const AUTO_LANGUAGE: &str = "auto";

/// A single captioned segment
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// How a caption track was authored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Manual,
    /// Speech recognition (`kind: "asr"`)
    AutoGenerated,
}

impl TrackKind {
    pub fn from_kind(kind: Option<&str>) -> Self {
        match kind {
            Some("asr") => TrackKind::AutoGenerated,
            _ => TrackKind::Manual,
        }
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Manual => write!(f, "manual"),
            TrackKind::AutoGenerated => write!(f, "auto"),
        }
    }
}

/// One subtitle option offered by the player endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    /// Signed timed-text URL, fetched verbatim
    pub location_url: String,
    pub display_name: String,
    pub language_code: String,
    pub kind: TrackKind,
    pub translatable: bool,
}

/// Recovered subtitle text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtitle {
    pub text: String,
    pub language_code: String,
}

/// The only value a download hands back to its caller
pub type SubtitleOutcome = Result<Subtitle, SubtitleError>;
