use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, trace, warn};
use regex::Regex;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Deserialize;

use crate::cache::redact;
use crate::error::ApiError;
use crate::{CaptionTrack, TrackKind};

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

pub const PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";

pub const CLIENT_VERSION: &str = "2.20241126.01.00";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

static API_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""INNERTUBE_API_KEY"\s*:\s*"([a-zA-Z0-9_-]+)""#).expect("api key pattern is valid")
});

static API_KEY_FALLBACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"innertubeApiKey\s*[=:]\s*"([a-zA-Z0-9_-]+)""#).expect("api key pattern is valid")
});

/// The remote calls needed to go from a video ID to a transcript document.
///
/// Implementations never retry; retry policy belongs to the caller.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// GET the watch page HTML
    async fn fetch_page(&self, url: &str) -> Result<String, ApiError>;

    /// Pull the InnerTube API key out of watch page HTML
    fn extract_credential(&self, html: &str) -> Option<String> {
        extract_api_key(html)
    }

    /// List caption tracks via the InnerTube player endpoint
    async fn call_player_info(&self, secret: &str, video_id: &str) -> Result<Vec<CaptionTrack>, ApiError>;

    /// GET a track's timed-text XML; the URL already carries its signature
    async fn fetch_transcript(&self, location_url: &str) -> Result<String, ApiError>;
}

/// Settings for [`YouTubeClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Applied to connect, read and the whole request
    pub timeout: Duration,
    pub user_agent: String,
    pub player_url: String,
    pub client_version: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: USER_AGENT.to_string(),
            player_url: PLAYER_URL.to_string(),
            client_version: CLIENT_VERSION.to_string(),
        }
    }
}

/// reqwest-backed [`ApiClient`] talking to youtube.com
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl YouTubeClient {
    pub fn new() -> Result<Self, ApiError> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        if let Ok(ua) = HeaderValue::from_str(&config.user_agent) {
            headers.insert(header::USER_AGENT, ua);
        } else {
            warn!("Ignoring invalid user agent: {}", config.user_agent);
            headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.timeout)
            .read_timeout(config.timeout)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<String, ApiError> {
        let resp = request.send().await?;
        let status = resp.status();
        trace!("{status} {url}");

        if !status.is_success() {
            warn!("Request failed: HTTP {status} from {url}");
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(resp.text().await?)
    }
}

#[async_trait]
impl ApiClient for YouTubeClient {
    async fn fetch_page(&self, url: &str) -> Result<String, ApiError> {
        debug!("Fetching watch page: {url}");
        let html = self.send(self.http.get(url), url).await?;
        debug!("Watch page: {} bytes", html.len());
        Ok(html)
    }

    async fn call_player_info(&self, secret: &str, video_id: &str) -> Result<Vec<CaptionTrack>, ApiError> {
        debug!("Calling InnerTube player for {video_id}");

        let url = format!("{}?key={secret}&prettyPrint=false", self.config.player_url);
        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": "WEB",
                    "clientVersion": self.config.client_version,
                }
            },
            "videoId": video_id
        });

        let request = self
            .http
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body);
        let log_url = format!("{}?key={}", self.config.player_url, redact(secret));
        let json = self.send(request, &log_url).await?;

        // The key was accepted; an unreadable body will not improve with a new one
        match parse_caption_tracks(&json) {
            Ok(tracks) => Ok(tracks),
            Err(e) => {
                warn!("Unreadable player response, treating as no captions: {e}");
                Ok(Vec::new())
            }
        }
    }

    async fn fetch_transcript(&self, location_url: &str) -> Result<String, ApiError> {
        let preview: String = location_url.chars().take(100).collect();
        debug!("Fetching transcript XML: {preview}");
        let xml = self.send(self.http.get(location_url), location_url).await?;
        debug!("Received XML: {} bytes", xml.len());
        Ok(xml)
    }
}

/// Find the InnerTube API key embedded in watch page script content
pub fn extract_api_key(html: &str) -> Option<String> {
    debug!("Searching for API key in {} bytes of HTML", html.len());

    let key = API_KEY
        .captures(html)
        .or_else(|| API_KEY_FALLBACK.captures(html))
        .map(|caps| caps[1].to_string());

    match &key {
        Some(k) => info!("INNERTUBE_API_KEY extracted: {}", redact(k)),
        None => warn!("Could not find INNERTUBE_API_KEY in watch page"),
    }
    key
}

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<CaptionTrackDto>>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrackDto {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    name: Option<TrackName>,
    kind: Option<String>,
    #[serde(rename = "isTranslatable", default)]
    is_translatable: bool,
}

#[derive(Debug, Deserialize)]
struct TrackName {
    #[serde(rename = "simpleText")]
    simple_text: Option<String>,
    runs: Option<Vec<TextRun>>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    text: String,
}

impl TrackName {
    fn into_text(self) -> String {
        match (self.simple_text, self.runs) {
            (Some(text), _) => text,
            (None, Some(runs)) => runs.into_iter().map(|r| r.text).collect(),
            (None, None) => String::new(),
        }
    }
}

impl From<CaptionTrackDto> for CaptionTrack {
    fn from(dto: CaptionTrackDto) -> Self {
        CaptionTrack {
            location_url: dto.base_url,
            display_name: dto.name.map(TrackName::into_text).unwrap_or_default(),
            language_code: dto.language_code,
            kind: TrackKind::from_kind(dto.kind.as_deref()),
            translatable: dto.is_translatable,
        }
    }
}

/// Decode the player response; a missing caption listing is zero tracks
fn parse_caption_tracks(json: &str) -> Result<Vec<CaptionTrack>, ApiError> {
    let resp: InnerTubePlayerResponse = serde_json::from_str(json)?;

    let tracks: Vec<CaptionTrack> = resp
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .and_then(|r| r.caption_tracks)
        .unwrap_or_default()
        .into_iter()
        .map(CaptionTrack::from)
        .collect();

    if tracks.is_empty() {
        warn!("No caption tracks found in player response");
    } else {
        info!("Found {} caption tracks", tracks.len());
        for t in &tracks {
            debug!("  - {} ({}) [{}]", t.display_name, t.language_code, t.kind);
        }
    }

    Ok(tracks)
}
