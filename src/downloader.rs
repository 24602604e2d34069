use std::any::Any;
use std::panic::AssertUnwindSafe;

use eyre::{Result, WrapErr};
use futures::FutureExt;
use log::{error, info, warn};

use crate::cache::CredentialCache;
use crate::client::{ApiClient, YouTubeClient};
use crate::config::Config;
use crate::error::{ErrorKind, SubtitleError};
use crate::store::{CredentialStore, DEFAULT_NAMESPACE, FileStore};
use crate::{CaptionTrack, DEFAULT_LANGUAGE_PREFERENCES, Subtitle, SubtitleOutcome, parser, select, url};

/// Subtitle download pipeline.
///
/// Construct one per process and share it (e.g. behind an `Arc`); concurrent
/// downloads only contend on the credential cache.
///
/// ```no_run
/// # async fn demo() -> eyre::Result<()> {
/// let downloader = ytsub::SubtitleDownloader::from_config(&ytsub::Config::load()?)?;
/// match downloader.download_with("https://youtu.be/dQw4w9WgXcQ", &["hi", "en", "auto"]).await {
///     Ok(subtitle) => println!("[{}] {}", subtitle.language_code, subtitle.text),
///     Err(e) => eprintln!("{e}"),
/// }
/// # Ok(())
/// # }
/// ```
pub struct SubtitleDownloader<C, S> {
    client: C,
    cache: CredentialCache<S>,
    default_languages: Vec<String>,
}

impl SubtitleDownloader<YouTubeClient, FileStore> {
    /// Wire the reqwest client and file-backed credential cache from config
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = YouTubeClient::with_config(config.client_config()).wrap_err("building HTTP client")?;
        let store = match &config.cache_path {
            Some(path) => FileStore::new(path),
            None => FileStore::in_cache_dir(DEFAULT_NAMESPACE)?,
        };
        let cache = CredentialCache::with_ttl(store, config.credential_ttl());

        Ok(Self::new(client, cache).with_default_languages(config.languages()))
    }
}

impl<C: ApiClient, S: CredentialStore> SubtitleDownloader<C, S> {
    pub fn new(client: C, cache: CredentialCache<S>) -> Self {
        info!("SubtitleDownloader initialized");
        Self {
            client,
            cache,
            default_languages: DEFAULT_LANGUAGE_PREFERENCES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Preferences used by [`download`](Self::download)
    pub fn with_default_languages<L: Into<String>>(mut self, languages: impl IntoIterator<Item = L>) -> Self {
        self.default_languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_languages(&self) -> &[String] {
        &self.default_languages
    }

    /// Download subtitles using the default language preferences
    pub async fn download(&self, url: &str) -> SubtitleOutcome {
        self.download_with(url, self.default_languages.as_slice()).await
    }

    /// Download subtitles, trying `preferences` in order (`auto` = any auto-generated track).
    ///
    /// An empty list falls through to the first available track.
    pub async fn download_with<L: AsRef<str> + Sync>(&self, url: &str, preferences: &[L]) -> SubtitleOutcome {
        match AssertUnwindSafe(self.run(url, preferences)).catch_unwind().await {
            Ok(outcome) => {
                if let Err(e) = &outcome {
                    error!("Subtitle download failed: {e}");
                }
                outcome
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Subtitle download panicked: {message}");
                Err(SubtitleError::new(ErrorKind::UnknownError, message))
            }
        }
    }

    /// Forget the cached credential so the next download extracts a fresh one
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Cache cleared by user");
    }

    pub fn has_valid_cached_credential(&self) -> bool {
        self.cache.has_valid()
    }

    async fn run<L: AsRef<str> + Sync>(&self, input: &str, preferences: &[L]) -> SubtitleOutcome {
        info!("=== Starting subtitle download ===");
        info!("URL: {input}");
        info!(
            "Language preferences: {:?}",
            preferences.iter().map(|p| p.as_ref()).collect::<Vec<_>>()
        );

        if input.trim().is_empty() {
            return Err(SubtitleError::new(ErrorKind::InvalidUrl, "URL cannot be empty"));
        }
        if !url::is_recognized(input) {
            return Err(SubtitleError::new(ErrorKind::InvalidUrl, "Not a valid YouTube URL"));
        }
        let video_id = url::extract_video_id(input).ok_or_else(|| {
            SubtitleError::new(ErrorKind::InvalidVideoId, "Failed to extract video ID from URL")
        })?;

        let secret = match self.cache.secret() {
            Some(secret) => secret,
            None => self.fetch_credential(&video_id).await?,
        };

        let tracks = self.caption_tracks(&secret, &video_id).await;
        if tracks.is_empty() {
            return Err(SubtitleError::new(
                ErrorKind::NoSubtitlesAvailable,
                "No subtitles available for this video",
            ));
        }

        let track = select::select_track(&tracks, preferences).ok_or_else(|| {
            SubtitleError::new(
                ErrorKind::LanguageNotAvailable,
                "None of the preferred languages are available",
            )
        })?;
        info!("Selected caption: {} ({})", track.display_name, track.language_code);

        let xml = self.client.fetch_transcript(&track.location_url).await.map_err(|e| {
            SubtitleError::with_source(
                ErrorKind::TranscriptDownloadFailed,
                format!("Failed to download {} transcript", track.language_code),
                e,
            )
        })?;

        let segments = parser::parse(&xml).map_err(|e| {
            SubtitleError::with_source(ErrorKind::TranscriptParseFailed, "Failed to parse transcript XML", e)
        })?;
        let text = parser::to_plain_text(&segments);

        info!("=== Subtitle download completed: {} characters ===", text.len());
        Ok(Subtitle {
            text,
            language_code: track.language_code.clone(),
        })
    }

    /// Extract a fresh API key from the watch page and cache it
    async fn fetch_credential(&self, video_id: &str) -> Result<String, SubtitleError> {
        info!("Fetching new INNERTUBE_API_KEY from YouTube");

        let html = self
            .client
            .fetch_page(&url::build_watch_url(video_id))
            .await
            .map_err(|e| SubtitleError::with_source(ErrorKind::NetworkError, "Failed to fetch video page", e))?;

        let secret = self.client.extract_credential(&html).ok_or_else(|| {
            SubtitleError::new(ErrorKind::CredentialExtractionFailed, "Failed to fetch INNERTUBE_API_KEY")
        })?;

        self.cache.put(&secret);
        Ok(secret)
    }

    /// Player-info call with a single refresh-and-retry.
    ///
    /// A cached key can go stale server-side before its TTL. Only call failures
    /// (transport errors, non-2xx) trigger the refresh; a 2xx body that cannot
    /// be decoded already comes back from the client as zero tracks. Any
    /// failure of the retry path yields zero tracks rather than an error.
    async fn caption_tracks(&self, secret: &str, video_id: &str) -> Vec<CaptionTrack> {
        let err = match self.client.call_player_info(secret, video_id).await {
            Ok(tracks) => return tracks,
            Err(e) => e,
        };
        warn!("Player call failed with current API key, refreshing: {err}");

        self.cache.clear();
        let fresh = match self.fetch_credential(video_id).await {
            Ok(secret) => secret,
            Err(e) => {
                warn!("Could not refresh API key: {e}");
                return Vec::new();
            }
        };

        info!("Retrying with fresh API key");
        match self.client.call_player_info(&fresh, video_id).await {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!("Player call failed again after refresh: {e}");
                Vec::new()
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown error occurred".to_string()
    }
}
