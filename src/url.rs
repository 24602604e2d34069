use std::sync::LazyLock;

use log::{debug, info, warn};
use regex::Regex;

static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("bare id pattern is valid"));

/// Tried in order; first match wins
static URL_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        // youtube.com/watch?v=ID
        r"(?:https?://)?(?:www\.)?youtube\.com/watch\?(?:.*&)?v=([a-zA-Z0-9_-]{11})",
        // youtu.be/ID
        r"(?:https?://)?youtu\.be/([a-zA-Z0-9_-]{11})",
        // youtube.com/embed/ID
        r"(?:https?://)?(?:www\.)?youtube\.com/embed/([a-zA-Z0-9_-]{11})",
        // m.youtube.com/watch?v=ID
        r"(?:https?://)?m\.youtube\.com/watch\?(?:.*&)?v=([a-zA-Z0-9_-]{11})",
    ]
    .map(|p| Regex::new(p).expect("url pattern is valid"))
});

/// Whether the input looks like a YouTube link at all
pub fn is_recognized(url: &str) -> bool {
    if url.trim().is_empty() {
        debug!("URL validation failed: URL is blank");
        return false;
    }

    let recognized = url.contains("youtube.com") || url.contains("youtu.be");
    if !recognized {
        debug!("URL validation failed: not a YouTube URL - {url}");
    }
    recognized
}

/// Extract video ID from the supported YouTube URL formats
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();

    if BARE_ID.is_match(input) {
        return Some(input.to_string());
    }

    for pattern in URL_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(input) {
            let id = caps[1].to_string();
            info!("Video ID extracted: {id}");
            return Some(id);
        }
    }

    warn!("Failed to extract video ID from URL: {input}");
    None
}

pub fn build_watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}
