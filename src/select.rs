use log::debug;

use crate::{AUTO_LANGUAGE, CaptionTrack, TrackKind};

/// Pick a caption track by ordered language preference.
///
/// Each preference is tried against the whole track list before moving on:
/// `auto` matches the first auto-generated track, anything else matches a
/// language code case-insensitively. With no match the first track is used, so
/// this only returns `None` for an empty list.
pub fn select_track<'a, L: AsRef<str>>(tracks: &'a [CaptionTrack], preferences: &[L]) -> Option<&'a CaptionTrack> {
    debug!("Selecting caption track from {} available tracks", tracks.len());

    for pref in preferences {
        let pref = pref.as_ref();
        let found = if pref.eq_ignore_ascii_case(AUTO_LANGUAGE) {
            tracks.iter().find(|t| t.kind == TrackKind::AutoGenerated)
        } else {
            tracks.iter().find(|t| t.language_code.eq_ignore_ascii_case(pref))
        };

        if let Some(track) = found {
            debug!("Matched preference '{pref}': {}", track.language_code);
            return Some(track);
        }
    }

    let fallback = tracks.first();
    if let Some(track) = fallback {
        debug!("No preference matched, using first available: {}", track.language_code);
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(lang: &str, kind: TrackKind) -> CaptionTrack {
        CaptionTrack {
            location_url: format!("https://www.youtube.com/api/timedtext?lang={lang}"),
            display_name: lang.to_string(),
            language_code: lang.to_string(),
            kind,
            translatable: false,
        }
    }

    #[test]
    fn test_preference_order_beats_track_order() {
        let tracks = vec![
            track("en", TrackKind::Manual),
            track("es", TrackKind::AutoGenerated),
            track("hi", TrackKind::Manual),
        ];
        let picked = select_track(&tracks, &["hi", "en", "auto"]).unwrap();
        assert_eq!(picked.language_code, "hi");
    }

    #[test]
    fn test_auto_picks_first_generated() {
        let tracks = vec![
            track("fr", TrackKind::Manual),
            track("de", TrackKind::AutoGenerated),
            track("ja", TrackKind::AutoGenerated),
        ];
        let picked = select_track(&tracks, &["en", "auto"]).unwrap();
        assert_eq!(picked.language_code, "de");
    }

    #[test]
    fn test_auto_only() {
        let tracks = vec![track("en", TrackKind::Manual), track("en", TrackKind::AutoGenerated)];
        let picked = select_track(&tracks, &["auto"]).unwrap();
        assert_eq!(picked.kind, TrackKind::AutoGenerated);
    }

    #[test]
    fn test_case_insensitive() {
        let tracks = vec![track("fr", TrackKind::Manual), track("pt-BR", TrackKind::Manual)];
        assert_eq!(select_track(&tracks, &["PT-br"]).unwrap().language_code, "pt-BR");
        assert_eq!(
            select_track(&[track("en", TrackKind::AutoGenerated)], &["AUTO"]).unwrap().kind,
            TrackKind::AutoGenerated
        );
    }

    #[test]
    fn test_fallback_to_first() {
        let tracks = vec![track("ko", TrackKind::Manual), track("ja", TrackKind::Manual)];
        assert_eq!(select_track(&tracks, &["en", "hi", "auto"]).unwrap().language_code, "ko");
        assert_eq!(select_track::<&str>(&tracks, &[]).unwrap().language_code, "ko");
    }

    #[test]
    fn test_empty_tracks() {
        assert!(select_track(&[], &["en", "auto"]).is_none());
    }
}
