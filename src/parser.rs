use log::{debug, info, warn};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::Segment;
use crate::error::ParseError;

/// Entities YouTube leaves escaped inside caption text. `&amp;` goes first so
/// double-escaped sequences like `&amp;#39;` resolve fully.
const ENTITIES: [(&str, &str); 7] = [
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&#160;", " "),
];

/// A `<text>` element being collected
struct PendingSegment {
    start: f64,
    duration: f64,
    text: String,
    depth: usize,
    malformed: bool,
}

/// Parse timed-text XML into segments.
///
/// Individual `<text>` elements that cannot be read are skipped with a
/// warning; a document the reader rejects is an error.
pub fn parse(xml: &str) -> Result<Vec<Segment>, ParseError> {
    debug!("Parsing transcript XML ({} bytes)", xml.len());

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut pending: Option<PendingSegment> = None;
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut skipped = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                seen_root = true;
                depth += 1;
                if pending.is_none() && e.name().as_ref() == b"text" {
                    pending = Some(open_segment(e, depth));
                }
            }
            Ok(Event::End(_)) => {
                if let Some(p) = pending.take_if(|p| p.depth == depth) {
                    match finish_segment(p) {
                        Some(segment) => segments.push(segment),
                        None => skipped += 1,
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Empty(ref e)) => {
                seen_root = true;
                if pending.is_none() && e.name().as_ref() == b"text" {
                    match finish_segment(open_segment(e, depth + 1)) {
                        Some(segment) => segments.push(segment),
                        None => skipped += 1,
                    }
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(p) = pending.as_mut() {
                    match e.unescape() {
                        Ok(text) => p.text.push_str(&text),
                        Err(err) => {
                            warn!("Unreadable caption text at {}s: {err}", p.start);
                            p.malformed = true;
                        }
                    }
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(p) = pending.as_mut() {
                    p.text.push_str(&String::from_utf8_lossy(e));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ParseError::Xml {
                    position: reader.error_position() as u64,
                    source: e,
                });
            }
            _ => {}
        }
    }

    if !seen_root {
        return Err(ParseError::NoRootElement);
    }
    if depth > 0 {
        return Err(ParseError::UnclosedElement { depth });
    }

    if skipped > 0 {
        warn!("Skipped {skipped} malformed caption segment(s)");
    }
    info!("Parsed {} subtitle segments", segments.len());
    Ok(segments)
}

fn open_segment(e: &BytesStart<'_>, depth: usize) -> PendingSegment {
    let mut start = 0.0;
    let mut duration = 0.0;
    let mut malformed = false;

    for attr in e.attributes() {
        match attr {
            Ok(attr) => match attr.key.as_ref() {
                b"start" => {
                    start = String::from_utf8_lossy(&attr.value).parse::<f64>().unwrap_or(0.0);
                }
                b"dur" => {
                    duration = String::from_utf8_lossy(&attr.value).parse::<f64>().unwrap_or(0.0);
                }
                _ => {}
            },
            Err(err) => {
                warn!("Malformed caption attributes: {err}");
                malformed = true;
            }
        }
    }

    PendingSegment {
        start,
        duration,
        text: String::new(),
        depth,
        malformed,
    }
}

fn finish_segment(p: PendingSegment) -> Option<Segment> {
    if p.malformed {
        return None;
    }
    Some(Segment {
        text: decode_entities(&p.text),
        start: p.start,
        duration: p.duration,
    })
}

/// Decode the fixed entity set, flatten newlines and trim
pub fn decode_entities(text: &str) -> String {
    let mut out = text.to_string();
    for (entity, replacement) in ENTITIES {
        if out.contains(entity) {
            out = out.replace(entity, replacement);
        }
    }
    out.replace('\u{a0}', " ")
        .replace("\r\n", " ")
        .replace(['\r', '\n'], " ")
        .trim()
        .to_string()
}

/// Join segment text with single spaces, dropping timing and blank segments
pub fn to_plain_text(segments: &[Segment]) -> String {
    let text = segments
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    debug!("Generated plain text: {} characters", text.len());
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str) -> Segment {
        Segment {
            text: text.to_string(),
            start: 0.0,
            duration: 0.0,
        }
    }

    #[test]
    fn test_parse_styled_segments() {
        let xml = r##"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="12.04" dur="3.9"><font color="#E5E5E5">namaste</font> dosto</text><text start="15.94" dur="4.1">aaj ka <i>video</i></text></transcript>"##;

        let segments = parse(xml).unwrap();
        assert_eq!(segments.len(), 2);
        // Child elements do not close the enclosing segment
        assert_eq!(segments[0].text, "namaste dosto");
        assert_eq!(segments[0].start, 12.04);
        assert_eq!(segments[0].duration, 3.9);
        assert_eq!(segments[1].text, "aaj ka video");
        assert_eq!(to_plain_text(&segments), "namaste dosto aaj ka video");
    }

    #[test]
    fn test_parse_ampersand() {
        let segments = parse(r#"<transcript><text start="0" dur="1">Hello &amp; welcome</text></transcript>"#).unwrap();
        assert_eq!(segments, vec![Segment {
            text: "Hello & welcome".to_string(),
            start: 0.0,
            duration: 1.0,
        }]);
    }

    #[test]
    fn test_parse_double_escaped_entities() {
        let xml = r#"<transcript>
    <text start="0.0" dur="1.0">it&amp;#39;s a &amp;quot;test&amp;quot; &amp;lt;b&amp;gt;</text>
</transcript>"#;
        let segments = parse(xml).unwrap();
        assert_eq!(segments[0].text, "it's a \"test\" <b>");
    }

    #[test]
    fn test_parse_nbsp_and_newlines() {
        let xml = "<transcript><text start=\"1\" dur=\"2\">\n  line one\nline&#160;two  </text></transcript>";
        let segments = parse(xml).unwrap();
        assert_eq!(segments[0].text, "line one line two");
    }

    #[test]
    fn test_parse_ignores_other_elements() {
        let xml = r#"<transcript><head><title>ignored</title></head><text start="1" dur="1">kept</text></transcript>"#;
        let segments = parse(xml).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "kept");
    }

    #[test]
    fn test_parse_missing_timing_defaults_to_zero() {
        let segments = parse(r#"<transcript><text>untimed</text></transcript>"#).unwrap();
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].duration, 0.0);
    }

    #[test]
    fn test_parse_self_closing_text_is_blank() {
        let segments = parse(r#"<transcript><text start="1" dur="1"/></transcript>"#).unwrap();
        assert_eq!(segments.len(), 1);
        assert!(segments[0].text.is_empty());
    }

    #[test]
    fn test_parse_skips_unresolvable_entity() {
        let xml = r#"<transcript>
    <text start="0" dur="1">first</text>
    <text start="1" dur="1">bad &bogus; entity</text>
    <text start="2" dur="1">third</text>
</transcript>"#;
        let segments = parse(xml).unwrap();
        let texts: Vec<_> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "third"]);
    }

    #[test]
    fn test_parse_skips_malformed_attributes() {
        let xml = r#"<transcript><text start="0" start="1">dup</text><text start="2" dur="1">ok</text></transcript>"#;
        let segments = parse(xml).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "ok");
    }

    #[test]
    fn test_parse_empty_transcript() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript></transcript>"#;
        assert!(parse(xml).unwrap().is_empty());
    }

    #[test]
    fn test_parse_mismatched_tags_fails() {
        let xml = r#"<transcript><text start="0" dur="1">oops</transcript>"#;
        assert!(matches!(parse(xml), Err(ParseError::Xml { .. })));
    }

    #[test]
    fn test_parse_truncated_document_fails() {
        let xml = r#"<transcript><text start="0" dur="1">cut off"#;
        assert!(parse(xml).is_err());
    }

    #[test]
    fn test_parse_not_xml_fails() {
        assert!(matches!(parse(""), Err(ParseError::NoRootElement)));
        assert!(matches!(parse("just some words"), Err(ParseError::NoRootElement)));
    }

    #[test]
    fn test_to_plain_text() {
        assert_eq!(to_plain_text(&[segment("Hello"), segment("world")]), "Hello world");
    }

    #[test]
    fn test_to_plain_text_drops_blank_segments() {
        assert_eq!(to_plain_text(&[segment("a"), segment("   "), segment(""), segment("b")]), "a b");
        assert_eq!(to_plain_text(&[]), "");
    }

    #[test]
    fn test_plain_text_discards_timing() {
        let xml = r#"<transcript>
    <text start="12.345" dur="6.789">no numbers here</text>
    <text start="19.134" dur="4.2">nor here</text>
</transcript>"#;
        let text = to_plain_text(&parse(xml).unwrap());
        assert_eq!(text, "no numbers here nor here");
        assert!(!text.chars().any(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_decode_entities_fixed_set_only() {
        assert_eq!(decode_entities("a &copy; b"), "a &copy; b");
        assert_eq!(decode_entities("x &apos;y&#39;"), "x 'y'");
    }
}
