//! Inline emotion markers in agent text
//!
//! Agent text may carry `<emotion type="X"/>`. The first marker is removed
//! from the visible text and its tag drives the avatar. No other marker
//! syntax is recognized.

use lia_core::EmotionTag;
use once_cell::sync::Lazy;
use regex::Regex;

static EMOTION_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<emotion\s+type\s*=\s*"([^"<>]+)"\s*/>"#).expect("valid emotion marker pattern")
});

/// Visible text and the emotion carried by it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub emotion: Option<EmotionTag>,
}

impl DecodedText {
    /// Nothing left to show once the marker is gone
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Strip the first emotion marker and return its tag
///
/// Whitespace on both sides of the marker collapses to a single space, so
/// `"Hello <emotion type=\"joy\"/> there"` becomes `"Hello there"`.
pub fn extract_emotion(text: &str) -> DecodedText {
    let Some(captures) = EMOTION_MARKER.captures(text) else {
        return DecodedText {
            text: text.trim().to_string(),
            emotion: None,
        };
    };

    // Group 0 always exists on a match
    let (Some(marker), Some(tag)) = (captures.get(0), captures.get(1)) else {
        return DecodedText {
            text: text.trim().to_string(),
            emotion: None,
        };
    };

    let before = text[..marker.start()].trim_end();
    let after = text[marker.end()..].trim_start();
    let joined = match (before.is_empty(), after.is_empty()) {
        (false, false) => format!("{} {}", before, after),
        _ => format!("{}{}", before, after),
    };

    DecodedText {
        text: joined.trim().to_string(),
        emotion: Some(EmotionTag::new(tag.as_str().trim())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_in_the_middle() {
        let decoded = extract_emotion(r#"Hello <emotion type="joy"/> there"#);
        assert_eq!(decoded.text, "Hello there");
        assert_eq!(decoded.emotion, Some(EmotionTag::new("joy")));
    }

    #[test]
    fn test_marker_only() {
        let decoded = extract_emotion(r#"<emotion type="sad"/>"#);
        assert!(decoded.is_empty());
        assert_eq!(decoded.emotion, Some(EmotionTag::new("sad")));
    }

    #[test]
    fn test_no_marker() {
        let decoded = extract_emotion("  plain reply ");
        assert_eq!(decoded.text, "plain reply");
        assert_eq!(decoded.emotion, None);
    }

    #[test]
    fn test_only_first_marker_is_taken() {
        let decoded =
            extract_emotion(r#"<emotion type="joy"/>Great!<emotion type="surprise"/>"#);
        assert_eq!(decoded.emotion, Some(EmotionTag::new("joy")));
        assert_eq!(decoded.text, r#"Great!<emotion type="surprise"/>"#);
    }

    #[test]
    fn test_other_markup_is_left_alone() {
        let decoded = extract_emotion(r#"<emotion tone="joy"/> hi"#);
        assert_eq!(decoded.emotion, None);
        assert_eq!(decoded.text, r#"<emotion tone="joy"/> hi"#);
    }

    #[test]
    fn test_multiline_text_keeps_inner_newlines() {
        let decoded = extract_emotion("line one\nline two <emotion type=\"calm\"/>");
        assert_eq!(decoded.text, "line one\nline two");
        assert_eq!(decoded.emotion, Some(EmotionTag::new("calm")));
    }
}
