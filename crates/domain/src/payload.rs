//! Display payload framing.
//!
//! A tool's visual output travels inside assistant text as
//! `[TAG:{json}]`, e.g. `[RISK:{"ticker":"TCS","score":45}]`. Clients scan
//! the text for these frames and render them; everything else is prose.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The visualization kind a payload carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DisplayTag {
    Chart,
    Risk,
    Timeline,
    Sentiment,
    Comparison,
}

impl DisplayTag {
    pub const ALL: [DisplayTag; 5] = [
        DisplayTag::Chart,
        DisplayTag::Risk,
        DisplayTag::Timeline,
        DisplayTag::Sentiment,
        DisplayTag::Comparison,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayTag::Chart => "CHART",
            DisplayTag::Risk => "RISK",
            DisplayTag::Timeline => "TIMELINE",
            DisplayTag::Sentiment => "SENTIMENT",
            DisplayTag::Comparison => "COMPARISON",
        }
    }
}

/// Frame a JSON body for the caller.
pub fn encode(tag: DisplayTag, body: &Value) -> String {
    format!("[{}:{}]", tag.as_str(), body)
}

/// A payload located inside a larger text.
#[derive(Debug, Clone, PartialEq)]
pub struct FoundPayload {
    pub tag: DisplayTag,
    pub body: Value,
    /// Byte range of the whole `[TAG:...]` frame.
    pub start: usize,
    pub end: usize,
}

/// Locate every well-formed payload frame in `text`, in order.
///
/// A frame is only recognized when its body parses as a JSON value and is
/// immediately followed by `]`; anything else is left as prose.
pub fn find_all(text: &str) -> Vec<FoundPayload> {
    let mut found = Vec::new();
    let mut cursor = 0;

    while let Some(rel) = text[cursor..].find('[') {
        let start = cursor + rel;
        match parse_frame(text, start) {
            Some(payload) => {
                cursor = payload.end;
                found.push(payload);
            }
            None => cursor = start + 1,
        }
    }

    found
}

/// Remove every payload frame from `text`, collapsing the gaps.
pub fn strip(text: &str) -> String {
    let payloads = find_all(text);
    if payloads.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for p in &payloads {
        out.push_str(&text[cursor..p.start]);
        cursor = p.end;
    }
    out.push_str(&text[cursor..]);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_frame(text: &str, start: usize) -> Option<FoundPayload> {
    let after_bracket = &text[start + 1..];
    let tag = DisplayTag::ALL.into_iter().find(|t| {
        after_bracket.starts_with(t.as_str())
            && after_bracket[t.as_str().len()..].starts_with(':')
    })?;

    let body_start = start + 1 + tag.as_str().len() + 1;
    let mut values = serde_json::Deserializer::from_str(&text[body_start..]).into_iter::<Value>();
    let body = values.next()?.ok()?;
    let body_end = body_start + values.byte_offset();

    if !text[body_end..].starts_with(']') {
        return None;
    }

    Some(FoundPayload {
        tag,
        body,
        start,
        end: body_end + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encode_then_locate_in_prose() {
        let frame = encode(DisplayTag::Risk, &json!({"ticker": "TCS", "score": 45}));
        assert_eq!(frame, r#"[RISK:{"score":45,"ticker":"TCS"}]"#);

        let text = format!("Here is the gauge. {frame} It shows moderate risk.");
        let found = find_all(&text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tag, DisplayTag::Risk);
        assert_eq!(found[0].body["score"], 45);
        assert_eq!(&text[found[0].start..found[0].end], frame);
    }

    #[test]
    fn brackets_inside_json_do_not_end_the_frame() {
        let text = r#"[CHART:{"data":{"labels":["a]","b"]}}] done"#;
        let found = find_all(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].body["data"]["labels"][0], "a]");
    }

    #[test]
    fn malformed_and_unknown_frames_are_prose() {
        assert!(find_all("[RISK:{not json}]").is_empty());
        assert!(find_all("[WEATHER:{}]").is_empty());
        assert!(find_all("[RISK:{}").is_empty());
        assert!(find_all("see [1] and [2]").is_empty());
    }

    #[test]
    fn strip_removes_frames_and_collapses_space() {
        let text = r#"Intro [TIMELINE:{"events":[]}] outro [SENTIMENT:{"overall":"Neutral"}]"#;
        assert_eq!(strip(text), "Intro outro");
        assert_eq!(strip("plain text"), "plain text");
    }
}
