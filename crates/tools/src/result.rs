use pr_domain::payload::{self, DisplayTag};
use serde_json::{json, Value};

/// What a tool hands back to the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    /// `[TAG:{json}]` frame for the caller, or empty when there is nothing
    /// worth showing. Empty payloads are never forwarded.
    pub display_payload: String,
    /// Fed back to the model as the tool-result message. Always carries a
    /// `result` string.
    pub summary_for_model: Value,
}

impl ToolResult {
    /// No visual; the model only learns `result`.
    pub fn empty(result: impl Into<String>) -> Self {
        Self {
            display_payload: String::new(),
            summary_for_model: json!({ "result": result.into() }),
        }
    }

    /// A framed payload plus a summary object. A summary that is not an
    /// object, or lacks `result`, gets one.
    pub fn display(tag: DisplayTag, body: &Value, summary: Value) -> Self {
        let summary_for_model = match summary {
            Value::Object(mut map) => {
                map.entry("result")
                    .or_insert_with(|| Value::String(format!("{} displayed.", tag.as_str())));
                Value::Object(map)
            }
            other => json!({ "result": format!("{} displayed.", tag.as_str()), "data": other }),
        };
        Self {
            display_payload: payload::encode(tag, body),
            summary_for_model,
        }
    }

    /// Only a summary, no visual, with extra fields besides `result`.
    pub fn text_only(summary: Value) -> Self {
        let summary_for_model = match summary {
            Value::Object(mut map) => {
                map.entry("result")
                    .or_insert_with(|| Value::String("Done.".into()));
                Value::Object(map)
            }
            other => json!({ "result": other }),
        };
        Self {
            display_payload: String::new(),
            summary_for_model,
        }
    }

    pub fn has_payload(&self) -> bool {
        !self.display_payload.is_empty()
    }

    pub fn result_text(&self) -> &str {
        self.summary_for_model
            .get("result")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// The tool-result message body sent back to the model.
    pub fn model_content(&self) -> String {
        self.summary_for_model.to_string()
    }
}
