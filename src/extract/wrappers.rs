//! Envelope shapes that commonly wrap the payload a model was asked for.

use serde_json::Value;

/// A known wrapper, tried in [`WrapperShape::PRIORITY`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperShape {
    /// OpenAI-style `choices[0].message.content`
    ChatCompletion,
    /// OpenAI-style `choices[0].message.tool_calls[0].function.arguments`
    ChatCompletionToolCall,
    /// Gemini `candidates[0].content.parts[0].text`
    GeminiCandidate,
    /// Bare `tool_calls[0].function.arguments`
    ToolCall,
    /// `message.content`
    MessageContent,
    /// `content`
    Content,
    /// `text`
    Text,
    /// `message` holding a string
    Message,
    /// `output`, as returned by hosted inference runners
    Output,
}

impl WrapperShape {
    pub const PRIORITY: [WrapperShape; 9] = [
        Self::ChatCompletion,
        Self::ChatCompletionToolCall,
        Self::GeminiCandidate,
        Self::ToolCall,
        Self::MessageContent,
        Self::Content,
        Self::Text,
        Self::Message,
        Self::Output,
    ];

    pub const fn pointer(self) -> &'static str {
        match self {
            Self::ChatCompletion => "/choices/0/message/content",
            Self::ChatCompletionToolCall => "/choices/0/message/tool_calls/0/function/arguments",
            Self::GeminiCandidate => "/candidates/0/content/parts/0/text",
            Self::ToolCall => "/tool_calls/0/function/arguments",
            Self::MessageContent => "/message/content",
            Self::Content => "/content",
            Self::Text => "/text",
            Self::Message => "/message",
            Self::Output => "/output",
        }
    }

    /// The wrapped value, if this shape is present and carries something
    /// worth searching (a string or a container).
    pub fn locate(self, value: &Value) -> Option<&Value> {
        let inner = value.pointer(self.pointer())?;
        match (self, inner) {
            (_, Value::String(s)) if !s.trim().is_empty() => Some(inner),
            // `message` is only a wrapper when it holds text; as an object it
            // is covered by `MessageContent`.
            (Self::Message, _) => None,
            (_, Value::Object(_) | Value::Array(_)) => Some(inner),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_completion_content() {
        let v = json!({"choices": [{"message": {"role": "assistant", "content": "{}"}}]});
        assert_eq!(
            WrapperShape::ChatCompletion.locate(&v),
            Some(&json!("{}"))
        );
    }

    #[test]
    fn gemini_candidate_text() {
        let v = json!({"candidates": [{"content": {"parts": [{"text": "{\"a\":1}"}]}}]});
        assert_eq!(
            WrapperShape::GeminiCandidate.locate(&v),
            Some(&json!("{\"a\":1}"))
        );
    }

    #[test]
    fn empty_or_scalar_wrappers_are_skipped() {
        assert_eq!(WrapperShape::Content.locate(&json!({"content": "  "})), None);
        assert_eq!(WrapperShape::Content.locate(&json!({"content": 4})), None);
        assert_eq!(WrapperShape::Message.locate(&json!({"message": {"content": "x"}})), None);
    }

    #[test]
    fn object_arguments_are_returned() {
        let v = json!({"tool_calls": [{"function": {"arguments": {"topic": "x"}}}]});
        assert_eq!(
            WrapperShape::ToolCall.locate(&v),
            Some(&json!({"topic": "x"}))
        );
    }
}
