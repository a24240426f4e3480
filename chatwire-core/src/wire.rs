//! Serde request/response structs for the Chat Completions wire format.
//!
//! These types mirror the JSON shapes exactly and are decoded once at the
//! boundary; the rest of the crate works on [`ProtocolChunk`] and
//! [`Message`] instead.
//!
//! [`ProtocolChunk`]: crate::chunk::ProtocolChunk
//! [`Message`]: crate::message::Message

use serde::{Deserialize, Serialize};

use crate::content::WireContentPart;

/// A single message in the API request body.
#[derive(Debug, Serialize)]
pub(crate) struct ApiMessage {
    /// Message role ("system", "user", "assistant", or "tool").
    pub(crate) role: String,
    /// Message content. Serialized as `null` when absent.
    pub(crate) content: Option<ApiContent>,
    /// Tool calls (present in assistant messages with tool use).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) tool_calls: Option<Vec<OaiToolCall>>,
    /// Tool call ID (present in tool result messages).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) tool_call_id: Option<String>,
    /// Reasoning echoed back under the key the provider used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) reasoning_content: Option<String>,
}

/// Message content: a plain string or a content array.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum ApiContent {
    Text(String),
    Parts(Vec<WireContentPart>),
}

/// Request body for a Chat Completions API call.
#[derive(Debug, Serialize)]
pub(crate) struct ApiRequest {
    /// Model identifier.
    pub(crate) model: String,
    /// Conversation messages.
    pub(crate) messages: Vec<ApiMessage>,
    /// Whether the reply is streamed as SSE.
    pub(crate) stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) temperature: Option<f32>,
    /// Token limit for regular models.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) max_tokens: Option<u32>,
    /// Token limit for reasoning models.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) max_completion_tokens: Option<u32>,
    /// Optional tool definitions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) tools: Option<Vec<OaiTool>>,
    /// Tool choice strategy. Only `"required"` is ever sent; otherwise the
    /// API default (`"auto"`) applies implicitly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) parallel_tool_calls: Option<bool>,
    /// Structured-output schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) response_format: Option<ResponseFormat>,
}

/// Tool definition in OpenAI-compatible format.
#[derive(Debug, Serialize)]
pub(crate) struct OaiTool {
    #[serde(rename = "type")]
    pub(crate) tool_type: String,
    pub(crate) function: OaiFunction,
}

/// Function definition within a tool.
#[derive(Debug, Serialize)]
pub(crate) struct OaiFunction {
    pub(crate) name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) description: Option<String>,
    pub(crate) parameters: serde_json::Value,
}

/// Tool call serialised when echoing an assistant turn back to the API.
#[derive(Debug, Serialize)]
pub(crate) struct OaiToolCall {
    pub(crate) id: String,
    #[serde(rename = "type")]
    pub(crate) call_type: String,
    pub(crate) function: OaiToolCallFunction,
}

/// Function name + arguments within a tool call.
#[derive(Debug, Serialize)]
pub(crate) struct OaiToolCallFunction {
    pub(crate) name: String,
    pub(crate) arguments: String,
}

/// `response_format` wrapper for a JSON schema.
#[derive(Debug, Serialize)]
pub(crate) struct ResponseFormat {
    #[serde(rename = "type")]
    pub(crate) format_type: String,
    pub(crate) json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSchemaFormat {
    pub(crate) name: String,
    pub(crate) schema: serde_json::Value,
    pub(crate) strict: bool,
}

/// Response body from a non-streaming Chat Completions API call.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse {
    pub(crate) choices: Option<Vec<Choice>>,
    pub(crate) usage: Option<Usage>,
}

/// A choice in the completion response.
#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub(crate) message: Option<ChoiceMessage>,
    pub(crate) finish_reason: Option<String>,
}

/// Message content in a completion choice.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChoiceMessage {
    pub(crate) content: Option<String>,
    pub(crate) tool_calls: Option<Vec<WireToolCall>>,
    pub(crate) reasoning: Option<String>,
    pub(crate) reasoning_content: Option<String>,
}

/// Tool call as received, either whole or as a streamed fragment.
///
/// Every field is optional: continuation fragments carry only arguments.
#[derive(Debug, Deserialize)]
pub(crate) struct WireToolCall {
    pub(crate) id: Option<String>,
    pub(crate) function: Option<WireFunction>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireFunction {
    pub(crate) name: Option<String>,
    pub(crate) arguments: Option<String>,
}

/// Token accounting block.
#[derive(Debug, Deserialize)]
pub(crate) struct Usage {
    pub(crate) completion_tokens: Option<u32>,
}

/// Error response body from the API.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    pub(crate) error: ErrorDetail,
}

/// Detail inside an API error response.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub(crate) message: String,
}

/// An SSE streaming response chunk.
///
/// `choices` and `delta` may be absent or `null`; both read as empty.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamChunk {
    pub(crate) choices: Option<Vec<StreamChoice>>,
    pub(crate) usage: Option<Usage>,
}

/// A choice in a streaming response chunk.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamChoice {
    pub(crate) delta: Option<StreamDelta>,
    pub(crate) finish_reason: Option<String>,
}

/// Delta content in a streaming choice.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct StreamDelta {
    pub(crate) content: Option<String>,
    pub(crate) tool_calls: Option<Vec<WireToolCall>>,
    pub(crate) reasoning: Option<String>,
    pub(crate) reasoning_content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_parsing() {
        let json = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [
                {
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": "Hello! How can I help you today?"
                    },
                    "finish_reason": "stop"
                }
            ],
            "usage": {"prompt_tokens": 9, "completion_tokens": 12}
        }"#;

        let response: ApiResponse = serde_json::from_str(json).unwrap();
        let choices = response.choices.unwrap();
        assert_eq!(choices.len(), 1);
        let message = choices[0].message.as_ref().unwrap();
        assert_eq!(
            message.content.as_deref(),
            Some("Hello! How can I help you today?")
        );
        assert_eq!(response.usage.unwrap().completion_tokens, Some(12));
    }

    #[test]
    fn test_api_error_parsing() {
        let json = r#"{
            "error": {
                "message": "Incorrect API key provided",
                "type": "invalid_request_error",
                "code": "invalid_api_key"
            }
        }"#;

        let error: ApiError = serde_json::from_str(json).unwrap();
        assert_eq!(error.error.message, "Incorrect API key provided");
    }

    #[test]
    fn test_parse_sse_with_role() {
        // First SSE event often has role but no content.
        let json = r#"{
            "id": "chatcmpl-123",
            "choices": [
                {
                    "index": 0,
                    "delta": {"role": "assistant"},
                    "finish_reason": null
                }
            ]
        }"#;

        let chunk: StreamChunk = serde_json::from_str(json).unwrap();
        let choices = chunk.choices.unwrap();
        assert!(choices[0].delta.as_ref().unwrap().content.is_none());
        assert!(choices[0].finish_reason.is_none());
    }

    #[test]
    fn test_parse_usage_only_chunk() {
        let json = r#"{"choices": [], "usage": {"completion_tokens": 7}}"#;
        let chunk: StreamChunk = serde_json::from_str(json).unwrap();
        assert!(chunk.choices.unwrap().is_empty());
        assert_eq!(chunk.usage.unwrap().completion_tokens, Some(7));
    }

    #[test]
    fn test_parse_null_choices_and_delta() {
        let json = r#"{"choices": null, "usage": {"completion_tokens": 3}}"#;
        let chunk: StreamChunk = serde_json::from_str(json).unwrap();
        assert!(chunk.choices.is_none());

        let json = r#"{"choices": [{"delta": null, "finish_reason": "stop"}]}"#;
        let chunk: StreamChunk = serde_json::from_str(json).unwrap();
        assert!(chunk.choices.unwrap()[0].delta.is_none());

        let response: ApiResponse = serde_json::from_str(r#"{"choices": null}"#).unwrap();
        assert!(response.choices.is_none());
    }

    #[test]
    fn test_content_null_serialized() {
        let message = ApiMessage {
            role: "assistant".to_string(),
            content: None,
            tool_calls: None,
            tool_call_id: None,
            reasoning: None,
            reasoning_content: None,
        };
        let json = serde_json::to_value(&message).unwrap();
        assert!(json["content"].is_null());
        assert!(json.as_object().unwrap().contains_key("content"));
        assert!(json.get("reasoning").is_none());
    }
}
