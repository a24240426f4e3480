//! One-shot extraction of a non-streaming chat completion.
//!
//! Produces the same [`Reply`] shape as the stream decoder.

use thiserror::Error;

use crate::message::{Message, MessageContent, ReasoningEcho, ReasoningField, Reply, ToolCall};
use crate::wire::ApiResponse;

/// Error returned when a response body cannot be decoded.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The body is not a chat completion object.
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Extract a [`Reply`] from a complete response body.
///
/// Text and tool calls are read independently: some OpenAI-compatible
/// servers return both in one message. Missing `choices`, `finish_reason`
/// or `usage` simply leave the matching fields empty.
///
/// # Errors
///
/// Returns [`ExtractError::Parse`] if `body` is not a JSON chat completion.
///
/// # Examples
///
/// ```
/// use chatwire_core::extract::extract;
///
/// let body = br#"{"choices":[{"message":{"content":"Hi"},"finish_reason":"stop"}]}"#;
/// let reply = extract(body).unwrap();
/// assert_eq!(reply.text.as_deref(), Some("Hi"));
/// assert_eq!(reply.stop_reason.as_deref(), Some("stop"));
/// ```
pub fn extract(body: &[u8]) -> Result<Reply, ExtractError> {
    let response: ApiResponse = serde_json::from_slice(body)?;
    Ok(from_response(response))
}

pub(crate) fn from_response(response: ApiResponse) -> Reply {
    let output_tokens = response.usage.and_then(|usage| usage.completion_tokens);

    let Some(choice) = response.choices.unwrap_or_default().into_iter().next() else {
        return Reply {
            output_tokens,
            ..Reply::default()
        };
    };

    let message = choice.message.unwrap_or_default();
    let text = message.content.filter(|content| !content.is_empty());
    let reasoning = ReasoningField::pick(message.reasoning, message.reasoning_content);

    let tool_calls: Vec<ToolCall> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| {
            let function = call.function.unwrap_or_default();
            ToolCall::from_wire_parts(
                call.id,
                function.name.unwrap_or_default(),
                function.arguments.as_deref().unwrap_or_default(),
            )
        })
        .collect();

    let assistant_turn = (!tool_calls.is_empty()).then(|| {
        let echo = reasoning
            .clone()
            .map(|(field, text)| ReasoningEcho { field, text });
        let mut turn = Message::assistant_tool_calls(tool_calls.clone(), echo);
        turn.content = text.clone().map(MessageContent::Text);
        turn
    });

    Reply {
        text,
        tool_calls,
        reasoning: reasoning.map(|(_, text)| text),
        stop_reason: choice.finish_reason,
        output_tokens,
        assistant_turn,
    }
}
