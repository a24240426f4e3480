//! Lexing of single SSE lines into protocol chunks.
//!
//! Each `data:` line is decoded against the closed [`StreamChunk`] schema
//! exactly once, here; the decoder only ever sees [`ProtocolChunk`]s.

use thiserror::Error;

use crate::message::ReasoningField;
use crate::wire::StreamChunk;

/// SSE "[DONE]" marker sent by OpenAI-compatible streaming APIs.
pub const SSE_DONE_MARKER: &str = "[DONE]";

const DATA_PREFIX: &str = "data:";

/// Name some providers send instead of omitting the field on continuation fragments.
const NULL_NAME_SENTINEL: &str = "null";

/// A complete `data:` line that could not be decoded.
#[derive(Debug, Error)]
#[error("malformed stream chunk: {0}")]
pub struct LexError(#[from] serde_json::Error);

/// One decoded unit of a streaming reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolChunk {
    /// A fragment of answer text.
    AnswerDelta(String),
    /// A new tool call begins.
    ToolCallStart {
        /// Call id, when the provider sent one.
        id: Option<String>,
        /// Function name.
        name: String,
        /// First fragment of the argument string.
        arguments: String,
    },
    /// More argument text for the open tool call.
    ToolCallContinuation(String),
    /// A fragment of reasoning text and the key it arrived under.
    ReasoningDelta {
        field: ReasoningField,
        text: String,
    },
    /// Reply metadata: `finish_reason` and/or `usage.completion_tokens`.
    Finish {
        stop_reason: Option<String>,
        output_tokens: Option<u32>,
    },
    /// The `[DONE]` marker.
    StreamEnd,
}

/// Whether a streamed function name opens a new tool call.
///
/// Absent, empty, and the literal string `"null"` all mean "continuation".
pub fn starts_new_call(name: Option<&str>) -> bool {
    matches!(name, Some(name) if !name.is_empty() && name != NULL_NAME_SENTINEL)
}

/// Lex one line of the stream (without its line terminator).
///
/// Returns `Ok(None)` for lines that carry no data (blank lines, SSE
/// comments, `event:` fields).
///
/// # Errors
///
/// Returns [`LexError`] if the `data:` payload is not a valid chunk.
pub fn lex_line(line: &str) -> Result<Option<Vec<ProtocolChunk>>, LexError> {
    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }
    if data == SSE_DONE_MARKER {
        return Ok(Some(vec![ProtocolChunk::StreamEnd]));
    }

    let chunk: StreamChunk = serde_json::from_str(data)?;
    Ok(Some(chunks_from(chunk)))
}

fn chunks_from(chunk: StreamChunk) -> Vec<ProtocolChunk> {
    let mut chunks = Vec::new();
    let mut stop_reason = None;

    if let Some(choice) = chunk.choices.unwrap_or_default().into_iter().next() {
        stop_reason = choice.finish_reason;
        let delta = choice.delta.unwrap_or_default();

        let tool_call = delta
            .tool_calls
            .and_then(|calls| calls.into_iter().next())
            .and_then(|call| call.function.map(|function| (call.id, function)));

        if let Some((id, function)) = tool_call {
            let arguments = function.arguments.unwrap_or_default();
            if starts_new_call(function.name.as_deref()) {
                chunks.push(ProtocolChunk::ToolCallStart {
                    id,
                    name: function.name.unwrap_or_default(),
                    arguments,
                });
            } else {
                chunks.push(ProtocolChunk::ToolCallContinuation(arguments));
            }
        } else {
            // Reasoning first: the answer in the same delta closes the reasoning block.
            if let Some((field, text)) = ReasoningField::pick(delta.reasoning, delta.reasoning_content)
            {
                chunks.push(ProtocolChunk::ReasoningDelta { field, text });
            }
            if let Some(text) = delta.content.filter(|text| !text.is_empty()) {
                chunks.push(ProtocolChunk::AnswerDelta(text));
            }
        }
    }

    let output_tokens = chunk.usage.and_then(|usage| usage.completion_tokens);
    if stop_reason.is_some() || output_tokens.is_some() {
        chunks.push(ProtocolChunk::Finish {
            stop_reason,
            output_tokens,
        });
    }

    chunks
}
