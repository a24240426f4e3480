//! Incremental decoding of streamed chat completions.
//!
//! [`StreamDecoder`] is fed the response body as it grows. Each call lexes the
//! complete lines past its cursor, drives a [`DecoderSession`] with the
//! resulting [`ProtocolChunk`]s, and returns the answer text those lines
//! carried. An incomplete trailing line is left for the next call, so any
//! split of the transport's byte stream yields the same text.
//!
//! # Examples
//!
//! ```
//! use chatwire_core::decoder::StreamDecoder;
//!
//! let body = concat!(
//!     "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
//!     "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
//!     "data: [DONE]\n\n",
//! );
//!
//! let mut decoder = StreamDecoder::new();
//! let mut text = decoder.decode(&body.as_bytes()[..40]);
//! text.push_str(&decoder.decode(body.as_bytes()));
//! assert_eq!(text, "Hello");
//! assert!(decoder.is_finished());
//! ```

mod reasoning;
mod tool_calls;

pub use reasoning::ReasoningPhase;

use reasoning::ReasoningTracker;
use tool_calls::ToolCallAccumulator;

use crate::chunk::{self, ProtocolChunk};
use crate::message::{Message, Reply, ToolCall};

/// State of one streamed reply, driven chunk by chunk.
///
/// A session belongs to exactly one request and is discarded after it ends.
#[derive(Debug, Default)]
pub struct DecoderSession {
    answer: Vec<String>,
    tool_calls: ToolCallAccumulator,
    reasoning: ReasoningTracker,
    stop_reason: Option<String>,
    output_tokens: Option<u32>,
    reply: Option<Reply>,
}

impl DecoderSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one chunk. Returns the answer text it added, if any.
    ///
    /// Chunks arriving after [`ProtocolChunk::StreamEnd`] are ignored.
    pub fn apply(&mut self, chunk: ProtocolChunk) -> Option<&str> {
        if self.is_finished() {
            tracing::debug!("decoder: ignoring chunk after end of stream");
            return None;
        }

        match chunk {
            ProtocolChunk::AnswerDelta(text) => {
                if text.is_empty() {
                    return None;
                }
                self.reasoning.observe_answer();
                self.answer.push(text);
                return self.answer.last().map(String::as_str);
            }
            ProtocolChunk::ToolCallStart {
                id,
                name,
                arguments,
            } => self.tool_calls.start(id, name, arguments),
            ProtocolChunk::ToolCallContinuation(fragment) => {
                if !self.tool_calls.append(fragment) {
                    tracing::debug!("decoder: dropping tool argument fragment with no open call");
                }
            }
            ProtocolChunk::ReasoningDelta { field, text } => {
                self.reasoning.observe_reasoning(field, text);
            }
            ProtocolChunk::Finish {
                stop_reason,
                output_tokens,
            } => {
                if stop_reason.is_some() {
                    self.stop_reason = stop_reason;
                }
                if output_tokens.is_some() {
                    self.output_tokens = output_tokens;
                }
            }
            ProtocolChunk::StreamEnd => self.end(),
        }
        None
    }

    fn end(&mut self) {
        let tool_calls: Vec<ToolCall> = self
            .tool_calls
            .finish()
            .into_iter()
            .map(|record| ToolCall::from_wire_parts(record.id, record.name, &record.arguments))
            .collect();

        let echo = self.reasoning.take_echo();
        let assistant_turn = (!tool_calls.is_empty())
            .then(|| Message::assistant_tool_calls(tool_calls.clone(), echo));

        let text = self.answer_text();
        tracing::debug!(
            tool_calls = tool_calls.len(),
            answer_len = text.len(),
            "decoder: stream finished"
        );

        self.reply = Some(Reply {
            text: (!text.is_empty()).then_some(text),
            tool_calls,
            reasoning: self.reasoning.text().map(str::to_string),
            stop_reason: self.stop_reason.clone(),
            output_tokens: self.output_tokens,
            assistant_turn,
        });
    }

    /// Whether [`ProtocolChunk::StreamEnd`] has been applied.
    pub fn is_finished(&self) -> bool {
        self.reply.is_some()
    }

    /// Answer text accumulated so far.
    pub fn answer_text(&self) -> String {
        self.answer.concat()
    }

    /// Cumulative reasoning text so far.
    pub fn reasoning(&self) -> Option<&str> {
        self.reasoning.text()
    }

    pub fn reasoning_phase(&self) -> ReasoningPhase {
        self.reasoning.phase()
    }

    /// Number of tool calls started so far.
    pub fn tool_call_count(&self) -> usize {
        match &self.reply {
            Some(reply) => reply.tool_calls.len(),
            None => self.tool_calls.len(),
        }
    }

    /// Whether a tool call is still receiving argument fragments.
    pub fn has_open_tool_call(&self) -> bool {
        self.tool_calls.has_open()
    }

    /// The finalized reply, once the stream has ended.
    pub fn reply(&self) -> Option<&Reply> {
        self.reply.as_ref()
    }

    /// Consume the session, returning the reply if the stream ended.
    ///
    /// An abandoned session yields `None`: no tool calls, no history turn.
    pub fn into_reply(self) -> Option<Reply> {
        self.reply
    }
}

/// Line framing over a growing response buffer plus the session it drives.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    cursor: usize,
    session: DecoderSession,
}

impl StreamDecoder {
    /// Create a decoder for a new request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the complete lines of `buffer` past the cursor.
    ///
    /// `buffer` is the whole body received so far; it must only ever grow
    /// between calls. Returns the answer text decoded by this call.
    pub fn decode(&mut self, buffer: &[u8]) -> String {
        self.consume(buffer, false)
    }

    /// Like [`decode`](Self::decode), but also treats an unterminated final
    /// line as complete. Use once the transport has closed.
    pub fn finish(&mut self, buffer: &[u8]) -> String {
        self.consume(buffer, true)
    }

    /// End the stream without a `[DONE]` marker.
    pub fn end_stream(&mut self) {
        self.session.apply(ProtocolChunk::StreamEnd);
    }

    fn consume(&mut self, buffer: &[u8], flush: bool) -> String {
        let mut emitted = String::new();
        if self.cursor > buffer.len() {
            tracing::warn!(
                cursor = self.cursor,
                len = buffer.len(),
                "decoder: buffer shorter than cursor"
            );
            return emitted;
        }

        while !self.session.is_finished() {
            let rest = &buffer[self.cursor..];
            let (line, advance) = match rest.iter().position(|&b| b == b'\n') {
                Some(pos) => (&rest[..pos], pos + 1),
                None if flush && !rest.is_empty() => (rest, rest.len()),
                None => break,
            };
            self.cursor += advance;

            let line = match std::str::from_utf8(line) {
                Ok(line) => line.trim_end_matches('\r'),
                Err(e) => {
                    tracing::warn!(error = %e, "decoder: skipping non UTF-8 stream line");
                    continue;
                }
            };

            match chunk::lex_line(line) {
                Ok(Some(chunks)) => {
                    for chunk in chunks {
                        if let Some(text) = self.session.apply(chunk) {
                            emitted.push_str(text);
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "decoder: skipping malformed stream line"),
            }
        }

        emitted
    }

    /// Bytes consumed so far.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn session(&self) -> &DecoderSession {
        &self.session
    }

    pub fn is_finished(&self) -> bool {
        self.session.is_finished()
    }

    /// Cumulative reasoning text so far.
    pub fn reasoning(&self) -> Option<&str> {
        self.session.reasoning()
    }

    pub fn reply(&self) -> Option<&Reply> {
        self.session.reply()
    }

    pub fn into_reply(self) -> Option<Reply> {
        self.session.into_reply()
    }
}
