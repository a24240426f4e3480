//! Conversation types for chat-completion round trips.
//!
//! Provides the [`Role`] enum, the [`Message`] turn type with its tool-call
//! and reasoning attachments, and [`Reply`], the shape produced by both the
//! stream decoder and the one-shot response extractor.

use serde::{Deserialize, Serialize};

use crate::content::ContentPart;
use crate::tool_id;

/// Role of a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions for the model.
    System,
    /// User input.
    User,
    /// Model response.
    Assistant,
    /// Result of a tool the model asked to run.
    Tool,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// Content of a single turn.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    /// Plain text, sent as a JSON string.
    Text(String),
    /// Mixed text and media, sent as a content array.
    Parts(Vec<ContentPart>),
}

/// Field name a provider used for streamed "thinking" text.
///
/// The name of the first reasoning fragment is remembered so the text can be
/// echoed back under the same key on the next round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningField {
    /// `reasoning`
    Reasoning,
    /// `reasoning_content`
    ReasoningContent,
}

impl ReasoningField {
    /// Wire name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningField::Reasoning => "reasoning",
            ReasoningField::ReasoningContent => "reasoning_content",
        }
    }

    /// Pick the first non-empty reasoning text, `reasoning` before `reasoning_content`.
    pub(crate) fn pick(
        reasoning: Option<String>,
        reasoning_content: Option<String>,
    ) -> Option<(ReasoningField, String)> {
        reasoning
            .filter(|text| !text.is_empty())
            .map(|text| (ReasoningField::Reasoning, text))
            .or_else(|| {
                reasoning_content
                    .filter(|text| !text.is_empty())
                    .map(|text| (ReasoningField::ReasoningContent, text))
            })
    }
}

/// Reasoning text attached to an assistant turn for verbatim replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningEcho {
    /// Key the provider originally used.
    pub field: ReasoningField,
    /// Concatenated reasoning text.
    pub text: String,
}

/// A resolved tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCall {
    /// Call identifier as received from the wire, or synthesized when absent.
    ///
    /// History keeps the wire form (`call_…`), so replaying it through
    /// [`tool_id::to_wire`] leaves it unchanged. See [`ToolCall::bare_id`].
    pub id: String,
    /// Function name.
    pub name: String,
    /// Parsed arguments. An empty object when the raw string was not valid JSON.
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Resolve a tool call from its wire parts.
    ///
    /// A missing id is synthesized so that the assistant replay and the
    /// matching tool-result turn agree. Arguments that fail to parse become
    /// an empty object.
    pub(crate) fn from_wire_parts(id: Option<String>, name: String, raw_arguments: &str) -> Self {
        let id = match id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => tool_id::to_wire(None),
        };
        let arguments = parse_arguments(&name, raw_arguments);
        Self {
            id,
            name,
            arguments,
        }
    }

    /// The id without this backend's `call_` prefix.
    pub fn bare_id(&self) -> &str {
        tool_id::from_wire(&self.id)
    }
}

fn parse_arguments(name: &str, raw: &str) -> serde_json::Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return serde_json::json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(tool = name, error = %e, "tool call arguments are not valid JSON");
        serde_json::json!({})
    })
}

/// A single turn in a conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// The role of this message.
    pub role: Role,
    /// Turn content; `None` is sent as JSON `null`.
    pub content: Option<MessageContent>,
    /// Tool calls requested by an assistant turn.
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Call this tool-result turn answers.
    pub tool_call_id: Option<String>,
    /// Reasoning text to echo back with an assistant turn.
    pub reasoning: Option<ReasoningEcho>,
}

impl Message {
    /// Create a new text message with the given role and content.
    ///
    /// # Examples
    ///
    /// ```
    /// use chatwire_core::message::{Message, MessageContent, Role};
    ///
    /// let msg = Message::new(Role::User, "Hello!");
    /// assert_eq!(msg.role, Role::User);
    /// assert_eq!(msg.text(), Some("Hello!"));
    /// ```
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(MessageContent::Text(content.into())),
            tool_calls: None,
            tool_call_id: None,
            reasoning: None,
        }
    }

    /// Create a user turn made of several content parts.
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: Some(MessageContent::Parts(parts)),
            tool_calls: None,
            tool_call_id: None,
            reasoning: None,
        }
    }

    /// Create the reply turn carrying the output of an executed tool call.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(MessageContent::Text(content.into())),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
            reasoning: None,
        }
    }

    /// Create an assistant turn with no text, a tool-call batch and optional reasoning.
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>, reasoning: Option<ReasoningEcho>) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
            reasoning,
        }
    }

    /// Plain text content, if this turn has any.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Some(MessageContent::Text(text)) => Some(text),
            _ => None,
        }
    }
}

/// Build a history from an alternating prompt list.
///
/// Even positions are user turns, odd positions assistant turns.
pub fn from_prompt_list<S: AsRef<str>>(prompts: &[S]) -> Vec<Message> {
    prompts
        .iter()
        .enumerate()
        .map(|(i, prompt)| {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            Message::new(role, prompt.as_ref())
        })
        .collect()
}

/// Everything a single reply produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    /// Answer text; `None` when the reply had no non-empty text.
    pub text: Option<String>,
    /// Resolved tool calls in arrival order.
    pub tool_calls: Vec<ToolCall>,
    /// Reasoning text, if the provider sent any.
    pub reasoning: Option<String>,
    /// The `finish_reason` reported by the provider.
    pub stop_reason: Option<String>,
    /// `usage.completion_tokens`, when reported.
    pub output_tokens: Option<u32>,
    /// Assistant turn to append to history before sending tool results.
    pub assistant_turn: Option<Message>,
}

impl Reply {
    /// Append the synthesized assistant turn to `history`.
    ///
    /// The turn is moved out, so repeated calls append it at most once.
    /// Returns whether a turn was appended.
    pub fn append_turn_to(&mut self, history: &mut Vec<Message>) -> bool {
        match self.assistant_turn.take() {
            Some(turn) => {
                history.push(turn);
                true
            }
            None => false,
        }
    }
}
