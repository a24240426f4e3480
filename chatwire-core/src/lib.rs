//! Chatwire core library.
//!
//! Speaks the OpenAI-style Chat Completions protocol: builds request
//! payloads from a conversation history, decodes streamed replies
//! incrementally, extracts one-shot replies, and keeps tool-call ids and
//! reasoning text consistent across round trips.

pub mod chunk;
pub mod client;
pub mod config;
pub mod content;
pub mod decoder;
pub mod extract;
pub mod message;
pub mod request;
pub mod tool_id;

mod wire;

pub use client::{ChatClient, ClientError, StreamEvent};
pub use config::{Config, ConfigError};
pub use decoder::{DecoderSession, StreamDecoder};
pub use extract::{ExtractError, extract};
pub use message::{Message, Reply, Role, ToolCall};
pub use request::{ModelInfo, RequestOptions, RequestPayload, build};
