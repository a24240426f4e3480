//! Conversation and tool files read by the `payload` and `send` commands.
//!
//! A conversation file is JSON: either a plain list of prompts alternating
//! user and assistant, or a list of turn objects that may attach files,
//! images, URLs and tool results.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use chatwire_core::content::ContentPart;
use chatwire_core::message::{self, Message, Role};
use chatwire_core::request::ToolDefinition;

/// Top-level shape of a conversation file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ConversationFile {
    /// `["hi", "hello!", "how are you?"]`
    Prompts(Vec<String>),
    Turns(Vec<Turn>),
}

/// One turn of a conversation file.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Turn {
    pub(crate) role: Option<Role>,
    #[serde(default)]
    pub(crate) text: Option<String>,
    /// Text files inlined into the turn.
    #[serde(default)]
    pub(crate) files: Vec<PathBuf>,
    /// Images attached as data URLs.
    #[serde(default)]
    pub(crate) images: Vec<PathBuf>,
    /// Remote media.
    #[serde(default)]
    pub(crate) urls: Vec<String>,
    /// Marks a tool-result turn.
    #[serde(default)]
    pub(crate) tool_call_id: Option<String>,
}

impl Turn {
    /// Convert to a history entry, reading attached images.
    pub(crate) fn into_message(self) -> Result<Message> {
        if let Some(id) = self.tool_call_id {
            return Ok(Message::tool_result(id, self.text.unwrap_or_default()));
        }

        let role = self.role.unwrap_or(Role::User);
        if self.files.is_empty() && self.images.is_empty() && self.urls.is_empty() {
            return Ok(Message::new(role, self.text.unwrap_or_default()));
        }

        let parts = user_parts(self.text, &self.images, self.files, self.urls)?;
        let mut message = Message::user_parts(parts);
        message.role = role;
        Ok(message)
    }
}

/// Read a conversation file into a history.
pub(crate) fn load_conversation(path: &Path) -> Result<Vec<Message>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read conversation '{}'", path.display()))?;
    parse_conversation(&raw)
        .with_context(|| format!("Failed to parse conversation '{}'", path.display()))
}

pub(crate) fn parse_conversation(raw: &str) -> Result<Vec<Message>> {
    match serde_json::from_str(raw)? {
        ConversationFile::Prompts(prompts) => Ok(message::from_prompt_list(&prompts)),
        ConversationFile::Turns(turns) => turns.into_iter().map(Turn::into_message).collect(),
    }
}

/// Read a JSON array of tool definitions.
pub(crate) fn load_tools(path: &Path) -> Result<Vec<ToolDefinition>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tools '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse tools '{}'", path.display()))
}

/// Read a JSON Schema file for structured output.
pub(crate) fn load_schema(path: &Path) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse schema '{}'", path.display()))
}

/// Assemble content parts: text first, then images, files and URLs.
pub(crate) fn user_parts(
    text: Option<String>,
    images: &[PathBuf],
    files: Vec<PathBuf>,
    urls: Vec<String>,
) -> Result<Vec<ContentPart>> {
    let mut parts = Vec::new();
    if let Some(text) = text {
        parts.push(ContentPart::Text(text));
    }
    for image in images {
        parts.push(read_image(image)?);
    }
    parts.extend(files.into_iter().map(ContentPart::TextFile));
    parts.extend(urls.into_iter().map(ContentPart::Url));
    Ok(parts)
}

fn read_image(path: &Path) -> Result<ContentPart> {
    let data =
        std::fs::read(path).with_context(|| format!("Failed to read image '{}'", path.display()))?;
    let mime = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    Ok(ContentPart::Media { data, mime })
}
