//! Outgoing request payload assembly.
//!
//! [`build`] turns a conversation history, per-call [`RequestOptions`] and a
//! model's [`ModelInfo`] into the JSON body of a Chat Completions request.
//! Field selection depends on whether the model is a reasoning model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::content::{self, ContentError, PrefixTrimmer};
use crate::message::{Message, MessageContent, ReasoningField, Role};
use crate::tool_id;
use crate::wire::{
    ApiContent, ApiMessage, ApiRequest, JsonSchemaFormat, OaiFunction, OaiTool, OaiToolCall,
    OaiToolCallFunction, ResponseFormat,
};

/// Models that take `max_completion_tokens` and reject `temperature`.
pub const REASONING_MODELS: &[&str] = &["o1", "o1-preview", "o1-mini", "o3", "o3-mini", "o4-mini"];

/// Errors raised while building a request payload.
#[derive(Debug, Error)]
pub enum RequestError {
    /// A multipart turn could not be encoded.
    #[error(transparent)]
    Content(#[from] ContentError),

    /// The assembled request could not be serialized.
    #[error("failed to serialize request: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Whether and how the model may call tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolUse {
    /// Tools are never sent.
    #[default]
    Off,
    /// Tools are sent; the model decides.
    Auto,
    /// Tools are sent and the model must call one.
    Force,
}

/// A function the model may call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolDefinition {
    /// Function name.
    pub name: String,
    /// What the function does.
    #[serde(default)]
    pub description: Option<String>,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
}

/// Per-call request settings.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// System prompt prepended when non-empty.
    pub system_message: Option<String>,
    /// Request an SSE stream.
    pub stream: bool,
    pub temperature: Option<f32>,
    /// Token limit; sent under the field the model class expects.
    pub max_tokens: Option<u32>,
    pub tool_use: ToolUse,
    pub tools: Vec<ToolDefinition>,
    /// JSON Schema the reply must follow.
    pub response_schema: Option<Value>,
    /// Caller-supplied extra parameters, merged first.
    pub request_params: Option<Map<String, Value>>,
    /// Prefix trimming applied to multipart turns.
    pub trimmer: PrefixTrimmer,
}

/// What the payload builder needs to know about the target model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelInfo {
    /// Model identifier sent as `model`.
    pub id: String,
    /// Overrides the built-in reasoning-model list when set.
    pub reasoning: Option<bool>,
    /// Backend-level extra parameters, merged after the caller's.
    pub backend_params: Option<Map<String, Value>>,
    /// Model-level extra parameters, merged last.
    pub model_params: Option<Map<String, Value>>,
}

impl ModelInfo {
    /// Describe a model by id with no overrides.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Whether requests for this model use the reasoning-model field set.
    pub fn is_reasoning(&self) -> bool {
        self.reasoning.unwrap_or_else(|| is_reasoning_model(&self.id))
    }
}

/// Fixed membership test against [`REASONING_MODELS`].
pub fn is_reasoning_model(id: &str) -> bool {
    REASONING_MODELS.contains(&id)
}

/// JSON body of a Chat Completions request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RequestPayload(Value);

impl RequestPayload {
    /// Look up a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether the payload asks for a streamed reply.
    pub fn is_streaming(&self) -> bool {
        self.0.get("stream").and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Build the request body for `history`.
///
/// # Errors
///
/// Returns [`RequestError::Content`] if a text-file part cannot be read.
///
/// # Examples
///
/// ```
/// use chatwire_core::message::{Message, Role};
/// use chatwire_core::request::{ModelInfo, RequestOptions, build};
///
/// let history = vec![Message::new(Role::User, "Hello")];
/// let options = RequestOptions {
///     temperature: Some(0.2),
///     max_tokens: Some(256),
///     ..RequestOptions::default()
/// };
///
/// let payload = build(&history, &options, &ModelInfo::new("o3-mini")).unwrap();
/// assert!(payload.get("temperature").is_none());
/// assert_eq!(payload.get("max_completion_tokens").unwrap(), 256);
/// ```
pub fn build(
    history: &[Message],
    options: &RequestOptions,
    model: &ModelInfo,
) -> Result<RequestPayload, RequestError> {
    let reasoning = model.is_reasoning();

    let mut messages = Vec::with_capacity(history.len() + 1);
    if let Some(system) = options
        .system_message
        .as_deref()
        .filter(|system| !system.is_empty())
    {
        messages.push(ApiMessage {
            role: Role::System.as_str().to_string(),
            content: Some(ApiContent::Text(system.to_string())),
            tool_calls: None,
            tool_call_id: None,
            reasoning: None,
            reasoning_content: None,
        });
    }
    for message in history {
        messages.push(build_api_message(message, &options.trimmer)?);
    }

    let tools = match options.tool_use {
        ToolUse::Off => None,
        ToolUse::Auto | ToolUse::Force => to_oai_tools(&options.tools),
    };
    let tool_choice = tools
        .as_ref()
        .filter(|_| options.tool_use == ToolUse::Force)
        .map(|_| "required".to_string());
    let parallel_tool_calls = tools.as_ref().filter(|_| !reasoning).map(|_| true);

    let request = ApiRequest {
        model: model.id.clone(),
        messages,
        stream: options.stream,
        temperature: options.temperature.filter(|_| !reasoning),
        max_tokens: options.max_tokens.filter(|_| !reasoning),
        max_completion_tokens: options.max_tokens.filter(|_| reasoning),
        tools,
        tool_choice,
        parallel_tool_calls,
        response_format: options.response_schema.clone().map(json_schema_format),
    };

    let mut body = serde_json::to_value(&request)?;
    for params in [
        &options.request_params,
        &model.backend_params,
        &model.model_params,
    ]
    .into_iter()
    .flatten()
    {
        merge_params(&mut body, params);
    }

    tracing::debug!(
        model = %model.id,
        reasoning,
        messages = request.messages.len(),
        "request: payload built"
    );
    Ok(RequestPayload(body))
}

/// Convert one history entry to its wire form.
fn build_api_message(message: &Message, trimmer: &PrefixTrimmer) -> Result<ApiMessage, RequestError> {
    let content = match &message.content {
        Some(MessageContent::Text(text)) => Some(ApiContent::Text(text.clone())),
        Some(MessageContent::Parts(parts)) => {
            Some(ApiContent::Parts(content::encode_parts(parts, trimmer)?))
        }
        None => None,
    };

    let tool_calls = message
        .tool_calls
        .as_ref()
        .filter(|calls| !calls.is_empty())
        .map(|calls| {
            calls
                .iter()
                .map(|call| OaiToolCall {
                    id: tool_id::to_wire(Some(&call.id)),
                    call_type: "function".to_string(),
                    function: OaiToolCallFunction {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect()
        });

    let (reasoning, reasoning_content) = match &message.reasoning {
        Some(echo) => match echo.field {
            ReasoningField::Reasoning => (Some(echo.text.clone()), None),
            ReasoningField::ReasoningContent => (None, Some(echo.text.clone())),
        },
        None => (None, None),
    };

    Ok(ApiMessage {
        role: message.role.as_str().to_string(),
        content,
        tool_calls,
        tool_call_id: message
            .tool_call_id
            .as_deref()
            .map(|id| tool_id::to_wire(Some(id))),
        reasoning,
        reasoning_content,
    })
}

/// Convert tool definitions to the wire format.
///
/// Returns `None` when the slice is empty so that `tools` can be omitted.
fn to_oai_tools(tools: &[ToolDefinition]) -> Option<Vec<OaiTool>> {
    if tools.is_empty() {
        None
    } else {
        Some(
            tools
                .iter()
                .map(|t| OaiTool {
                    tool_type: "function".to_string(),
                    function: OaiFunction {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    },
                })
                .collect(),
        )
    }
}

fn json_schema_format(schema: Value) -> ResponseFormat {
    ResponseFormat {
        format_type: "json_schema".to_string(),
        json_schema: JsonSchemaFormat {
            name: format!("schema_{}", uuid::Uuid::new_v4().simple()),
            schema,
            strict: true,
        },
    }
}

/// Merge `overrides` into `base` field by field.
///
/// Nested objects are merged recursively; any other value replaces the one
/// in `base`.
pub fn merge_params(base: &mut Value, overrides: &Map<String, Value>) {
    let Some(base_obj) = base.as_object_mut() else {
        *base = Value::Object(overrides.clone());
        return;
    };

    for (key, value) in overrides {
        let nested = matches!(
            (base_obj.get(key), value),
            (Some(Value::Object(_)), Value::Object(_))
        );
        if nested
            && let (Some(existing), Value::Object(nested_override)) = (base_obj.get_mut(key), value)
        {
            merge_params(existing, nested_override);
        } else {
            base_obj.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests;
