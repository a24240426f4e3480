//! Thin HTTP adapter for a Chat Completions endpoint.
//!
//! [`ChatClient`] posts a [`RequestPayload`] and hands the response to the
//! [`extract`](crate::extract) module or to a [`StreamDecoder`]. It owns no
//! protocol logic: no retries, no timeouts, no request shaping.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use thiserror::Error;

use crate::config::Config;
use crate::decoder::StreamDecoder;
use crate::extract::{self, ExtractError};
use crate::message::Reply;
use crate::request::RequestPayload;
use crate::wire::{ApiError, ErrorDetail};

/// Error type for client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Request failed due to network or connection issues, or a non-success status.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Authentication failed (e.g., invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationError(String),

    /// Neither `OPENAI_API_KEY` nor the config file provides a key.
    #[error("no API key configured (set OPENAI_API_KEY or api_key in the config file)")]
    MissingApiKey,

    /// The response body is not a chat completion.
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Events yielded while a streamed reply arrives.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Answer text decoded from the latest bytes.
    TextDelta(String),
    /// Cumulative reasoning text, sent whenever it grows.
    Reasoning(String),
    /// The stream ended; carries the finalized reply.
    Done(Reply),
}

/// Boxed stream of [`StreamEvent`]s.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ClientError>> + Send>>;

/// Client for one Chat Completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ChatClient {
    /// Create a client for `endpoint`, authenticating with `api_key`.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Create a client from the configured endpoint and key.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingApiKey`] if no key is configured.
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let api_key = config.resolve_api_key().ok_or(ClientError::MissingApiKey)?;
        Ok(Self::new(&config.base_url, api_key))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a non-streaming request and extract the reply.
    pub async fn complete(&self, payload: &RequestPayload) -> Result<Reply, ClientError> {
        let response = send_request(&self.client, &self.endpoint, &self.api_key, payload).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;
        Ok(extract::extract(&body)?)
    }

    /// Send a streaming request and decode it as it arrives.
    ///
    /// Returns an owned stream so callers do not need to hold a reference to
    /// the client. The last item is always [`StreamEvent::Done`] unless an
    /// error is yielded first.
    pub fn stream(&self, payload: RequestPayload) -> EventStream {
        stream_events(
            self.client.clone(),
            self.endpoint.clone(),
            self.api_key.clone(),
            payload,
        )
    }
}

/// POST `payload` and map error statuses.
async fn send_request(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    payload: &RequestPayload,
) -> Result<reqwest::Response, ClientError> {
    tracing::debug!(endpoint, stream = payload.is_streaming(), "client: POST request");
    let response = client
        .post(endpoint)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(payload)
        .send()
        .await
        .map_err(|e| ClientError::RequestFailed(e.to_string()))?;

    let status = response.status();
    tracing::debug!(status = status.as_u16(), "client: response status");

    if status == reqwest::StatusCode::UNAUTHORIZED {
        let error_body: ApiError = response.json().await.unwrap_or_else(|_| ApiError {
            error: ErrorDetail {
                message: "Invalid API key".to_string(),
            },
        });
        return Err(ClientError::AuthenticationError(error_body.error.message));
    }

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        return Err(ClientError::RequestFailed(format!(
            "HTTP {}: {}",
            status, error_text
        )));
    }

    Ok(response)
}

fn stream_events(
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    payload: RequestPayload,
) -> EventStream {
    Box::pin(async_stream::stream! {
        let response = match send_request(&client, &endpoint, &api_key, &payload).await {
            Ok(r) => r,
            Err(e) => {
                yield Err(e);
                return;
            }
        };

        tracing::debug!(endpoint, "client: stream started");
        let mut body = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut decoder = StreamDecoder::new();
        let mut reasoning_len = 0;

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    buffer.extend_from_slice(&bytes);
                    for event in drain_events(&mut decoder, &buffer, false, &mut reasoning_len) {
                        yield Ok(event);
                    }
                    if decoder.is_finished() {
                        tracing::debug!(endpoint, "client: stream ended");
                        return;
                    }
                }
                Err(e) => {
                    yield Err(ClientError::RequestFailed(e.to_string()));
                    return;
                }
            }
        }

        // Stream ended without [DONE]; flush the tail and still signal completion.
        for event in drain_events(&mut decoder, &buffer, true, &mut reasoning_len) {
            yield Ok(event);
        }
        if !decoder.is_finished() {
            tracing::debug!(endpoint, "client: stream closed without [DONE]");
            decoder.end_stream();
            if let Some(reply) = decoder.into_reply() {
                yield Ok(StreamEvent::Done(reply));
            }
        }
    })
}

/// Decode `buffer` and turn what changed into events.
///
/// `reasoning_len` tracks how much reasoning text has already been reported.
fn drain_events(
    decoder: &mut StreamDecoder,
    buffer: &[u8],
    flush: bool,
    reasoning_len: &mut usize,
) -> Vec<StreamEvent> {
    let text = if flush {
        decoder.finish(buffer)
    } else {
        decoder.decode(buffer)
    };

    let mut events = Vec::new();
    if let Some(reasoning) = decoder.reasoning()
        && reasoning.len() > *reasoning_len
    {
        *reasoning_len = reasoning.len();
        events.push(StreamEvent::Reasoning(reasoning.to_string()));
    }
    if !text.is_empty() {
        events.push(StreamEvent::TextDelta(text));
    }
    if let Some(reply) = decoder.reply() {
        events.push(StreamEvent::Done(reply.clone()));
    }
    events
}
