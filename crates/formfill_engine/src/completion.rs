use std::time::Duration;

use bytes::{Buf, BytesMut};
use formfill_logging::{fill_debug, fill_trace};
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::prompt::{ChatMessage, CompletionRequest};
use crate::{CompletionError, ConfigurationError, FailureKind};

const BODY_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub connect_timeout: Duration,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Receives content fragments in arrival order.
pub trait FragmentSink: Send + Sync {
    fn fragment(&self, text: &str);
}

#[async_trait::async_trait]
pub trait CompletionService: Send + Sync {
    /// Check that a request could be made at all; called before every job.
    fn validate(&self) -> Result<(), ConfigurationError>;

    /// Stream one completion, forwarding every content fragment to `sink`.
    async fn stream_completion(
        &self,
        request: &CompletionRequest,
        sink: &dyn FragmentSink,
    ) -> Result<(), CompletionError>;
}

/// OpenAI-compatible chat completions over server-sent events.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    settings: CompletionSettings,
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    stream: bool,
    messages: &'a [ChatMessage],
}

impl OpenAiClient {
    pub fn new(settings: CompletionSettings) -> Self {
        Self { settings }
    }

    fn endpoint(&self) -> Result<Url, ConfigurationError> {
        let mut base = self.settings.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base)
            .and_then(|url| url.join("chat/completions"))
            .map_err(|err| ConfigurationError::InvalidEndpoint(format!("{base}: {err}")))
    }

    fn api_key(&self) -> Option<&str> {
        self.settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    fn build_client(&self) -> Result<reqwest::Client, CompletionError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .build()
            .map_err(|err| CompletionError::new(FailureKind::Network, err.to_string()))
    }
}

#[async_trait::async_trait]
impl CompletionService for OpenAiClient {
    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.api_key().is_none() {
            return Err(ConfigurationError::MissingApiKey);
        }
        if self.settings.model.trim().is_empty() {
            return Err(ConfigurationError::MissingModel);
        }
        self.endpoint().map(|_| ())
    }

    async fn stream_completion(
        &self,
        request: &CompletionRequest,
        sink: &dyn FragmentSink,
    ) -> Result<(), CompletionError> {
        let endpoint = self
            .endpoint()
            .map_err(|err| CompletionError::new(FailureKind::Network, err.to_string()))?;
        let body = serde_json::to_vec(&ChatCompletionBody {
            model: self.settings.model.trim(),
            stream: true,
            messages: &request.messages,
        })
        .map_err(|err| CompletionError::new(FailureKind::Network, err.to_string()))?;

        let client = self.build_client()?;
        let response = client
            .post(endpoint)
            .bearer_auth(self.api_key().unwrap_or_default())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let excerpt: String = text.trim().chars().take(BODY_EXCERPT_CHARS).collect();
            return Err(CompletionError::new(
                FailureKind::HttpStatus(status.as_u16()),
                if excerpt.is_empty() {
                    status.to_string()
                } else {
                    format!("{status}: {excerpt}")
                },
            ));
        }

        let mut lines = SseLines::default();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            lines.extend(&chunk);
            while let Some(line) = lines.next_line() {
                if handle_line(&line, sink)? == Flow::Done {
                    return Ok(());
                }
            }
        }
        if let Some(line) = lines.finish() {
            handle_line(&line, sink)?;
        }
        fill_debug!("completion stream ended without [DONE]");
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Done,
}

fn handle_line(line: &str, sink: &dyn FragmentSink) -> Result<Flow, CompletionError> {
    let Some(data) = line.strip_prefix("data:") else {
        // Comments, event names and ids carry nothing we use.
        return Ok(Flow::Continue);
    };
    let data = data.trim();
    if data.is_empty() {
        return Ok(Flow::Continue);
    }
    if data == "[DONE]" {
        return Ok(Flow::Done);
    }

    let chunk: Value = serde_json::from_str(data).map_err(|err| {
        CompletionError::new(FailureKind::MalformedStream, format!("{err}: {data}"))
    })?;
    if let Some(error) = chunk.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), ToOwned::to_owned);
        return Err(CompletionError::new(FailureKind::Upstream, message));
    }
    if let Some(content) = chunk
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .filter(|content| !content.is_empty())
    {
        fill_trace!("fragment of {} bytes", content.len());
        sink.fragment(content);
    }
    Ok(Flow::Continue)
}

/// Splits an event-stream body into lines across chunk boundaries.
#[derive(Debug, Default)]
struct SseLines {
    buffer: BytesMut,
}

impl SseLines {
    fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    fn next_line(&mut self) -> Option<String> {
        let end = self.buffer.iter().position(|byte| *byte == b'\n')?;
        let line = self.buffer.split_to(end);
        self.buffer.advance(1);
        Some(decode_line(&line))
    }

    /// Whatever is left once the body ended without a final newline.
    fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = self.buffer.split();
        Some(decode_line(&rest))
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

fn map_reqwest_error(err: reqwest::Error) -> CompletionError {
    if err.is_timeout() {
        return CompletionError::new(FailureKind::Timeout, err.to_string());
    }
    CompletionError::new(FailureKind::Network, err.to_string())
}
