//! Google Gemini backend using `streamGenerateContent` over server-sent events.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use memchr::memchr;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::chat_stream::{
    BackendProvider, ChatBackend, RawReplyStream, ReplyRequest, SessionInitError, StreamError,
};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiSettings {
    pub model: String,
    pub base_url: String,
    pub connect_timeout: Duration,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl GeminiSettings {
    pub fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/'),
            self.model.trim_start_matches("models/")
        )
    }
}

/// Builds [`GeminiBackend`]s once a credential is available.
pub struct GeminiProvider {
    settings: GeminiSettings,
    api_key: Option<String>,
}

impl GeminiProvider {
    pub fn new(settings: GeminiSettings, api_key: Option<String>) -> Self {
        Self { settings, api_key }
    }
}

impl BackendProvider for GeminiProvider {
    fn connect(&self) -> Result<Arc<dyn ChatBackend>, SessionInitError> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(SessionInitError::MissingCredential)?;

        let client = Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .build()
            .map_err(|err| SessionInitError::Client(err.to_string()))?;

        debug!(model = %self.settings.model, "gemini backend ready");
        Ok(Arc::new(GeminiBackend {
            client,
            api_key: api_key.to_string(),
            settings: self.settings.clone(),
        }))
    }
}

pub struct GeminiBackend {
    client: Client,
    api_key: String,
    settings: GeminiSettings,
}

impl ChatBackend for GeminiBackend {
    fn stream_reply(&self, request: ReplyRequest) -> RawReplyStream {
        let pending = PendingRequest {
            client: self.client.clone(),
            url: self.settings.stream_url(),
            api_key: self.api_key.clone(),
            body: GenerateContentRequest::from(&request),
        };
        stream::unfold(SseState::Start(pending), next_increment).boxed()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

impl From<&ReplyRequest> for GenerateContentRequest {
    fn from(request: &ReplyRequest) -> Self {
        Self {
            contents: request
                .contents
                .iter()
                .map(|turn| Content {
                    role: turn.role.as_str(),
                    parts: vec![Part {
                        text: turn.text.clone(),
                    }],
                })
                .collect(),
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: request.system_instruction.to_string(),
                }],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Decoded content of one `data:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SseEvent {
    Text(String),
    Failed(StreamError),
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Collapse a Gemini error body into one line, preferring `STATUS: message`.
fn summarize_api_error(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    match serde_json::from_str::<ErrorWrapper>(trimmed) {
        Ok(wrapper) => {
            let message = wrapper
                .error
                .message
                .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
                .unwrap_or_else(|| trimmed.to_string());
            match wrapper.error.status.filter(|status| !status.is_empty()) {
                Some(status) => format!("{status}: {message}"),
                None => message,
            }
        }
        Err(_) => trimmed.to_string(),
    }
}

fn parse_data_line(line: &str) -> Option<SseEvent> {
    let payload = extract_data_payload(line)?;
    if payload.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(payload) {
        if value.get("error").is_some() {
            return Some(SseEvent::Failed(StreamError::Api(summarize_api_error(
                payload,
            ))));
        }
    }

    match serde_json::from_str::<GenerateContentResponse>(payload) {
        Ok(response) => {
            if let Some(reason) = response
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason)
            {
                return Some(SseEvent::Failed(StreamError::Api(format!(
                    "prompt blocked: {reason}"
                ))));
            }
            let text: String = response
                .candidates
                .into_iter()
                .next()
                .and_then(|candidate| candidate.content)
                .map(|content| {
                    content
                        .parts
                        .into_iter()
                        .filter(|part| !part.thought)
                        .filter_map(|part| part.text)
                        .collect()
                })
                .unwrap_or_default();
            Some(SseEvent::Text(text))
        }
        Err(err) => {
            warn!(error = %err, "unparseable stream payload");
            Some(SseEvent::Failed(StreamError::Malformed(err.to_string())))
        }
    }
}

/// Splits a byte stream into lines and decodes `data:` payloads.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn feed(&mut self, bytes: &[u8], out: &mut VecDeque<SseEvent>) {
        self.buffer.extend_from_slice(bytes);
        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            Self::decode_line(&line[..newline_pos], out);
        }
    }

    /// Decode a trailing line that was not newline-terminated.
    fn finish(&mut self, out: &mut VecDeque<SseEvent>) {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            Self::decode_line(&line, out);
        }
    }

    fn decode_line(raw: &[u8], out: &mut VecDeque<SseEvent>) {
        match std::str::from_utf8(raw) {
            Ok(line) => {
                if let Some(event) = parse_data_line(line.trim()) {
                    out.push_back(event);
                }
            }
            Err(err) => {
                out.push_back(SseEvent::Failed(StreamError::Malformed(format!(
                    "invalid UTF-8 in stream: {err}"
                ))));
            }
        }
    }
}

struct PendingRequest {
    client: Client,
    url: String,
    api_key: String,
    body: GenerateContentRequest,
}

impl PendingRequest {
    async fn send(self) -> Result<reqwest::Response, StreamError> {
        debug!(url = %self.url, turns = self.body.contents.len(), "posting gemini request");
        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.body)
            .send()
            .await
            .map_err(|err| StreamError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(http_error(status, &body));
        }
        Ok(response)
    }
}

fn http_error(status: StatusCode, body: &str) -> StreamError {
    StreamError::Api(format!(
        "HTTP {}: {}",
        status.as_u16(),
        summarize_api_error(body)
    ))
}

struct SseReader {
    response: reqwest::Response,
    decoder: SseDecoder,
    pending: VecDeque<SseEvent>,
    body_done: bool,
}

enum SseState {
    Start(PendingRequest),
    Reading(Box<SseReader>),
    Done,
}

async fn next_increment(
    mut state: SseState,
) -> Option<(Result<String, StreamError>, SseState)> {
    loop {
        state = match state {
            SseState::Done => return None,
            SseState::Start(request) => match request.send().await {
                Ok(response) => SseState::Reading(Box::new(SseReader {
                    response,
                    decoder: SseDecoder::default(),
                    pending: VecDeque::new(),
                    body_done: false,
                })),
                Err(err) => return Some((Err(err), SseState::Done)),
            },
            SseState::Reading(mut reader) => {
                match reader.pending.pop_front() {
                    Some(SseEvent::Text(text)) => {
                        return Some((Ok(text), SseState::Reading(reader)));
                    }
                    Some(SseEvent::Failed(err)) => return Some((Err(err), SseState::Done)),
                    None if reader.body_done => return None,
                    None => {}
                }

                match reader.response.chunk().await {
                    Ok(Some(bytes)) => {
                        let SseReader {
                            decoder, pending, ..
                        } = &mut *reader;
                        decoder.feed(&bytes, pending);
                    }
                    Ok(None) => {
                        let SseReader {
                            decoder, pending, ..
                        } = &mut *reader;
                        decoder.finish(pending);
                        reader.body_done = true;
                    }
                    Err(err) => {
                        return Some((
                            Err(StreamError::Transport(err.to_string())),
                            SseState::Done,
                        ));
                    }
                }
                SseState::Reading(reader)
            }
        };
    }
}
