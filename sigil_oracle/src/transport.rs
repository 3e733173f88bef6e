//! How a completion request reaches the model.
//!
//! [`Transport`] is the only seam between the oracle and the network.  The
//! live implementation speaks the Gemini `generateContent` REST call;
//! [`OfflineTransport`] refuses everything; [`CannedTransport`] replays
//! scripted replies for tests and demos.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::OracleError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL:    &str = "gemini-3-flash-preview";
pub const DEFAULT_TIMEOUT:  Duration = Duration::from_secs(30);

/// One single-turn request: a system instruction, the user text and, for
/// structured replies, a JSON schema the answer must follow.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub system_instruction: String,
    pub prompt:             String,
    pub response_schema:    Option<Value>,
}

pub trait Transport: Send {
    /// Return the model's text for `request`.
    fn complete(&self, request: &CompletionRequest) -> Result<String, OracleError>;
}

impl<T: Transport + Sync + ?Sized> Transport for Arc<T> {
    fn complete(&self, request: &CompletionRequest) -> Result<String, OracleError> {
        (**self).complete(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn complete(&self, request: &CompletionRequest) -> Result<String, OracleError> {
        (**self).complete(request)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Gemini REST
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model:    String,
    pub api_key:  String,
    pub timeout:  Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        GeminiConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            model:    DEFAULT_MODEL.to_string(),
            api_key:  api_key.into(),
            timeout:  DEFAULT_TIMEOUT,
        }
    }
}

pub struct GeminiTransport {
    config: GeminiConfig,
    agent:  ureq::Agent,
}

impl GeminiTransport {
    pub fn new(config: GeminiConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        GeminiTransport { config, agent }
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

impl Transport for GeminiTransport {
    fn complete(&self, request: &CompletionRequest) -> Result<String, OracleError> {
        let body = request_body(request);
        let response = self
            .agent
            .post(&self.endpoint())
            .query("key", &self.config.api_key)
            .send_json(&body)
            .map_err(|e| match e {
                ureq::Error::Status(code, resp) => OracleError::Status {
                    code,
                    body: resp.into_string().unwrap_or_default(),
                },
                other => OracleError::Transport(other.to_string()),
            })?;
        let parsed: GenerateResponse = response
            .into_json()
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        parsed.first_text().ok_or(OracleError::EmptyResponse)
    }
}

/// JSON body of a `generateContent` call.
pub fn request_body(request: &CompletionRequest) -> Value {
    let mut body = json!({
        "systemInstruction": { "parts": [{ "text": request.system_instruction }] },
        "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }]
    });
    if let Some(schema) = &request.response_schema {
        body["generationConfig"] = json!({
            "responseMimeType": "application/json",
            "responseSchema": schema
        });
    }
    body
}

// ── Response shape (only the fields we read) ─────────────────────────────

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Part {
    pub text: Option<String>,
}

impl GenerateResponse {
    /// `candidates[0].content.parts[0].text`, if every link is present.
    pub fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Offline / canned
// ════════════════════════════════════════════════════════════════════════════

/// Used when no API key is configured: every call fails, so callers always
/// land on their fallback content.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineTransport;

impl Transport for OfflineTransport {
    fn complete(&self, _request: &CompletionRequest) -> Result<String, OracleError> {
        Err(OracleError::Offline)
    }
}

/// Replays scripted replies in order and remembers every request it saw.
/// Clones share the script and the log.
#[derive(Clone, Default)]
pub struct CannedTransport {
    replies: Arc<Mutex<VecDeque<Result<String, OracleError>>>>,
    seen:    Arc<Mutex<Vec<CompletionRequest>>>,
}

impl CannedTransport {
    pub fn new() -> Self { CannedTransport::default() }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    pub fn fail(self, err: OracleError) -> Self {
        self.push(Err(err));
        self
    }

    pub fn push(&self, reply: Result<String, OracleError>) {
        self.replies.lock().unwrap_or_else(|p| p.into_inner()).push_back(reply);
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.seen.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Transport for CannedTransport {
    fn complete(&self, request: &CompletionRequest) -> Result<String, OracleError> {
        self.seen.lock().unwrap_or_else(|p| p.into_inner()).push(request.clone());
        self.replies
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::Transport("no scripted reply left".into())))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
