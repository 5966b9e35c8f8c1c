use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, warn};
use url::Url;

pub const GENERATIVE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const FAILURE_REPLY: &str = "Sorry, something went wrong.";

const ASSISTANT_PREAMBLE: &str = "You are an AI assistant for a YouTube channel named \"Engineering in Kannada\". \
Your name is \"EiK Assistant\". You should only answer questions related to engineering, technology, and education. \
You should not answer questions about other topics. If you are asked a question that is not related to these topics, \
you should politely decline to answer and say that you can only answer questions related to engineering, technology, and education.";

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(anyhow!("no generative-language API key configured"));
        }
        let endpoint = Url::parse(GENERATIVE_API_BASE)?
            .join(&format!("models/{model}:generateContent"))
            .context("building generateContent URL")?;
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, endpoint, api_key: api_key.to_string() })
    }
}

/// Model that could not be set up; every request fails with the setup error.
struct Unconfigured {
    reason: String,
}

#[async_trait]
impl GenerativeModel for Unconfigured {
    async fn generate(&self, _prompt: &str) -> Result<String> { Err(anyhow!("{}", self.reason)) }
}

/// Concatenated text of the first candidate.
fn extract_text(raw: &str) -> Result<String> {
    let resp: GenerateResponse = serde_json::from_str(raw).context("decoding generateContent response")?;
    let text: String = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        return Err(anyhow!("model returned no text"));
    }
    Ok(text)
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        let resp = self
            .http
            .post(self.endpoint.clone())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .context("calling generative-language API")?;
        let status = resp.status();
        let raw = resp.text().await?;
        if !status.is_success() {
            return Err(anyhow!("generative-language API returned HTTP {status}"));
        }
        extract_text(&raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
}

pub fn build_prompt(question: &str) -> String {
    format!("{ASSISTANT_PREAMBLE}\n\nHere is the user's question: {question}")
}

/// Conversation transcript with a model behind it.
pub struct Chatbot {
    model: Box<dyn GenerativeModel>,
    messages: Vec<ChatMessage>,
}

impl Chatbot {
    pub fn new(model: impl GenerativeModel + 'static) -> Self {
        Self { model: Box::new(model), messages: Vec::new() }
    }

    /// Chatbot backed by Gemini. A missing key or bad model name does not fail
    /// here; each question then gets the failure reply.
    pub fn gemini(api_key: Option<&str>, model: &str) -> Self {
        match GeminiClient::new(api_key.unwrap_or_default(), model) {
            Ok(client) => Self::new(client),
            Err(e) => {
                warn!(error = %e, "assistant not configured");
                Self::new(Unconfigured { reason: format!("{e:#}") })
            }
        }
    }

    pub fn messages(&self) -> &[ChatMessage] { &self.messages }

    /// Ask a question. Blank input is ignored and returns `None`; a model
    /// failure becomes an apology message rather than an error.
    pub async fn send(&mut self, input: &str) -> Option<&ChatMessage> {
        let question = input.trim();
        if question.is_empty() {
            return None;
        }
        self.messages.push(ChatMessage { sender: Sender::User, text: question.to_string() });
        let text = match self.model.generate(&build_prompt(question)).await {
            Ok(t) => {
                debug!(chars = t.len(), "assistant replied");
                t
            }
            Err(e) => {
                error!(error = %e, "assistant request failed");
                FAILURE_REPLY.to_string()
            }
        };
        self.messages.push(ChatMessage { sender: Sender::Bot, text });
        self.messages.last()
    }
}
