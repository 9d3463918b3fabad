use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use intake_core::config::{LlmConfig, LlmProvider};

pub const GEMINI_DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm client configuration error: {0}")]
    Configuration(String),
    #[error("llm transport failure: {0}")]
    Transport(String),
    #[error("llm provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("llm response could not be decoded: {0}")]
    MalformedResponse(String),
    #[error("llm returned an empty completion")]
    EmptyCompletion,
}

/// Black-box text completion: one rendered prompt in, raw model text out.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

pub fn build_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let http = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .build()
        .map_err(|e| LlmError::Configuration(format!("failed to build HTTP client: {e}")))?;
    let base_url = config.base_url.as_deref().map(|url| url.trim_end_matches('/').to_string());

    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Gemini => Arc::new(GeminiClient {
            http,
            base_url: base_url.unwrap_or_else(|| GEMINI_DEFAULT_BASE_URL.to_string()),
            model: config.model.clone(),
            api_key: require_api_key(config)?,
        }),
        LlmProvider::OpenAi => Arc::new(OpenAiClient {
            http,
            base_url: base_url.unwrap_or_else(|| OPENAI_DEFAULT_BASE_URL.to_string()),
            model: config.model.clone(),
            api_key: require_api_key(config)?,
        }),
        LlmProvider::Ollama => Arc::new(OllamaClient {
            http,
            base_url: base_url.unwrap_or_else(|| OLLAMA_DEFAULT_BASE_URL.to_string()),
            model: config.model.clone(),
        }),
    };

    Ok(client)
}

fn require_api_key(config: &LlmConfig) -> Result<SecretString, LlmError> {
    config.api_key.clone().ok_or_else(|| {
        LlmError::Configuration("llm.api_key is required for hosted providers".to_string())
    })
}

async fn post_json<T, R>(request: reqwest::RequestBuilder, body: &T) -> Result<R, LlmError>
where
    T: Serialize + ?Sized,
    R: for<'de> Deserialize<'de>,
{
    let response =
        request.json(body).send().await.map_err(|e| LlmError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Status { status: status.as_u16(), body });
    }

    response.json::<R>().await.map_err(|e| LlmError::MalformedResponse(e.to_string()))
}

fn non_empty(text: Option<String>) -> Result<String, LlmError> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(LlmError::EmptyCompletion),
    }
}

/// Google AI Studio `generateContent`.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let body = GeminiRequest {
            contents: vec![GeminiContent { role: "user", parts: vec![GeminiPart { text: prompt }] }],
        };
        let request =
            self.http.post(url).header("x-goog-api-key", self.api_key.expose_secret());

        let response: GeminiResponse = post_json(request, &body).await?;
        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content.parts.into_iter().filter_map(|part| part.text).collect::<String>()
            });
        non_empty(text)
    }
}

/// Any `/chat/completions` compatible endpoint.
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: 0.0,
        };
        let request = self.http.post(url).bearer_auth(self.api_key.expose_secret());

        let response: ChatResponse = post_json(request, &body).await?;
        non_empty(response.choices.into_iter().next().and_then(|choice| choice.message.content))
    }
}

/// Local Ollama `/api/generate` without streaming.
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: Option<String>,
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaRequest { model: &self.model, prompt, stream: false };

        let response: OllamaResponse = post_json(self.http.post(url), &body).await?;
        non_empty(response.response)
    }
}

/// Replays queued completions in order and keeps every prompt it was given.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|reply| Ok(reply.into())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub async fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().await.push_back(Ok(reply.into()));
    }

    pub async fn push_failure(&self, message: impl Into<String>) {
        self.replies.lock().await.push_back(Err(message.into()));
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().await.push(prompt.to_string());
        match self.replies.lock().await.pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(LlmError::Transport(message)),
            None => Err(LlmError::EmptyCompletion),
        }
    }
}

#[cfg(test)]
mod tests {
    use intake_core::config::{AppConfig, LlmProvider};

    use super::{build_client, LlmClient, LlmError, ScriptedLlm};

    #[test]
    fn hosted_provider_without_key_is_rejected() {
        let mut config = AppConfig::default().llm;
        config.provider = LlmProvider::OpenAi;
        config.api_key = None;

        assert!(matches!(build_client(&config), Err(LlmError::Configuration(_))));
    }

    #[test]
    fn ollama_builds_without_key() {
        let config = AppConfig::default().llm;
        assert!(build_client(&config).is_ok());
    }

    #[tokio::test]
    async fn scripted_llm_replays_in_order_and_records_prompts() {
        let llm = ScriptedLlm::new(["budget_sharing"]);
        llm.push_failure("quota exceeded").await;

        assert_eq!(llm.complete("first").await.expect("reply"), "budget_sharing");
        assert!(matches!(llm.complete("second").await, Err(LlmError::Transport(_))));
        assert!(matches!(llm.complete("third").await, Err(LlmError::EmptyCompletion)));
        assert_eq!(llm.prompts().await, vec!["first", "second", "third"]);
    }
}
