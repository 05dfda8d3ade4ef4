//! Client for the GitHub Models inference endpoint.
//!
//! Configuration comes from the process environment: `GITHUB_TOKEN` is the
//! bearer credential and is required at construction time. Endpoint and
//! model are fixed defaults that [`AiConfig`] can override.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

use super::types::*;
use super::{AiBackend, AiFailure};
use crate::models::Quiz;

/// Default inference endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://models.github.ai/inference";

/// Default generation model.
pub const DEFAULT_MODEL: &str = "openai/gpt-4.1-mini";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 1500;

/// Returned by extraction when the response carries no choices.
const EMPTY_RESPONSE_SENTINEL: &str = "AI分析完成，但返回内容为空。";

const EXTRACT_SYSTEM_PROMPT: &str = "你是一个专业的文档分析助手，擅长从各种文档中提取关键信息。";
const TRANSLATE_SYSTEM_PROMPT: &str = "你是一个专业的翻译助手，精通多种语言。";
const QUIZ_SYSTEM_PROMPT: &str = "你是一个专业的出题助手，擅长根据学习材料设计多项选择题。";

/// Configuration for the chat-completion client.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub endpoint: String,
    pub model: String,
    /// Bearer credential for the endpoint.
    pub token: String,
    pub timeout_seconds: u64,
}

impl AiConfig {
    /// Read configuration from the environment. Fails when `GITHUB_TOKEN`
    /// is absent or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = std::env::var("GITHUB_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        Ok(Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            token,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        })
    }
}

/// Construction-time errors for [`GithubModelsClient`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GITHUB_TOKEN is not set")]
    MissingToken,

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Chat-completion client for the GitHub Models endpoint.
pub struct GithubModelsClient {
    client: Client,
    config: AiConfig,
}

impl GithubModelsClient {
    pub fn new(config: AiConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(AiConfig::from_env()?)
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    /// Issue one chat-completion call. Returns the first choice's message
    /// text, or `None` when the response has no choices. All faults come
    /// back as classified [`AiFailure`] values.
    async fn chat(&self, system: &str, prompt: String) -> Result<Option<String>, AiFailure> {
        debug!(
            "Chat completion with model {}, prompt length {}",
            self.config.model,
            prompt.len()
        );

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt,
                },
            ],
            temperature: Some(TEMPERATURE),
            max_tokens: Some(MAX_TOKENS),
        };

        let url = format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorResponse>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_status(status, message));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AiFailure::Unknown(format!("Failed to parse response: {}", e)))?;

        Ok(result.choices.into_iter().next().map(|c| c.message.content))
    }
}

#[async_trait]
impl AiBackend for GithubModelsClient {
    async fn extract_key_information(&self, content: &str) -> Result<String, AiFailure> {
        let prompt = extract_prompt(content);
        match self.chat(EXTRACT_SYSTEM_PROMPT, prompt).await? {
            Some(text) => Ok(text.trim().to_string()),
            None => Ok(EMPTY_RESPONSE_SENTINEL.to_string()),
        }
    }

    async fn translate(
        &self,
        content: &str,
        target_language: &str,
    ) -> Result<String, AiFailure> {
        let prompt = translate_prompt(content, target_language);
        match self.chat(TRANSLATE_SYSTEM_PROMPT, prompt).await? {
            Some(text) => Ok(text.trim().to_string()),
            None => Ok(String::new()),
        }
    }

    async fn generate_quiz(&self, content: &str) -> Result<Quiz, AiFailure> {
        let prompt = quiz_prompt(content);
        match self.chat(QUIZ_SYSTEM_PROMPT, prompt).await? {
            Some(text) => parse_quiz(&text),
            None => Err(AiFailure::MalformedQuiz { raw: String::new() }),
        }
    }
}

/// Map an HTTP error status to a failure class.
fn classify_status(status: StatusCode, message: String) -> AiFailure {
    match status.as_u16() {
        401 | 403 => AiFailure::Unauthorized,
        429 => AiFailure::RateLimited,
        _ => AiFailure::Unknown(format!("{}: {}", status, message)),
    }
}

/// Map a transport-level error to a failure class.
fn classify_transport(e: reqwest::Error) -> AiFailure {
    if e.is_timeout() {
        AiFailure::Timeout
    } else {
        AiFailure::Unknown(e.to_string())
    }
}

/// Decode the model's quiz response.
///
/// Tries the full text first, then the substring between the first `{` and
/// the last `}` (models like to wrap JSON in prose or code fences). Anything
/// else is a malformed result carrying the raw text.
fn parse_quiz(raw: &str) -> Result<Quiz, AiFailure> {
    let trimmed = raw.trim();

    if let Ok(quiz) = serde_json::from_str::<Quiz>(trimmed) {
        return Ok(quiz);
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(quiz) = serde_json::from_str::<Quiz>(&trimmed[start..=end]) {
                return Ok(quiz);
            }
        }
    }

    Err(AiFailure::MalformedQuiz {
        raw: raw.to_string(),
    })
}

fn extract_prompt(content: &str) -> String {
    format!(
        "请分析以下文档内容，并提取其中的关键信息。请按照以下格式整理信息：

📋 **主要内容摘要**
[提供文档的核心内容摘要]

🔑 **关键要点**
[列出3-5个主要要点]

📊 **重要数据/信息**
[提取重要的数据、日期、人名、地名等]

🎯 **行动项/任务**
[如果有的话，列出需要执行的任务或行动项]

💡 **关键洞察**
[提供有价值的洞察或结论]

文档内容：
{content}

请用中文回答，格式清晰易读。"
    )
}

fn translate_prompt(content: &str, target_language: &str) -> String {
    format!(
        "请将以下内容翻译成{target_language}。只返回翻译后的文本，不要添加任何解释、注释或说明。

{content}"
    )
}

fn quiz_prompt(content: &str) -> String {
    format!(
        "请根据以下学习材料设计一道多项选择题。严格按照如下 JSON 格式返回，不要输出 JSON 以外的任何内容：

{{
  \"question\": \"题干\",
  \"options\": [
    {{\"label\": \"A\", \"text\": \"选项内容\"}},
    {{\"label\": \"B\", \"text\": \"选项内容\"}},
    {{\"label\": \"C\", \"text\": \"选项内容\"}},
    {{\"label\": \"D\", \"text\": \"选项内容\"}}
  ],
  \"answer\": \"A\",
  \"explanation\": \"答案解析\"
}}

学习材料：
{content}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_QUIZ: &str = r#"{
        "question": "水的化学式是什么？",
        "options": [
            {"label": "A", "text": "H2O"},
            {"label": "B", "text": "CO2"}
        ],
        "answer": "A",
        "explanation": "水分子由两个氢原子和一个氧原子组成。"
    }"#;

    #[test]
    fn parse_quiz_accepts_plain_json() {
        let quiz = parse_quiz(VALID_QUIZ).unwrap();
        assert_eq!(quiz.answer, "A");
        assert_eq!(quiz.options.len(), 2);
    }

    #[test]
    fn parse_quiz_salvages_fenced_json() {
        let wrapped = format!("好的，题目如下：\n```json\n{}\n```\n祝学习愉快！", VALID_QUIZ);
        let quiz = parse_quiz(&wrapped).unwrap();
        assert_eq!(quiz.question, "水的化学式是什么？");
    }

    #[test]
    fn parse_quiz_rejects_garbage_with_raw_text() {
        let err = parse_quiz("I cannot generate a quiz.").unwrap_err();
        match err {
            AiFailure::MalformedQuiz { raw } => {
                assert_eq!(raw, "I cannot generate a quiz.");
            }
            other => panic!("expected MalformedQuiz, got {:?}", other),
        }
    }

    #[test]
    fn parse_quiz_rejects_braces_without_valid_json() {
        let err = parse_quiz("{ not valid }").unwrap_err();
        assert!(matches!(err, AiFailure::MalformedQuiz { .. }));
    }

    #[test]
    fn classify_401_as_unauthorized() {
        let failure = classify_status(StatusCode::UNAUTHORIZED, "bad token".to_string());
        assert!(matches!(failure, AiFailure::Unauthorized));
    }

    #[test]
    fn classify_429_as_rate_limited() {
        let failure = classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down".to_string());
        assert!(matches!(failure, AiFailure::RateLimited));
    }

    #[test]
    fn classify_500_as_unknown_with_message() {
        let failure =
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, "upstream".to_string());
        match failure {
            AiFailure::Unknown(msg) => assert!(msg.contains("upstream")),
            other => panic!("expected Unknown, got {:?}", other),
        }
    }

    #[test]
    fn config_from_env_requires_token() {
        // Serialize access to the env var across test threads
        static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
        let _guard = LOCK.lock().unwrap();

        std::env::remove_var("GITHUB_TOKEN");
        assert!(matches!(
            AiConfig::from_env(),
            Err(ConfigError::MissingToken)
        ));

        std::env::set_var("GITHUB_TOKEN", "test-token");
        let config = AiConfig::from_env().unwrap();
        assert_eq!(config.token, "test-token");
        assert_eq!(config.model, DEFAULT_MODEL);
        std::env::remove_var("GITHUB_TOKEN");
    }
}
