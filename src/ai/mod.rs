//! Client for the external chat-completion API.
//!
//! Three operations are exposed over note content: key-information
//! extraction, translation, and multiple-choice quiz generation. The real
//! client ([`GithubModelsClient`]) talks to the GitHub Models inference
//! endpoint; [`mock::MockBackend`] stands in for it in tests.
//!
//! Every transport or protocol fault is converted into an [`AiFailure`]
//! value. Callers always receive a usable result or a classified failure,
//! never a raw HTTP error.

mod client;
pub mod mock;
mod types;

pub use client::{AiConfig, ConfigError, GithubModelsClient};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Quiz;

/// Classified failure from an AI operation.
///
/// The display strings are the user-facing messages surfaced by the API.
#[derive(Debug, Clone, Error)]
pub enum AiFailure {
    #[error("认证失败，请检查 GitHub Token 是否有效")]
    Unauthorized,

    #[error("API 调用频率超限，请稍后重试")]
    RateLimited,

    #[error("API 请求超时，请稍后重试")]
    Timeout,

    /// The model's quiz response was not decodable JSON. Carries the raw
    /// response text for diagnostics.
    #[error("无法解析模型返回的题目内容")]
    MalformedQuiz { raw: String },

    #[error("处理过程中发生错误: {0}")]
    Unknown(String),
}

/// The three AI operations over note content.
///
/// Implementations hold only immutable configuration and are safe to share
/// across concurrent requests.
#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Extract key information from `content`. Returns the model's text
    /// trimmed of surrounding whitespace, or a sentinel message when the
    /// response carries no choices.
    async fn extract_key_information(&self, content: &str) -> Result<String, AiFailure>;

    /// Translate `content` into `target_language`. Whatever text comes back
    /// is accepted as the translation.
    async fn translate(&self, content: &str, target_language: &str)
        -> Result<String, AiFailure>;

    /// Generate a multiple-choice quiz from `content`.
    async fn generate_quiz(&self, content: &str) -> Result<Quiz, AiFailure>;
}
