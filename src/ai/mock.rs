//! Mock AI backend for deterministic testing.
//!
//! Returns canned responses for each operation; a configured failure makes
//! every operation return it instead. Calls are logged so tests can assert
//! what was (or was not) invoked.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{AiBackend, AiFailure};
use crate::models::{Quiz, QuizOption};

/// Mock backend with builder-style configuration.
#[derive(Clone)]
pub struct MockBackend {
    extraction: String,
    translation: String,
    quiz: Quiz,
    failure: Option<AiFailure>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            extraction: "Mock extracted info".to_string(),
            translation: "Mock translation".to_string(),
            quiz: sample_quiz(),
            failure: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the canned extraction result.
    pub fn with_extraction(mut self, text: impl Into<String>) -> Self {
        self.extraction = text.into();
        self
    }

    /// Set the canned translation result.
    pub fn with_translation(mut self, text: impl Into<String>) -> Self {
        self.translation = text.into();
        self
    }

    /// Set the canned quiz result.
    pub fn with_quiz(mut self, quiz: Quiz) -> Self {
        self.quiz = quiz;
        self
    }

    /// Make every operation fail with the given failure.
    pub fn failing_with(mut self, failure: AiFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Operations invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, operation: &str) -> Result<(), AiFailure> {
        self.calls.lock().unwrap().push(operation.to_string());
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AiBackend for MockBackend {
    async fn extract_key_information(&self, _content: &str) -> Result<String, AiFailure> {
        self.record("extract")?;
        Ok(self.extraction.clone())
    }

    async fn translate(
        &self,
        _content: &str,
        _target_language: &str,
    ) -> Result<String, AiFailure> {
        self.record("translate")?;
        Ok(self.translation.clone())
    }

    async fn generate_quiz(&self, _content: &str) -> Result<Quiz, AiFailure> {
        self.record("quiz")?;
        Ok(self.quiz.clone())
    }
}

fn sample_quiz() -> Quiz {
    Quiz {
        question: "Mock question?".to_string(),
        options: vec![
            QuizOption {
                label: "A".to_string(),
                text: "First".to_string(),
            },
            QuizOption {
                label: "B".to_string(),
                text: "Second".to_string(),
            },
        ],
        answer: "A".to_string(),
        explanation: "Because A.".to_string(),
    }
}
