use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A note as stored in the database.
///
/// `translations` and `quiz_options` hold raw JSON text exactly as written;
/// they are only decoded when producing the external representation. All
/// AI-derived fields start out `None` and are filled in by the extract,
/// translate, and quiz operations.
#[derive(Debug, Clone)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// Free-form AI output from key-information extraction, last write wins.
    pub extracted_info: Option<String>,
    pub extracted_at: Option<DateTime<Utc>>,
    /// JSON object mapping language name to translated text.
    pub translations: Option<String>,
    pub translation_updated_at: Option<DateTime<Utc>>,
    pub quiz_question: Option<String>,
    /// JSON array of `{label, text}` pairs.
    pub quiz_options: Option<String>,
    /// Expected to match one option's label; not enforced anywhere.
    pub quiz_answer: Option<String>,
    pub quiz_explanation: Option<String>,
    pub quiz_generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One answer choice in a generated quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizOption {
    /// Short token identifying the choice, such as "A".
    pub label: String,
    pub text: String,
}

/// A multiple-choice quiz generated from note content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub question: String,
    pub options: Vec<QuizOption>,
    pub answer: String,
    pub explanation: String,
}

/// The external JSON representation of a note.
///
/// Timestamps serialize as ISO-8601 strings or null. `translations` and
/// `quiz_options` are the decoded values, falling back to empty on absence
/// or corruption. This is a pure projection of [`Note`], nothing else is
/// transformed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub extracted_info: Option<String>,
    pub extracted_at: Option<DateTime<Utc>>,
    pub translations: BTreeMap<String, String>,
    pub translation_updated_at: Option<DateTime<Utc>>,
    pub quiz_question: Option<String>,
    pub quiz_options: Vec<QuizOption>,
    pub quiz_answer: Option<String>,
    pub quiz_explanation: Option<String>,
    pub quiz_generated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a note. Both fields are required and must be non-blank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNoteInput {
    pub title: String,
    pub content: String,
}

/// Input for updating a note. Omitted fields keep their current value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateNoteInput {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Lenient read: decode stored JSON, substituting the default value when the
/// column is empty or holds text that no longer parses. Malformed data never
/// surfaces as an error to the caller.
pub fn decode_or_default<T: DeserializeOwned + Default>(raw: Option<&str>) -> T {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

impl Note {
    /// Project the note into its external representation.
    pub fn to_response(&self) -> NoteResponse {
        NoteResponse {
            id: self.id,
            title: self.title.clone(),
            content: self.content.clone(),
            extracted_info: self.extracted_info.clone(),
            extracted_at: self.extracted_at,
            translations: decode_or_default(self.translations.as_deref()),
            translation_updated_at: self.translation_updated_at,
            quiz_question: self.quiz_question.clone(),
            quiz_options: decode_or_default(self.quiz_options.as_deref()),
            quiz_answer: self.quiz_answer.clone(),
            quiz_explanation: self.quiz_explanation.clone(),
            quiz_generated_at: self.quiz_generated_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
