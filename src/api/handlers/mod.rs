use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::ai::{AiBackend, AiFailure};
use crate::api::AppState;
use crate::models::*;

// ============================================================
// Error Handling
// ============================================================

/// Every failure response is a JSON object with an `error` key; success
/// responses never carry one.
type ApiError = (StatusCode, Json<serde_json::Value>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
}

/// Log a persistence or internal fault and surface its message with a 500.
fn internal_error(e: impl std::fmt::Display) -> ApiError {
    let msg = e.to_string();
    tracing::error!("Internal error: {}", msg);
    error(StatusCode::INTERNAL_SERVER_ERROR, msg)
}

/// Map a classified AI failure to a 500. A malformed quiz carries the raw
/// model output as the diagnostic.
fn ai_error(failure: AiFailure) -> ApiError {
    tracing::warn!("AI operation failed: {}", failure);
    match failure {
        AiFailure::MalformedQuiz { raw } => error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("题目生成失败，模型返回内容无法解析: {}", raw),
        ),
        other => error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

/// The AI client, or a structured "service misconfigured" failure when the
/// process started without a credential.
fn ai_backend(state: &AppState) -> Result<Arc<dyn AiBackend>, ApiError> {
    state.ai.clone().ok_or_else(|| {
        error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "AI 服务未配置，请设置 GITHUB_TOKEN 环境变量",
        )
    })
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Note CRUD
// ============================================================

pub async fn list_notes(
    State(state): State<AppState>,
) -> Result<Json<Vec<NoteResponse>>, ApiError> {
    let notes = state.db.list_notes().map_err(internal_error)?;
    Ok(Json(notes.iter().map(Note::to_response).collect()))
}

/// Create-note body. Fields are optional here so that a missing key is a
/// 400 with the validation message rather than a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

pub async fn create_note(
    State(state): State<AppState>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<NoteResponse>), ApiError> {
    let title = req.title.unwrap_or_default();
    let content = req.content.unwrap_or_default();
    if title.trim().is_empty() || content.trim().is_empty() {
        return Err(error(
            StatusCode::BAD_REQUEST,
            "Title and content are required",
        ));
    }

    state
        .db
        .create_note(CreateNoteInput { title, content })
        .map(|note| (StatusCode::CREATED, Json(note.to_response())))
        .map_err(internal_error)
}

pub async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<NoteResponse>, ApiError> {
    state
        .db
        .get_note(id)
        .map_err(internal_error)?
        .map(|note| Json(note.to_response()))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Note not found"))
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateNoteInput>,
) -> Result<Json<NoteResponse>, ApiError> {
    state
        .db
        .update_note(id, input)
        .map_err(internal_error)?
        .map(|note| Json(note.to_response()))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Note not found"))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.db.delete_note(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(error(StatusCode::NOT_FOUND, "Note not found"))
    }
}

/// Query parameters for note search.
#[derive(Debug, Deserialize)]
pub struct SearchNotesQuery {
    /// Substring to match against title and content. Empty means no results.
    #[serde(default)]
    pub q: String,
}

pub async fn search_notes(
    State(state): State<AppState>,
    Query(query): Query<SearchNotesQuery>,
) -> Result<Json<Vec<NoteResponse>>, ApiError> {
    let notes = state.db.search_notes(&query.q).map_err(internal_error)?;
    Ok(Json(notes.iter().map(Note::to_response).collect()))
}

// ============================================================
// AI operations
// ============================================================

#[derive(Debug, Deserialize)]
pub struct ExtractInfoRequest {
    #[serde(default)]
    pub content: Option<String>,
    /// When present, the extraction result is persisted onto this note.
    #[serde(default)]
    pub note_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ExtractInfoResponse {
    pub success: bool,
    pub extracted_info: String,
    /// Whether the result was written to a note.
    pub saved: bool,
}

pub async fn extract_info(
    State(state): State<AppState>,
    Json(req): Json<ExtractInfoRequest>,
) -> Result<Json<ExtractInfoResponse>, ApiError> {
    let content = req.content.unwrap_or_default();
    let content = content.trim();
    if content.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "文档内容不能为空"));
    }

    if let Some(note_id) = req.note_id {
        state
            .db
            .get_note(note_id)
            .map_err(internal_error)?
            .ok_or_else(|| error(StatusCode::NOT_FOUND, "笔记不存在"))?;
    }

    let ai = ai_backend(&state)?;
    let extracted_info = ai
        .extract_key_information(content)
        .await
        .map_err(ai_error)?;

    let saved = match req.note_id {
        Some(note_id) => state
            .db
            .save_extracted_info(note_id, &extracted_info)
            .map_err(internal_error)?,
        None => false,
    };

    Ok(Json(ExtractInfoResponse {
        success: true,
        extracted_info,
        saved,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// When present, the translation is upserted into this note's map.
    #[serde(default)]
    pub note_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    pub success: bool,
    pub translation: String,
    pub language: String,
    pub saved: bool,
}

pub async fn translate(
    State(state): State<AppState>,
    Json(req): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, ApiError> {
    let content = req.content.unwrap_or_default();
    let content = content.trim();
    let language = req.language.unwrap_or_default();
    let language = language.trim();
    if content.is_empty() || language.is_empty() {
        return Err(error(
            StatusCode::BAD_REQUEST,
            "翻译内容和目标语言不能为空",
        ));
    }

    if let Some(note_id) = req.note_id {
        state
            .db
            .get_note(note_id)
            .map_err(internal_error)?
            .ok_or_else(|| error(StatusCode::NOT_FOUND, "笔记不存在"))?;
    }

    let ai = ai_backend(&state)?;
    // A failed translation is never persisted
    let translation = ai.translate(content, language).await.map_err(ai_error)?;

    let saved = match req.note_id {
        Some(note_id) => state
            .db
            .upsert_translation(note_id, language, &translation)
            .map_err(internal_error)?,
        None => false,
    };

    Ok(Json(TranslateResponse {
        success: true,
        translation,
        language: language.to_string(),
        saved,
    }))
}

#[derive(Debug, Deserialize)]
pub struct GenerateQuizRequest {
    #[serde(default)]
    pub content: Option<String>,
    /// When present, the quiz overwrites this note's quiz fields as a group.
    #[serde(default)]
    pub note_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct GenerateQuizResponse {
    pub success: bool,
    pub quiz: Quiz,
    pub saved: bool,
}

pub async fn generate_quiz(
    State(state): State<AppState>,
    Json(req): Json<GenerateQuizRequest>,
) -> Result<Json<GenerateQuizResponse>, ApiError> {
    let content = req.content.unwrap_or_default();
    let content = content.trim();
    if content.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "学习内容不能为空"));
    }

    if let Some(note_id) = req.note_id {
        state
            .db
            .get_note(note_id)
            .map_err(internal_error)?
            .ok_or_else(|| error(StatusCode::NOT_FOUND, "笔记不存在"))?;
    }

    let ai = ai_backend(&state)?;
    // An error-tagged result leaves the stored quiz untouched
    let quiz = ai.generate_quiz(content).await.map_err(ai_error)?;

    let saved = match req.note_id {
        Some(note_id) => state
            .db
            .save_quiz(note_id, &quiz)
            .map_err(internal_error)?,
        None => false,
    };

    Ok(Json(GenerateQuizResponse {
        success: true,
        quiz,
        saved,
    }))
}
