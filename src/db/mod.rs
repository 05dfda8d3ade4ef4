mod schema;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;

use crate::models::*;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

const NOTE_COLUMNS: &str = "id, title, content, extracted_info, extracted_at, \
     translations, translation_updated_at, quiz_question, quiz_options, \
     quiz_answer, quiz_explanation, quiz_generated_at, created_at, updated_at";

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "studynotes")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("studynotes.db");
        Self::open(db_path)
    }

    /// Open the database named by `STUDYNOTES_DB`, falling back to the
    /// per-user data directory. The fallback is a development convenience,
    /// not a production deployment path.
    pub fn open_from_env() -> Result<Self> {
        match std::env::var("STUDYNOTES_DB") {
            Ok(path) if !path.is_empty() => Self::open(PathBuf::from(path)),
            _ => Self::open_default(),
        }
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Note CRUD
    // ============================================================

    pub fn list_notes(&self) -> Result<Vec<Note>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes ORDER BY updated_at DESC, id DESC"
        ))?;

        let notes = stmt
            .query_map([], note_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(notes)
    }

    pub fn get_note(&self, id: i64) -> Result<Option<Note>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt =
            conn.prepare(&format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?"))?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(note_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn create_note(&self, input: CreateNoteInput) -> Result<Note> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();

        conn.execute(
            "INSERT INTO notes (title, content, created_at, updated_at)
             VALUES (?, ?, ?, ?)",
            (&input.title, &input.content, now.to_rfc3339(), now.to_rfc3339()),
        )?;
        let id = conn.last_insert_rowid();

        Ok(Note {
            id,
            title: input.title,
            content: input.content,
            extracted_info: None,
            extracted_at: None,
            translations: None,
            translation_updated_at: None,
            quiz_question: None,
            quiz_options: None,
            quiz_answer: None,
            quiz_explanation: None,
            quiz_generated_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_note(&self, id: i64, input: UpdateNoteInput) -> Result<Option<Note>> {
        let Some(existing) = self.get_note(id)? else {
            return Ok(None);
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let title = input.title.unwrap_or(existing.title);
        let content = input.content.unwrap_or(existing.content);

        conn.execute(
            "UPDATE notes SET title = ?, content = ?, updated_at = ? WHERE id = ?",
            (&title, &content, now.to_rfc3339(), id),
        )?;

        Ok(Some(Note {
            title,
            content,
            updated_at: now,
            ..existing
        }))
    }

    pub fn delete_note(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM notes WHERE id = ?", [id])?;
        Ok(rows > 0)
    }

    /// Substring search over title and content. Case handling is whatever
    /// SQLite's LIKE does by default.
    pub fn search_notes(&self, query: &str) -> Result<Vec<Note>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes
             WHERE title LIKE ?1 OR content LIKE ?1
             ORDER BY updated_at DESC, id DESC"
        ))?;

        let pattern = format!("%{}%", query);
        let notes = stmt
            .query_map([pattern], note_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(notes)
    }

    // ============================================================
    // AI result writes
    // ============================================================

    /// Persist extracted key information. Returns false when the note does
    /// not exist.
    pub fn save_extracted_info(&self, id: i64, info: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now().to_rfc3339();

        let rows = conn.execute(
            "UPDATE notes SET extracted_info = ?, extracted_at = ?, updated_at = ? WHERE id = ?",
            (info, &now, &now, id),
        )?;
        Ok(rows > 0)
    }

    /// Insert or replace one language's entry in the translations map.
    ///
    /// The stored map is re-read inside the transaction, so a corrupted
    /// column degrades to an empty map instead of failing the write, and
    /// concurrent upserts cannot lose entries. Returns false when the note
    /// does not exist.
    pub fn upsert_translation(&self, id: i64, language: &str, text: &str) -> Result<bool> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        let stored: Option<Option<String>> = {
            let mut stmt = tx.prepare("SELECT translations FROM notes WHERE id = ?")?;
            let mut rows = stmt.query([id])?;
            match rows.next()? {
                Some(row) => Some(row.get(0)?),
                None => None,
            }
        };
        let Some(raw) = stored else {
            return Ok(false);
        };

        let mut translations: BTreeMap<String, String> = decode_or_default(raw.as_deref());
        translations.insert(language.to_string(), text.to_string());
        let encoded = serde_json::to_string(&translations)?;

        let now = Utc::now().to_rfc3339();
        tx.execute(
            "UPDATE notes SET translations = ?, translation_updated_at = ?, updated_at = ?
             WHERE id = ?",
            (&encoded, &now, &now, id),
        )?;

        tx.commit()?;
        Ok(true)
    }

    /// Overwrite the quiz fields as one unit. A single statement, so either
    /// the whole group changes or nothing does. Returns false when the note
    /// does not exist.
    pub fn save_quiz(&self, id: i64, quiz: &Quiz) -> Result<bool> {
        let options = serde_json::to_string(&quiz.options)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now().to_rfc3339();

        let rows = conn.execute(
            "UPDATE notes SET quiz_question = ?, quiz_options = ?, quiz_answer = ?,
             quiz_explanation = ?, quiz_generated_at = ?, updated_at = ? WHERE id = ?",
            (
                &quiz.question,
                &options,
                &quiz.answer,
                &quiz.explanation,
                &now,
                &now,
                id,
            ),
        )?;
        Ok(rows > 0)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn note_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        extracted_info: row.get(3)?,
        extracted_at: row.get::<_, Option<String>>(4)?.map(parse_datetime),
        translations: row.get(5)?,
        translation_updated_at: row.get::<_, Option<String>>(6)?.map(parse_datetime),
        quiz_question: row.get(7)?,
        quiz_options: row.get(8)?,
        quiz_answer: row.get(9)?,
        quiz_explanation: row.get(10)?,
        quiz_generated_at: row.get::<_, Option<String>>(11)?.map(parse_datetime),
        created_at: parse_datetime(row.get::<_, String>(12)?),
        updated_at: parse_datetime(row.get::<_, String>(13)?),
    })
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
