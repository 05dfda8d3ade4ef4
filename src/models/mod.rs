//! Domain models for the note backend.
//!
//! The only persisted entity is [`Note`]: user-authored title and content
//! plus AI-derived side channels (extracted key information, per-language
//! translations, a generated quiz). The side channels are stored as raw JSON
//! text columns and decoded leniently at the serialization boundary; see
//! [`Note::to_response`].

mod note;

pub use note::*;
