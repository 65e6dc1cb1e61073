//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - languages(code UNIQUE, name)
//! - packs(name, language_id) unique per language
//! - sentences(pack_id, order_index UNIQUE per pack, manifest_index, text, ...)
//!
//! The importer talks to the store through the traits below.

pub mod schema;
pub mod sqlite;

pub use sqlite::{SqliteStore, DbStats};

use crate::Result;
use crate::model::{Language, Pack, Sentence, SentenceDraft};

pub trait LanguageStore {
    fn find_language_by_code(&self, code: &str) -> Result<Option<Language>>;

    /// Fetch the language with `code`, creating it with `name` if absent.
    /// Must be a single atomic operation at the store.
    fn get_or_create_language(&self, code: &str, name: &str) -> Result<Language>;

    fn list_languages(&self) -> Result<Vec<Language>>;
}

pub trait PackStore {
    fn find_pack_by_name_and_language(&self, name: &str, language_code: &str) -> Result<Option<Pack>>;

    /// Atomic get-or-create keyed by (language, name).
    /// `None` when no language has `language_code`.
    fn get_or_create_pack(&self, name: &str, language_code: &str) -> Result<Option<Pack>>;

    fn list_packs(&self, language_code: Option<&str>) -> Result<Vec<Pack>>;
}

pub trait SentenceStore {
    /// Store drafts in order; the nth draft gets `order_index` n.
    /// `on_inserted` is called with the 1-based count after each row.
    fn insert_sentences(
        &mut self,
        language_id: i64,
        pack_id: i64,
        drafts: &[SentenceDraft],
        on_inserted: &mut dyn FnMut(usize),
    ) -> Result<usize>;

    /// Point the sentence numbered `manifest_index` at a copied audio file
    fn set_sentence_audio(&self, pack_id: i64, manifest_index: u32, audio_path: &str) -> Result<bool>;

    fn list_sentences(&self, pack_id: i64) -> Result<Vec<Sentence>>;
}

/// Everything the import pipeline needs from persistence
pub trait ImportStore: LanguageStore + PackStore + SentenceStore {}

impl<T: LanguageStore + PackStore + SentenceStore> ImportStore for T {}
