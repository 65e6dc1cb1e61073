//! SQLite storage implementation

use std::path::Path;
use std::time::Duration;
use rusqlite::{Connection, params, OptionalExtension, TransactionBehavior};
use crate::Result;
use crate::model::{Language, Pack, Sentence, SentenceDraft};
use super::{schema, LanguageStore, PackStore, SentenceStore};

/// Concurrent importers wait this long for the write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed storage for languages, packs and sentences
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        self.conn.pragma_update(None, "foreign_keys", true)?;
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Counts ==========

    pub fn count_languages(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM languages")
    }

    pub fn count_packs(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM packs")
    }

    pub fn count_sentences(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM sentences")
    }

    pub fn count_sentences_with_audio(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM sentences WHERE audio_path IS NOT NULL")
    }

    fn count(&self, sql: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            languages: self.count_languages()?,
            packs: self.count_packs()?,
            sentences: self.count_sentences()?,
            sentences_with_audio: self.count_sentences_with_audio()?,
        })
    }

    fn row_to_language(row: &rusqlite::Row) -> rusqlite::Result<Language> {
        Ok(Language {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
        })
    }

    fn row_to_pack(row: &rusqlite::Row) -> rusqlite::Result<Pack> {
        Ok(Pack {
            id: row.get(0)?,
            name: row.get(1)?,
            language_id: row.get(2)?,
            language_code: row.get(3)?,
        })
    }

    fn row_to_sentence(row: &rusqlite::Row) -> rusqlite::Result<Sentence> {
        Ok(Sentence {
            id: row.get(0)?,
            language_id: row.get(1)?,
            pack_id: row.get(2)?,
            order_index: row.get(3)?,
            manifest_index: row.get(4)?,
            text: row.get(5)?,
            translation: row.get(6)?,
            ipa: row.get(7)?,
            romanization: row.get(8)?,
            audio_path: row.get(9)?,
        })
    }
}

// ========== Language Operations ==========

impl LanguageStore for SqliteStore {
    fn find_language_by_code(&self, code: &str) -> Result<Option<Language>> {
        self.conn
            .query_row(
                "SELECT id, code, name FROM languages WHERE code = ?1",
                [code],
                Self::row_to_language,
            )
            .optional()
            .map_err(Into::into)
    }

    fn get_or_create_language(&self, code: &str, name: &str) -> Result<Language> {
        // The no-op update makes RETURNING yield the existing row on conflict
        let language = self.conn.query_row(
            r#"
            INSERT INTO languages (code, name) VALUES (?1, ?2)
            ON CONFLICT(code) DO UPDATE SET code = excluded.code
            RETURNING id, code, name
            "#,
            params![code, name],
            Self::row_to_language,
        )?;
        Ok(language)
    }

    fn list_languages(&self) -> Result<Vec<Language>> {
        let mut stmt = self.conn.prepare("SELECT id, code, name FROM languages ORDER BY code")?;

        let languages = stmt
            .query_map([], Self::row_to_language)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(languages)
    }
}

// ========== Pack Operations ==========

impl PackStore for SqliteStore {
    fn find_pack_by_name_and_language(&self, name: &str, language_code: &str) -> Result<Option<Pack>> {
        self.conn
            .query_row(
                r#"
                SELECT p.id, p.name, p.language_id, l.code
                FROM packs p JOIN languages l ON l.id = p.language_id
                WHERE p.name = ?1 AND l.code = ?2
                "#,
                [name, language_code],
                Self::row_to_pack,
            )
            .optional()
            .map_err(Into::into)
    }

    fn get_or_create_pack(&self, name: &str, language_code: &str) -> Result<Option<Pack>> {
        let row: Option<(i64, String, i64)> = self
            .conn
            .query_row(
                r#"
                INSERT INTO packs (name, language_id)
                SELECT ?1, id FROM languages WHERE code = ?2
                ON CONFLICT(language_id, name) DO UPDATE SET name = excluded.name
                RETURNING id, name, language_id
                "#,
                [name, language_code],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        Ok(row.map(|(id, name, language_id)| Pack {
            id,
            name,
            language_id,
            language_code: language_code.to_string(),
        }))
    }

    fn list_packs(&self, language_code: Option<&str>) -> Result<Vec<Pack>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT p.id, p.name, p.language_id, l.code
            FROM packs p JOIN languages l ON l.id = p.language_id
            WHERE ?1 IS NULL OR l.code = ?1
            ORDER BY l.code, p.name
            "#,
        )?;

        let packs = stmt
            .query_map([language_code], Self::row_to_pack)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(packs)
    }
}

// ========== Sentence Operations ==========

impl SentenceStore for SqliteStore {
    fn insert_sentences(
        &mut self,
        language_id: i64,
        pack_id: i64,
        drafts: &[SentenceDraft],
        on_inserted: &mut dyn FnMut(usize),
    ) -> Result<usize> {
        // Take the write lock up front; a deferred upgrade can fail with SQLITE_BUSY
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO sentences
                    (language_id, pack_id, order_index, manifest_index, text, translation, ipa, romanization)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(pack_id, order_index) DO UPDATE SET
                    manifest_index = excluded.manifest_index,
                    text = excluded.text,
                    translation = excluded.translation,
                    ipa = excluded.ipa,
                    romanization = excluded.romanization,
                    audio_path = NULL
                "#,
            )?;

            for (position, draft) in drafts.iter().enumerate() {
                stmt.execute(params![
                    language_id,
                    pack_id,
                    position as u32,
                    draft.manifest_index,
                    draft.text,
                    draft.translation,
                    draft.ipa,
                    draft.romanization,
                ])?;
                on_inserted(position + 1);
            }
        }
        // Rows past the end of a shorter manifest belong to an earlier import
        let stale = tx.execute(
            "DELETE FROM sentences WHERE pack_id = ?1 AND order_index >= ?2",
            params![pack_id, drafts.len() as u32],
        )?;
        if stale > 0 {
            tracing::debug!("Removed {} stale sentences from pack {}", stale, pack_id);
        }
        tx.commit()?;
        Ok(drafts.len())
    }

    fn set_sentence_audio(&self, pack_id: i64, manifest_index: u32, audio_path: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE sentences SET audio_path = ?3 WHERE pack_id = ?1 AND manifest_index = ?2",
            params![pack_id, manifest_index, audio_path],
        )?;
        Ok(changed > 0)
    }

    fn list_sentences(&self, pack_id: i64) -> Result<Vec<Sentence>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, language_id, pack_id, order_index, manifest_index, text,
                   translation, ipa, romanization, audio_path
            FROM sentences WHERE pack_id = ?1 ORDER BY order_index
            "#,
        )?;

        let sentences = stmt
            .query_map([pack_id], Self::row_to_sentence)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(sentences)
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub languages: usize,
    pub packs: usize,
    pub sentences: usize,
    pub sentences_with_audio: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Languages: {}", self.languages)?;
        writeln!(f, "  Packs: {}", self.packs)?;
        writeln!(f, "  Sentences: {}", self.sentences)?;
        writeln!(f, "  With audio: {}", self.sentences_with_audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drafts(texts: &[&str]) -> Vec<SentenceDraft> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| SentenceDraft::new(i as u32 + 1, *t))
            .collect()
    }

    #[test]
    fn test_get_or_create_language_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();

        let first = store.get_or_create_language("en", "English").unwrap();
        let second = store.get_or_create_language("en", "Something else").unwrap();

        assert_eq!(first, second);
        assert_eq!(second.name, "English");
        assert_eq!(store.count_languages().unwrap(), 1);
        assert_eq!(store.find_language_by_code("en").unwrap(), Some(first));
        assert!(store.find_language_by_code("de").unwrap().is_none());
    }

    #[test]
    fn test_get_or_create_pack() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.get_or_create_language("en", "English").unwrap();
        store.get_or_create_language("es", "Spanish").unwrap();

        let en = store.get_or_create_pack("basics", "en").unwrap().unwrap();
        let again = store.get_or_create_pack("basics", "en").unwrap().unwrap();
        let es = store.get_or_create_pack("basics", "es").unwrap().unwrap();

        assert_eq!(en, again);
        assert_ne!(en.id, es.id);
        assert_eq!(en.language_code, "en");
        assert_eq!(store.count_packs().unwrap(), 2);
        assert_eq!(
            store.find_pack_by_name_and_language("basics", "es").unwrap(),
            Some(es)
        );
        assert_eq!(store.list_packs(Some("en")).unwrap().len(), 1);
        assert_eq!(store.list_packs(None).unwrap().len(), 2);
    }

    #[test]
    fn test_pack_without_language() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.get_or_create_pack("basics", "fr").unwrap().is_none());
        assert_eq!(store.count_packs().unwrap(), 0);
    }

    #[test]
    fn test_insert_sentences_in_order() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let language = store.get_or_create_language("en", "English").unwrap();
        let pack = store.get_or_create_pack("basics", "en").unwrap().unwrap();

        let mut seen = Vec::new();
        let inserted = store
            .insert_sentences(language.id, pack.id, &drafts(&["Hello", "World", "Again"]), &mut |n| {
                seen.push(n)
            })
            .unwrap();

        assert_eq!(inserted, 3);
        assert_eq!(seen, vec![1, 2, 3]);
        let sentences = store.list_sentences(pack.id).unwrap();
        let texts: Vec<_> = sentences.iter().map(|s| (s.order_index, s.text.as_str())).collect();
        assert_eq!(texts, vec![(0, "Hello"), (1, "World"), (2, "Again")]);
    }

    #[test]
    fn test_reinsert_replaces_rows() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let language = store.get_or_create_language("en", "English").unwrap();
        let pack = store.get_or_create_pack("basics", "en").unwrap().unwrap();

        store.insert_sentences(language.id, pack.id, &drafts(&["Hello", "World"]), &mut |_| {}).unwrap();
        store.insert_sentences(language.id, pack.id, &drafts(&["Hi", "World"]), &mut |_| {}).unwrap();

        let sentences = store.list_sentences(pack.id).unwrap();
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].text, "Hi");
    }

    #[test]
    fn test_shorter_reinsert_drops_tail_and_audio() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let language = store.get_or_create_language("en", "English").unwrap();
        let pack = store.get_or_create_pack("basics", "en").unwrap().unwrap();

        store.insert_sentences(language.id, pack.id, &drafts(&["A", "B", "C"]), &mut |_| {}).unwrap();
        for index in 1..=3 {
            assert!(store.set_sentence_audio(pack.id, index, "/media/old.mp3").unwrap());
        }
        store.insert_sentences(language.id, pack.id, &drafts(&["X", "Y"]), &mut |_| {}).unwrap();

        let sentences = store.list_sentences(pack.id).unwrap();
        let rows: Vec<_> = sentences
            .iter()
            .map(|s| (s.text.as_str(), s.audio_path.is_some()))
            .collect();
        assert_eq!(rows, vec![("X", false), ("Y", false)]);
        assert_eq!(store.stats().unwrap().sentences_with_audio, 0);
    }

    #[test]
    fn test_set_sentence_audio() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let language = store.get_or_create_language("en", "English").unwrap();
        let pack = store.get_or_create_pack("basics", "en").unwrap().unwrap();
        store.insert_sentences(language.id, pack.id, &drafts(&["Hello"]), &mut |_| {}).unwrap();

        assert!(store.set_sentence_audio(pack.id, 1, "/media/1/1/0001.mp3").unwrap());
        assert!(!store.set_sentence_audio(pack.id, 7, "/media/1/1/0007.mp3").unwrap());

        let stats = store.stats().unwrap();
        assert_eq!(stats.sentences, 1);
        assert_eq!(stats.sentences_with_audio, 1);
    }

    #[test]
    fn test_concurrent_get_or_create_on_file_db() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("natibo.db");
        SqliteStore::open(&db).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || {
                    let store = SqliteStore::open(&db).unwrap();
                    store.get_or_create_language("ja", "Japanese").unwrap().id
                })
            })
            .collect();
        let ids: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(SqliteStore::open(&db).unwrap().count_languages().unwrap(), 1);
    }
}
