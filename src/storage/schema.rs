//! Database schema definitions

/// SQL to create the languages table
pub const CREATE_LANGUAGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS languages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL
)
"#;

/// SQL to create the packs table
/// A pack name is unique within its language
pub const CREATE_PACKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS packs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    language_id INTEGER NOT NULL REFERENCES languages(id),
    UNIQUE(language_id, name)
)
"#;

/// SQL to create the sentences table
pub const CREATE_SENTENCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sentences (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    language_id INTEGER NOT NULL REFERENCES languages(id),
    pack_id INTEGER NOT NULL REFERENCES packs(id),
    order_index INTEGER NOT NULL,
    manifest_index INTEGER NOT NULL,
    text TEXT NOT NULL,
    translation TEXT,
    ipa TEXT,
    romanization TEXT,
    audio_path TEXT,
    UNIQUE(pack_id, order_index)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_packs_language ON packs(language_id)",
    "CREATE INDEX IF NOT EXISTS idx_sentences_manifest ON sentences(pack_id, manifest_index)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_LANGUAGES_TABLE,
        CREATE_PACKS_TABLE,
        CREATE_SENTENCES_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
