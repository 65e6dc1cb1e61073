//! Record types stored by the importer
//!
//! - `Language`: one row per distinct ISO-639 code
//! - `Pack`: a named sentence collection owned by one language
//! - `Sentence`: one manifest line, ordered within its pack
//! - `SentenceDraft`: a parsed manifest line that has not been stored yet

use serde::{Deserialize, Serialize};

/// A language known to the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: i64,
    /// Lowercase ISO-639 code (`en`, `zh`, `yue`)
    pub code: String,
    /// English display name (`English`)
    pub name: String,
}

/// A content pack belonging to exactly one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pack {
    pub id: i64,
    pub name: String,
    pub language_id: i64,
    pub language_code: String,
}

/// A stored sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    pub id: i64,
    pub language_id: i64,
    pub pack_id: i64,
    /// 0-based position in the manifest
    pub order_index: u32,
    /// Number the manifest itself gives the sentence; pairs it with audio
    pub manifest_index: u32,
    pub text: String,
    pub translation: Option<String>,
    pub ipa: Option<String>,
    pub romanization: Option<String>,
    /// Absolute path of the copied audio file
    pub audio_path: Option<String>,
}

/// A sentence read from a manifest, before it has a pack.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SentenceDraft {
    pub manifest_index: u32,
    pub text: String,
    pub translation: Option<String>,
    pub ipa: Option<String>,
    pub romanization: Option<String>,
}

impl SentenceDraft {
    /// Create a draft with only the required fields
    pub fn new(manifest_index: u32, text: impl Into<String>) -> Self {
        Self {
            manifest_index,
            text: text.into(),
            ..Default::default()
        }
    }
}

impl std::fmt::Display for SentenceDraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}
