//! # Natibo - content-pack importer
//!
//! Imports language-learning content packs into a local SQLite database.
//!
//! A pack is a zip archive named `<language>_<pack>.pack` that carries:
//! - a tab-separated sentence manifest (`*.gsp` / `*.tsv`)
//! - one numbered audio file per sentence (`EN - Basics - 0001.mp3`)
//!
//! Natibo provides:
//! - Locator parsing for `file://`, `content://` and bare paths
//! - Atomic get-or-create of language and pack records
//! - A staged import pipeline with observer-based progress reporting
//! - A background worker delivering import events over a channel

pub mod locator;
pub mod model;
pub mod languages;
pub mod content;
pub mod archive;
pub mod storage;
pub mod import;
pub mod config;
pub mod watcher;
pub mod output;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenient access
pub use locator::{Locator, Scheme};
pub use model::{Language, Pack, Sentence, SentenceDraft};
pub use storage::SqliteStore;
pub use import::{
    ImportError, ImportEvent, ImportListener, ImportOutcome, ImportReport, ImportState,
    ImportWorker, PackImportPipeline,
};

/// Result type alias for Natibo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Natibo operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    State(#[from] import::InvalidTransition),

    #[error("Import worker failed: {0}")]
    Worker(String),
}
