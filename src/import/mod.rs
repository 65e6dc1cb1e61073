//! Pack import pipeline
//!
//! extract name -> resolve language/pack -> count audio -> parse manifest
//! -> persist sentences -> copy audio, reporting progress to listeners.

pub mod naming;
pub mod manifest;
pub mod media;
pub mod listener;
pub mod state;
pub mod pipeline;
pub mod worker;

pub use naming::extract_language_and_pack_name;
pub use manifest::{parse_sentences, SentenceDrafts};
pub use listener::{ChannelListener, ImportEvent, ImportListener, ListenerId, Listeners};
pub use state::{ImportJob, ImportState, InvalidTransition};
pub use pipeline::{ImportOptions, ImportOutcome, ImportReport, PackImportPipeline};
pub use worker::{ImportHandle, ImportWorker};

/// Failures the pipeline reports to its listeners.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    #[error("Malformed pack name: {0}")]
    MalformedName(String),

    #[error("Unable to create language with code: {0}")]
    LanguageCreationFailed(String),

    #[error("Unable to create pack: {0}")]
    PackCreationFailed(String),

    #[error("Unreadable source: {0}")]
    UnreadableSource(String),

    #[error("Invalid pack archive: {0}")]
    InvalidArchive(String),

    #[error("Malformed manifest: {0}")]
    MalformedManifest(String),
}

impl ImportError {
    /// Stable identifier for machine-readable output
    pub fn kind(&self) -> &'static str {
        match self {
            ImportError::MalformedName(_) => "malformed_name",
            ImportError::LanguageCreationFailed(_) => "language_creation_failed",
            ImportError::PackCreationFailed(_) => "pack_creation_failed",
            ImportError::UnreadableSource(_) => "unreadable_source",
            ImportError::InvalidArchive(_) => "invalid_archive",
            ImportError::MalformedManifest(_) => "malformed_manifest",
        }
    }
}
