//! Import job state machine
//!
//! ```text
//! Idle -> ExtractingMetadata -> ResolvingRecords -> ParsingContent
//!      -> PersistingSentences -> CopyingMedia -> Completed
//! ```
//!
//! Every non-terminal state may also move to `Failed`.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportState {
    Idle,
    ExtractingMetadata,
    ResolvingRecords,
    ParsingContent,
    PersistingSentences,
    CopyingMedia,
    Completed,
    Failed,
}

impl ImportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportState::Idle => "idle",
            ImportState::ExtractingMetadata => "extracting_metadata",
            ImportState::ResolvingRecords => "resolving_records",
            ImportState::ParsingContent => "parsing_content",
            ImportState::PersistingSentences => "persisting_sentences",
            ImportState::CopyingMedia => "copying_media",
            ImportState::Completed => "completed",
            ImportState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportState::Completed | ImportState::Failed)
    }

    /// The state that follows on success
    pub fn next(&self) -> Option<ImportState> {
        match self {
            ImportState::Idle => Some(ImportState::ExtractingMetadata),
            ImportState::ExtractingMetadata => Some(ImportState::ResolvingRecords),
            ImportState::ResolvingRecords => Some(ImportState::ParsingContent),
            ImportState::ParsingContent => Some(ImportState::PersistingSentences),
            ImportState::PersistingSentences => Some(ImportState::CopyingMedia),
            ImportState::CopyingMedia => Some(ImportState::Completed),
            ImportState::Completed | ImportState::Failed => None,
        }
    }

    pub fn can_transition_to(&self, to: ImportState) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == ImportState::Failed || self.next() == Some(to)
    }
}

impl std::fmt::Display for ImportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid import state transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: ImportState,
    pub to: ImportState,
}

/// Transient bookkeeping for one import run.
#[derive(Debug, Clone)]
pub struct ImportJob {
    pub locator: String,
    pub state: ImportState,
    pub expected_audio_files: Option<usize>,
    pub parsed_sentences: Option<usize>,
    pub last_message: Option<String>,
    history: Vec<ImportState>,
}

impl ImportJob {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            state: ImportState::Idle,
            expected_audio_files: None,
            parsed_sentences: None,
            last_message: None,
            history: vec![ImportState::Idle],
        }
    }

    pub fn transition(&mut self, to: ImportState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(to) {
            return Err(InvalidTransition { from: self.state, to });
        }
        tracing::debug!("Import {}: {} -> {}", self.locator, self.state, to);
        self.state = to;
        self.history.push(to);
        Ok(())
    }

    /// Every state visited, starting with `Idle`
    pub fn history(&self) -> &[ImportState] {
        &self.history
    }
}
