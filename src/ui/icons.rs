/// Icons used in status lines. Pipeline stages each have their own.
pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const EYE: &str = "👀";
    pub const PACKAGE: &str = "📦";
    pub const DATABASE: &str = "🗄️";
    pub const MUSIC: &str = "🎵";
    pub const GLOBE: &str = "🌐";
    pub const SPEECH: &str = "💬";
    pub const FOLDER: &str = "📂";
    pub const HOURGLASS: &str = "⏳";
}

/// Icon shown next to a pipeline state
pub fn state_icon(state: crate::import::ImportState) -> &'static str {
    use crate::import::ImportState;
    match state {
        ImportState::Idle => Icons::HOURGLASS,
        ImportState::ExtractingMetadata => Icons::PACKAGE,
        ImportState::ResolvingRecords => Icons::GLOBE,
        ImportState::ParsingContent | ImportState::PersistingSentences => Icons::SPEECH,
        ImportState::CopyingMedia => Icons::MUSIC,
        ImportState::Completed => Icons::CHECK,
        ImportState::Failed => Icons::CROSS,
    }
}
