pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::{state_icon, Icons};
pub use output::{accent, error, header, info, muted, section, status, success, summary_row, warn};
pub use progress::{ImportProgress, ProgressManager};
pub use table::{language_table, pack_table, sentence_table, stats_table, TableBuilder};
pub use theme::{theme, Theme};
