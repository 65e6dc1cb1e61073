//! Pack file naming convention: `<code>_<name>.<ext>`
//!
//! - `code`: 2-3 ASCII letters, stored lowercase
//! - `name`: anything non-blank, underscores allowed
//! - `ext`: `pack` or `gls`

use crate::locator::Locator;
use super::ImportError;
use regex::Regex;
use std::sync::OnceLock;

/// Accepted pack file extensions
pub const PACK_EXTENSIONS: &[&str] = &["pack", "gls"];

static PACK_FILE_NAME: OnceLock<Regex> = OnceLock::new();

fn pack_file_name_regex() -> &'static Regex {
    PACK_FILE_NAME.get_or_init(|| {
        Regex::new(r"^(?P<code>[A-Za-z]{2,3})_(?P<name>.+)\.(?P<ext>[A-Za-z]+)$")
            .expect("pack file name pattern is valid")
    })
}

/// Pull the language code and pack name out of a locator's file name.
pub fn extract_language_and_pack_name(locator: &Locator) -> Result<(String, String), ImportError> {
    let file_name = locator
        .file_name()
        .map_err(|e| ImportError::MalformedName(e.to_string()))?;
    parse_pack_file_name(&file_name)
}

/// Parse a bare file name such as `en_basics.pack`
pub fn parse_pack_file_name(file_name: &str) -> Result<(String, String), ImportError> {
    let malformed = || {
        ImportError::MalformedName(format!(
            "'{}' does not match <language>_<pack>.pack",
            file_name
        ))
    };

    let caps = pack_file_name_regex().captures(file_name).ok_or_else(malformed)?;

    let ext = caps["ext"].to_ascii_lowercase();
    if !PACK_EXTENSIONS.contains(&ext.as_str()) {
        return Err(malformed());
    }

    let name = &caps["name"];
    if name.trim().is_empty() || name.contains(['/', '\\']) {
        return Err(malformed());
    }

    Ok((caps["code"].to_ascii_lowercase(), name.to_string()))
}

/// File name a pack is expected to carry
pub fn pack_file_name(language_code: &str, pack_name: &str) -> String {
    format!("{}_{}.pack", language_code, pack_name)
}
