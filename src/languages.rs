use isolang::Language as IsoLanguage;

/// Look up an ISO 639-1 (2-letter) or ISO 639-3 (3-letter) code.
fn lookup(code: &str) -> Option<IsoLanguage> {
    let normalized = code.trim().to_lowercase();
    match normalized.len() {
        2 => IsoLanguage::from_639_1(&normalized),
        3 => IsoLanguage::from_639_3(&normalized),
        _ => None,
    }
}

/// Whether `code` names a known language
pub fn is_known_code(code: &str) -> bool {
    lookup(code).is_some()
}

/// English display name for a language code (`en` -> `English`)
pub fn display_name(code: &str) -> Option<&'static str> {
    lookup(code).map(|lang| lang.to_name())
}
