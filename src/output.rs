use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// `NATIBO_QUIET=1` silences progress and informational output. Errors still print.
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("NATIBO_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}
