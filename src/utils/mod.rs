pub mod logging;

/// Reads a boolean flag from the environment ("1" or "true", case-insensitive).
pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
