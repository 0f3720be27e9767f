//! Small text helpers shared by the session store, the resolver and the
//! tools.

const ELLIPSIS: &str = "...";

/// Truncate to at most `max_chars` characters on a char boundary. When
/// something was cut the result ends in `...`, which counts toward the cap.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let room = max_chars.saturating_sub(ELLIPSIS.len());
    if room == 0 {
        return s.chars().take(max_chars).collect();
    }
    let cut: String = s.chars().take(room).collect();
    format!("{}{ELLIPSIS}", cut.trim_end())
}

/// Collapse every run of whitespace (newlines included) into one space.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
