/// Canonical lookup key for column headers and category labels: invisible
/// characters dropped, underscores treated as spaces, whitespace collapsed,
/// lowercase.
pub(crate) fn normalize_key(value: &str) -> String {
    let cleaned = value
        .replace(['\u{feff}', '\u{200b}'], "")
        .replace('_', " ");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}

/// Spreadsheet exports frequently wrap cells in stray quotes (`'5-6 hours'`).
pub(crate) fn strip_quotes(value: &str) -> &str {
    value
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .trim()
}

/// `true` when `input` equals `pattern` or starts with it at a word boundary.
pub(crate) fn is_word_prefix(input: &str, pattern: &str) -> bool {
    if pattern.is_empty() || !input.starts_with(pattern) {
        return false;
    }

    input[pattern.len()..]
        .chars()
        .next()
        .map_or(true, |next| !next.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_key_collapses_case_whitespace_and_underscores() {
        assert_eq!(normalize_key("\u{feff}Academic  Pressure"), "academic pressure");
        assert_eq!(normalize_key("academic_pressure"), "academic pressure");
        assert_eq!(normalize_key("  Work/Study Hours "), "work/study hours");
    }

    #[test]
    fn strip_quotes_removes_wrapping_quotes() {
        assert_eq!(strip_quotes("'5-6 hours'"), "5-6 hours");
        assert_eq!(strip_quotes("  \"Healthy\" "), "Healthy");
        assert_eq!(strip_quotes("O'Neil"), "O'Neil");
    }

    #[test]
    fn word_prefix_requires_boundary() {
        assert!(is_word_prefix("poor diet", "poor"));
        assert!(is_word_prefix("poor", "poor"));
        assert!(!is_word_prefix("poorly", "poor"));
        assert!(!is_word_prefix("poor", ""));
    }
}
