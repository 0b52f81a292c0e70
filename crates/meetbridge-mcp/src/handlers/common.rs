//! Small text helpers shared by the formatters.

use meetbridge_google::google::common::NOT_AVAILABLE;

/// Indented `Label: value` line.
pub fn bullet(label: &str, value: impl AsRef<str>) -> String {
    format!("  {}: {}", label, value.as_ref())
}

pub fn or_na(value: Option<&str>) -> &str {
    value.unwrap_or(NOT_AVAILABLE)
}

/// Blocks separated by a blank line.
pub fn join_blocks<I>(blocks: I) -> String
where
    I: IntoIterator<Item = String>,
{
    blocks.into_iter().collect::<Vec<_>>().join("\n\n")
}

/// Truncate to at most `max` characters, marking the cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}... [truncated]", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("héllo wörld", 5), "héllo... [truncated]");
    }

    #[test]
    fn test_bullet_and_blocks() {
        assert_eq!(bullet("Name", "x"), "  Name: x");
        assert_eq!(or_na(None), "N/A");
        assert_eq!(join_blocks(vec!["a".to_string(), "b".to_string()]), "a\n\nb");
    }
}
