//! Terminal output helpers

use serde::Serialize;

/// Print a section header followed by an underline of the same width.
pub fn print_header(title: &str) {
    println!("{title}");
    println!("{}", "-".repeat(title.len()));
}

/// Pretty-print a value as JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) -> crate::error::CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| crate::error::CliError::Config(format!("JSON encoding failed: {e}")))?;
    println!("{text}");
    Ok(())
}

/// Truncate a message for inline display in a table cell.
pub fn truncate(message: &str, max: usize) -> String {
    if message.len() <= max {
        message.to_string()
    } else {
        let mut end = max.saturating_sub(3);
        while end > 0 && !message.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &message[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_leaves_short_messages_alone() {
        assert_eq!(truncate("short", 50), "short");
    }

    #[test]
    fn truncate_appends_ellipsis() {
        let long = "x".repeat(80);
        let cut = truncate(&long, 50);
        assert_eq!(cut.len(), 50);
        assert!(cut.ends_with("..."));
    }
}
