//! String manipulation utilities

/// Pluralize a word based on count
pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

/// Escape a string for use inside a double-quoted DOT identifier or label
pub fn escape_dot(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("cycle", 0), "cycles");
        assert_eq!(pluralize("cycle", 1), "cycle");
        assert_eq!(pluralize("node", 5), "nodes");
    }

    #[test]
    fn test_escape_dot() {
        assert_eq!(escape_dot(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_dot("a\\b"), "a\\\\b");
        assert_eq!(escape_dot("two\nlines"), "two\\nlines");
    }
}
