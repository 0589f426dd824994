//! Splits an `A<n>` response payload into whitespace-separated tokens.

/// Splits `payload` on spaces and newlines, stopping at the first empty
/// token (a run of consecutive separators, or trailing separator, ends the
/// scan rather than producing `""` entries).
pub fn tokenize(payload: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(payload);
    let mut tokens = Vec::new();
    for piece in text.split(|c: char| c == ' ' || c == '\n') {
        if piece.is_empty() {
            break;
        }
        tokens.push(piece.to_string());
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_space_and_newline() {
        assert_eq!(
            tokenize(b"AS1 AS2\nAS3"),
            vec!["AS1".to_string(), "AS2".to_string(), "AS3".to_string()]
        );
    }

    #[test]
    fn stops_at_first_empty_token() {
        assert_eq!(tokenize(b"AS1  AS2"), vec!["AS1".to_string()]);
        assert_eq!(tokenize(b"AS1\n\nAS2"), vec!["AS1".to_string()]);
    }

    #[test]
    fn trailing_separator_yields_no_trailing_empty() {
        assert_eq!(tokenize(b"AS1 AS2 "), vec!["AS1".to_string(), "AS2".to_string()]);
    }

    #[test]
    fn empty_payload_yields_no_tokens() {
        assert!(tokenize(b"").is_empty());
    }
}
