//! Free-text expectations: case-insensitive word tokens.

/// Alphanumeric runs, lower-cased. Non-ASCII characters count as letters.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_ascii() && !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone)]
pub struct TextOutput {
    raw: String,
    tokens: Vec<String>,
}

impl TextOutput {
    pub fn new(text: &str) -> Self {
        Self {
            raw: text.to_string(),
            tokens: tokenize(text),
        }
    }

    pub fn expected(&self) -> &str {
        &self.raw
    }

    /// The expected tokens must appear in order in the output, the last
    /// expected token being the last output token.
    pub fn matches(&self, output: &str) -> bool {
        let found = tokenize(output);
        let (Some(last), Some(found_last)) = (self.tokens.last(), found.last()) else {
            return self.tokens.is_empty();
        };
        if last != found_last {
            return false;
        }
        let mut remaining = found[..found.len() - 1].iter().rev();
        self.tokens[..self.tokens.len() - 1]
            .iter()
            .rev()
            .all(|token| remaining.any(|candidate| candidate == token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("A CAT, and-a DOG!"), vec!["a", "cat", "and", "a", "dog"]);
        assert_eq!(tokenize("añil x"), vec!["añil", "x"]);
    }

    #[test]
    fn test_case_insensitive_suffix_subsequence() {
        let m = TextOutput::new("cat dog");
        assert!(m.matches("A CAT and a DOG"));
        assert!(m.matches("cat dog"));
        assert!(!m.matches("A DOG and a CAT"));
        assert!(!m.matches("cat dog house"));
    }

    #[test]
    fn test_output_shorter_than_expected() {
        let m = TextOutput::new("one two three");
        assert!(!m.matches("two three"));
    }

    #[test]
    fn test_empty_expected_matches_anything() {
        let m = TextOutput::new("  ");
        assert!(m.matches("whatever"));
        assert!(m.matches(""));
    }
}
