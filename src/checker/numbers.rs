//! Numeric-sequence expectations.
//!
//! Both the expected text and the program output are reduced to the list of
//! numbers they contain. Integers compare exactly; as soon as one side of a
//! pair is not an integer the pair compares with a relative tolerance.

const TOLERANCE: f64 = 0.0001;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    fn parse(token: &str) -> Option<Number> {
        if token.is_empty() || !token.starts_with(is_num_start) || !token.chars().all(is_num) {
            return None;
        }
        if let Ok(value) = token.parse::<i64>() {
            return Some(Number::Integer(value));
        }
        if token == "." {
            return None;
        }
        token.parse::<f64>().ok().map(Number::Float)
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Integer(v) => v as f64,
            Number::Float(v) => v,
        }
    }

    /// `self` is the expected value.
    fn accepts(self, found: Number) -> bool {
        match (self, found) {
            (Number::Integer(a), Number::Integer(b)) => a == b,
            _ => {
                let (a, b) = (self.as_f64(), found.as_f64());
                if a != 0.0 {
                    ((a - b) / a).abs() < TOLERANCE
                } else {
                    b.abs() < TOLERANCE
                }
            }
        }
    }
}

fn is_num(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')
}

fn is_num_start(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '+' | '-' | '.')
}

/// Every number in `text`, in order. Runs that do not parse are skipped.
fn tokenize(text: &str) -> Vec<Number> {
    let mut numbers = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if (is_num(c) && !current.is_empty()) || (is_num_start(c) && current.is_empty()) {
            current.push(c);
        } else if !current.is_empty() {
            numbers.extend(Number::parse(&current));
            current.clear();
        }
    }
    numbers.extend(Number::parse(&current));
    numbers
}

#[derive(Debug, Clone)]
pub struct NumbersOutput {
    numbers: Vec<Number>,
    anchored: bool,
    clean: String,
}

impl NumbersOutput {
    /// Every run of characters other than whitespace and `*` is a number.
    pub fn is_shape(text: &str) -> bool {
        text.split(|c: char| c.is_ascii_whitespace() || c == '*')
            .filter(|run| !run.is_empty())
            .all(|run| Number::parse(run).is_some())
    }

    pub fn new(text: &str) -> Self {
        let start = text.trim_start_matches(|c: char| c.is_ascii_whitespace());
        let (anchored, clean) = match start.strip_prefix('*') {
            Some(rest) => (true, rest),
            None => (false, start),
        };
        Self {
            numbers: tokenize(text),
            anchored,
            clean: clean.to_string(),
        }
    }

    /// Expected text without the leading anchor.
    pub fn expected(&self) -> &str {
        &self.clean
    }

    pub fn matches(&self, output: &str) -> bool {
        let found = tokenize(output);
        if found.len() < self.numbers.len() {
            return false;
        }
        let offset = if self.anchored {
            found.len() - self.numbers.len()
        } else {
            0
        };
        self.numbers
            .iter()
            .zip(&found[offset..])
            .all(|(expected, got)| expected.accepts(*got))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape() {
        assert!(NumbersOutput::is_shape("1 2.5 -3 1e5"));
        assert!(NumbersOutput::is_shape("* 7\n"));
        assert!(NumbersOutput::is_shape(""));
        assert!(!NumbersOutput::is_shape("7 apples"));
        assert!(!NumbersOutput::is_shape("."));
        assert!(!NumbersOutput::is_shape("+inf"));
    }

    #[test]
    fn test_tokenize_skips_words() {
        let m = NumbersOutput::new("7");
        assert!(m.matches("result: 7\n"));
        assert_eq!(
            tokenize("x=1, y=-2.5"),
            vec![Number::Integer(1), Number::Float(-2.5)]
        );
    }

    #[test]
    fn test_tolerance() {
        let m = NumbersOutput::new("7");
        assert!(m.matches("result: 7.0001"));
        assert!(!m.matches("8"));
        assert!(!m.matches("7.01"));

        let zero = NumbersOutput::new("0.0");
        assert!(zero.matches("0.00001"));
        assert!(!zero.matches("0.001"));
    }

    #[test]
    fn test_integers_compare_exactly() {
        let m = NumbersOutput::new("100000");
        assert!(!m.matches("100001"));
    }

    #[test]
    fn test_prefix_and_anchored_suffix() {
        let prefix = NumbersOutput::new("1 2");
        assert!(prefix.matches("1 2 3"));
        assert!(!prefix.matches("0 1 2"));

        let suffix = NumbersOutput::new("* 2 3");
        assert_eq!(suffix.expected(), " 2 3");
        assert!(suffix.matches("1 2 3"));
        assert!(!suffix.matches("2 3 4"));
    }

    #[test]
    fn test_shorter_output_never_matches() {
        let m = NumbersOutput::new("1 2 3");
        assert!(!m.matches("1 2"));
    }
}
