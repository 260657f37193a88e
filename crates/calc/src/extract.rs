use once_cell::sync::Lazy;
use regex::Regex;

/// The three recognized shapes, scanned in order: binary operator
/// expressions, explicit powers, square roots of a literal.
static PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"\b\d+(?:\.\d+)?\s*[+\-*/^]\s*\d+(?:\.\d+)?\b")
            .expect("valid binary-op pattern"),
        Regex::new(r"\b\d+(?:\.\d+)?\s*\^\s*\d+(?:\.\d+)?\b").expect("valid power pattern"),
        Regex::new(r"√\d+(?:\.\d+)?").expect("valid square-root pattern"),
    ]
});

/// Pull evaluatable arithmetic sub-expressions out of free text, in the order
/// found. A sub-expression matched by more than one pattern is reported once.
pub fn extract_expressions(text: &str) -> Vec<String> {
    let mut found = Vec::new();

    for pattern in PATTERNS.iter() {
        for matched in pattern.find_iter(text) {
            let expression = matched.as_str().to_string();
            if !found.contains(&expression) {
                found.push(expression);
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_binary_expression_with_spacing() {
        assert_eq!(extract_expressions("Calculate 15 * 23"), vec!["15 * 23"]);
    }

    #[test]
    fn finds_multiple_expressions_in_order() {
        let found = extract_expressions("first 2+2, then 10 / 5");
        assert_eq!(found, vec!["2+2", "10 / 5"]);
    }

    #[test]
    fn power_is_reported_once() {
        // Matched by both the binary and the power pattern.
        assert_eq!(extract_expressions("evaluate 2^10 please"), vec!["2^10"]);
    }

    #[test]
    fn finds_square_roots() {
        assert_eq!(extract_expressions("what is √16?"), vec!["√16"]);
    }

    #[test]
    fn plain_prose_yields_nothing() {
        assert!(extract_expressions("solve the quadratic equation").is_empty());
    }
}
