//! One-line node labels from an article's opening sentence.

use regex::Regex;
use std::sync::OnceLock;

const MAX_LABEL_CHARS: usize = 100;

fn copula_regex() -> &'static Regex {
    static COPULA: OnceLock<Regex> = OnceLock::new();
    COPULA.get_or_init(|| {
        Regex::new(r"^.*?(?:is a |is an |was a |was an |was the |is the )(?P<summary>.*?)\.?$")
            .expect("Invalid regex pattern")
    })
}

/// First sentence of `text`: up to the first ". " (or end of first paragraph).
fn first_sentence(text: &str) -> &str {
    let paragraph = text.trim_start().lines().next().unwrap_or("");
    match paragraph.find(". ") {
        Some(end) => &paragraph[..=end],
        None => paragraph,
    }
}

/// `"John Winston Ono Lennon was an English singer..."` -> `"English singer..."`.
pub fn label_from_summary(text: &str) -> Option<String> {
    let sentence = first_sentence(text).trim();
    let caps = copula_regex().captures(sentence)?;
    let summary = caps.name("summary")?.as_str().trim();
    if summary.is_empty() {
        return None;
    }

    if summary.chars().count() > MAX_LABEL_CHARS {
        let truncated: String = summary.chars().take(MAX_LABEL_CHARS).collect();
        Some(format!("{}...", truncated))
    } else {
        Some(summary.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_after_copula() {
        let text = "John Winston Ono Lennon was an English singer and songwriter. He co-founded the Beatles.";
        assert_eq!(
            label_from_summary(text).as_deref(),
            Some("English singer and songwriter")
        );
    }

    #[test]
    fn test_label_uses_first_copula_only() {
        let text = "Yoko Ono is a Japanese artist who was a member of Fluxus.";
        assert_eq!(
            label_from_summary(text).as_deref(),
            Some("Japanese artist who was a member of Fluxus")
        );
    }

    #[test]
    fn test_no_copula() {
        assert_eq!(label_from_summary("Liverpool, England."), None);
        assert_eq!(label_from_summary(""), None);
    }

    #[test]
    fn test_long_label_truncated() {
        let text = format!("X is a {}.", "very ".repeat(40));
        let label = label_from_summary(&text).unwrap();
        assert!(label.ends_with("..."));
        assert_eq!(label.chars().count(), MAX_LABEL_CHARS + 3);
    }
}
