//! Choosing one alternative from a disambiguation page.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use super::sections::strip_excluded_sections;

/// Alternatives that point at name lists or other disambiguation pages.
const EXCLUDED_QUALIFIERS: &[&str] = &["(name)", "(surname)", "(given name)", "(disambiguation)"];

/// Link prefixes that leave the article namespace.
const NON_ARTICLE_PREFIXES: &[&str] = &[
    "category", "file", "image", "media", "template", "help", "portal", "wikipedia",
    "special", "talk", "user", "draft", "module", "wikt", "wiktionary",
];

fn qualifier_regex() -> &'static Regex {
    static QUALIFIER: OnceLock<Regex> = OnceLock::new();
    QUALIFIER.get_or_init(|| Regex::new(r"^.* \((?P<hint>.+)\)$").expect("Invalid regex pattern"))
}

fn wikilink_regex() -> &'static Regex {
    static WIKILINK: OnceLock<Regex> = OnceLock::new();
    WIKILINK.get_or_init(|| {
        Regex::new(r"\[\[(?P<target>[^\]\|#]+)(?:#[^\]\|]*)?(?:\|[^\]]*)?\]\]").expect("Invalid regex pattern")
    })
}

/// Article link targets in `wikitext`, first occurrence order.
///
/// "See also" and the other excluded sections are ignored, as are links into
/// other namespaces (`Category:`, `File:`, `wikt:` and the like).
pub fn links_in_page_order(wikitext: &str) -> Vec<String> {
    let body = strip_excluded_sections(wikitext);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for caps in wikilink_regex().captures_iter(&body) {
        let target = caps["target"].replace('_', " ");
        let target = target.trim();
        if target.is_empty() || target.starts_with(':') || is_non_article(target) {
            continue;
        }
        let mut chars = target.chars();
        let title: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => continue,
        };
        if seen.insert(title.clone()) {
            links.push(title);
        }
    }

    links
}

fn is_non_article(target: &str) -> bool {
    target
        .split_once(':')
        .is_some_and(|(prefix, _)| NON_ARTICLE_PREFIXES.contains(&prefix.trim().to_lowercase().as_str()))
}

fn is_excluded(alternative: &str) -> bool {
    EXCLUDED_QUALIFIERS.iter().any(|q| alternative.contains(q))
}

/// Pick the alternative whose parenthesized qualifier occurs most often in `hint_text`.
///
/// `"George Harrison (musician)"` scores the occurrences of `musician` in the
/// referring article. Without a hint, or when no qualifier scores above zero,
/// the first non-excluded alternative is returned.
pub fn choose_alternative<'a>(alternatives: &'a [String], hint_text: Option<&str>) -> Option<&'a str> {
    let mut best: Option<&str> = None;
    let mut max_count = 0;

    if let Some(hint_text) = hint_text {
        for alternative in alternatives.iter().filter(|a| !is_excluded(a)) {
            let Some(caps) = qualifier_regex().captures(alternative) else {
                continue;
            };
            let count = hint_text.matches(&caps["hint"]).count();
            if count > max_count {
                max_count = count;
                best = Some(alternative.as_str());
            }
        }
    }

    best.or_else(|| {
        alternatives
            .iter()
            .find(|a| !is_excluded(a))
            .map(String::as_str)
    })
}
