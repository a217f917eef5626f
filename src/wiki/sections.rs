//! Removal of trailing link/citation sections from plaintext extracts.

use regex::Regex;
use std::sync::OnceLock;

/// Sections dropped before entity extraction; matched case-insensitively.
pub const EXCLUDED_SECTIONS: &[&str] = &["see also", "references", "external links"];

fn heading_regex() -> &'static Regex {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    HEADING.get_or_init(|| {
        Regex::new(r"^(={2,6})\s*(.*?)\s*={2,6}\s*$").expect("Invalid regex pattern")
    })
}

/// Parse a `== Heading ==` line into (level, title).
fn parse_heading(line: &str) -> Option<(usize, &str)> {
    let caps = heading_regex().captures(line.trim())?;
    let level = caps.get(1)?.as_str().len();
    let title = caps.get(2)?.as_str();
    Some((level, title))
}

/// Drop excluded sections and their subsections, keeping everything else verbatim.
pub fn strip_excluded_sections(text: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut skipping_below: Option<usize> = None;

    for line in text.lines() {
        if let Some((level, title)) = parse_heading(line) {
            if let Some(skip_level) = skipping_below {
                if level > skip_level {
                    continue;
                }
                skipping_below = None;
            }
            let lowered = title.to_lowercase();
            if EXCLUDED_SECTIONS.contains(&lowered.as_str()) {
                skipping_below = Some(level);
                continue;
            }
        } else if skipping_below.is_some() {
            continue;
        }
        kept.push(line);
    }

    kept.join("\n").trim_end().to_string()
}
