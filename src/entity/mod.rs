//! Entity mentions and their per-article aggregates.
//!
//! Spans come from the NER collaborator in text order; the ranker folds them
//! into Candidates keyed by normalized surface text and picks expansion targets.

mod promotion;
mod ranker;

pub use promotion::promote_persons;
pub use ranker::{infer_self_type, select_candidates, tally};

use serde::{Deserialize, Serialize};
use std::fmt;

/// NER tag set. Only `Person` nodes are mined for further candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Misc,
}

impl EntityType {
    /// Map a tagger label (`PER`, `B-ORG`, `GPE`, ...) onto the tag set.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        let bare = label
            .strip_prefix("B-")
            .or_else(|| label.strip_prefix("I-"))
            .unwrap_or(label);
        match bare.to_ascii_uppercase().as_str() {
            "PER" | "PERSON" => EntityType::Person,
            "ORG" | "ORGANIZATION" | "ORGANISATION" => EntityType::Organization,
            "LOC" | "LOCATION" | "GPE" => EntityType::Location,
            _ => EntityType::Misc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Person => "PERSON",
            EntityType::Organization => "ORGANIZATION",
            EntityType::Location => "LOCATION",
            EntityType::Misc => "MISC",
        }
    }

    pub fn is_person(&self) -> bool {
        matches!(self, EntityType::Person)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(EntityType::from_label(s))
    }
}

/// One entity mention in article text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub entity_type: EntityType,
    pub token_count: usize,
    /// False when the tagger boundary falls inside a word (sub-token fragment).
    pub is_complete_token: bool,
}

impl Span {
    /// Complete-token span with the token count taken from whitespace splitting.
    pub fn new(text: impl Into<String>, entity_type: EntityType) -> Self {
        let text = text.into();
        let token_count = count_tokens(&text);
        Self {
            text,
            entity_type,
            token_count,
            is_complete_token: true,
        }
    }

    pub fn fragment(mut self) -> Self {
        self.is_complete_token = false;
        self
    }
}

/// All spans of one article sharing a normalized key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    /// Normalized surface text.
    pub key: String,
    /// Surface text of the first span, used as the lookup query.
    pub text: String,
    pub entity_type: EntityType,
    pub occurrence_count: usize,
    pub token_count: usize,
    #[serde(skip)]
    pub(crate) is_complete_token: bool,
}

impl Candidate {
    pub fn is_multi_token_person(&self) -> bool {
        self.entity_type.is_person() && self.token_count >= 2
    }
}

/// Case-folded, whitespace-collapsed form used for grouping and self-identity checks.
pub fn normalize_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count().max(1)
}
