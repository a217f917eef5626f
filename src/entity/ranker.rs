//! Candidate ranking and width-bounded selection for one article.

use std::collections::HashMap;

use super::{normalize_key, promote_persons, Candidate, EntityType, Span};

/// Fold spans into candidates keyed by normalized text, in first-occurrence order.
///
/// The first span of each key is the representative: it fixes the candidate's
/// surface text, type, token count and completeness.
pub fn tally(spans: &[Span]) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for span in spans {
        let key = normalize_key(&span.text);
        match index.get(&key) {
            Some(&i) => candidates[i].occurrence_count += 1,
            None => {
                index.insert(key.clone(), candidates.len());
                candidates.push(Candidate {
                    key,
                    text: span.text.trim().to_string(),
                    entity_type: span.entity_type,
                    occurrence_count: 1,
                    token_count: span.token_count,
                    is_complete_token: span.is_complete_token,
                });
            }
        }
    }

    candidates
}

/// Pick up to `width` expansion targets from one article's spans.
///
/// Candidates equal to the article's own identity, single-character keys and
/// sub-token fragments are dropped. The rest are ranked by occurrence count
/// (stable, so ties keep text order), persons are re-ordered by
/// [`promote_persons`], and the top `width` are taken. When that cut holds no
/// person but a person exists further down, the best-ranked person takes the
/// last slot.
///
/// Selection happens before title resolution. A selected candidate that later
/// resolves to nothing, or back to the article itself, leaves its slot empty;
/// the caller does not refill it from the remainder.
pub fn select_candidates(spans: &[Span], self_identity: &str, width: usize) -> Vec<Candidate> {
    if width == 0 {
        return Vec::new();
    }

    let self_key = normalize_key(self_identity);
    let mut ranked: Vec<Candidate> = tally(spans)
        .into_iter()
        .filter(|c| is_admissible(c, &self_key))
        .collect();

    ranked.sort_by(|a, b| b.occurrence_count.cmp(&a.occurrence_count));
    let ranked = promote_persons(ranked);

    let cut = width.min(ranked.len());
    let mut selected: Vec<Candidate> = ranked[..cut].to_vec();

    if !selected.iter().any(|c| c.entity_type.is_person()) {
        if let Some(person) = ranked[cut..].iter().find(|c| c.entity_type.is_person()) {
            selected.pop();
            selected.push(person.clone());
        }
    }

    selected
}

fn is_admissible(candidate: &Candidate, self_key: &str) -> bool {
    candidate.is_complete_token
        && candidate.key.chars().count() > 1
        && candidate.key != self_key
}

/// Most frequent tag among spans naming the article itself (first seen wins ties).
pub fn infer_self_type(spans: &[Span], self_identity: &str) -> Option<EntityType> {
    let self_key = normalize_key(self_identity);
    let mut counts: Vec<(EntityType, usize)> = Vec::new();

    for span in spans.iter().filter(|s| normalize_key(&s.text) == self_key) {
        match counts.iter_mut().find(|(t, _)| *t == span.entity_type) {
            Some((_, n)) => *n += 1,
            None => counts.push((span.entity_type, 1)),
        }
    }

    let mut best: Option<(EntityType, usize)> = None;
    for (t, n) in counts {
        if best.map_or(true, |(_, m)| n > m) {
            best = Some((t, n));
        }
    }
    best.map(|(t, _)| t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(text: &str) -> Span {
        Span::new(text, EntityType::Person)
    }

    fn org(text: &str) -> Span {
        Span::new(text, EntityType::Organization)
    }

    fn repeat(span: Span, n: usize) -> Vec<Span> {
        std::iter::repeat(span).take(n).collect()
    }

    fn keys(selected: &[Candidate]) -> Vec<&str> {
        selected.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_tally_groups_by_normalized_key() {
        let spans = vec![
            person("Paul McCartney"),
            org("Apple Corps"),
            person("paul  mccartney"),
            person("Paul McCartney"),
        ];
        let candidates = tally(&spans);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].key, "paul mccartney");
        assert_eq!(candidates[0].text, "Paul McCartney");
        assert_eq!(candidates[0].occurrence_count, 3);
        assert_eq!(candidates[0].token_count, 2);
        assert_eq!(candidates[1].occurrence_count, 1);
    }

    #[test]
    fn test_empty_spans_yield_empty_selection() {
        assert!(select_candidates(&[], "Steve Jobs", 3).is_empty());
    }

    #[test]
    fn test_zero_width_selects_nothing() {
        let spans = vec![person("Steve Wozniak")];
        assert!(select_candidates(&spans, "Steve Jobs", 0).is_empty());
    }

    #[test]
    fn test_self_identity_filtered() {
        let mut spans = repeat(person("Steve Jobs"), 10);
        spans.push(person("Steve Wozniak"));
        let selected = select_candidates(&spans, "Steve Jobs", 2);
        assert_eq!(keys(&selected), vec!["Steve Wozniak"]);
    }

    #[test]
    fn test_single_character_keys_filtered() {
        let mut spans = repeat(org("X"), 5);
        spans.push(person("Ringo Starr"));
        let selected = select_candidates(&spans, "The Beatles", 2);
        assert_eq!(keys(&selected), vec!["Ringo Starr"]);
    }

    #[test]
    fn test_fragments_never_selected() {
        let mut spans = repeat(person("##cartney").fragment(), 20);
        spans.push(person("George Harrison"));
        let selected = select_candidates(&spans, "The Beatles", 5);
        assert_eq!(keys(&selected), vec!["George Harrison"]);
        assert!(selected.iter().all(|c| c.is_complete_token));
    }

    #[test]
    fn test_ranked_by_count_with_stable_ties() {
        let mut spans = vec![
            org("Apple Inc."),
            person("Steve Wozniak"),
            org("Pixar"),
            person("Laurene Powell"),
        ];
        spans.extend(repeat(org("NeXT"), 3));
        let selected = select_candidates(&spans, "Steve Jobs", 3);
        // NeXT leads on count; the rest tie at one and keep text order.
        assert_eq!(keys(&selected), vec!["NeXT", "Apple Inc.", "Steve Wozniak"]);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let mut spans = Vec::new();
        for name in ["Yoko Ono", "Cynthia Lennon", "Julian Lennon", "Sean Lennon"] {
            spans.push(person(name));
            spans.push(org("EMI"));
        }
        let first = select_candidates(&spans, "John Lennon", 3);
        for _ in 0..10 {
            assert_eq!(select_candidates(&spans, "John Lennon", 3), first);
        }
    }

    #[test]
    fn test_width_bound() {
        let spans: Vec<Span> = (0..20).map(|i| person(&format!("Person Number{}", i))).collect();
        for width in 1..8 {
            assert!(select_candidates(&spans, "Someone Else", width).len() <= width);
        }
    }

    #[test]
    fn test_multi_token_person_promoted_over_surname() {
        let mut spans = repeat(person("Lennon"), 5);
        spans.extend(repeat(person("John Lennon"), 2));
        let selected = select_candidates(&spans, "Yoko Ono", 1);
        assert_eq!(keys(&selected), vec!["John Lennon"]);
    }

    #[test]
    fn test_person_takes_last_slot_when_cut_has_none() {
        let mut spans = repeat(org("Apple Records"), 6);
        spans.extend(repeat(org("EMI"), 5));
        spans.extend(repeat(org("Abbey Road Studios"), 4));
        spans.push(person("George Martin"));
        let selected = select_candidates(&spans, "The Beatles", 2);
        assert_eq!(keys(&selected), vec!["Apple Records", "George Martin"]);
    }

    #[test]
    fn test_no_person_falls_back_to_top_n() {
        let mut spans = repeat(org("Apple Records"), 3);
        spans.extend(repeat(org("EMI"), 2));
        spans.push(Span::new("Liverpool", EntityType::Location));
        let selected = select_candidates(&spans, "The Beatles", 2);
        assert_eq!(keys(&selected), vec!["Apple Records", "EMI"]);
    }

    #[test]
    fn test_partial_selection_when_few_candidates() {
        let spans = vec![person("Brian Epstein")];
        let selected = select_candidates(&spans, "The Beatles", 4);
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_infer_self_type() {
        let spans = vec![
            org("Steve Jobs"),
            person("Steve Jobs"),
            person("steve jobs"),
            org("Apple Inc."),
        ];
        assert_eq!(infer_self_type(&spans, "Steve Jobs"), Some(EntityType::Person));
        assert_eq!(infer_self_type(&spans, "Tim Cook"), None);
    }

    #[test]
    fn test_infer_self_type_tie_keeps_first() {
        let spans = vec![org("Apple"), person("Apple")];
        assert_eq!(infer_self_type(&spans, "Apple"), Some(EntityType::Organization));
    }
}
