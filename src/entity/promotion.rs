//! Multi-token person promotion.
//!
//! A lone first name or surname tends to resolve to a disambiguation or name
//! page, so full names are preferred whenever both kinds are present.

use super::Candidate;

/// Re-order the person candidates of an already ranked list.
///
/// The positions held by persons stay person positions; they are refilled with
/// the multi-token persons first and the single-token persons after, each group
/// keeping its ranked order. Non-person candidates do not move.
pub fn promote_persons(ranked: Vec<Candidate>) -> Vec<Candidate> {
    let slots: Vec<usize> = ranked
        .iter()
        .enumerate()
        .filter(|(_, c)| c.entity_type.is_person())
        .map(|(i, _)| i)
        .collect();

    let (multi, single): (Vec<Candidate>, Vec<Candidate>) = slots
        .iter()
        .map(|&i| ranked[i].clone())
        .partition(|c| c.is_multi_token_person());

    let mut out = ranked;
    for (slot, candidate) in slots.into_iter().zip(multi.into_iter().chain(single)) {
        if out[slot].key != candidate.key {
            log::debug!("Promoting {} in place of {}", candidate.text, out[slot].text);
        }
        out[slot] = candidate;
    }
    out
}
