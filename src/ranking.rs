//! Deterministic ranking of provider candidates
//!
//! Tie-breaks, each consulted only when the previous one is equal:
//! 1. exact match of the normalized city or display name against the query
//! 2. non-US before US (so "Dublin" picks Ireland over Georgia or Ohio)
//! 3. `CITY` before `AIRPORT` before anything else
//!
//! Sorting is stable, so candidates that tie on all three keep the provider's
//! order. Candidates without an IATA code never win.

use std::cmp::Ordering;

use crate::normalize::normalize_key;
use crate::provider::Candidate;

fn is_exact_match(candidate: &Candidate, normalized_query: &str) -> bool {
    let name = normalize_key(candidate.name.as_deref().unwrap_or(""));
    let city = normalize_key(candidate.city_name().unwrap_or(""));
    city == normalized_query || name == normalized_query
}

fn is_us(candidate: &Candidate) -> bool {
    candidate.country_code() == Some("US")
}

fn specificity(candidate: &Candidate) -> u8 {
    match candidate.sub_type.as_deref() {
        Some("CITY") => 2,
        Some("AIRPORT") => 1,
        _ => 0,
    }
}

/// Order two candidates; `Less` means `a` is the better pick
pub fn compare_candidates(a: &Candidate, b: &Candidate, normalized_query: &str) -> Ordering {
    is_exact_match(b, normalized_query)
        .cmp(&is_exact_match(a, normalized_query))
        .then_with(|| is_us(a).cmp(&is_us(b)))
        .then_with(|| specificity(b).cmp(&specificity(a)))
}

/// Sort candidates best-first
pub fn sort_candidates(candidates: &mut [Candidate], normalized_query: &str) {
    candidates.sort_by(|a, b| compare_candidates(a, b, normalized_query));
}

/// Pick the best candidate that carries a code, if any
pub fn rank(mut candidates: Vec<Candidate>, normalized_query: &str) -> Option<Candidate> {
    candidates.retain(|c| !c.iata_code.trim().is_empty());
    sort_candidates(&mut candidates, normalized_query);
    candidates.into_iter().next()
}
