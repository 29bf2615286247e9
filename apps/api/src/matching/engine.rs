//! Match engine: filters, scores and orders job postings for a query.
//!
//! Pure and synchronous: no I/O, no shared state. Safe to call from any thread.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::matching::query::MatchQuery;
use crate::models::posting::JobPosting;

static INTEGER_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("integer pattern is valid"));

/// A posting plus its relevance to the predicted skill set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPosting {
    #[serde(flatten)]
    pub posting: JobPosting,
    pub match_percentage: f64, // 0 – 100
    pub skill_match_count: usize,
}

/// Ranks `corpus` against `query`.
///
/// Algorithm:
/// 1. Base filter: location (when set) and exact experience years (when set)
/// 2. Title filter over the base set: case-insensitive substring of the
///    trimmed search text (empty text matches everything)
/// 3. Skill filter over the base set: any overlap with the predicted skills,
///    only when the predicted skill set is non-empty
/// 4. Title result wins if non-empty; otherwise the skill result, even if empty
/// 5. match_percentage = |overlap| / |predicted| × 100 (0 without skills)
/// 6. Stable sort: match_percentage desc, skill_match_count desc, corpus order
pub fn rank(corpus: &[JobPosting], query: &MatchQuery) -> Vec<RankedPosting> {
    let location = query
        .location
        .as_deref()
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty());

    let base: Vec<&JobPosting> = corpus
        .iter()
        .filter(|p| matches_location(p, location.as_deref()))
        .filter(|p| matches_experience(p, query.experience_years))
        .collect();

    let needle = query.title.trim().to_lowercase();
    let by_title: Vec<&JobPosting> = base
        .iter()
        .copied()
        .filter(|p| p.title.to_lowercase().contains(&needle))
        .collect();

    let predicted = query
        .prediction
        .as_ref()
        .map(|p| &p.skills)
        .filter(|skills| !skills.is_empty());

    let selected = if !by_title.is_empty() {
        by_title
    } else if let Some(skills) = predicted {
        base.into_iter()
            .filter(|p| skill_overlap(p, skills) > 0)
            .collect()
    } else {
        by_title
    };

    let mut ranked: Vec<RankedPosting> = selected
        .into_iter()
        .map(|posting| score(posting, predicted))
        .collect();

    // sort_by is stable, so equal scores keep newest-first corpus order.
    ranked.sort_by(|a, b| {
        b.match_percentage
            .total_cmp(&a.match_percentage)
            .then_with(|| b.skill_match_count.cmp(&a.skill_match_count))
    });

    ranked
}

/// Effective years of experience a posting asks for: the largest integer in
/// its experience text, or 0 when there is none. Integers too large for u64
/// saturate, so they still dominate the maximum.
pub fn required_experience(experience: Option<&str>) -> u64 {
    experience
        .map(|text| {
            INTEGER_RUN
                .find_iter(text)
                .map(|m| m.as_str().parse::<u64>().unwrap_or(u64::MAX))
                .max()
                .unwrap_or(0)
        })
        .unwrap_or(0)
}

fn matches_location(posting: &JobPosting, wanted: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => posting.locations().any(|l| l.to_lowercase() == wanted),
    }
}

fn matches_experience(posting: &JobPosting, wanted: Option<u32>) -> bool {
    match wanted {
        None => true,
        Some(years) => required_experience(posting.experience.as_deref()) == u64::from(years),
    }
}

fn skill_overlap(posting: &JobPosting, predicted: &BTreeSet<String>) -> usize {
    posting
        .skills
        .iter()
        .filter(|s| predicted.contains(s.as_str()))
        .map(String::as_str)
        .collect::<HashSet<&str>>()
        .len()
}

fn score(posting: &JobPosting, predicted: Option<&BTreeSet<String>>) -> RankedPosting {
    let (match_percentage, skill_match_count) = match predicted {
        Some(skills) => {
            let count = skill_overlap(posting, skills);
            (count as f64 / skills.len() as f64 * 100.0, count)
        }
        None => (0.0, 0),
    };

    RankedPosting {
        posting: posting.clone(),
        match_percentage,
        skill_match_count,
    }
}
