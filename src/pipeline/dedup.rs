use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::{Context, Result};
use regex::Regex;

use crate::model::{DedupedCandidate, ValidatedCandidate};
use crate::pipeline::classify::SECTOR_UNKNOWN;
use crate::schema::UNIT_PERCENT;

const CONTRADICTION_RELATIVE_GAP: f64 = 0.1;

const COMPARATIVE_KEYWORDS: [&str; 6] =
    ["whereas", "compared to", "in contrast", "versus", " vs ", "while "];

/// (metric type, canonical unit, rounded value, year, sector).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticKey {
    pub metric_type: String,
    pub unit: String,
    pub value_scaled: i64,
    pub year: Option<i64>,
    pub sector: String,
}

pub fn semantic_key(candidate: &ValidatedCandidate) -> SemanticKey {
    SemanticKey {
        metric_type: candidate.classified.metric_type.clone(),
        unit: candidate.classified.candidate.unit.clone(),
        value_scaled: scaled_value(
            candidate.classified.candidate.value,
            &candidate.classified.candidate.unit,
        ),
        year: candidate.classified.candidate.year,
        sector: candidate.classified.sector.clone(),
    }
}

/// Percentages round to one decimal, everything else to the nearest integer.
pub fn scaled_value(value: f64, unit: &str) -> i64 {
    if unit == UNIT_PERCENT {
        (value * 10.0).round() as i64
    } else {
        value.round() as i64
    }
}

/// Post-validation confidence used for collision decisions: the method's
/// base confidence attenuated by validation penalties only.
pub fn interim_confidence(candidate: &ValidatedCandidate) -> f64 {
    candidate.classified.candidate.base_confidence * candidate.penalty
}

#[derive(Debug, Default)]
pub struct DedupOutcome {
    pub kept: Vec<DedupedCandidate>,
    /// (merged candidate id, winning candidate id, merged interim confidence).
    pub merged: Vec<(String, String, f64)>,
    pub duplicate_groups_collapsed: usize,
    pub contradictions_preserved: usize,
}

pub struct Deduplicator {
    range_contrast: Regex,
}

impl Deduplicator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            // Explicit "from X to Y" ranges count as comparative language.
            range_contrast: Regex::new(r"(?i)\bfrom\s+-?\d[\d,]*(?:\.\d+)?%?\s+to\s+-?\d")
                .context("failed to compile range contrast pattern")?,
        })
    }

    /// Collapses candidates on the semantic key, then collapses near-equal
    /// values within (type, unit, year, sector) groups as measurement noise.
    /// Divergent values survive only under documented contrast. Input order
    /// must be the generator's (page, offset) order; the outcome is then
    /// independent of strategy arrival order.
    pub fn dedup(&self, candidates: Vec<ValidatedCandidate>) -> DedupOutcome {
        let mut outcome = DedupOutcome::default();

        // Pass 1: exact semantic-key collapse. Protected candidates bypass
        // duplicate removal entirely.
        let mut groups: Vec<Vec<ValidatedCandidate>> = Vec::new();
        let mut index_by_key: HashMap<SemanticKey, usize> = HashMap::new();

        for candidate in candidates {
            if candidate.protected {
                groups.push(vec![candidate]);
                continue;
            }
            let key = semantic_key(&candidate);
            match index_by_key.get(&key) {
                Some(&index) => groups[index].push(candidate),
                None => {
                    index_by_key.insert(key, groups.len());
                    groups.push(vec![candidate]);
                }
            }
        }

        let mut collapsed: Vec<DedupedCandidate> = Vec::new();
        for group in groups {
            if group.len() > 1 {
                outcome.duplicate_groups_collapsed += 1;
            }
            collapsed.push(collapse_group(group, &mut outcome.merged));
        }

        // Pass 2: noise collapse within (type, unit, year, sector).
        let mut value_groups: Vec<Vec<DedupedCandidate>> = Vec::new();
        let mut index_by_group: HashMap<(String, String, Option<i64>, String), usize> =
            HashMap::new();

        for entry in collapsed {
            if entry.validated.protected {
                value_groups.push(vec![entry]);
                continue;
            }
            let classified = &entry.validated.classified;
            let key = (
                classified.metric_type.clone(),
                classified.candidate.unit.clone(),
                classified.candidate.year,
                classified.sector.clone(),
            );
            match index_by_group.get(&key) {
                Some(&index) => value_groups[index].push(entry),
                None => {
                    index_by_group.insert(key, value_groups.len());
                    value_groups.push(vec![entry]);
                }
            }
        }

        for group in value_groups {
            self.resolve_value_group(group, &mut outcome);
        }

        outcome
            .kept
            .sort_by_key(|entry| position(&entry.validated));
        outcome
    }

    fn resolve_value_group(&self, group: Vec<DedupedCandidate>, outcome: &mut DedupOutcome) {
        if group.len() == 1 {
            outcome.kept.extend(group);
            return;
        }

        let divergent = group.iter().any(|a| {
            group
                .iter()
                .any(|b| relative_gap(value_of(a), value_of(b)) > CONTRADICTION_RELATIVE_GAP)
        });

        if divergent && group.iter().any(|entry| self.has_comparative_language(entry)) {
            // Documented contrast: one survivor per distinct value cluster.
            // Near-equal members inside a cluster still collapse as noise.
            let clusters = cluster_by_value(group);
            outcome.contradictions_preserved += clusters.len();
            for cluster in clusters {
                if cluster.len() > 1 {
                    outcome.duplicate_groups_collapsed += 1;
                }
                outcome
                    .kept
                    .push(collapse_group_deduped(cluster, &mut outcome.merged));
            }
            return;
        }

        // Measurement noise (or undocumented divergence): keep the best.
        outcome.duplicate_groups_collapsed += 1;
        outcome.kept.push(collapse_group_deduped(group, &mut outcome.merged));
    }

    fn has_comparative_language(&self, entry: &DedupedCandidate) -> bool {
        let context = entry.validated.classified.candidate.context.to_lowercase();
        COMPARATIVE_KEYWORDS
            .iter()
            .any(|keyword| context.contains(keyword))
            || self.range_contrast.is_match(&context)
    }
}

fn value_of(entry: &DedupedCandidate) -> f64 {
    entry.validated.classified.candidate.value
}

/// Splits a divergent group into clusters of near-equal values. Members
/// within the noise gap of a cluster's anchor join it; anything further
/// out opens a new cluster.
fn cluster_by_value(mut group: Vec<DedupedCandidate>) -> Vec<Vec<DedupedCandidate>> {
    group.sort_by(|a, b| {
        value_of(a)
            .partial_cmp(&value_of(b))
            .unwrap_or(Ordering::Equal)
    });

    let mut clusters: Vec<Vec<DedupedCandidate>> = Vec::new();
    let mut anchor = 0.0_f64;
    for entry in group {
        let value = value_of(&entry);
        match clusters.last_mut() {
            Some(cluster) if relative_gap(anchor, value) <= CONTRADICTION_RELATIVE_GAP => {
                cluster.push(entry);
            }
            _ => {
                anchor = value;
                clusters.push(vec![entry]);
            }
        }
    }
    clusters
}

fn relative_gap(a: f64, b: f64) -> f64 {
    let denom = a.abs().max(b.abs());
    if denom == 0.0 {
        return 0.0;
    }
    (a - b).abs() / denom
}

fn position(candidate: &ValidatedCandidate) -> (i64, usize) {
    (
        candidate.classified.candidate.page,
        candidate.classified.candidate.offset,
    )
}

/// Higher confidence wins; ties break by more agreeing methods, then a
/// non-unknown sector, then earlier document position.
fn better(a: &DedupedCandidate, b: &DedupedCandidate) -> Ordering {
    interim_confidence(&a.validated)
        .partial_cmp(&interim_confidence(&b.validated))
        .unwrap_or(Ordering::Equal)
        .then(a.merged_methods.cmp(&b.merged_methods))
        .then_with(|| {
            let a_known = a.validated.classified.sector != SECTOR_UNKNOWN;
            let b_known = b.validated.classified.sector != SECTOR_UNKNOWN;
            a_known.cmp(&b_known)
        })
        .then_with(|| position(&b.validated).cmp(&position(&a.validated)))
}

fn collapse_group(
    group: Vec<ValidatedCandidate>,
    merged: &mut Vec<(String, String, f64)>,
) -> DedupedCandidate {
    let entries = group
        .into_iter()
        .map(|validated| DedupedCandidate {
            merged_candidate_ids: vec![validated.classified.candidate.candidate_id.clone()],
            merged_methods: 1,
            validated,
        })
        .collect();
    collapse_group_deduped(entries, merged)
}

fn collapse_group_deduped(
    mut group: Vec<DedupedCandidate>,
    merged: &mut Vec<(String, String, f64)>,
) -> DedupedCandidate {
    let mut best_index = 0;
    for index in 1..group.len() {
        if better(&group[index], &group[best_index]) == Ordering::Greater {
            best_index = index;
        }
    }

    let mut winner = group.swap_remove(best_index);
    let winner_id = winner.validated.classified.candidate.candidate_id.clone();

    let mut method_set = vec![winner.validated.classified.candidate.method];
    for loser in group {
        let loser_confidence = interim_confidence(&loser.validated);
        for id in &loser.merged_candidate_ids {
            merged.push((id.clone(), winner_id.clone(), loser_confidence));
        }
        winner
            .merged_candidate_ids
            .extend(loser.merged_candidate_ids);
        let method = loser.validated.classified.candidate.method;
        if !method_set.contains(&method) {
            method_set.push(method);
        }
    }
    winner.merged_methods = method_set.len();

    winner
}
