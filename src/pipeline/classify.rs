use crate::model::{ClassifiedCandidate, MetricCandidate};
use crate::schema::{CompiledSector, MetricDefinition, SchemaConfig};

pub const SECTOR_UNKNOWN: &str = "unknown";
pub const METRIC_UNCLASSIFIED: &str = "unclassified";

const SECTOR_SCORE_FLOOR: f64 = 0.1;

/// Assigns sector and metric-type labels from the run's schema tables.
/// Deterministic and keyword/pattern/range based; no match is not an error,
/// the candidate proceeds as `unclassified`.
pub fn classify(candidate: MetricCandidate, config: &SchemaConfig) -> ClassifiedCandidate {
    let context_lower = candidate.context.to_lowercase();

    let (sector, sector_confidence) = pick_sector(&candidate.context, &context_lower, config);
    let metric_type = pick_metric_type(&candidate, &context_lower, config);

    ClassifiedCandidate {
        candidate,
        metric_type,
        sector,
        sector_confidence,
    }
}

fn pick_sector(context: &str, context_lower: &str, config: &SchemaConfig) -> (String, f64) {
    let mut best: Option<(&str, f64)> = None;

    for sector in &config.sectors {
        let score = sector_score(sector, context, context_lower, config);
        let better = match best {
            Some((_, best_score)) => score > best_score,
            None => true,
        };
        if better {
            best = Some((&sector.def.sector, score));
        }
    }

    match best {
        Some((sector, score)) if score >= SECTOR_SCORE_FLOOR => {
            (sector.to_string(), score.min(1.0))
        }
        Some((_, score)) => (SECTOR_UNKNOWN.to_string(), score.min(1.0)),
        None => (SECTOR_UNKNOWN.to_string(), 0.0),
    }
}

fn sector_score(
    sector: &CompiledSector,
    context: &str,
    context_lower: &str,
    config: &SchemaConfig,
) -> f64 {
    let keyword_fraction = fraction_matched(&sector.def.keywords, context_lower);

    let pattern_fraction = if sector.patterns.is_empty() {
        0.0
    } else {
        let matched = sector
            .patterns
            .iter()
            .filter(|pattern| pattern.is_match(context))
            .count();
        matched as f64 / sector.patterns.len() as f64
    };

    let entity_bonus = if sector
        .def
        .entities
        .iter()
        .any(|entity| context_lower.contains(&entity.to_lowercase()))
    {
        1.0
    } else {
        0.0
    };

    let hint_bonus = if config
        .entity_hints
        .iter()
        .any(|(entity, hinted)| hinted == &sector.def.sector && context_lower.contains(entity))
    {
        1.0
    } else {
        0.0
    };

    0.4 * keyword_fraction + 0.3 * pattern_fraction + 0.2 * entity_bonus + 0.1 * hint_bonus
}

fn fraction_matched(keywords: &[String], context_lower: &str) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let matched = keywords
        .iter()
        .filter(|keyword| context_lower.contains(keyword.to_lowercase().as_str()))
        .count();
    matched as f64 / keywords.len() as f64
}

fn pick_metric_type(
    candidate: &MetricCandidate,
    context_lower: &str,
    config: &SchemaConfig,
) -> String {
    // A publisher pattern's declared type wins when its schema still agrees.
    if let Some(hint) = candidate.metric_type_hint.as_deref()
        && let Some(def) = config.metric_definition(hint)
        && definition_matches(def, candidate, context_lower)
    {
        return hint.to_string();
    }

    for def in &config.metrics {
        if definition_matches(def, candidate, context_lower) {
            return def.metric_type.clone();
        }
    }

    METRIC_UNCLASSIFIED.to_string()
}

fn definition_matches(
    def: &MetricDefinition,
    candidate: &MetricCandidate,
    context_lower: &str,
) -> bool {
    if def.invalid_units.iter().any(|unit| unit == &candidate.unit) {
        return false;
    }

    let Some((min, max)) = def.range_for(&candidate.unit) else {
        return false;
    };
    if candidate.value < min || candidate.value > max {
        return false;
    }

    let required_present = def
        .required_context
        .iter()
        .any(|keyword| context_lower.contains(keyword.to_lowercase().as_str()));
    if !required_present {
        return false;
    }

    let excluded_present = def
        .excluded_context
        .iter()
        .any(|keyword| context_lower.contains(keyword.to_lowercase().as_str()));

    !excluded_present
}
