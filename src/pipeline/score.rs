use crate::model::{DedupedCandidate, Route, ScoredCandidate};
use crate::pipeline::classify::METRIC_UNCLASSIFIED;

const CONFIDENCE_CAP: f64 = 0.99;
const SHORT_CONTEXT_CHARS: usize = 50;
const LONG_CONTEXT_CHARS: usize = 200;
const SHORT_CONTEXT_FACTOR: f64 = 0.8;
const LONG_CONTEXT_FACTOR: f64 = 1.1;

#[derive(Debug, Clone, Copy)]
pub struct ScoreThresholds {
    pub min_confidence: f64,
    pub accept_confidence: f64,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            accept_confidence: 0.8,
        }
    }
}

/// Final confidence = method base x validation penalties x sector factor x
/// context-length factor, capped below 1. Routing: below the floor drops the
/// candidate (protected ones go to review instead), at or above the accept
/// threshold auto-accepts, everything else queues for human review.
/// Unclassified candidates never auto-accept; without a matched definition
/// a high score still only earns a review slot.
pub fn score(deduped: DedupedCandidate, thresholds: ScoreThresholds) -> ScoredCandidate {
    let candidate = &deduped.validated.classified.candidate;

    let sector_factor = 0.7 + 0.3 * deduped.validated.classified.sector_confidence;
    let context_factor = context_length_factor(candidate.context.chars().count());

    let final_confidence = (candidate.base_confidence
        * deduped.validated.penalty
        * sector_factor
        * context_factor)
        .clamp(0.0, CONFIDENCE_CAP);

    let unclassified = deduped.validated.classified.metric_type == METRIC_UNCLASSIFIED;
    let route = if final_confidence < thresholds.min_confidence {
        if deduped.validated.protected {
            Route::Review
        } else {
            Route::Drop
        }
    } else if final_confidence >= thresholds.accept_confidence && !unclassified {
        Route::Accept
    } else {
        Route::Review
    };

    ScoredCandidate {
        deduped,
        final_confidence,
        route,
    }
}

fn context_length_factor(chars: usize) -> f64 {
    if chars < SHORT_CONTEXT_CHARS {
        SHORT_CONTEXT_FACTOR
    } else if chars > LONG_CONTEXT_CHARS {
        LONG_CONTEXT_FACTOR
    } else {
        1.0
    }
}
