use std::time::Instant;

use anyhow::Result;

use crate::model::{
    CandidateDisposition, DocumentInput, DocumentSummary, ExtractedMetric, ReviewRecord,
};
use crate::schema::SchemaConfig;

pub mod aggregate;
pub mod classify;
pub mod dedup;
pub mod generate;
pub mod score;
pub mod validate;

#[cfg(test)]
mod tests;

use aggregate::Aggregator;
use dedup::Deduplicator;
use generate::CandidateGenerator;
use score::ScoreThresholds;
use validate::{ValidationOutcome, Validator, default_cross_metric_rules};

#[derive(Debug)]
pub struct DocumentOutcome {
    pub doc_id: String,
    pub metrics: Vec<ExtractedMetric>,
    pub review_queue: Vec<ReviewRecord>,
    pub dispositions: Vec<CandidateDisposition>,
    pub summary: DocumentSummary,
    pub warnings: Vec<String>,
}

/// One pipeline run: compiled strategies plus the rule engine, shared
/// read-only across documents. Processing one document is a pure function of
/// its text and tables, so retries at document granularity are safe.
pub struct Pipeline {
    generator: CandidateGenerator,
    validator: Validator,
    deduplicator: Deduplicator,
    thresholds: ScoreThresholds,
}

impl Pipeline {
    pub fn new(thresholds: ScoreThresholds) -> Result<Self> {
        Ok(Self {
            generator: CandidateGenerator::new()?,
            validator: Validator::new(default_cross_metric_rules())?,
            deduplicator: Deduplicator::new()?,
            thresholds,
        })
    }

    pub fn process_document(
        &self,
        doc: &DocumentInput,
        config: &SchemaConfig,
        deadline: Option<Instant>,
    ) -> DocumentOutcome {
        let mut aggregator = Aggregator::new(&doc.doc_id);
        let mut warnings = Vec::new();

        let generated = self.generator.generate(doc, config, deadline);
        if generated.budget_exhausted {
            warnings.push(format!(
                "document {} exceeded its processing budget; partial candidate set used",
                doc.doc_id
            ));
        }
        aggregator.summary.total_candidates = generated.candidates.len();

        let mut survivors = Vec::new();
        for candidate in generated.candidates {
            let candidate_id = candidate.candidate_id.clone();
            let classified = classify::classify(candidate, config);
            match self
                .validator
                .validate(classified, doc.reporting_year, config)
            {
                ValidationOutcome::Passed(validated) => survivors.push(validated),
                ValidationOutcome::Rejected { cause, reason } => {
                    aggregator.record_rejection(&candidate_id, &doc.doc_id, cause, reason, 0.0);
                }
            }
        }

        let deduped = self.deduplicator.dedup(survivors);
        aggregator.summary.duplicate_groups_collapsed = deduped.duplicate_groups_collapsed;
        aggregator.summary.contradictions_preserved = deduped.contradictions_preserved;
        for (merged_id, winner_id, confidence) in &deduped.merged {
            aggregator.record_merge(merged_id, &doc.doc_id, winner_id, *confidence);
        }

        for entry in deduped.kept {
            aggregator.record_scored(score::score(entry, self.thresholds));
        }

        DocumentOutcome {
            doc_id: doc.doc_id.clone(),
            metrics: aggregator.metrics,
            review_queue: aggregator.review_queue,
            dispositions: aggregator.dispositions,
            summary: aggregator.summary,
            warnings,
        }
    }
}
