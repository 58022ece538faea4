use crate::model::{
    CandidateDisposition, Disposition, DocumentSummary, ExtractedMetric, ReviewRecord, Route,
    ScoredCandidate,
};
use crate::pipeline::validate::RejectCause;

/// Records a disposition and reason for every candidate, and emits the final
/// accepted metric set plus the audit material needed to reconstruct the
/// decision trail without re-running the pipeline.
#[derive(Debug, Default)]
pub struct Aggregator {
    pub metrics: Vec<ExtractedMetric>,
    pub review_queue: Vec<ReviewRecord>,
    pub dispositions: Vec<CandidateDisposition>,
    pub summary: DocumentSummary,
}

impl Aggregator {
    pub fn new(doc_id: &str) -> Self {
        Self {
            summary: DocumentSummary {
                doc_id: doc_id.to_string(),
                ..DocumentSummary::default()
            },
            ..Self::default()
        }
    }

    pub fn record_rejection(
        &mut self,
        candidate_id: &str,
        doc_id: &str,
        cause: RejectCause,
        reason: String,
        confidence: f64,
    ) {
        match cause {
            RejectCause::Citation => self.summary.rejected_citation += 1,
            RejectCause::Schema => self.summary.rejected_schema += 1,
            RejectCause::CrossMetric => self.summary.rejected_cross_metric += 1,
        }
        self.dispositions.push(CandidateDisposition {
            candidate_id: candidate_id.to_string(),
            doc_id: doc_id.to_string(),
            disposition: Disposition::Rejected.as_str().to_string(),
            reason,
            confidence,
        });
    }

    pub fn record_merge(
        &mut self,
        candidate_id: &str,
        doc_id: &str,
        winner_id: &str,
        confidence: f64,
    ) {
        self.dispositions.push(CandidateDisposition {
            candidate_id: candidate_id.to_string(),
            doc_id: doc_id.to_string(),
            disposition: Disposition::MergedDuplicate.as_str().to_string(),
            reason: format!("duplicate of {winner_id}"),
            confidence,
        });
    }

    pub fn record_scored(&mut self, scored: ScoredCandidate) {
        let validated = &scored.deduped.validated;
        let candidate = &validated.classified.candidate;

        match scored.route {
            Route::Accept => {
                let metric_id = format!(
                    "{}:metric:{:04}",
                    candidate.doc_id,
                    self.metrics.len() + 1
                );
                self.dispositions.push(CandidateDisposition {
                    candidate_id: candidate.candidate_id.clone(),
                    doc_id: candidate.doc_id.clone(),
                    disposition: Disposition::Accepted.as_str().to_string(),
                    reason: format!(
                        "confidence {:.3} at or above accept threshold",
                        scored.final_confidence
                    ),
                    confidence: scored.final_confidence,
                });
                self.summary.accepted += 1;
                self.metrics.push(ExtractedMetric {
                    metric_id,
                    doc_id: candidate.doc_id.clone(),
                    page: candidate.page,
                    metric_type: validated.classified.metric_type.clone(),
                    sector: validated.classified.sector.clone(),
                    value: candidate.value,
                    unit: candidate.unit.clone(),
                    year: candidate.year,
                    confidence: scored.final_confidence,
                    context: candidate.context.clone(),
                    validation_issues: validated.issues.clone(),
                    source_candidates: scored.deduped.merged_candidate_ids.clone(),
                });
            }
            Route::Drop => {
                self.summary.rejected_low_confidence += 1;
                self.dispositions.push(CandidateDisposition {
                    candidate_id: candidate.candidate_id.clone(),
                    doc_id: candidate.doc_id.clone(),
                    disposition: Disposition::Rejected.as_str().to_string(),
                    reason: format!(
                        "confidence {:.3} below minimum threshold",
                        scored.final_confidence
                    ),
                    confidence: scored.final_confidence,
                });
            }
            Route::Review => {
                self.summary.review_pending += 1;
                self.dispositions.push(CandidateDisposition {
                    candidate_id: candidate.candidate_id.clone(),
                    doc_id: candidate.doc_id.clone(),
                    disposition: Disposition::NeedsReview.as_str().to_string(),
                    reason: format!(
                        "confidence {:.3} in review band",
                        scored.final_confidence
                    ),
                    confidence: scored.final_confidence,
                });
                self.review_queue.push(ReviewRecord {
                    candidate_id: candidate.candidate_id.clone(),
                    doc_id: candidate.doc_id.clone(),
                    page: candidate.page,
                    value: candidate.value,
                    unit: candidate.unit.clone(),
                    year: candidate.year,
                    context: candidate.context.clone(),
                    suggested_metric_type: validated.classified.metric_type.clone(),
                    suggested_sector: validated.classified.sector.clone(),
                    confidence: scored.final_confidence,
                });
            }
        }
    }
}
