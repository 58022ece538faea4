use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::cli::ReviewArgs;
use crate::model::{
    CandidateDisposition, Disposition, ExtractedMetric, ReviewAction, ReviewDecision, ReviewRecord,
};
use crate::store;
use crate::util::{load_json, save_json};

pub fn run(args: ReviewArgs) -> Result<()> {
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| args.cache_root.join("econex_metrics.sqlite"));

    if args.export.is_none() && args.apply.is_none() {
        bail!("review requires --export or --apply");
    }

    let mut connection = store::open(&db_path)?;

    if let Some(export_path) = &args.export {
        let pending = store::pending_reviews(&connection)?;
        save_json(export_path, &pending)?;
        info!(path = %export_path.display(), pending = pending.len(), "exported review queue");
    }

    if let Some(apply_path) = &args.apply {
        let decisions: Vec<ReviewDecision> = load_json(apply_path)?;
        let applied = apply_decisions(&mut connection, &decisions)?;
        info!(
            path = %apply_path.display(),
            decisions = decisions.len(),
            applied = applied,
            "applied review decisions"
        );
    }

    Ok(())
}

/// Folds reviewer decisions back into the metric set and the audit trail.
fn apply_decisions(
    connection: &mut rusqlite::Connection,
    decisions: &[ReviewDecision],
) -> Result<usize> {
    let mut applied = 0_usize;

    for decision in decisions {
        let Some(record) = store::pending_review(connection, &decision.candidate_id)? else {
            warn!(candidate_id = %decision.candidate_id, "no pending review for decision");
            continue;
        };

        match decision.action {
            ReviewAction::Accept => {
                accept_record(connection, &record, None, None)?;
                store::mark_review_decided(connection, &record.candidate_id, "accepted")?;
            }
            ReviewAction::Modify => {
                accept_record(
                    connection,
                    &record,
                    decision.metric_type.as_deref(),
                    decision.sector.as_deref(),
                )?;
                store::mark_review_decided(connection, &record.candidate_id, "modified")?;
            }
            ReviewAction::Reject => {
                store::insert_dispositions(
                    connection,
                    &[CandidateDisposition {
                        candidate_id: record.candidate_id.clone(),
                        doc_id: record.doc_id.clone(),
                        disposition: Disposition::Rejected.as_str().to_string(),
                        reason: "rejected by reviewer".to_string(),
                        confidence: record.confidence,
                    }],
                )?;
                store::mark_review_decided(connection, &record.candidate_id, "rejected")?;
            }
        }

        applied += 1;
    }

    Ok(applied)
}

fn accept_record(
    connection: &mut rusqlite::Connection,
    record: &ReviewRecord,
    metric_type: Option<&str>,
    sector: Option<&str>,
) -> Result<()> {
    let modified = metric_type.is_some() || sector.is_some();
    let metric = ExtractedMetric {
        metric_id: format!("{}:reviewed", record.candidate_id),
        doc_id: record.doc_id.clone(),
        page: record.page,
        metric_type: metric_type
            .unwrap_or(&record.suggested_metric_type)
            .to_string(),
        sector: sector.unwrap_or(&record.suggested_sector).to_string(),
        value: record.value,
        unit: record.unit.clone(),
        year: record.year,
        confidence: record.confidence,
        context: record.context.clone(),
        validation_issues: Vec::new(),
        source_candidates: vec![record.candidate_id.clone()],
    };

    store::upsert_metric_batch(connection, &[metric])?;

    let disposition = if modified {
        Disposition::ModifiedClassification
    } else {
        Disposition::Accepted
    };
    store::insert_dispositions(
        connection,
        &[CandidateDisposition {
            candidate_id: record.candidate_id.clone(),
            doc_id: record.doc_id.clone(),
            disposition: disposition.as_str().to_string(),
            reason: if modified {
                "accepted by reviewer with modified classification".to_string()
            } else {
                "accepted by reviewer".to_string()
            },
            confidence: record.confidence,
        }],
    )?;

    Ok(())
}
