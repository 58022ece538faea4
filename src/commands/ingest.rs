use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::cli::IngestArgs;
use crate::model::{
    DocumentEntry, DocumentInput, DocumentSummary, IngestCounts, IngestPaths, IngestRunManifest,
};
use crate::pipeline::{DocumentOutcome, Pipeline};
use crate::pipeline::score::ScoreThresholds;
use crate::schema::SchemaConfig;
use crate::store;
use crate::util::{compact_utc, ensure_dir, file_sha256, rfc3339_now, save_json};

pub fn run(args: IngestArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = rfc3339_now();
    let run_id = format!("run-{}", compact_utc(started_ts));

    let cache_root = args.cache_root.clone();
    let manifest_dir = cache_root.join("manifests");
    ensure_dir(&manifest_dir)?;

    let ingest_manifest_path = args.ingest_manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!("ingest_run_{}.json", compact_utc(started_ts)))
    });
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| cache_root.join("econex_metrics.sqlite"));

    info!(cache_root = %cache_root.display(), run_id = %run_id, "starting ingest");

    let config = SchemaConfig::load(
        args.metrics_config.as_deref(),
        args.sectors_config.as_deref(),
        args.publishers_config.as_deref(),
        args.entity_hints_config.as_deref(),
    )?;

    let thresholds = ScoreThresholds {
        min_confidence: args.min_confidence,
        accept_confidence: args.accept_confidence,
    };
    let pipeline = Pipeline::new(thresholds)?;

    let mut warnings = Vec::new();
    let mut failed_summaries = Vec::new();
    let (documents, entries) = load_documents(&args.input_dir, &mut warnings, &mut failed_summaries)?;

    let doc_budget = Duration::from_millis(args.doc_timeout_ms);
    let outcomes: Vec<DocumentOutcome> = documents
        .par_iter()
        .map(|doc| {
            let deadline = Instant::now() + doc_budget;
            pipeline.process_document(doc, &config, Some(deadline))
        })
        .collect();

    let mut connection = store::open(&db_path)?;
    let mut counts = IngestCounts {
        document_count: entries.len() + failed_summaries.len(),
        ..IngestCounts::default()
    };
    let mut summaries = Vec::new();

    for entry in &entries {
        store::upsert_doc(&connection, entry)?;
    }

    for outcome in outcomes {
        counts.processed_document_count += 1;
        counts.candidates_total += outcome.summary.total_candidates;
        counts.accepted_total += outcome.summary.accepted;
        counts.rejected_total += outcome.summary.rejected_citation
            + outcome.summary.rejected_schema
            + outcome.summary.rejected_cross_metric
            + outcome.summary.rejected_low_confidence;
        counts.review_pending_total += outcome.summary.review_pending;
        counts.duplicate_groups_collapsed += outcome.summary.duplicate_groups_collapsed;
        counts.contradictions_preserved += outcome.summary.contradictions_preserved;
        counts.citation_filtered_total += outcome.summary.rejected_citation;

        store::upsert_metric_batch(&mut connection, &outcome.metrics)?;
        store::insert_review_records(&mut connection, &outcome.review_queue)?;
        store::insert_dispositions(&mut connection, &outcome.dispositions)?;
        store::upsert_document_summary(&connection, &outcome.summary)?;

        for warning in &outcome.warnings {
            warn!(doc_id = %outcome.doc_id, warning = %warning, "document warning");
        }
        warnings.extend(outcome.warnings);
        summaries.push(outcome.summary);
    }

    for summary in failed_summaries {
        counts.failed_document_count += 1;
        store::upsert_document_summary(&connection, &summary)?;
        summaries.push(summary);
    }

    counts.metrics_total = store::count_rows(&connection, "SELECT COUNT(*) FROM metrics")?;

    let manifest = IngestRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        db_schema_version: store::DB_SCHEMA_VERSION.to_string(),
        status: "completed".to_string(),
        started_at,
        updated_at: rfc3339_now(),
        paths: IngestPaths {
            cache_root: cache_root.display().to_string(),
            manifest_dir: manifest_dir.display().to_string(),
            input_dir: args.input_dir.display().to_string(),
            db_path: db_path.display().to_string(),
        },
        counts,
        documents: summaries,
        source_hashes: entries,
        warnings,
    };

    save_json(&ingest_manifest_path, &manifest)?;

    info!(path = %ingest_manifest_path.display(), "wrote ingest run manifest");
    info!(
        documents = manifest.counts.processed_document_count,
        candidates = manifest.counts.candidates_total,
        accepted = manifest.counts.accepted_total,
        review_pending = manifest.counts.review_pending_total,
        "ingest completed"
    );

    Ok(())
}

/// Reads every document JSON file under the input directory. A file that
/// fails to read or parse is isolated: it becomes a warning plus an
/// errored summary, and the batch continues.
fn load_documents(
    input_dir: &Path,
    warnings: &mut Vec<String>,
    failed_summaries: &mut Vec<DocumentSummary>,
) -> Result<(Vec<DocumentInput>, Vec<DocumentEntry>)> {
    let mut paths = discover_document_files(input_dir)?;
    paths.sort();

    if paths.is_empty() {
        bail!("no document JSON files found in {}", input_dir.display());
    }

    let mut documents = Vec::new();
    let mut entries = Vec::new();

    for path in paths {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

        match load_one_document(&path) {
            Ok(doc) => {
                let sha256 = file_sha256(&path)?;
                entries.push(DocumentEntry {
                    filename,
                    doc_id: doc.doc_id.clone(),
                    sha256,
                    page_count: doc.pages.len(),
                });
                documents.push(doc);
            }
            Err(err) => {
                let warning = format!("failed to load {}: {err:#}", path.display());
                warn!(warning = %warning, "document load warning");
                warnings.push(warning);
                failed_summaries.push(DocumentSummary {
                    doc_id: filename,
                    error: Some(format!("{err:#}")),
                    ..DocumentSummary::default()
                });
            }
        }
    }

    Ok((documents, entries))
}

fn load_one_document(path: &Path) -> Result<DocumentInput> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let doc: DocumentInput = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    if doc.doc_id.trim().is_empty() {
        bail!("document {} has an empty doc_id", path.display());
    }
    Ok(doc)
}

fn discover_document_files(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let dir_entries = fs::read_dir(input_dir)
        .with_context(|| format!("failed to read {}", input_dir.display()))?;

    for dir_entry in dir_entries {
        let dir_entry =
            dir_entry.with_context(|| format!("failed to read entry in {}", input_dir.display()))?;
        let path = dir_entry.path();

        if !dir_entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            files.push(path);
        }
    }

    Ok(files)
}
