use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::model::{
    CandidateDisposition, DocumentEntry, DocumentSummary, ExtractedMetric, ReviewRecord,
};
use crate::util::rfc3339_now;

pub const DB_SCHEMA_VERSION: &str = "0.1.0";

pub fn open(db_path: &Path) -> Result<Connection> {
    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    Ok(connection)
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

pub(crate) fn ensure_schema(connection: &Connection) -> Result<()> {
    connection.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS docs (
          doc_id TEXT PRIMARY KEY,
          filename TEXT NOT NULL,
          sha256 TEXT NOT NULL,
          page_count INTEGER NOT NULL,
          ingested_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS metrics (
          metric_id TEXT PRIMARY KEY,
          doc_id TEXT NOT NULL,
          page INTEGER NOT NULL,
          metric_type TEXT NOT NULL,
          sector TEXT NOT NULL,
          value REAL NOT NULL,
          unit TEXT NOT NULL,
          year INTEGER,
          confidence REAL NOT NULL,
          context TEXT NOT NULL,
          validation_issues TEXT NOT NULL,
          source_candidates TEXT NOT NULL,
          FOREIGN KEY(doc_id) REFERENCES docs(doc_id)
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_metrics_semantic_key
          ON metrics(doc_id, metric_type, unit, value, year, sector);
        CREATE INDEX IF NOT EXISTS idx_metrics_type_year_sector
          ON metrics(metric_type, year, sector);

        CREATE TABLE IF NOT EXISTS review_queue (
          candidate_id TEXT PRIMARY KEY,
          doc_id TEXT NOT NULL,
          page INTEGER NOT NULL,
          value REAL NOT NULL,
          unit TEXT NOT NULL,
          year INTEGER,
          context TEXT NOT NULL,
          suggested_metric_type TEXT NOT NULL,
          suggested_sector TEXT NOT NULL,
          confidence REAL NOT NULL,
          status TEXT NOT NULL DEFAULT 'pending',
          decided_at TEXT,
          FOREIGN KEY(doc_id) REFERENCES docs(doc_id)
        );

        CREATE TABLE IF NOT EXISTS dispositions (
          disposition_id INTEGER PRIMARY KEY AUTOINCREMENT,
          candidate_id TEXT NOT NULL,
          doc_id TEXT NOT NULL,
          disposition TEXT NOT NULL,
          reason TEXT NOT NULL,
          confidence REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_dispositions_doc ON dispositions(doc_id);

        CREATE TABLE IF NOT EXISTS document_summaries (
          doc_id TEXT PRIMARY KEY,
          total_candidates INTEGER NOT NULL,
          accepted INTEGER NOT NULL,
          rejected_citation INTEGER NOT NULL,
          rejected_schema INTEGER NOT NULL,
          rejected_cross_metric INTEGER NOT NULL,
          rejected_low_confidence INTEGER NOT NULL,
          duplicate_groups_collapsed INTEGER NOT NULL,
          contradictions_preserved INTEGER NOT NULL,
          review_pending INTEGER NOT NULL,
          error TEXT
        );
        ",
    )?;

    let now = rfc3339_now();
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now],
    )?;

    Ok(())
}

pub fn upsert_doc(connection: &Connection, entry: &DocumentEntry) -> Result<()> {
    connection.execute(
        "INSERT INTO docs(doc_id, filename, sha256, page_count, ingested_at)
         VALUES(?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(doc_id) DO UPDATE SET
           filename=excluded.filename,
           sha256=excluded.sha256,
           page_count=excluded.page_count,
           ingested_at=excluded.ingested_at",
        params![
            entry.doc_id,
            entry.filename,
            entry.sha256,
            entry.page_count as i64,
            rfc3339_now()
        ],
    )?;
    Ok(())
}

/// Upserts a metric batch with duplicate-skip semantics. OR IGNORE covers
/// both uniqueness constraints: the semantic-key index, and the metric-id
/// primary key. The latter matters for NULL years, which never collide on
/// the index; reruns are idempotent there because metric ids are
/// deterministic. Returns how many rows were actually inserted.
pub fn upsert_metric_batch(
    connection: &mut Connection,
    metrics: &[ExtractedMetric],
) -> Result<usize> {
    let tx = connection.transaction()?;
    let mut inserted = 0_usize;

    {
        let mut statement = tx.prepare(
            "INSERT OR IGNORE INTO metrics(
               metric_id, doc_id, page, metric_type, sector, value, unit, year,
               confidence, context, validation_issues, source_candidates
             )
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )?;

        for metric in metrics {
            let issues = serde_json::to_string(&metric.validation_issues)
                .context("failed to serialize validation issues")?;
            let sources = serde_json::to_string(&metric.source_candidates)
                .context("failed to serialize source candidates")?;

            inserted += statement.execute(params![
                metric.metric_id,
                metric.doc_id,
                metric.page,
                metric.metric_type,
                metric.sector,
                metric.value,
                metric.unit,
                metric.year,
                metric.confidence,
                metric.context,
                issues,
                sources
            ])?;
        }
    }

    tx.commit()?;
    Ok(inserted)
}

pub fn insert_review_records(connection: &mut Connection, records: &[ReviewRecord]) -> Result<()> {
    let tx = connection.transaction()?;

    {
        let mut statement = tx.prepare(
            "INSERT INTO review_queue(
               candidate_id, doc_id, page, value, unit, year, context,
               suggested_metric_type, suggested_sector, confidence, status
             )
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 'pending')
             ON CONFLICT(candidate_id) DO NOTHING",
        )?;

        for record in records {
            statement.execute(params![
                record.candidate_id,
                record.doc_id,
                record.page,
                record.value,
                record.unit,
                record.year,
                record.context,
                record.suggested_metric_type,
                record.suggested_sector,
                record.confidence
            ])?;
        }
    }

    tx.commit()?;
    Ok(())
}

pub fn insert_dispositions(
    connection: &mut Connection,
    dispositions: &[CandidateDisposition],
) -> Result<()> {
    let tx = connection.transaction()?;

    {
        let mut statement = tx.prepare(
            "INSERT INTO dispositions(candidate_id, doc_id, disposition, reason, confidence)
             VALUES(?1, ?2, ?3, ?4, ?5)",
        )?;

        for disposition in dispositions {
            statement.execute(params![
                disposition.candidate_id,
                disposition.doc_id,
                disposition.disposition,
                disposition.reason,
                disposition.confidence
            ])?;
        }
    }

    tx.commit()?;
    Ok(())
}

pub fn upsert_document_summary(connection: &Connection, summary: &DocumentSummary) -> Result<()> {
    connection.execute(
        "INSERT INTO document_summaries(
           doc_id, total_candidates, accepted, rejected_citation, rejected_schema,
           rejected_cross_metric, rejected_low_confidence, duplicate_groups_collapsed,
           contradictions_preserved, review_pending, error
         )
         VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(doc_id) DO UPDATE SET
           total_candidates=excluded.total_candidates,
           accepted=excluded.accepted,
           rejected_citation=excluded.rejected_citation,
           rejected_schema=excluded.rejected_schema,
           rejected_cross_metric=excluded.rejected_cross_metric,
           rejected_low_confidence=excluded.rejected_low_confidence,
           duplicate_groups_collapsed=excluded.duplicate_groups_collapsed,
           contradictions_preserved=excluded.contradictions_preserved,
           review_pending=excluded.review_pending,
           error=excluded.error",
        params![
            summary.doc_id,
            summary.total_candidates as i64,
            summary.accepted as i64,
            summary.rejected_citation as i64,
            summary.rejected_schema as i64,
            summary.rejected_cross_metric as i64,
            summary.rejected_low_confidence as i64,
            summary.duplicate_groups_collapsed as i64,
            summary.contradictions_preserved as i64,
            summary.review_pending as i64,
            summary.error
        ],
    )?;
    Ok(())
}

#[derive(Debug, Default)]
pub struct MetricFilter {
    pub metric_type: Option<String>,
    pub year: Option<i64>,
    pub sector: Option<String>,
    pub limit: usize,
}

pub fn query_metrics(connection: &Connection, filter: &MetricFilter) -> Result<Vec<ExtractedMetric>> {
    let mut sql = String::from(
        "SELECT metric_id, doc_id, page, metric_type, sector, value, unit, year,
                confidence, context, validation_issues, source_candidates
         FROM metrics WHERE 1=1",
    );
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(metric_type) = &filter.metric_type {
        sql.push_str(" AND metric_type = ?");
        params_vec.push(Box::new(metric_type.clone()));
    }
    if let Some(year) = filter.year {
        sql.push_str(" AND year = ?");
        params_vec.push(Box::new(year));
    }
    if let Some(sector) = &filter.sector {
        sql.push_str(" AND sector = ?");
        params_vec.push(Box::new(sector.clone()));
    }

    sql.push_str(" ORDER BY metric_type, year, sector, doc_id, page");
    if filter.limit > 0 {
        sql.push_str(" LIMIT ?");
        params_vec.push(Box::new(filter.limit as i64));
    }

    let mut statement = connection.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::ToSql> =
        params_vec.iter().map(|param| param.as_ref()).collect();

    let rows = statement.query_map(param_refs.as_slice(), |row| {
        let issues: String = row.get(10)?;
        let sources: String = row.get(11)?;
        Ok(ExtractedMetric {
            metric_id: row.get(0)?,
            doc_id: row.get(1)?,
            page: row.get(2)?,
            metric_type: row.get(3)?,
            sector: row.get(4)?,
            value: row.get(5)?,
            unit: row.get(6)?,
            year: row.get(7)?,
            confidence: row.get(8)?,
            context: row.get(9)?,
            validation_issues: serde_json::from_str(&issues).unwrap_or_default(),
            source_candidates: serde_json::from_str(&sources).unwrap_or_default(),
        })
    })?;

    let mut metrics = Vec::new();
    for row in rows {
        metrics.push(row?);
    }
    Ok(metrics)
}

pub fn pending_reviews(connection: &Connection) -> Result<Vec<ReviewRecord>> {
    let mut statement = connection.prepare(
        "SELECT candidate_id, doc_id, page, value, unit, year, context,
                suggested_metric_type, suggested_sector, confidence
         FROM review_queue WHERE status = 'pending'
         ORDER BY doc_id, page, candidate_id",
    )?;

    let rows = statement.query_map([], |row| {
        Ok(ReviewRecord {
            candidate_id: row.get(0)?,
            doc_id: row.get(1)?,
            page: row.get(2)?,
            value: row.get(3)?,
            unit: row.get(4)?,
            year: row.get(5)?,
            context: row.get(6)?,
            suggested_metric_type: row.get(7)?,
            suggested_sector: row.get(8)?,
            confidence: row.get(9)?,
        })
    })?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

pub fn pending_review(connection: &Connection, candidate_id: &str) -> Result<Option<ReviewRecord>> {
    let record = connection
        .query_row(
            "SELECT candidate_id, doc_id, page, value, unit, year, context,
                    suggested_metric_type, suggested_sector, confidence
             FROM review_queue WHERE candidate_id = ?1 AND status = 'pending'",
            [candidate_id],
            |row| {
                Ok(ReviewRecord {
                    candidate_id: row.get(0)?,
                    doc_id: row.get(1)?,
                    page: row.get(2)?,
                    value: row.get(3)?,
                    unit: row.get(4)?,
                    year: row.get(5)?,
                    context: row.get(6)?,
                    suggested_metric_type: row.get(7)?,
                    suggested_sector: row.get(8)?,
                    confidence: row.get(9)?,
                })
            },
        )
        .optional()?;
    Ok(record)
}

pub fn mark_review_decided(
    connection: &Connection,
    candidate_id: &str,
    status: &str,
) -> Result<()> {
    connection.execute(
        "UPDATE review_queue SET status = ?1, decided_at = ?2 WHERE candidate_id = ?3",
        params![status, rfc3339_now(), candidate_id],
    )?;
    Ok(())
}

pub fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
