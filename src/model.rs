use serde::{Deserialize, Serialize};

/// One document as delivered by the upstream converter: plain page text plus
/// labelled table cells. The pipeline never touches binary source formats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInput {
    pub doc_id: String,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub reporting_year: Option<i64>,
    #[serde(default)]
    pub pages: Vec<PageInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInput {
    pub page: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tables: Vec<TableInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInput {
    #[serde(default)]
    pub cells: Vec<TableCellInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCellInput {
    #[serde(default)]
    pub row_label: String,
    #[serde(default)]
    pub col_header: String,
    pub text: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Text,
    Table,
    Publisher,
}

impl ExtractionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionMethod::Text => "text",
            ExtractionMethod::Table => "table",
            ExtractionMethod::Publisher => "publisher",
        }
    }

    pub fn base_confidence(self) -> f64 {
        match self {
            ExtractionMethod::Text => 0.7,
            ExtractionMethod::Table => 0.8,
            // Publisher patterns carry their own confidence; this is the floor.
            ExtractionMethod::Publisher => 0.85,
        }
    }
}

/// Raw extraction output. Immutable once emitted by the generator; later
/// stages wrap it rather than mutate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricCandidate {
    pub candidate_id: String,
    pub doc_id: String,
    pub page: i64,
    pub offset: usize,
    pub value: f64,
    pub unit: String,
    pub raw_text: String,
    pub context: String,
    pub method: ExtractionMethod,
    pub base_confidence: f64,
    pub citation_candidate: bool,
    pub year: Option<i64>,
    /// Set by publisher patterns that declare the metric type they match.
    pub metric_type_hint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClassifiedCandidate {
    pub candidate: MetricCandidate,
    pub metric_type: String,
    pub sector: String,
    pub sector_confidence: f64,
}

#[derive(Debug, Clone)]
pub struct ValidatedCandidate {
    pub classified: ClassifiedCandidate,
    /// Product of all schema/cross-metric penalty multipliers.
    pub penalty: f64,
    pub issues: Vec<String>,
    pub protected: bool,
}

#[derive(Debug, Clone)]
pub struct DedupedCandidate {
    pub validated: ValidatedCandidate,
    pub merged_candidate_ids: Vec<String>,
    pub merged_methods: usize,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Route {
    Accept,
    Drop,
    Review,
}

#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub deduped: DedupedCandidate,
    pub final_confidence: f64,
    pub route: Route,
}

/// Final curated record. Created only by the aggregator and never mutated;
/// a later contradictory observation becomes a new metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedMetric {
    pub metric_id: String,
    pub doc_id: String,
    pub page: i64,
    pub metric_type: String,
    pub sector: String,
    pub value: f64,
    pub unit: String,
    pub year: Option<i64>,
    pub confidence: f64,
    pub context: String,
    pub validation_issues: Vec<String>,
    pub source_candidates: Vec<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Disposition {
    Accepted,
    Rejected,
    MergedDuplicate,
    NeedsReview,
    ModifiedClassification,
}

impl Disposition {
    pub fn as_str(self) -> &'static str {
        match self {
            Disposition::Accepted => "accepted",
            Disposition::Rejected => "rejected",
            Disposition::MergedDuplicate => "merged_duplicate",
            Disposition::NeedsReview => "needs_review",
            Disposition::ModifiedClassification => "modified_classification",
        }
    }
}

/// Audit entry recorded for every candidate regardless of outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDisposition {
    pub candidate_id: String,
    pub doc_id: String,
    pub disposition: String,
    pub reason: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub doc_id: String,
    pub total_candidates: usize,
    pub accepted: usize,
    pub rejected_citation: usize,
    pub rejected_schema: usize,
    pub rejected_cross_metric: usize,
    pub rejected_low_confidence: usize,
    pub duplicate_groups_collapsed: usize,
    pub contradictions_preserved: usize,
    pub review_pending: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub filename: String,
    pub doc_id: String,
    pub sha256: String,
    pub page_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestPaths {
    pub cache_root: String,
    pub manifest_dir: String,
    pub input_dir: String,
    pub db_path: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestCounts {
    pub document_count: usize,
    pub processed_document_count: usize,
    pub failed_document_count: usize,
    pub candidates_total: usize,
    pub accepted_total: usize,
    pub rejected_total: usize,
    pub review_pending_total: usize,
    pub duplicate_groups_collapsed: usize,
    pub contradictions_preserved: usize,
    pub citation_filtered_total: usize,
    pub metrics_total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub paths: IngestPaths,
    pub counts: IngestCounts,
    pub documents: Vec<DocumentSummary>,
    pub source_hashes: Vec<DocumentEntry>,
    pub warnings: Vec<String>,
}

/// Flat record handed to the human-review interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub candidate_id: String,
    pub doc_id: String,
    pub page: i64,
    pub value: f64,
    pub unit: String,
    pub year: Option<i64>,
    pub context: String,
    pub suggested_metric_type: String,
    pub suggested_sector: String,
    pub confidence: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Accept,
    Reject,
    Modify,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub candidate_id: String,
    pub action: ReviewAction,
    #[serde(default)]
    pub metric_type: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
}
