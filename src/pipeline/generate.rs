use std::time::Instant;

use anyhow::{Context, Result};
use regex::Regex;

use crate::model::{DocumentInput, ExtractionMethod, MetricCandidate, PageInput, TableCellInput};
use crate::schema::{SchemaConfig, UNIT_COUNT, UNIT_PERCENT, UNIT_USD_MILLIONS};

const CONTEXT_TOKENS: usize = 25;
const CITATION_YEAR_MIN: f64 = 1900.0;
const CITATION_YEAR_MAX: f64 = 2030.0;

#[derive(Debug, Default)]
pub struct GeneratedCandidates {
    pub candidates: Vec<MetricCandidate>,
    pub budget_exhausted: bool,
}

/// Compiled extraction patterns shared by the three strategies. Each strategy
/// is a pure read over the immutable document; missing input yields an empty
/// list, never an error.
#[derive(Debug)]
pub struct CandidateGenerator {
    percent: Regex,
    currency_symbol: Regex,
    currency_word: Regex,
    count: Regex,
    citation_marker: Regex,
    year: Regex,
}

impl CandidateGenerator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            percent: Regex::new(r"(?i)(-?\d+(?:\.\d+)?)\s*(?:%|percent\b|per cent\b)")
                .context("failed to compile percent pattern")?,
            currency_symbol: Regex::new(
                r"(?i)(?:US)?\$\s*(\d[\d,]*(?:\.\d+)?)\s*(trillion|billion|million|thousand|tn|bn|mn|k)?\b",
            )
            .context("failed to compile currency symbol pattern")?,
            currency_word: Regex::new(
                r"(?i)\b(\d[\d,]*(?:\.\d+)?)\s*(trillion|billion|million|thousand)\s+(?:dollars|usd|euros|eur)\b",
            )
            .context("failed to compile currency word pattern")?,
            count: Regex::new(
                r"(?i)\b(\d[\d,]*(?:\.\d+)?)\s*(trillion|billion|million|thousand)?\s+(?:jobs|workers|employees|people|firms|companies|users|farmers|students|roles)\b",
            )
            .context("failed to compile count pattern")?,
            citation_marker: Regex::new(
                r"(?:\(\s*(?:19|20)\d{2}[a-z]?\s*\))|(?:\bet\s+al\.?)|(?:\[\d+\])|(?:\b[A-Z][a-z]+\s+\(\s*(?:19|20)\d{2}\s*\))",
            )
            .context("failed to compile citation marker pattern")?,
            year: Regex::new(r"\b(19\d{2}|20[0-2]\d|2030)\b")
                .context("failed to compile year pattern")?,
        })
    }

    /// Runs all three strategies over one document. The deadline bounds
    /// pathological pattern-matching cost; when it passes, remaining pages
    /// and strategies are abandoned and whatever was produced is returned.
    pub fn generate(
        &self,
        doc: &DocumentInput,
        config: &SchemaConfig,
        deadline: Option<Instant>,
    ) -> GeneratedCandidates {
        let mut out = GeneratedCandidates::default();

        for page in &doc.pages {
            if deadline_passed(deadline) {
                out.budget_exhausted = true;
                return out;
            }
            self.scan_page_text(doc, page, &mut out.candidates);

            if deadline_passed(deadline) {
                out.budget_exhausted = true;
                return out;
            }
            self.scan_tables(doc, page, &mut out.candidates);

            if deadline_passed(deadline) {
                out.budget_exhausted = true;
                return out;
            }
            self.scan_publisher_patterns(doc, page, config, &mut out.candidates);
        }

        // Deterministic downstream order regardless of strategy interleaving.
        out.candidates
            .sort_by(|a, b| (a.page, a.offset).cmp(&(b.page, b.offset)));
        out
    }

    fn scan_page_text(&self, doc: &DocumentInput, page: &PageInput, out: &mut Vec<MetricCandidate>) {
        for captures in self.percent.captures_iter(&page.text) {
            let Some(value) = captures.get(1).and_then(|m| parse_number(m.as_str())) else {
                continue;
            };
            let Some(whole) = captures.get(0) else {
                continue;
            };
            self.push_text_candidate(doc, page, out, whole.start(), whole.end(), value, UNIT_PERCENT);
        }

        for captures in self.currency_symbol.captures_iter(&page.text) {
            let Some(raw) = captures.get(1).and_then(|m| parse_number(m.as_str())) else {
                continue;
            };
            let magnitude = captures.get(2).map(|m| m.as_str());
            let value = raw * currency_multiplier(magnitude);
            let Some(whole) = captures.get(0) else {
                continue;
            };
            self.push_text_candidate(
                doc,
                page,
                out,
                whole.start(),
                whole.end(),
                value,
                UNIT_USD_MILLIONS,
            );
        }

        for captures in self.currency_word.captures_iter(&page.text) {
            let Some(raw) = captures.get(1).and_then(|m| parse_number(m.as_str())) else {
                continue;
            };
            let magnitude = captures.get(2).map(|m| m.as_str());
            let value = raw * currency_multiplier(magnitude);
            let Some(whole) = captures.get(0) else {
                continue;
            };
            self.push_text_candidate(
                doc,
                page,
                out,
                whole.start(),
                whole.end(),
                value,
                UNIT_USD_MILLIONS,
            );
        }

        for captures in self.count.captures_iter(&page.text) {
            let Some(raw) = captures.get(1).and_then(|m| parse_number(m.as_str())) else {
                continue;
            };
            let magnitude = captures.get(2).map(|m| m.as_str());
            let value = raw * count_multiplier(magnitude);
            let Some(whole) = captures.get(0) else {
                continue;
            };
            self.push_text_candidate(doc, page, out, whole.start(), whole.end(), value, UNIT_COUNT);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn push_text_candidate(
        &self,
        doc: &DocumentInput,
        page: &PageInput,
        out: &mut Vec<MetricCandidate>,
        start: usize,
        end: usize,
        value: f64,
        unit: &str,
    ) {
        let context = context_window(&page.text, start, end, CONTEXT_TOKENS);
        let raw_text = page.text[start..end].to_string();
        let citation_candidate = self.is_citation_adjacent(value, &context);
        let year = self.year_from_context(&context, doc.reporting_year);

        out.push(MetricCandidate {
            candidate_id: candidate_id(doc, ExtractionMethod::Text, page.page, start, out.len()),
            doc_id: doc.doc_id.clone(),
            page: page.page,
            offset: start,
            value,
            unit: unit.to_string(),
            raw_text,
            context,
            method: ExtractionMethod::Text,
            base_confidence: ExtractionMethod::Text.base_confidence(),
            citation_candidate,
            year,
            metric_type_hint: None,
        });
    }

    fn scan_tables(&self, doc: &DocumentInput, page: &PageInput, out: &mut Vec<MetricCandidate>) {
        // Table candidates sort after the page text they accompany.
        let base_offset = page.text.len() + 1;

        for (table_index, table) in page.tables.iter().enumerate() {
            for (cell_index, cell) in table.cells.iter().enumerate() {
                let Some((value, unit)) = self.parse_cell(cell) else {
                    continue;
                };

                let context = format!("{} {}", cell.row_label.trim(), cell.col_header.trim())
                    .trim()
                    .to_string();
                let offset = base_offset + table_index * 1024 + cell_index;
                let citation_candidate = self.is_citation_adjacent(value, &context);
                let year = self.year_from_context(&context, doc.reporting_year);

                out.push(MetricCandidate {
                    candidate_id: candidate_id(
                        doc,
                        ExtractionMethod::Table,
                        page.page,
                        offset,
                        out.len(),
                    ),
                    doc_id: doc.doc_id.clone(),
                    page: page.page,
                    offset,
                    value,
                    unit,
                    raw_text: cell.text.clone(),
                    context,
                    method: ExtractionMethod::Table,
                    base_confidence: ExtractionMethod::Table.base_confidence(),
                    citation_candidate,
                    year,
                    metric_type_hint: None,
                });
            }
        }
    }

    fn parse_cell(&self, cell: &TableCellInput) -> Option<(f64, String)> {
        let text = cell.text.trim();
        if text.is_empty() {
            return None;
        }

        if let Some(captures) = self.percent.captures(text) {
            let value = parse_number(captures.get(1)?.as_str())?;
            return Some((value, UNIT_PERCENT.to_string()));
        }

        if let Some(captures) = self.currency_symbol.captures(text) {
            let raw = parse_number(captures.get(1)?.as_str())?;
            let value = raw * currency_multiplier(captures.get(2).map(|m| m.as_str()));
            return Some((value, UNIT_USD_MILLIONS.to_string()));
        }

        let value = parse_number(text)?;
        let header = format!("{} {}", cell.row_label, cell.col_header).to_lowercase();
        if header.contains('%') || header.contains("percent") || header.contains("share") {
            Some((value, UNIT_PERCENT.to_string()))
        } else if header.contains('$')
            || header.contains("usd")
            || header.contains("million")
            || header.contains("billion")
        {
            let value = if header.contains("billion") {
                value * 1000.0
            } else {
                value
            };
            Some((value, UNIT_USD_MILLIONS.to_string()))
        } else {
            Some((value, UNIT_COUNT.to_string()))
        }
    }

    fn scan_publisher_patterns(
        &self,
        doc: &DocumentInput,
        page: &PageInput,
        config: &SchemaConfig,
        out: &mut Vec<MetricCandidate>,
    ) {
        let Some(publisher) = doc.publisher.as_deref() else {
            return;
        };

        for pattern in config.publisher_patterns(publisher) {
            for captures in pattern.regex.captures_iter(&page.text) {
                let Some(value) = captures.get(1).and_then(|m| parse_number(m.as_str())) else {
                    continue;
                };
                let value = value * pattern.scale;
                let Some(whole) = captures.get(0) else {
                    continue;
                };
                let context = context_window(&page.text, whole.start(), whole.end(), CONTEXT_TOKENS);
                let citation_candidate = self.is_citation_adjacent(value, &context);
                let year = self.year_from_context(&context, doc.reporting_year);

                out.push(MetricCandidate {
                    candidate_id: candidate_id(
                        doc,
                        ExtractionMethod::Publisher,
                        page.page,
                        whole.start(),
                        out.len(),
                    ),
                    doc_id: doc.doc_id.clone(),
                    page: page.page,
                    offset: whole.start(),
                    value,
                    unit: pattern.unit.clone(),
                    raw_text: page.text[whole.start()..whole.end()].to_string(),
                    context,
                    method: ExtractionMethod::Publisher,
                    base_confidence: pattern.confidence,
                    citation_candidate,
                    year,
                    metric_type_hint: pattern.metric_type.clone(),
                });
            }
        }
    }

    fn is_citation_adjacent(&self, value: f64, context: &str) -> bool {
        if value.fract() != 0.0 || !(CITATION_YEAR_MIN..=CITATION_YEAR_MAX).contains(&value) {
            return false;
        }
        self.citation_marker.is_match(context)
    }

    fn year_from_context(&self, context: &str, reporting_year: Option<i64>) -> Option<i64> {
        for captures in self.year.captures_iter(context) {
            let matched = captures.get(1)?;
            let preceded_by_paren = context[..matched.start()].ends_with('(');
            if preceded_by_paren {
                // Parenthesized years in prose are citations, not observation years.
                continue;
            }
            if let Ok(year) = matched.as_str().parse::<i64>() {
                return Some(year);
            }
        }
        reporting_year
    }
}

fn candidate_id(
    doc: &DocumentInput,
    method: ExtractionMethod,
    page: i64,
    offset: usize,
    seq: usize,
) -> String {
    format!(
        "{}:cand:{}:{:04}:{:06}:{:03}",
        doc.doc_id,
        method.as_str(),
        page,
        offset,
        seq
    )
}

fn deadline_passed(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() >= deadline)
}

fn parse_number(text: &str) -> Option<f64> {
    let cleaned = text.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

fn currency_multiplier(magnitude: Option<&str>) -> f64 {
    match magnitude.map(str::to_lowercase).as_deref() {
        Some("trillion" | "tn") => 1_000_000.0,
        Some("billion" | "bn") => 1_000.0,
        Some("million" | "mn") => 1.0,
        Some("thousand" | "k") => 0.001,
        // Bare dollar amounts normalize to millions as well.
        _ => 0.000_001,
    }
}

fn count_multiplier(magnitude: Option<&str>) -> f64 {
    match magnitude.map(str::to_lowercase).as_deref() {
        Some("trillion") => 1_000_000_000_000.0,
        Some("billion") => 1_000_000_000.0,
        Some("million") => 1_000_000.0,
        Some("thousand") => 1_000.0,
        _ => 1.0,
    }
}

/// Bounded window of whole tokens around a match, including the match text.
fn context_window(text: &str, start: usize, end: usize, tokens: usize) -> String {
    let before: Vec<&str> = text[..start].split_whitespace().collect();
    let after: Vec<&str> = text[end..].split_whitespace().collect();

    let before_start = before.len().saturating_sub(tokens);
    let mut parts: Vec<&str> = before[before_start..].to_vec();
    parts.push(text[start..end].trim());
    parts.extend(after.iter().take(tokens));

    parts.join(" ")
}
