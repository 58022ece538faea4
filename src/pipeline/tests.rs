use super::*;

use crate::model::{
    ClassifiedCandidate, DedupedCandidate, ExtractionMethod, MetricCandidate, PageInput, Route,
    TableCellInput, TableInput, ValidatedCandidate,
};
use crate::pipeline::classify::{METRIC_UNCLASSIFIED, SECTOR_UNKNOWN, classify};
use crate::pipeline::dedup::{Deduplicator, interim_confidence, scaled_value};
use crate::pipeline::generate::CandidateGenerator;
use crate::pipeline::score::{ScoreThresholds, score};
use crate::pipeline::validate::{
    CrossCondition, CrossMetricRule, RejectCause, RuleAction, ValidationOutcome, Validator,
    default_cross_metric_rules,
};
use crate::schema::{SchemaConfig, UNIT_COUNT, UNIT_PERCENT, UNIT_USD_MILLIONS};

fn make_doc(text: &str) -> DocumentInput {
    DocumentInput {
        doc_id: "doc-1".to_string(),
        publisher: None,
        reporting_year: Some(2024),
        pages: vec![PageInput {
            page: 1,
            text: text.to_string(),
            tables: Vec::new(),
        }],
    }
}

fn make_candidate(value: f64, unit: &str, context: &str) -> MetricCandidate {
    MetricCandidate {
        candidate_id: format!("doc-1:cand:text:0001:{:06}:000", context.len()),
        doc_id: "doc-1".to_string(),
        page: 1,
        offset: context.len(),
        value,
        unit: unit.to_string(),
        raw_text: String::new(),
        context: context.to_string(),
        method: ExtractionMethod::Text,
        base_confidence: ExtractionMethod::Text.base_confidence(),
        citation_candidate: false,
        year: Some(2024),
        metric_type_hint: None,
    }
}

fn make_validated(
    value: f64,
    unit: &str,
    metric_type: &str,
    sector: &str,
    base_confidence: f64,
    context: &str,
    offset: usize,
) -> ValidatedCandidate {
    let mut candidate = make_candidate(value, unit, context);
    candidate.candidate_id = format!("doc-1:cand:text:0001:{offset:06}:000");
    candidate.offset = offset;
    candidate.base_confidence = base_confidence;
    ValidatedCandidate {
        classified: ClassifiedCandidate {
            candidate,
            metric_type: metric_type.to_string(),
            sector: sector.to_string(),
            sector_confidence: 0.0,
        },
        penalty: 1.0,
        issues: Vec::new(),
        protected: false,
    }
}

#[test]
fn percent_extraction_yields_canonical_candidate_with_year() {
    let generator = CandidateGenerator::new().unwrap();
    let config = SchemaConfig::builtin().unwrap();
    let doc = make_doc("Cloud adoption reached 45% across surveyed firms in 2023.");

    let generated = generator.generate(&doc, &config, None);
    let percent: Vec<_> = generated
        .candidates
        .iter()
        .filter(|candidate| candidate.unit == UNIT_PERCENT)
        .collect();

    assert_eq!(percent.len(), 1);
    assert_eq!(percent[0].value, 45.0);
    assert_eq!(percent[0].year, Some(2023));
    assert!(percent[0].context.contains("Cloud adoption"));
}

#[test]
fn currency_magnitudes_normalize_to_millions() {
    let generator = CandidateGenerator::new().unwrap();
    let config = SchemaConfig::builtin().unwrap();
    let doc = make_doc("Venture funding totalled $2.5 billion during the year.");

    let generated = generator.generate(&doc, &config, None);
    let currency: Vec<_> = generated
        .candidates
        .iter()
        .filter(|candidate| candidate.unit == UNIT_USD_MILLIONS)
        .collect();

    assert_eq!(currency.len(), 1);
    assert!((currency[0].value - 2500.0).abs() < 1e-9);
}

#[test]
fn count_magnitudes_normalize_to_absolute_numbers() {
    let generator = CandidateGenerator::new().unwrap();
    let config = SchemaConfig::builtin().unwrap();
    let doc = make_doc("The sector added 3 million jobs over the decade.");

    let generated = generator.generate(&doc, &config, None);
    let counts: Vec<_> = generated
        .candidates
        .iter()
        .filter(|candidate| candidate.unit == UNIT_COUNT)
        .collect();

    assert_eq!(counts.len(), 1);
    assert!((counts[0].value - 3_000_000.0).abs() < 1e-9);
}

#[test]
fn missing_tables_yield_empty_table_strategy_output() {
    let generator = CandidateGenerator::new().unwrap();
    let config = SchemaConfig::builtin().unwrap();
    let doc = DocumentInput {
        doc_id: "doc-1".to_string(),
        publisher: None,
        reporting_year: None,
        pages: vec![PageInput {
            page: 1,
            text: String::new(),
            tables: Vec::new(),
        }],
    };

    let generated = generator.generate(&doc, &config, None);
    assert!(generated.candidates.is_empty());
    assert!(!generated.budget_exhausted);
}

#[test]
fn table_cells_take_units_from_row_and_header_labels() {
    let generator = CandidateGenerator::new().unwrap();
    let config = SchemaConfig::builtin().unwrap();
    let mut doc = make_doc("");
    doc.pages[0].tables = vec![TableInput {
        cells: vec![
            TableCellInput {
                row_label: "AI adoption".to_string(),
                col_header: "Share (%)".to_string(),
                text: "62".to_string(),
            },
            TableCellInput {
                row_label: "Funding".to_string(),
                col_header: "USD billion".to_string(),
                text: "1.2".to_string(),
            },
            TableCellInput {
                row_label: "Notes".to_string(),
                col_header: "".to_string(),
                text: "n/a".to_string(),
            },
        ],
    }];

    let generated = generator.generate(&doc, &config, None);
    assert_eq!(generated.candidates.len(), 2);
    assert_eq!(generated.candidates[0].unit, UNIT_PERCENT);
    assert_eq!(generated.candidates[0].value, 62.0);
    assert_eq!(generated.candidates[1].unit, UNIT_USD_MILLIONS);
    assert!((generated.candidates[1].value - 1200.0).abs() < 1e-9);
    assert!(generated.candidates[0].context.contains("AI adoption"));
}

#[test]
fn publisher_patterns_carry_high_base_confidence_and_hint() {
    let generator = CandidateGenerator::new().unwrap();
    let config = SchemaConfig::builtin().unwrap();
    let mut doc = make_doc("The adoption rate reached 61.5% among manufacturers.");
    doc.publisher = Some("oecd_outlook".to_string());

    let generated = generator.generate(&doc, &config, None);
    let publisher: Vec<_> = generated
        .candidates
        .iter()
        .filter(|candidate| candidate.method == ExtractionMethod::Publisher)
        .collect();

    assert_eq!(publisher.len(), 1);
    assert!(publisher[0].base_confidence >= 0.85);
    assert_eq!(publisher[0].metric_type_hint.as_deref(), Some("adoption"));
}

#[test]
fn citation_year_next_to_marker_is_tagged_at_generation() {
    let generator = CandidateGenerator::new().unwrap();
    let config = SchemaConfig::builtin().unwrap();
    let doc = make_doc("Smith (2024) surveyed 2024 firms about their tooling.");

    let generated = generator.generate(&doc, &config, None);
    let tagged: Vec<_> = generated
        .candidates
        .iter()
        .filter(|candidate| candidate.value == 2024.0)
        .collect();

    assert!(!tagged.is_empty());
    assert!(tagged.iter().all(|candidate| candidate.citation_candidate));
}

#[test]
fn citation_candidates_never_reach_final_output() {
    let pipeline = Pipeline::new(ScoreThresholds::default()).unwrap();
    let config = SchemaConfig::builtin().unwrap();
    let doc = make_doc("Smith (2024) argues adoption is rising, citing 2024 firms in total.");

    let outcome = pipeline.process_document(&doc, &config, None);

    assert!(outcome.metrics.iter().all(|metric| metric.value != 2024.0));
    assert!(
        outcome
            .review_queue
            .iter()
            .all(|record| record.value != 2024.0)
    );
    assert!(outcome.summary.rejected_citation >= 1);
}

#[test]
fn sector_scoring_prefers_keyword_dense_sector() {
    let config = SchemaConfig::builtin().unwrap();
    let candidate = make_candidate(
        30.0,
        UNIT_PERCENT,
        "adoption of software and cloud platforms across technology startups and digital services",
    );

    let classified = classify(candidate, &config);
    assert_eq!(classified.sector, "technology");
    assert!(classified.sector_confidence >= 0.1);
}

#[test]
fn weak_sector_signal_falls_back_to_unknown() {
    let config = SchemaConfig::builtin().unwrap();
    let candidate = make_candidate(30.0, UNIT_PERCENT, "adoption of the new approach was broad");

    let classified = classify(candidate, &config);
    assert_eq!(classified.sector, SECTOR_UNKNOWN);
}

#[test]
fn metric_type_matching_is_priority_ordered() {
    let config = SchemaConfig::builtin().unwrap();
    // Context satisfies both adoption and growth; adoption has priority.
    let candidate = make_candidate(
        12.0,
        UNIT_PERCENT,
        "adoption grew strongly, with growth in usage reported across firms",
    );

    let classified = classify(candidate, &config);
    assert_eq!(classified.metric_type, "adoption");
}

#[test]
fn unmatched_candidates_become_unclassified_not_errors() {
    let config = SchemaConfig::builtin().unwrap();
    let candidate = make_candidate(
        12.0,
        UNIT_PERCENT,
        "an unremarkable figure appeared in the middle of the document text",
    );

    let classified = classify(candidate, &config);
    assert_eq!(classified.metric_type, METRIC_UNCLASSIFIED);
}

#[test]
fn meaningful_zero_survives_validation() {
    let config = SchemaConfig::builtin().unwrap();
    let validator = Validator::new(default_cross_metric_rules()).unwrap();
    let candidate = make_candidate(
        0.0,
        UNIT_PERCENT,
        "the survey found 0% adoption among small firms in the region",
    );
    let classified = classify(candidate, &config);

    let outcome = validator.validate(classified, Some(2024), &config);
    assert!(matches!(outcome, ValidationOutcome::Passed(_)));
}

#[test]
fn bare_zero_without_keywords_is_rejected() {
    let config = SchemaConfig::builtin().unwrap();
    let validator = Validator::new(default_cross_metric_rules()).unwrap();
    let candidate = make_candidate(0.0, UNIT_PERCENT, "0%");
    let classified = classify(candidate, &config);

    match validator.validate(classified, Some(2024), &config) {
        ValidationOutcome::Rejected { cause, .. } => assert_eq!(cause, RejectCause::Schema),
        ValidationOutcome::Passed(_) => panic!("bare zero should be rejected"),
    }
}

#[test]
fn reporting_year_value_in_citation_context_is_discarded() {
    let config = SchemaConfig::builtin().unwrap();
    let validator = Validator::new(default_cross_metric_rules()).unwrap();
    let candidate = make_candidate(
        2024.0,
        UNIT_COUNT,
        "as discussed in the journal paper covering this topic at length",
    );
    let classified = classify(candidate, &config);

    match validator.validate(classified, Some(2024), &config) {
        ValidationOutcome::Rejected { cause, .. } => assert_eq!(cause, RejectCause::Citation),
        ValidationOutcome::Passed(_) => panic!("reporting-year citation should be rejected"),
    }
}

#[test]
fn invalid_unit_is_a_hard_reject_even_for_protected_context() {
    let config = SchemaConfig::builtin().unwrap();
    let validator = Validator::new(default_cross_metric_rules()).unwrap();
    let candidate = make_candidate(
        5.0,
        UNIT_USD_MILLIONS,
        "employment support for women-owned firms and workers",
    );
    let classified = ClassifiedCandidate {
        candidate,
        metric_type: "employment".to_string(),
        sector: SECTOR_UNKNOWN.to_string(),
        sector_confidence: 0.0,
    };

    match validator.validate(classified, Some(2024), &config) {
        ValidationOutcome::Rejected { cause, .. } => assert_eq!(cause, RejectCause::Schema),
        ValidationOutcome::Passed(_) => panic!("invalid unit must hard-reject"),
    }
}

#[test]
fn zero_employment_with_large_headcount_hits_cross_rule() {
    let config = SchemaConfig::builtin().unwrap();
    let validator = Validator::new(default_cross_metric_rules()).unwrap();
    // "reported" keeps the zero meaningful, so the schema zero check passes
    // and the cross-metric rule is the one that fires.
    let candidate = make_candidate(
        0.0,
        UNIT_COUNT,
        "the plant reported 0 jobs lost even though 12,000 workers were affected",
    );
    let classified = ClassifiedCandidate {
        candidate,
        metric_type: "employment".to_string(),
        sector: SECTOR_UNKNOWN.to_string(),
        sector_confidence: 0.0,
    };

    match validator.validate(classified, Some(2024), &config) {
        ValidationOutcome::Rejected { cause, .. } => assert_eq!(cause, RejectCause::CrossMetric),
        ValidationOutcome::Passed(_) => panic!("zero-with-headcount should be rejected"),
    }
}

#[test]
fn cross_metric_engine_applies_rules_in_order() {
    let config = SchemaConfig::builtin().unwrap();
    let rules = vec![
        CrossMetricRule {
            name: "attenuate_everything".to_string(),
            condition: CrossCondition::default(),
            action: RuleAction::Penalize(0.9),
        },
        CrossMetricRule {
            name: "reject_everything".to_string(),
            condition: CrossCondition::default(),
            action: RuleAction::Reject,
        },
    ];
    let validator = Validator::new(rules).unwrap();
    let candidate = make_candidate(
        5.0,
        UNIT_PERCENT,
        "growth of output reported in the annual statistics",
    );
    let classified = classify(candidate, &config);

    match validator.validate(classified, Some(2024), &config) {
        ValidationOutcome::Rejected { reason, .. } => {
            assert!(reason.contains("reject_everything"));
        }
        ValidationOutcome::Passed(_) => panic!("reject rule should short-circuit"),
    }
}

#[test]
fn schema_penalties_multiply_into_validation_penalty() {
    let config = SchemaConfig::builtin().unwrap();
    let validator = Validator::new(Vec::new()).unwrap();
    // Classified by hint but missing the required keyword: x0.8.
    let mut candidate = make_candidate(
        40.0,
        UNIT_PERCENT,
        "a broad figure described without any of the expected vocabulary",
    );
    candidate.metric_type_hint = Some("adoption".to_string());
    let classified = ClassifiedCandidate {
        candidate,
        metric_type: "adoption".to_string(),
        sector: SECTOR_UNKNOWN.to_string(),
        sector_confidence: 0.0,
    };

    match validator.validate(classified, Some(2024), &config) {
        ValidationOutcome::Passed(validated) => {
            assert!((validated.penalty - 0.8).abs() < 1e-9);
            assert_eq!(validated.issues.len(), 1);
        }
        ValidationOutcome::Rejected { reason, .. } => panic!("unexpected reject: {reason}"),
    }
}

#[test]
fn percent_values_round_to_one_decimal_for_the_semantic_key() {
    assert_eq!(scaled_value(85.04, UNIT_PERCENT), 850);
    assert_eq!(scaled_value(85.06, UNIT_PERCENT), 851);
    assert_eq!(scaled_value(1234.4, UNIT_USD_MILLIONS), 1234);
}

#[test]
fn duplicate_candidates_collapse_to_highest_confidence() {
    let deduplicator = Deduplicator::new().unwrap();
    let duplicate_context = "adoption of 85.0% reported across surveyed firms";
    let a = make_validated(85.0, UNIT_PERCENT, "adoption", "unknown", 0.8, duplicate_context, 10);
    let b = make_validated(85.0, UNIT_PERCENT, "adoption", "unknown", 0.6, duplicate_context, 90);

    let outcome = deduplicator.dedup(vec![a, b]);

    assert_eq!(outcome.kept.len(), 1);
    assert_eq!(outcome.duplicate_groups_collapsed, 1);
    assert!((interim_confidence(&outcome.kept[0].validated) - 0.8).abs() < 1e-9);
    assert_eq!(outcome.kept[0].merged_candidate_ids.len(), 2);
    assert_eq!(outcome.merged.len(), 1);
    // The merge record carries the losing candidate's interim confidence.
    assert!((outcome.merged[0].2 - 0.6).abs() < 1e-9);
}

#[test]
fn dedup_ties_break_toward_the_earlier_document_position() {
    let deduplicator = Deduplicator::new().unwrap();
    let context = "adoption of 40% reported in the sector overview";
    let early = make_validated(40.0, UNIT_PERCENT, "adoption", "unknown", 0.7, context, 10);
    let late = make_validated(40.0, UNIT_PERCENT, "adoption", "unknown", 0.7, context, 90);

    let outcome = deduplicator.dedup(vec![early, late]);
    assert_eq!(outcome.kept.len(), 1);
    assert_eq!(outcome.kept[0].validated.classified.candidate.offset, 10);
}

#[test]
fn contradictory_values_with_comparative_context_are_preserved() {
    let deduplicator = Deduplicator::new().unwrap();
    let context = "while the US reported only 12%, Germany reached 45% adoption overall";
    let low = make_validated(12.0, UNIT_PERCENT, "adoption", "unknown", 0.7, context, 10);
    let high = make_validated(45.0, UNIT_PERCENT, "adoption", "unknown", 0.7, context, 40);

    let outcome = deduplicator.dedup(vec![low, high]);

    assert_eq!(outcome.kept.len(), 2);
    assert_eq!(outcome.contradictions_preserved, 2);
}

#[test]
fn contrast_groups_still_collapse_near_equal_members() {
    let deduplicator = Deduplicator::new().unwrap();
    let context = "while one region reached 45%, others reported 85% and 86% adoption";
    let a = make_validated(85.0, UNIT_PERCENT, "adoption", "unknown", 0.8, context, 10);
    let b = make_validated(86.0, UNIT_PERCENT, "adoption", "unknown", 0.6, context, 40);
    let c = make_validated(45.0, UNIT_PERCENT, "adoption", "unknown", 0.7, context, 70);

    let outcome = deduplicator.dedup(vec![a, b, c]);

    // 85 and 86 are within the noise gap of each other; only the contrast
    // against 45 survives as a second observation.
    assert_eq!(outcome.kept.len(), 2);
    assert_eq!(outcome.contradictions_preserved, 2);
    let values: Vec<f64> = outcome
        .kept
        .iter()
        .map(|entry| entry.validated.classified.candidate.value)
        .collect();
    assert!(values.contains(&45.0));
    assert!(values.contains(&85.0));
    assert!(!values.contains(&86.0));
}

#[test]
fn divergent_values_without_contrast_language_collapse_to_best() {
    let deduplicator = Deduplicator::new().unwrap();
    let a = make_validated(
        12.0,
        UNIT_PERCENT,
        "adoption",
        "unknown",
        0.6,
        "adoption of 12% reported in the first chapter",
        10,
    );
    let b = make_validated(
        45.0,
        UNIT_PERCENT,
        "adoption",
        "unknown",
        0.8,
        "adoption of 45% reported in the annex tables",
        40,
    );

    let outcome = deduplicator.dedup(vec![a, b]);

    assert_eq!(outcome.kept.len(), 1);
    assert_eq!(
        outcome.kept[0].validated.classified.candidate.value,
        45.0
    );
}

#[test]
fn protected_candidates_bypass_duplicate_removal() {
    let deduplicator = Deduplicator::new().unwrap();
    let context = "adoption among women-owned enterprises stood at 15% in the survey";
    let mut a = make_validated(15.0, UNIT_PERCENT, "adoption", "unknown", 0.8, context, 10);
    let mut b = make_validated(15.0, UNIT_PERCENT, "adoption", "unknown", 0.6, context, 40);
    a.protected = true;
    b.protected = true;

    let outcome = deduplicator.dedup(vec![a, b]);
    assert_eq!(outcome.kept.len(), 2);
    assert_eq!(outcome.merged.len(), 0);
}

#[test]
fn scorer_caps_confidence_and_routes_by_threshold() {
    let long_context = "c".repeat(250);
    let mut validated = make_validated(
        50.0,
        UNIT_PERCENT,
        "adoption",
        "technology",
        0.95,
        &long_context,
        10,
    );
    validated.classified.sector_confidence = 1.0;
    let deduped = DedupedCandidate {
        merged_candidate_ids: vec![validated.classified.candidate.candidate_id.clone()],
        merged_methods: 1,
        validated,
    };

    let scored = score(deduped, ScoreThresholds::default());
    assert!((scored.final_confidence - 0.99).abs() < 1e-9);
    assert_eq!(scored.route, Route::Accept);
}

#[test]
fn short_context_attenuates_and_low_scores_drop() {
    let mut validated = make_validated(50.0, UNIT_PERCENT, "adoption", "unknown", 0.7, "tiny", 10);
    validated.penalty = 0.5;
    let deduped = DedupedCandidate {
        merged_candidate_ids: vec![validated.classified.candidate.candidate_id.clone()],
        merged_methods: 1,
        validated,
    };

    let scored = score(deduped, ScoreThresholds::default());
    // 0.7 x 0.5 x 0.7 x 0.8 = 0.196
    assert!(scored.final_confidence < 0.3);
    assert_eq!(scored.route, Route::Drop);
}

#[test]
fn protected_low_confidence_candidates_go_to_review_instead_of_drop() {
    let mut validated = make_validated(50.0, UNIT_PERCENT, "adoption", "unknown", 0.7, "tiny", 10);
    validated.penalty = 0.5;
    validated.protected = true;
    let deduped = DedupedCandidate {
        merged_candidate_ids: vec![validated.classified.candidate.candidate_id.clone()],
        merged_methods: 1,
        validated,
    };

    let scored = score(deduped, ScoreThresholds::default());
    assert!(scored.final_confidence < 0.3);
    assert_eq!(scored.route, Route::Review);
}

#[test]
fn unclassified_candidates_never_auto_accept() {
    let long_context = "c".repeat(250);
    let mut validated = make_validated(
        50.0,
        UNIT_PERCENT,
        METRIC_UNCLASSIFIED,
        "technology",
        0.95,
        &long_context,
        10,
    );
    validated.classified.sector_confidence = 1.0;
    let deduped = DedupedCandidate {
        merged_candidate_ids: vec![validated.classified.candidate.candidate_id.clone()],
        merged_methods: 1,
        validated,
    };

    let scored = score(deduped, ScoreThresholds::default());
    assert!(scored.final_confidence >= 0.8);
    assert_eq!(scored.route, Route::Review);
}

#[test]
fn merged_dispositions_carry_the_losing_confidence() {
    let mut aggregator = Aggregator::new("doc-1");
    aggregator.record_merge("cand-b", "doc-1", "cand-a", 0.6);

    assert_eq!(aggregator.dispositions.len(), 1);
    assert_eq!(aggregator.dispositions[0].disposition, "merged_duplicate");
    assert!((aggregator.dispositions[0].confidence - 0.6).abs() < 1e-9);
}

#[test]
fn accepted_metrics_respect_declared_ranges() {
    let pipeline = Pipeline::new(ScoreThresholds::default()).unwrap();
    let config = SchemaConfig::builtin().unwrap();
    let mut doc = make_doc(
        "The adoption rate reached 61.5% among manufacturers in 2024. Industrial production \
         and factory automation spending rose as Siemens and other manufacturing groups \
         expanded assembly lines; supply chain digitisation was reported across plants.",
    );
    doc.publisher = Some("oecd_outlook".to_string());

    let outcome = pipeline.process_document(&doc, &config, None);

    for metric in &outcome.metrics {
        let def = config
            .metric_definition(&metric.metric_type)
            .unwrap_or_else(|| panic!("accepted metric without definition: {}", metric.metric_type));
        let (min, max) = def.range_for(&metric.unit).expect("range for accepted unit");
        assert!(metric.value >= min && metric.value <= max);
        assert!(metric.confidence > 0.0 && metric.confidence <= 0.99);
    }
}

#[test]
fn pipeline_rerun_on_identical_input_is_idempotent() {
    let pipeline = Pipeline::new(ScoreThresholds::default()).unwrap();
    let config = SchemaConfig::builtin().unwrap();
    let mut doc = make_doc(
        "The adoption rate reached 61.5% among manufacturers in 2024, while legacy plants \
         reported only 23% adoption. Venture funding totalled $2.5 billion, and the industry \
         added 120 thousand jobs across industrial production sites.",
    );
    doc.publisher = Some("oecd_outlook".to_string());

    let first = pipeline.process_document(&doc, &config, None);
    let second = pipeline.process_document(&doc, &config, None);

    let first_json = serde_json::to_string(&first.metrics).unwrap();
    let second_json = serde_json::to_string(&second.metrics).unwrap();
    assert_eq!(first_json, second_json);

    let first_dispositions = serde_json::to_string(&first.dispositions).unwrap();
    let second_dispositions = serde_json::to_string(&second.dispositions).unwrap();
    assert_eq!(first_dispositions, second_dispositions);
}

#[test]
fn every_candidate_receives_a_disposition() {
    let pipeline = Pipeline::new(ScoreThresholds::default()).unwrap();
    let config = SchemaConfig::builtin().unwrap();
    let doc = make_doc(
        "Adoption stood at 34% among surveyed firms. Smith (2024) argues adoption is rising, \
         citing 2024 firms. Funding reached $40 million for the programme.",
    );

    let outcome = pipeline.process_document(&doc, &config, None);

    // Merged duplicates add extra audit rows on top of per-candidate ones.
    assert!(outcome.dispositions.len() >= outcome.summary.total_candidates);
    assert!(outcome.summary.total_candidates > 0);
}
