use anyhow::{Context, Result};
use regex::Regex;

use crate::model::{ClassifiedCandidate, ValidatedCandidate};
use crate::pipeline::classify::METRIC_UNCLASSIFIED;
use crate::schema::{SchemaConfig, UNIT_USD_MILLIONS};

const PENALTY_UNIT_NOT_VALID: f64 = 0.85;
const PENALTY_OUT_OF_RANGE: f64 = 0.7;
const PENALTY_MISSING_REQUIRED: f64 = 0.8;
const PENALTY_EXCLUDED_PRESENT: f64 = 0.6;
const PENALTY_UNCLASSIFIED: f64 = 0.8;

const CITATION_KEYWORDS: [&str; 5] = ["paper", "study", "journal", "proceedings", "et al"];
const SURVEY_KEYWORDS: [&str; 8] = [
    "survey",
    "study",
    "finding",
    "observed",
    "reported",
    "no change",
    "remained flat",
    "found",
];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RejectCause {
    Citation,
    Schema,
    CrossMetric,
}

#[derive(Debug)]
pub enum ValidationOutcome {
    Rejected { cause: RejectCause, reason: String },
    Passed(ValidatedCandidate),
}

#[derive(Debug, Clone, Default)]
pub struct CrossCondition {
    /// Empty matches any metric type.
    pub metric_types: Vec<String>,
    /// Empty matches any unit.
    pub units: Vec<String>,
    pub zero_value: Option<bool>,
    pub context_any: Vec<String>,
    /// Matches when the context carries a standalone number at or above
    /// this threshold (e.g. a headcount next to a zero observation).
    pub context_number_at_least: Option<f64>,
}

#[derive(Debug, Clone)]
pub enum RuleAction {
    Reject,
    Penalize(f64),
}

/// One entry of the ordered cross-metric rule list. Evaluated by a single
/// generic engine; the first matching reject short-circuits.
#[derive(Debug, Clone)]
pub struct CrossMetricRule {
    pub name: String,
    pub condition: CrossCondition,
    pub action: RuleAction,
}

pub fn default_cross_metric_rules() -> Vec<CrossMetricRule> {
    vec![
        CrossMetricRule {
            name: "financial_unit_for_employment".to_string(),
            condition: CrossCondition {
                metric_types: vec!["employment".to_string()],
                units: vec![UNIT_USD_MILLIONS.to_string()],
                ..CrossCondition::default()
            },
            action: RuleAction::Reject,
        },
        CrossMetricRule {
            name: "zero_employment_with_headcount".to_string(),
            condition: CrossCondition {
                metric_types: vec!["employment".to_string()],
                zero_value: Some(true),
                context_number_at_least: Some(1_000.0),
                ..CrossCondition::default()
            },
            action: RuleAction::Reject,
        },
    ]
}

pub struct Validator {
    rules: Vec<CrossMetricRule>,
    large_number: Regex,
}

impl Validator {
    pub fn new(rules: Vec<CrossMetricRule>) -> Result<Self> {
        Ok(Self {
            rules,
            large_number: Regex::new(r"\b\d[\d,]*(?:\.\d+)?\b")
                .context("failed to compile number pattern")?,
        })
    }

    /// Applies citation filter, carve-outs, schema rules, and cross-metric
    /// rules in that order. Rejections are permanent and carry the reason.
    pub fn validate(
        &self,
        classified: ClassifiedCandidate,
        reporting_year: Option<i64>,
        config: &SchemaConfig,
    ) -> ValidationOutcome {
        let context_lower = classified.candidate.context.to_lowercase();

        // Citation filter runs first and nothing bypasses it.
        if classified.candidate.citation_candidate {
            return ValidationOutcome::Rejected {
                cause: RejectCause::Citation,
                reason: "value adjacent to citation marker".to_string(),
            };
        }
        if let Some(reporting_year) = reporting_year
            && classified.candidate.value == reporting_year as f64
            && CITATION_KEYWORDS
                .iter()
                .any(|keyword| context_lower.contains(keyword))
        {
            return ValidationOutcome::Rejected {
                cause: RejectCause::Citation,
                reason: format!("value equals reporting year {reporting_year} in citation context"),
            };
        }

        let def = config.metric_definition(&classified.metric_type);
        let survey_context = SURVEY_KEYWORDS
            .iter()
            .any(|keyword| context_lower.contains(keyword));
        let meaningful_zero = classified.candidate.value == 0.0
            && (def.is_some_and(|def| def.zero_valid) || survey_context);
        let protected = config.is_protected_context(&classified.candidate.context);

        let mut penalty = 1.0;
        let mut issues = Vec::new();

        match def {
            Some(def) => {
                if def
                    .invalid_units
                    .iter()
                    .any(|unit| unit == &classified.candidate.unit)
                {
                    // Hard unit violations are not protected.
                    return ValidationOutcome::Rejected {
                        cause: RejectCause::Schema,
                        reason: format!(
                            "unit {} is invalid for metric type {}",
                            classified.candidate.unit, classified.metric_type
                        ),
                    };
                }

                if classified.candidate.value == 0.0 && !meaningful_zero {
                    return ValidationOutcome::Rejected {
                        cause: RejectCause::Schema,
                        reason: "zero value without survey or finding context".to_string(),
                    };
                }

                if !def
                    .valid_units
                    .iter()
                    .any(|unit| unit == &classified.candidate.unit)
                {
                    penalty *= PENALTY_UNIT_NOT_VALID;
                    issues.push(format!(
                        "unit {} not declared valid for {}",
                        classified.candidate.unit, classified.metric_type
                    ));
                }

                match def.range_for(&classified.candidate.unit) {
                    Some((min, max)) => {
                        if classified.candidate.value < min || classified.candidate.value > max {
                            penalty *= PENALTY_OUT_OF_RANGE;
                            issues.push(format!(
                                "value {} outside [{min}, {max}] for unit {}",
                                classified.candidate.value, classified.candidate.unit
                            ));
                        }
                    }
                    None => {
                        if classified.candidate.value < 0.0 && !def.negative_valid {
                            penalty *= PENALTY_OUT_OF_RANGE;
                            issues.push("negative value not expected for this type".to_string());
                        }
                    }
                }

                if !def.required_context.iter().any(|keyword| {
                    context_lower.contains(keyword.to_lowercase().as_str())
                }) {
                    penalty *= PENALTY_MISSING_REQUIRED;
                    issues.push("required context keyword missing".to_string());
                }

                if def.excluded_context.iter().any(|keyword| {
                    context_lower.contains(keyword.to_lowercase().as_str())
                }) {
                    penalty *= PENALTY_EXCLUDED_PRESENT;
                    issues.push("excluded context keyword present".to_string());
                }
            }
            None => {
                if classified.metric_type == METRIC_UNCLASSIFIED {
                    if classified.candidate.value == 0.0 && !meaningful_zero {
                        return ValidationOutcome::Rejected {
                            cause: RejectCause::Schema,
                            reason: "zero value without survey or finding context".to_string(),
                        };
                    }
                    penalty *= PENALTY_UNCLASSIFIED;
                    issues.push("no metric definition matched".to_string());
                }
            }
        }

        for rule in &self.rules {
            if !self.condition_matches(&rule.condition, &classified, &context_lower) {
                continue;
            }
            match rule.action {
                RuleAction::Reject => {
                    return ValidationOutcome::Rejected {
                        cause: RejectCause::CrossMetric,
                        reason: format!("cross-metric rule {}", rule.name),
                    };
                }
                RuleAction::Penalize(factor) => {
                    penalty *= factor;
                    issues.push(format!("cross-metric penalty {}", rule.name));
                }
            }
        }

        ValidationOutcome::Passed(ValidatedCandidate {
            classified,
            penalty,
            issues,
            protected,
        })
    }

    fn condition_matches(
        &self,
        condition: &CrossCondition,
        classified: &ClassifiedCandidate,
        context_lower: &str,
    ) -> bool {
        if !condition.metric_types.is_empty()
            && !condition
                .metric_types
                .iter()
                .any(|metric_type| metric_type == &classified.metric_type)
        {
            return false;
        }

        if !condition.units.is_empty()
            && !condition
                .units
                .iter()
                .any(|unit| unit == &classified.candidate.unit)
        {
            return false;
        }

        if let Some(zero) = condition.zero_value
            && (classified.candidate.value == 0.0) != zero
        {
            return false;
        }

        if !condition.context_any.is_empty()
            && !condition
                .context_any
                .iter()
                .any(|needle| context_lower.contains(needle))
        {
            return false;
        }

        if let Some(threshold) = condition.context_number_at_least {
            let found = self.large_number.find_iter(context_lower).any(|m| {
                m.as_str()
                    .replace(',', "")
                    .parse::<f64>()
                    .is_ok_and(|value| value >= threshold)
            });
            if !found {
                return false;
            }
        }

        true
    }
}
