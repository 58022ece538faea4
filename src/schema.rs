use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::util::load_json;

pub const UNIT_PERCENT: &str = "percent";
pub const UNIT_USD_MILLIONS: &str = "usd_millions";
pub const UNIT_COUNT: &str = "count";

/// Per-metric-type validation schema. Configuration data, not code: new
/// metric types are a data change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub metric_type: String,
    pub priority: u32,
    #[serde(default)]
    pub valid_units: Vec<String>,
    #[serde(default)]
    pub invalid_units: Vec<String>,
    /// unit -> [min, max] inclusive.
    #[serde(default)]
    pub ranges: BTreeMap<String, (f64, f64)>,
    #[serde(default)]
    pub required_context: Vec<String>,
    #[serde(default)]
    pub excluded_context: Vec<String>,
    #[serde(default)]
    pub zero_valid: bool,
    #[serde(default)]
    pub negative_valid: bool,
}

impl MetricDefinition {
    pub fn range_for(&self, unit: &str) -> Option<(f64, f64)> {
        self.ranges.get(unit).copied()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorDefinition {
    pub sector: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub metric_categories: Vec<String>,
}

#[derive(Debug)]
pub struct CompiledSector {
    pub def: SectorDefinition,
    pub patterns: Vec<Regex>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherPattern {
    pub pattern: String,
    pub unit: String,
    #[serde(default)]
    pub metric_type: Option<String>,
    /// Multiplier applied to the captured value to reach the canonical unit.
    #[serde(default = "default_scale")]
    pub scale: f64,
    pub confidence: f64,
}

fn default_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherRuleSet {
    pub publisher: String,
    pub patterns: Vec<PublisherPattern>,
}

#[derive(Debug)]
pub struct CompiledPublisherPattern {
    pub regex: Regex,
    pub unit: String,
    pub metric_type: Option<String>,
    pub scale: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MetricsFile {
    metrics: Vec<MetricDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SectorsFile {
    sectors: Vec<SectorDefinition>,
    #[serde(default)]
    protected_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PublishersFile {
    publishers: Vec<PublisherRuleSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntityHintsFile {
    hints: HashMap<String, String>,
}

/// Read-only keyword/pattern tables shared across all documents of a run.
/// Loaded once and passed explicitly; nothing here mutates after load.
#[derive(Debug)]
pub struct SchemaConfig {
    /// Sorted ascending by priority; first match wins.
    pub metrics: Vec<MetricDefinition>,
    pub sectors: Vec<CompiledSector>,
    pub publishers: HashMap<String, Vec<CompiledPublisherPattern>>,
    /// Lowercased entity -> sector.
    pub entity_hints: HashMap<String, String>,
    pub protected_patterns: Vec<Regex>,
}

impl SchemaConfig {
    pub fn load(
        metrics_path: Option<&Path>,
        sectors_path: Option<&Path>,
        publishers_path: Option<&Path>,
        entity_hints_path: Option<&Path>,
    ) -> Result<Self> {
        let metrics = match metrics_path {
            Some(path) => load_json::<MetricsFile>(path)?.metrics,
            None => default_metric_definitions(),
        };

        let (sector_defs, protected_sources) = match sectors_path {
            Some(path) => {
                let file = load_json::<SectorsFile>(path)?;
                (file.sectors, file.protected_patterns)
            }
            None => (default_sector_definitions(), default_protected_patterns()),
        };

        let publishers = match publishers_path {
            Some(path) => load_json::<PublishersFile>(path)?.publishers,
            None => default_publisher_rule_sets(),
        };

        let entity_hints = match entity_hints_path {
            Some(path) => load_json::<EntityHintsFile>(path)?.hints,
            None => default_entity_hints(),
        };

        Self::build(metrics, sector_defs, publishers, entity_hints, protected_sources)
    }

    pub fn builtin() -> Result<Self> {
        Self::build(
            default_metric_definitions(),
            default_sector_definitions(),
            default_publisher_rule_sets(),
            default_entity_hints(),
            default_protected_patterns(),
        )
    }

    fn build(
        mut metrics: Vec<MetricDefinition>,
        sector_defs: Vec<SectorDefinition>,
        publisher_sets: Vec<PublisherRuleSet>,
        entity_hints: HashMap<String, String>,
        protected_sources: Vec<String>,
    ) -> Result<Self> {
        if metrics.is_empty() {
            bail!("metric definition table is empty");
        }
        metrics.sort_by_key(|def| def.priority);

        let mut sectors = Vec::with_capacity(sector_defs.len());
        for def in sector_defs {
            let mut patterns = Vec::with_capacity(def.patterns.len());
            for source in &def.patterns {
                let regex = Regex::new(&format!("(?i){source}")).with_context(|| {
                    format!("invalid pattern for sector {}: {source}", def.sector)
                })?;
                patterns.push(regex);
            }
            sectors.push(CompiledSector { def, patterns });
        }

        let mut publishers = HashMap::new();
        for set in publisher_sets {
            let mut compiled = Vec::with_capacity(set.patterns.len());
            for pattern in set.patterns {
                let regex = Regex::new(&pattern.pattern).with_context(|| {
                    format!(
                        "invalid pattern for publisher {}: {}",
                        set.publisher, pattern.pattern
                    )
                })?;
                compiled.push(CompiledPublisherPattern {
                    regex,
                    unit: pattern.unit,
                    metric_type: pattern.metric_type,
                    scale: pattern.scale,
                    confidence: pattern.confidence.clamp(0.85, 0.95),
                });
            }
            publishers.insert(set.publisher, compiled);
        }

        let entity_hints = entity_hints
            .into_iter()
            .map(|(entity, sector)| (entity.to_lowercase(), sector))
            .collect();

        let mut protected_patterns = Vec::with_capacity(protected_sources.len());
        for source in &protected_sources {
            let regex = Regex::new(&format!("(?i){source}"))
                .with_context(|| format!("invalid protected-category pattern: {source}"))?;
            protected_patterns.push(regex);
        }

        Ok(Self {
            metrics,
            sectors,
            publishers,
            entity_hints,
            protected_patterns,
        })
    }

    pub fn publisher_patterns(&self, publisher: &str) -> &[CompiledPublisherPattern] {
        self.publishers
            .get(publisher)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn metric_definition(&self, metric_type: &str) -> Option<&MetricDefinition> {
        self.metrics
            .iter()
            .find(|def| def.metric_type == metric_type)
    }

    pub fn is_protected_context(&self, context: &str) -> bool {
        self.protected_patterns
            .iter()
            .any(|pattern| pattern.is_match(context))
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub fn default_metric_definitions() -> Vec<MetricDefinition> {
    vec![
        MetricDefinition {
            metric_type: "adoption".to_string(),
            priority: 1,
            valid_units: strings(&[UNIT_PERCENT]),
            invalid_units: strings(&[UNIT_USD_MILLIONS]),
            ranges: BTreeMap::from([(UNIT_PERCENT.to_string(), (0.0, 100.0))]),
            required_context: strings(&[
                "adoption", "adopted", "adopt", "usage", "using", "penetration", "uptake",
                "deployed",
            ]),
            excluded_context: strings(&["salary", "wage"]),
            zero_valid: true,
            negative_valid: false,
        },
        MetricDefinition {
            metric_type: "investment".to_string(),
            priority: 2,
            valid_units: strings(&[UNIT_USD_MILLIONS]),
            invalid_units: strings(&[UNIT_PERCENT]),
            ranges: BTreeMap::from([(UNIT_USD_MILLIONS.to_string(), (0.001, 10_000_000.0))]),
            required_context: strings(&[
                "investment", "invested", "funding", "funded", "capital", "venture", "raised",
            ]),
            excluded_context: strings(&["cost savings"]),
            zero_valid: false,
            negative_valid: false,
        },
        MetricDefinition {
            metric_type: "cost".to_string(),
            priority: 3,
            valid_units: strings(&[UNIT_USD_MILLIONS, UNIT_PERCENT]),
            invalid_units: Vec::new(),
            ranges: BTreeMap::from([
                (UNIT_USD_MILLIONS.to_string(), (0.0001, 1_000_000.0)),
                (UNIT_PERCENT.to_string(), (0.0, 100.0)),
            ]),
            required_context: strings(&[
                "cost", "costs", "savings", "saved", "expense", "spending", "reduction",
            ]),
            excluded_context: Vec::new(),
            zero_valid: false,
            negative_valid: false,
        },
        MetricDefinition {
            metric_type: "productivity".to_string(),
            priority: 4,
            valid_units: strings(&[UNIT_PERCENT]),
            invalid_units: strings(&[UNIT_USD_MILLIONS]),
            ranges: BTreeMap::from([(UNIT_PERCENT.to_string(), (-50.0, 500.0))]),
            required_context: strings(&[
                "productivity", "efficiency", "output", "throughput", "performance",
            ]),
            excluded_context: Vec::new(),
            zero_valid: true,
            negative_valid: true,
        },
        MetricDefinition {
            metric_type: "employment".to_string(),
            priority: 5,
            valid_units: strings(&[UNIT_COUNT, UNIT_PERCENT]),
            invalid_units: strings(&[UNIT_USD_MILLIONS]),
            ranges: BTreeMap::from([
                (UNIT_COUNT.to_string(), (1.0, 1_000_000_000.0)),
                (UNIT_PERCENT.to_string(), (-100.0, 100.0)),
            ]),
            required_context: strings(&[
                "jobs", "workers", "employment", "employees", "workforce", "hiring", "headcount",
            ]),
            excluded_context: Vec::new(),
            zero_valid: false,
            negative_valid: true,
        },
        MetricDefinition {
            metric_type: "revenue".to_string(),
            priority: 6,
            valid_units: strings(&[UNIT_USD_MILLIONS]),
            invalid_units: strings(&[UNIT_PERCENT]),
            ranges: BTreeMap::from([(UNIT_USD_MILLIONS.to_string(), (0.001, 10_000_000.0))]),
            required_context: strings(&["revenue", "sales", "turnover", "earnings"]),
            excluded_context: Vec::new(),
            zero_valid: false,
            negative_valid: false,
        },
        MetricDefinition {
            metric_type: "growth".to_string(),
            priority: 7,
            valid_units: strings(&[UNIT_PERCENT]),
            invalid_units: Vec::new(),
            ranges: BTreeMap::from([(UNIT_PERCENT.to_string(), (-100.0, 1_000.0))]),
            required_context: strings(&[
                "growth", "grew", "increase", "increased", "decline", "declined", "cagr",
            ]),
            excluded_context: Vec::new(),
            zero_valid: true,
            negative_valid: true,
        },
    ]
}

pub fn default_sector_definitions() -> Vec<SectorDefinition> {
    vec![
        SectorDefinition {
            sector: "technology".to_string(),
            keywords: strings(&[
                "software",
                "technology",
                "tech",
                "digital",
                "cloud",
                "ai",
                "artificial intelligence",
                "semiconductor",
                "startup",
            ]),
            entities: strings(&["Microsoft", "Google", "IBM", "Intel", "SAP"]),
            patterns: strings(&[r"\b(?:fin|med|agri)?tech\b", r"\bsaas\b", r"\bmachine learning\b"]),
            metric_categories: strings(&["adoption", "investment", "revenue"]),
        },
        SectorDefinition {
            sector: "manufacturing".to_string(),
            keywords: strings(&[
                "manufacturing", "factory", "factories", "industrial", "production", "assembly",
                "automation",
            ]),
            entities: strings(&["Siemens", "Bosch", "Toyota", "Foxconn"]),
            patterns: strings(&[r"\bplant[s]?\b", r"\bsupply chain\b"]),
            metric_categories: strings(&["productivity", "employment", "cost"]),
        },
        SectorDefinition {
            sector: "finance".to_string(),
            keywords: strings(&[
                "bank", "banking", "financial", "finance", "insurance", "lending", "payments",
            ]),
            entities: strings(&["JPMorgan", "Goldman Sachs", "HSBC", "Visa"]),
            patterns: strings(&[r"\bfintech\b", r"\bcapital markets\b"]),
            metric_categories: strings(&["investment", "revenue", "adoption"]),
        },
        SectorDefinition {
            sector: "healthcare".to_string(),
            keywords: strings(&[
                "healthcare", "health", "hospital", "clinical", "medical", "pharmaceutical",
                "patient",
            ]),
            entities: strings(&["Pfizer", "Roche", "Mayo Clinic", "Novartis"]),
            patterns: strings(&[r"\bmedtech\b", r"\blife sciences\b"]),
            metric_categories: strings(&["adoption", "cost", "employment"]),
        },
        SectorDefinition {
            sector: "retail".to_string(),
            keywords: strings(&[
                "retail", "retailer", "e-commerce", "ecommerce", "consumer", "stores", "shopping",
            ]),
            entities: strings(&["Walmart", "Amazon", "Tesco", "Alibaba"]),
            patterns: strings(&[r"\bpoint[- ]of[- ]sale\b", r"\bomni-?channel\b"]),
            metric_categories: strings(&["revenue", "adoption", "growth"]),
        },
        SectorDefinition {
            sector: "agriculture".to_string(),
            keywords: strings(&[
                "agriculture", "farming", "farm", "crop", "crops", "livestock", "agricultural",
            ]),
            entities: strings(&["John Deere", "Cargill", "Bayer"]),
            patterns: strings(&[r"\bagri[- ]?(?:tech|business)\b", r"\bsmallholder[s]?\b"]),
            metric_categories: strings(&["adoption", "productivity", "employment"]),
        },
        SectorDefinition {
            sector: "energy".to_string(),
            keywords: strings(&[
                "energy", "power", "electricity", "renewable", "solar", "wind", "grid", "oil",
            ]),
            entities: strings(&["Shell", "BP", "Siemens Energy", "NextEra"]),
            patterns: strings(&[r"\bclean ?tech\b", r"\bmegawatt[s]?\b"]),
            metric_categories: strings(&["investment", "growth", "cost"]),
        },
        SectorDefinition {
            sector: "education".to_string(),
            keywords: strings(&[
                "education", "school", "schools", "university", "universities", "students",
                "training", "learning",
            ]),
            entities: strings(&["Coursera", "Pearson"]),
            patterns: strings(&[r"\bed[- ]?tech\b", r"\bcurricul(?:um|a)\b"]),
            metric_categories: strings(&["adoption", "employment"]),
        },
    ]
}

pub fn default_publisher_rule_sets() -> Vec<PublisherRuleSet> {
    vec![
        PublisherRuleSet {
            publisher: "oecd_outlook".to_string(),
            patterns: vec![
                PublisherPattern {
                    pattern: r"(?i)adoption rate (?:of|reached|stood at) (\d+(?:\.\d+)?)\s*%"
                        .to_string(),
                    unit: UNIT_PERCENT.to_string(),
                    metric_type: Some("adoption".to_string()),
                    scale: 1.0,
                    confidence: 0.92,
                },
                PublisherPattern {
                    pattern: r"(?i)total investment of (?:USD|\$)\s*(\d+(?:\.\d+)?)\s*billion"
                        .to_string(),
                    unit: UNIT_USD_MILLIONS.to_string(),
                    metric_type: Some("investment".to_string()),
                    scale: 1000.0,
                    confidence: 0.95,
                },
            ],
        },
        PublisherRuleSet {
            publisher: "industry_survey".to_string(),
            patterns: vec![PublisherPattern {
                pattern: r"(?i)(\d+(?:\.\d+)?)\s*% of (?:surveyed )?(?:firms|respondents|companies)"
                    .to_string(),
                unit: UNIT_PERCENT.to_string(),
                metric_type: Some("adoption".to_string()),
                scale: 1.0,
                confidence: 0.88,
            }],
        },
    ]
}

pub fn default_entity_hints() -> HashMap<String, String> {
    HashMap::from([
        ("openai".to_string(), "technology".to_string()),
        ("nvidia".to_string(), "technology".to_string()),
        ("deere".to_string(), "agriculture".to_string()),
        ("unitedhealth".to_string(), "healthcare".to_string()),
        ("blackrock".to_string(), "finance".to_string()),
    ])
}

pub fn default_protected_patterns() -> Vec<String> {
    strings(&[
        r"women[- ]owned",
        r"minority[- ]owned",
        r"informal (?:sector|economy)",
        r"smallholder[s]?",
        r"micro[- ]?enterprise[s]?",
    ])
}
