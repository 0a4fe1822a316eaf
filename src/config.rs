use crate::error::{ProfitabilityError, Result};
use crate::schema::CustomerSegment;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_DATE_FORMAT: &str = "%d-%m-%Y";
pub const DEFAULT_SEED: u64 = 42;

/// Every tunable constant of the pipeline. `Default` reproduces the documented behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PipelineConfig {
    #[schemars(description = "chrono format string for the Order Date and Ship Date columns")]
    pub date_format: String,

    pub enrichment: EnrichmentConfig,

    pub scenario: ScenarioConfig,

    pub forecast: ForecastConfig,

    pub insights: InsightConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            enrichment: EnrichmentConfig::default(),
            scenario: ScenarioConfig::default(),
            forecast: ForecastConfig::default(),
            insights: InsightConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EnrichmentConfig {
    #[schemars(description = "Seed for the synthetic dimension generator. Re-applied on every enrichment run.")]
    pub seed: u64,

    #[schemars(description = "Number of distinct simulated customers")]
    pub customer_pool_size: usize,

    pub customer_id_prefix: String,

    #[schemars(description = "Relative draw weights per customer segment (must sum to 1.0)")]
    pub segment_weights: Vec<SegmentWeight>,

    #[schemars(description = "Product categories, drawn uniformly")]
    pub product_categories: Vec<String>,

    #[schemars(description = "Range of the manufacturing share of total cost")]
    pub manufacturing_share: ShareRange,

    #[schemars(description = "Range of the shipping share of total cost")]
    pub shipping_share: ShareRange,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            customer_pool_size: 500,
            customer_id_prefix: "CUST-".to_string(),
            segment_weights: vec![
                SegmentWeight::new(CustomerSegment::Wholesale, 0.4),
                SegmentWeight::new(CustomerSegment::Retail, 0.3),
                SegmentWeight::new(CustomerSegment::Online, 0.2),
                SegmentWeight::new(CustomerSegment::Corporate, 0.1),
            ],
            product_categories: ["Sweets", "Chocolates", "Savory", "Beverages", "Gifts"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            manufacturing_share: ShareRange::new(0.65, 0.75),
            shipping_share: ShareRange::new(0.15, 0.25),
        }
    }
}

impl EnrichmentConfig {
    pub fn customer_id(&self, index: usize) -> String {
        format!("{}{:04}", self.customer_id_prefix, index + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentWeight {
    pub segment: CustomerSegment,
    pub weight: f64,
}

impl SegmentWeight {
    pub fn new(segment: CustomerSegment, weight: f64) -> Self {
        Self { segment, weight }
    }
}

/// Half-open `[min, max)` range of a uniform draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ShareRange {
    pub min: f64,
    pub max: f64,
}

impl ShareRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Fixed shares used when a record has no enriched cost breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ScenarioConfig {
    pub fallback_manufacturing_share: f64,
    pub fallback_shipping_share: f64,
    pub fallback_overhead_share: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            fallback_manufacturing_share: 0.7,
            fallback_shipping_share: 0.2,
            fallback_overhead_share: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ForecastConfig {
    #[schemars(description = "Number of months projected past the last historical month")]
    pub horizon_months: usize,

    #[schemars(description = "Length of the seasonal cycle in months")]
    pub seasonal_period: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_months: 6,
            seasonal_period: 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct InsightConfig {
    #[schemars(description = "Cumulative profit percentage used to count Pareto coverage")]
    pub pareto_threshold_pct: f64,

    #[schemars(description = "Records below this gross margin % with above-median cost are flagged")]
    pub low_margin_threshold_pct: f64,

    #[schemars(description = "Row count of the top-N tables in the report")]
    pub top_n: usize,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            pareto_threshold_pct: 80.0,
            low_margin_threshold_pct: 10.0,
            top_n: 5,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn json_schema() -> Result<String> {
        let schema = schemars::schema_for!(PipelineConfig);
        Ok(serde_json::to_string_pretty(&schema)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.date_format.trim().is_empty() {
            return Err(ProfitabilityError::InvalidConfig(
                "date_format must not be empty".to_string(),
            ));
        }

        validate_segment_weights(&self.enrichment.segment_weights)?;

        if self.enrichment.customer_pool_size == 0 {
            return Err(ProfitabilityError::InvalidConfig(
                "customer_pool_size must be at least 1".to_string(),
            ));
        }

        if self.enrichment.product_categories.is_empty() {
            return Err(ProfitabilityError::InvalidConfig(
                "product_categories must not be empty".to_string(),
            ));
        }

        validate_share_range("manufacturing_share", &self.enrichment.manufacturing_share)?;
        validate_share_range("shipping_share", &self.enrichment.shipping_share)?;

        let scenario = &self.scenario;
        for (name, share) in [
            ("fallback_manufacturing_share", scenario.fallback_manufacturing_share),
            ("fallback_shipping_share", scenario.fallback_shipping_share),
            ("fallback_overhead_share", scenario.fallback_overhead_share),
        ] {
            if !share.is_finite() || share < 0.0 {
                return Err(ProfitabilityError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, share
                )));
            }
        }

        if self.forecast.seasonal_period < 2 {
            return Err(ProfitabilityError::InvalidConfig(format!(
                "seasonal_period must be at least 2, got {}",
                self.forecast.seasonal_period
            )));
        }

        if !(0.0..=100.0).contains(&self.insights.pareto_threshold_pct) {
            return Err(ProfitabilityError::InvalidConfig(format!(
                "pareto_threshold_pct must be between 0 and 100, got {}",
                self.insights.pareto_threshold_pct
            )));
        }

        Ok(())
    }
}

pub fn validate_segment_weights(weights: &[SegmentWeight]) -> Result<()> {
    if weights.is_empty() {
        return Err(ProfitabilityError::InvalidSegmentWeights(
            "At least one segment is required".to_string(),
        ));
    }

    if weights.iter().any(|w| !w.weight.is_finite() || w.weight < 0.0) {
        return Err(ProfitabilityError::InvalidSegmentWeights(
            "All weights must be non-negative".to_string(),
        ));
    }

    let sum: f64 = weights.iter().map(|w| w.weight).sum();
    if (sum - 1.0).abs() > 0.01 {
        return Err(ProfitabilityError::InvalidSegmentWeights(format!(
            "Weights must sum to 1.0 (got {})",
            sum
        )));
    }

    Ok(())
}

pub(crate) fn validate_share_range(name: &str, range: &ShareRange) -> Result<()> {
    if !range.min.is_finite() || !range.max.is_finite() || range.min < 0.0 || range.min >= range.max
    {
        return Err(ProfitabilityError::InvalidConfig(format!(
            "{} must satisfy 0 <= min < max, got [{}, {})",
            name, range.min, range.max
        )));
    }
    Ok(())
}
