use crate::config::ScenarioConfig;
use crate::error::{ProfitabilityError, Result};
use crate::schema::{CostBreakdown, Dataset};
use crate::utils::margin_pct;
use log::{debug, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Percentage changes to apply, e.g. `5.0` for +5%.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScenarioInput {
    pub mfg_cost_change_pct: f64,
    pub shipping_cost_change_pct: f64,
    pub price_change_pct: f64,
}

impl ScenarioInput {
    pub fn new(mfg_cost_change_pct: f64, shipping_cost_change_pct: f64, price_change_pct: f64) -> Self {
        Self {
            mfg_cost_change_pct,
            shipping_cost_change_pct,
            price_change_pct,
        }
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("mfg_cost_change_pct", self.mfg_cost_change_pct),
            ("shipping_cost_change_pct", self.shipping_cost_change_pct),
            ("price_change_pct", self.price_change_pct),
        ] {
            if !value.is_finite() {
                return Err(ProfitabilityError::InvalidScenario(format!(
                    "{} must be finite, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Original vs. scenario totals. All zero when the simulation could not run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScenarioResult {
    #[serde(rename = "Original Sales")]
    pub original_sales: f64,
    #[serde(rename = "Original Profit")]
    pub original_profit: f64,
    #[serde(rename = "Original Margin")]
    pub original_margin: f64,
    #[serde(rename = "New Sales")]
    pub new_sales: f64,
    #[serde(rename = "New Profit")]
    pub new_profit: f64,
    #[serde(rename = "New Margin")]
    pub new_margin: f64,
    #[serde(rename = "Profit Change")]
    pub profit_change: f64,
    #[serde(rename = "Margin Change")]
    pub margin_change: f64,
}

impl ScenarioResult {
    /// Total cost implied by the scenario.
    pub fn new_cost(&self) -> f64 {
        self.new_sales - self.new_profit
    }
}

pub struct ScenarioSimulator {
    config: ScenarioConfig,
}

impl ScenarioSimulator {
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    /// Advisory form: any failure is logged and reported as an all-zero result.
    pub fn simulate(&self, dataset: &Dataset, input: ScenarioInput) -> ScenarioResult {
        match self.try_simulate(dataset, input) {
            Ok(result) => result,
            Err(e) => {
                warn!("Scenario simulation failed: {}", e);
                ScenarioResult::default()
            }
        }
    }

    /// Reprices a private copy of the dataset and compares totals.
    ///
    /// Overhead is fixed. Records without an enriched breakdown get one from
    /// their total cost using the configured fallback shares. A record with an
    /// empty cost cell keeps its gross profit, shifted by the price change;
    /// without a cost column at all, scenario cost is zero.
    pub fn try_simulate(&self, dataset: &Dataset, input: ScenarioInput) -> Result<ScenarioResult> {
        input.validate()?;

        let price_factor = 1.0 + input.price_change_pct / 100.0;
        let mfg_factor = 1.0 + input.mfg_cost_change_pct / 100.0;
        let ship_factor = 1.0 + input.shipping_cost_change_pct / 100.0;

        let mut scenario = dataset.clone();
        let mut new_profit = 0.0;

        for record in scenario.records.iter_mut() {
            let old_sales = record.sales;
            record.sales *= price_factor;

            record.cost_breakdown = match (record.cost_breakdown, record.cost) {
                (Some(split), _) => Some(CostBreakdown {
                    manufacturing: split.manufacturing * mfg_factor,
                    shipping: split.shipping * ship_factor,
                    overhead: split.overhead,
                }),
                (None, Some(cost)) => Some(CostBreakdown {
                    manufacturing: cost * self.config.fallback_manufacturing_share * mfg_factor,
                    shipping: cost * self.config.fallback_shipping_share * ship_factor,
                    overhead: cost * self.config.fallback_overhead_share,
                }),
                (None, None) => None,
            };

            new_profit += match record.cost_breakdown {
                Some(split) => record.sales - split.total(),
                // A missing cost cell keeps its reported profit; only the price moves it.
                None if dataset.has_cost_column => {
                    record.gross_profit + (record.sales - old_sales)
                }
                None => record.sales,
            };
        }

        let original_sales = dataset.total_sales();
        let original_profit = dataset.total_gross_profit();
        let original_margin = margin_pct(original_profit, original_sales);

        let new_sales = scenario.total_sales();
        let new_margin = margin_pct(new_profit, new_sales);

        let result = ScenarioResult {
            original_sales,
            original_profit,
            original_margin,
            new_sales,
            new_profit,
            new_margin,
            profit_change: new_profit - original_profit,
            margin_change: new_margin - original_margin,
        };

        if !result_is_finite(&result) {
            return Err(ProfitabilityError::InvalidScenario(
                "scenario totals are not finite".to_string(),
            ));
        }

        debug!(
            "Scenario {:?}: profit {:.2} -> {:.2}",
            input, original_profit, new_profit
        );
        Ok(result)
    }
}

impl Default for ScenarioSimulator {
    fn default() -> Self {
        Self::new(ScenarioConfig::default())
    }
}

fn result_is_finite(result: &ScenarioResult) -> bool {
    [
        result.original_sales,
        result.original_profit,
        result.original_margin,
        result.new_sales,
        result.new_profit,
        result.new_margin,
    ]
    .iter()
    .all(|v| v.is_finite())
}
