//! # Profitability Analytics
//!
//! A batch pipeline for distributor sales data: load a CSV extract, clean it,
//! enrich it with derived ratios and simulated dimensions, then aggregate,
//! forecast and stress-test it.
//!
//! ## Core Concepts
//!
//! - **Dataset**: cleaned line items ordered by order date
//! - **Enrichment**: margin ratios, seeded synthetic customers/categories and a cost split
//! - **Insights**: product, division, Pareto, monthly, state, customer and cost tables
//! - **Forecast**: additive Holt-Winters per metric with a last-value fallback
//! - **Scenario**: what-if repricing of manufacturing, shipping and sales price
//!
//! ## Example
//!
//! ```rust,ignore
//! use profitability_analytics::*;
//!
//! let pipeline = ProfitabilityPipeline::new(PipelineConfig::default());
//! let dataset = pipeline.run("Nassau Candy Distributor.csv")?;
//!
//! let insights = InsightReport::compute(&dataset);
//! let forecast = pipeline.forecaster().forecast(&dataset);
//! let what_if = pipeline
//!     .simulator()
//!     .simulate(&dataset, ScenarioInput::new(5.0, 0.0, 2.0));
//!
//! println!("{}", pipeline.report(&dataset));
//! ```

pub mod cleaning;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod filter;
pub mod forecasting;
pub mod ingestion;
pub mod insights;
pub mod report;
pub mod scenario;
pub mod schema;
pub mod seasonality;
pub mod utils;

pub use cleaning::{clean_or_empty, Cleaner, CleaningStats};
pub use config::*;
pub use enrichment::Enricher;
pub use error::{ProfitabilityError, Result};
pub use filter::DatasetFilter;
pub use forecasting::{
    naive_forecast, ForecastMethod, ForecastPoint, ForecastResult, Forecaster, MonthlyHistory,
    SeriesType,
};
pub use ingestion::{load, load_from_reader, RawTable};
pub use insights::*;
pub use report::{CustomerSummary, ProductHighlight, ReportSummary};
pub use scenario::{ScenarioInput, ScenarioResult, ScenarioSimulator};
pub use schema::*;
pub use seasonality::{FittedHoltWinters, HoltWinters, SmoothingParams};

use log::{debug, info};
use std::io::Read;
use std::path::Path;

/// Runs Loader -> Cleaner -> Enricher and hands out the downstream components
/// configured from the same [`PipelineConfig`].
pub struct ProfitabilityPipeline {
    config: PipelineConfig,
}

impl ProfitabilityPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Validates the configuration before accepting it.
    pub fn try_new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Source errors halt the run. Everything after loading degrades instead.
    pub fn run(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let table = load(path)?;
        Ok(self.process_table(&table))
    }

    pub fn run_from_reader<R: Read>(&self, reader: R) -> Result<Dataset> {
        let table = load_from_reader(reader)?;
        Ok(self.process_table(&table))
    }

    pub fn process_table(&self, table: &RawTable) -> Dataset {
        info!("Processing {} raw rows", table.len());

        let cleaner = Cleaner::new(self.config.date_format.clone());
        let dataset = clean_or_empty(&cleaner, table);
        debug!(
            "Cleaned dataset spans {:?} to {:?}",
            dataset.first_order_date(),
            dataset.last_order_date()
        );

        let dataset = Enricher::new(self.config.enrichment.clone()).enrich(dataset);

        info!(
            "Pipeline produced {} records (cost column: {})",
            dataset.len(),
            dataset.has_cost_column
        );
        dataset
    }

    pub fn forecaster(&self) -> Forecaster {
        Forecaster::new(self.config.forecast)
    }

    pub fn simulator(&self) -> ScenarioSimulator {
        ScenarioSimulator::new(self.config.scenario)
    }

    pub fn report(&self, dataset: &Dataset) -> ReportSummary {
        ReportSummary::compute(dataset, &self.config.insights)
    }

    /// Records flagged with above-median cost and a margin below the configured threshold.
    pub fn margin_risks(&self, dataset: &Dataset) -> Result<Vec<TransactionRecord>> {
        high_cost_low_margin(dataset, self.config.insights.low_margin_threshold_pct)
    }
}

impl Default for ProfitabilityPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

/// Loads and prepares a CSV file with the default configuration.
pub fn process_sales_file(path: impl AsRef<Path>) -> Result<Dataset> {
    ProfitabilityPipeline::default().run(path)
}
