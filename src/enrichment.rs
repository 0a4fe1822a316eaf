use crate::config::{validate_segment_weights, validate_share_range, EnrichmentConfig};
use crate::error::{ProfitabilityError, Result};
use crate::schema::{CostBreakdown, Dataset, DerivedMetrics, SyntheticDimensions};
use crate::utils::ratio;
use log::{debug, info, warn};
use rand::distributions::WeightedIndex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};

/// Adds ratio metrics, simulated dimensions and the cost split to a dataset.
///
/// Every call builds its own generator from the configured seed, so two runs
/// over datasets of the same length assign identical dimensions. Draw order:
/// customer for every record, then segment, then category, then the
/// manufacturing share, then the shipping share.
///
/// The manufacturing and shipping shares are drawn independently and are not
/// constrained to sum to at most one. A negative remainder is clamped to zero
/// overhead rather than renormalized.
pub struct Enricher {
    config: EnrichmentConfig,
}

impl Enricher {
    pub fn new(config: EnrichmentConfig) -> Self {
        Self { config }
    }

    /// Applies every stage in order and stops at the first failing one.
    ///
    /// Stages that completed before the failure stay applied.
    pub fn try_enrich(&self, dataset: &mut Dataset) -> Result<()> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        apply_ratio_metrics(dataset);
        self.assign_dimensions(dataset, &mut rng)?;
        self.split_costs(dataset, &mut rng)?;

        info!("Enriched {} records", dataset.len());
        Ok(())
    }

    /// Best-effort form: failures are logged and the partially enriched dataset returned.
    pub fn enrich(&self, mut dataset: Dataset) -> Dataset {
        if let Err(e) = self.try_enrich(&mut dataset) {
            warn!("Enrichment stopped early: {}", e);
        }
        dataset
    }

    fn assign_dimensions(&self, dataset: &mut Dataset, rng: &mut StdRng) -> Result<()> {
        validate_segment_weights(&self.config.segment_weights)?;
        if self.config.customer_pool_size == 0 {
            return Err(ProfitabilityError::Transform(
                "customer pool is empty".to_string(),
            ));
        }
        if self.config.product_categories.is_empty() {
            return Err(ProfitabilityError::Transform(
                "no product categories configured".to_string(),
            ));
        }

        let customers = Uniform::new(0, self.config.customer_pool_size);
        let segments = WeightedIndex::new(self.config.segment_weights.iter().map(|w| w.weight))
            .map_err(|e| ProfitabilityError::InvalidSegmentWeights(e.to_string()))?;
        let categories = Uniform::new(0, self.config.product_categories.len());

        let n = dataset.len();
        let customer_draws: Vec<usize> = (0..n).map(|_| customers.sample(rng)).collect();
        let segment_draws: Vec<usize> = (0..n).map(|_| segments.sample(rng)).collect();
        let category_draws: Vec<usize> = (0..n).map(|_| categories.sample(rng)).collect();

        for (i, record) in dataset.records.iter_mut().enumerate() {
            record.dimensions = Some(SyntheticDimensions {
                customer_id: self.config.customer_id(customer_draws[i]),
                customer_segment: self.config.segment_weights[segment_draws[i]].segment,
                product_category: self.config.product_categories[category_draws[i]].clone(),
            });
        }

        debug!("Assigned synthetic dimensions to {} records", n);
        Ok(())
    }

    fn split_costs(&self, dataset: &mut Dataset, rng: &mut StdRng) -> Result<()> {
        if !dataset.has_cost_column {
            debug!("No cost column, skipping cost split");
            return Ok(());
        }

        let mfg_range = &self.config.manufacturing_share;
        let ship_range = &self.config.shipping_share;
        validate_share_range("manufacturing_share", mfg_range)?;
        validate_share_range("shipping_share", ship_range)?;

        let mfg_share = Uniform::new(mfg_range.min, mfg_range.max);
        let ship_share = Uniform::new(ship_range.min, ship_range.max);

        // Drawn for every record, including those without a cost, so the
        // stream position depends only on the record index.
        let n = dataset.len();
        let mfg_draws: Vec<f64> = (0..n).map(|_| mfg_share.sample(rng)).collect();
        let ship_draws: Vec<f64> = (0..n).map(|_| ship_share.sample(rng)).collect();

        let mut clamped = 0usize;
        for (i, record) in dataset.records.iter_mut().enumerate() {
            record.cost_breakdown = record.cost.map(|cost| {
                let manufacturing = cost * mfg_draws[i];
                let shipping = cost * ship_draws[i];
                let raw_overhead = cost - manufacturing - shipping;
                if raw_overhead < 0.0 {
                    clamped += 1;
                }
                CostBreakdown {
                    manufacturing,
                    shipping,
                    overhead: raw_overhead.max(0.0),
                }
            });
        }

        if clamped > 0 {
            debug!("Clamped negative overhead to zero on {} records", clamped);
        }
        Ok(())
    }
}

impl Default for Enricher {
    fn default() -> Self {
        Self::new(EnrichmentConfig::default())
    }
}

/// Gross margin % and profit per unit, with the zero-denominator guard.
pub fn apply_ratio_metrics(dataset: &mut Dataset) {
    for record in dataset.records.iter_mut() {
        record.derived = Some(DerivedMetrics {
            gross_margin_pct: ratio(record.gross_profit, record.sales) * 100.0,
            profit_per_unit: ratio(record.gross_profit, record.units),
        });
    }
}
