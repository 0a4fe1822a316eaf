//! Aggregations over an enriched dataset.
//!
//! Each function is pure and returns its own `Result`, so one failing insight
//! never takes the others down. Groups keep the order in which their key first
//! appears and all sorts are stable, which makes equal-profit ties deterministic.

use crate::error::{ProfitabilityError, Result};
use crate::schema::{Dataset, TransactionRecord};
use crate::utils::{margin_pct, median, month_key, pearson_correlation, ratio};
use log::{debug, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProductProfitability {
    #[serde(rename = "Product Name")]
    pub product_name: String,
    #[serde(rename = "Sales")]
    pub sales: f64,
    #[serde(rename = "Gross Profit")]
    pub gross_profit: f64,
    #[serde(rename = "Units")]
    pub units: f64,
    #[serde(rename = "Gross Margin (%)")]
    pub gross_margin_pct: f64,
    #[serde(rename = "Profit per Unit")]
    pub profit_per_unit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DivisionPerformance {
    #[serde(rename = "Division")]
    pub division: String,
    #[serde(rename = "Sales")]
    pub sales: f64,
    #[serde(rename = "Gross Profit")]
    pub gross_profit: f64,
    #[serde(rename = "Units")]
    pub units: f64,
    #[serde(rename = "Gross Margin (%)")]
    pub gross_margin_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParetoEntry {
    #[serde(rename = "Product Name")]
    pub product_name: String,
    #[serde(rename = "Gross Profit")]
    pub gross_profit: f64,
    #[serde(rename = "Cumulative Profit")]
    pub cumulative_profit: f64,
    #[serde(rename = "Cumulative Percentage")]
    pub cumulative_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MonthlyTrend {
    /// `YYYY-MM`
    #[serde(rename = "Month")]
    pub month: String,
    #[serde(rename = "Sales")]
    pub sales: f64,
    #[serde(rename = "Gross Profit")]
    pub gross_profit: f64,
    #[serde(rename = "Gross Margin (%)")]
    pub gross_margin_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StatePerformance {
    #[serde(rename = "State/Province")]
    pub state_province: String,
    #[serde(rename = "Sales")]
    pub sales: f64,
    #[serde(rename = "Gross Profit")]
    pub gross_profit: f64,
    #[serde(rename = "Gross Margin (%)")]
    pub gross_margin_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CustomerProfitability {
    #[serde(rename = "Customer ID")]
    pub customer_id: String,
    #[serde(rename = "Sales")]
    pub sales: f64,
    #[serde(rename = "Gross Profit")]
    pub gross_profit: f64,
    #[serde(rename = "Units")]
    pub units: f64,
    #[serde(rename = "Gross Margin (%)")]
    pub gross_margin_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CostComponentTotal {
    #[serde(rename = "Cost Component")]
    pub component: String,
    #[serde(rename = "Total Cost")]
    pub total_cost: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    sales: f64,
    gross_profit: f64,
    units: f64,
}

impl Totals {
    fn add(&mut self, record: &TransactionRecord) {
        self.sales += record.sales;
        self.gross_profit += record.gross_profit;
        self.units += record.units;
    }

    fn is_finite(&self) -> bool {
        self.sales.is_finite() && self.gross_profit.is_finite() && self.units.is_finite()
    }
}

/// Sums per key in first-appearance order. Records whose key is `None` are skipped.
fn group_totals<K, F>(dataset: &Dataset, insight: &str, key: F) -> Result<Vec<(K, Totals)>>
where
    K: Eq + Hash + Clone,
    F: Fn(&TransactionRecord) -> Option<K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Totals)> = Vec::new();

    for record in dataset {
        let Some(k) = key(record) else {
            continue;
        };
        let slot = *index.entry(k.clone()).or_insert_with(|| {
            groups.push((k, Totals::default()));
            groups.len() - 1
        });
        groups[slot].1.add(record);
    }

    if let Some((_, bad)) = groups.iter().find(|(_, t)| !t.is_finite()) {
        return Err(ProfitabilityError::Aggregation {
            insight: insight.to_string(),
            details: format!(
                "non-finite totals (sales {}, profit {}, units {})",
                bad.sales, bad.gross_profit, bad.units
            ),
        });
    }

    Ok(groups)
}

fn sort_by_profit_desc<T>(rows: &mut [T], profit: impl Fn(&T) -> f64) {
    rows.sort_by(|a, b| profit(b).total_cmp(&profit(a)));
}

pub fn product_profitability(dataset: &Dataset) -> Result<Vec<ProductProfitability>> {
    let groups = group_totals(dataset, "product_profitability", |r| {
        Some(r.product_name.clone())
    })?;

    let mut rows: Vec<ProductProfitability> = groups
        .into_iter()
        .map(|(product_name, t)| ProductProfitability {
            product_name,
            sales: t.sales,
            gross_profit: t.gross_profit,
            units: t.units,
            gross_margin_pct: margin_pct(t.gross_profit, t.sales),
            profit_per_unit: ratio(t.gross_profit, t.units),
        })
        .collect();

    sort_by_profit_desc(&mut rows, |r| r.gross_profit);
    Ok(rows)
}

pub fn division_performance(dataset: &Dataset) -> Result<Vec<DivisionPerformance>> {
    let groups = group_totals(dataset, "division_performance", |r| Some(r.division.clone()))?;

    let mut rows: Vec<DivisionPerformance> = groups
        .into_iter()
        .map(|(division, t)| DivisionPerformance {
            division,
            sales: t.sales,
            gross_profit: t.gross_profit,
            units: t.units,
            gross_margin_pct: margin_pct(t.gross_profit, t.sales),
        })
        .collect();

    sort_by_profit_desc(&mut rows, |r| r.gross_profit);
    Ok(rows)
}

/// Products ranked by gross profit with the running share of total profit.
///
/// With a zero total the cumulative percentage is reported as 0 throughout.
pub fn pareto_analysis(dataset: &Dataset) -> Result<Vec<ParetoEntry>> {
    let mut groups = group_totals(dataset, "pareto_analysis", |r| Some(r.product_name.clone()))?;
    sort_by_profit_desc(&mut groups, |(_, t)| t.gross_profit);

    let total_profit: f64 = groups.iter().map(|(_, t)| t.gross_profit).sum();

    let mut cumulative = 0.0;
    let rows = groups
        .into_iter()
        .map(|(product_name, t)| {
            cumulative += t.gross_profit;
            ParetoEntry {
                product_name,
                gross_profit: t.gross_profit,
                cumulative_profit: cumulative,
                cumulative_pct: 100.0 * ratio(cumulative, total_profit),
            }
        })
        .collect();

    Ok(rows)
}

/// Number of leading Pareto entries whose cumulative share stays within `threshold_pct`.
pub fn pareto_coverage(entries: &[ParetoEntry], threshold_pct: f64) -> usize {
    entries
        .iter()
        .filter(|e| e.cumulative_pct <= threshold_pct)
        .count()
}

/// Sales and profit per calendar month, ascending. Undated records are skipped.
pub fn monthly_trends(dataset: &Dataset) -> Result<Vec<MonthlyTrend>> {
    if !dataset.is_empty() && dataset.iter().all(|r| r.order_date.is_none()) {
        return Err(ProfitabilityError::MissingColumn("Order Date".to_string()));
    }

    let mut months: BTreeMap<String, Totals> = BTreeMap::new();
    for record in dataset {
        if let Some(date) = record.order_date {
            months.entry(month_key(date)).or_default().add(record);
        }
    }

    Ok(months
        .into_iter()
        .map(|(month, t)| MonthlyTrend {
            month,
            sales: t.sales,
            gross_profit: t.gross_profit,
            gross_margin_pct: margin_pct(t.gross_profit, t.sales),
        })
        .collect())
}

pub fn state_performance(dataset: &Dataset) -> Result<Vec<StatePerformance>> {
    let groups = group_totals(dataset, "state_performance", |r| {
        Some(r.state_province.clone())
    })?;

    let mut rows: Vec<StatePerformance> = groups
        .into_iter()
        .map(|(state_province, t)| StatePerformance {
            state_province,
            sales: t.sales,
            gross_profit: t.gross_profit,
            gross_margin_pct: margin_pct(t.gross_profit, t.sales),
        })
        .collect();

    sort_by_profit_desc(&mut rows, |r| r.gross_profit);
    Ok(rows)
}

/// Requires the simulated customer dimension.
pub fn customer_profitability(dataset: &Dataset) -> Result<Vec<CustomerProfitability>> {
    if !dataset.is_empty() && !dataset.has_customer_ids() {
        return Err(ProfitabilityError::MissingColumn("Customer ID".to_string()));
    }

    let groups = group_totals(dataset, "customer_profitability", |r| {
        r.customer_id().map(str::to_string)
    })?;

    let mut rows: Vec<CustomerProfitability> = groups
        .into_iter()
        .map(|(customer_id, t)| CustomerProfitability {
            customer_id,
            sales: t.sales,
            gross_profit: t.gross_profit,
            units: t.units,
            gross_margin_pct: margin_pct(t.gross_profit, t.sales),
        })
        .collect();

    sort_by_profit_desc(&mut rows, |r| r.gross_profit);
    Ok(rows)
}

/// Totals per cost component. Empty when no record carries a cost breakdown.
pub fn cost_breakdown(dataset: &Dataset) -> Result<Vec<CostComponentTotal>> {
    if !dataset.has_cost_breakdown() {
        return Ok(Vec::new());
    }

    let (mut manufacturing, mut shipping, mut overhead) = (0.0, 0.0, 0.0);
    for split in dataset.iter().filter_map(|r| r.cost_breakdown) {
        manufacturing += split.manufacturing;
        shipping += split.shipping;
        overhead += split.overhead;
    }

    Ok(vec![
        CostComponentTotal {
            component: "Manufacturing Cost".to_string(),
            total_cost: manufacturing,
        },
        CostComponentTotal {
            component: "Shipping Cost".to_string(),
            total_cost: shipping,
        },
        CostComponentTotal {
            component: "Overhead Cost".to_string(),
            total_cost: overhead,
        },
    ])
}

/// Records with above-median cost and a gross margin below `margin_threshold_pct`.
pub fn high_cost_low_margin(
    dataset: &Dataset,
    margin_threshold_pct: f64,
) -> Result<Vec<TransactionRecord>> {
    let costs: Vec<f64> = dataset.iter().filter_map(|r| r.cost).collect();
    let Some(median_cost) = median(&costs) else {
        if dataset.is_empty() {
            return Ok(Vec::new());
        }
        return Err(ProfitabilityError::MissingColumn("Cost".to_string()));
    };

    Ok(dataset
        .iter()
        .filter(|r| {
            r.cost.is_some_and(|c| c > median_cost) && r.gross_margin_pct() < margin_threshold_pct
        })
        .cloned()
        .collect())
}

/// Pearson correlation between cost and gross margin % over records with a cost.
pub fn cost_margin_correlation(dataset: &Dataset) -> Option<f64> {
    let (costs, margins): (Vec<f64>, Vec<f64>) = dataset
        .iter()
        .filter_map(|r| r.cost.map(|c| (c, r.gross_margin_pct())))
        .unzip();
    pearson_correlation(&costs, &margins)
}

/// One insight that could not be computed, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightFailure {
    pub insight: String,
    pub reason: String,
}

/// Every insight table for one dataset. A failed insight is left empty and
/// recorded in `failures`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub products: Vec<ProductProfitability>,
    pub divisions: Vec<DivisionPerformance>,
    pub pareto: Vec<ParetoEntry>,
    pub monthly: Vec<MonthlyTrend>,
    pub states: Vec<StatePerformance>,
    pub customers: Vec<CustomerProfitability>,
    pub cost_breakdown: Vec<CostComponentTotal>,
    pub failures: Vec<InsightFailure>,
}

impl InsightReport {
    pub fn compute(dataset: &Dataset) -> Self {
        let mut failures = Vec::new();

        let report = Self {
            products: or_empty("product_profitability", product_profitability(dataset), &mut failures),
            divisions: or_empty("division_performance", division_performance(dataset), &mut failures),
            pareto: or_empty("pareto_analysis", pareto_analysis(dataset), &mut failures),
            monthly: or_empty("monthly_trends", monthly_trends(dataset), &mut failures),
            states: or_empty("state_performance", state_performance(dataset), &mut failures),
            customers: or_empty(
                "customer_profitability",
                customer_profitability(dataset),
                &mut failures,
            ),
            cost_breakdown: or_empty("cost_breakdown", cost_breakdown(dataset), &mut failures),
            failures: Vec::new(),
        };

        debug!(
            "Computed insights: {} products, {} divisions, {} months, {} failures",
            report.products.len(),
            report.divisions.len(),
            report.monthly.len(),
            failures.len()
        );

        Self { failures, ..report }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

fn or_empty<T>(insight: &str, result: Result<Vec<T>>, failures: &mut Vec<InsightFailure>) -> Vec<T> {
    match result {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Insight {} unavailable: {}", insight, e);
            failures.push(InsightFailure {
                insight: insight.to_string(),
                reason: e.to_string(),
            });
            Vec::new()
        }
    }
}
