//! Executive summary of a dataset and its plain-text rendering.

use crate::config::InsightConfig;
use crate::insights::{
    cost_breakdown, cost_margin_correlation, customer_profitability, division_performance,
    monthly_trends, pareto_analysis, pareto_coverage, product_profitability, state_performance,
    CostComponentTotal, CustomerProfitability, DivisionPerformance, MonthlyTrend,
    ProductProfitability, StatePerformance,
};
use crate::schema::Dataset;
use crate::utils::{margin_pct, mean};
use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductHighlight {
    pub product_name: String,
    pub gross_profit: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub total_customers: usize,
    pub avg_profit_per_customer: f64,
    pub top_customers: Vec<CustomerProfitability>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_sales: f64,
    pub total_gross_profit: f64,
    pub overall_margin_pct: f64,
    pub total_units: f64,
    pub first_order_date: Option<NaiveDate>,
    pub last_order_date: Option<NaiveDate>,
    /// Unweighted mean of the per-record margins.
    pub avg_record_margin_pct: f64,
    pub top_product: Option<ProductHighlight>,
    pub bottom_product: Option<ProductHighlight>,
    pub divisions: Vec<DivisionPerformance>,
    pub pareto_threshold_pct: f64,
    pub pareto_products: usize,
    pub distinct_products: usize,
    pub cost_margin_correlation: Option<f64>,
    pub cost_breakdown: Vec<CostComponentTotal>,
    pub monthly: Vec<MonthlyTrend>,
    pub top_states: Vec<StatePerformance>,
    /// `None` when the dataset carries no simulated customers.
    pub customers: Option<CustomerSummary>,
}

impl ReportSummary {
    pub fn compute(dataset: &Dataset, config: &InsightConfig) -> Self {
        let total_sales = dataset.total_sales();
        let total_gross_profit = dataset.total_gross_profit();
        let margins: Vec<f64> = dataset.iter().map(|r| r.gross_margin_pct()).collect();

        let products = logged("product_profitability", product_profitability(dataset));
        let highlight = |p: &ProductProfitability| ProductHighlight {
            product_name: p.product_name.clone(),
            gross_profit: p.gross_profit,
        };

        let pareto = logged("pareto_analysis", pareto_analysis(dataset));
        let distinct_products = dataset
            .iter()
            .map(|r| r.product_name.as_str())
            .collect::<HashSet<_>>()
            .len();

        let mut top_states = logged("state_performance", state_performance(dataset));
        top_states.truncate(config.top_n);

        let customers = if dataset.has_customer_ids() {
            let rows = logged("customer_profitability", customer_profitability(dataset));
            let profits: Vec<f64> = rows.iter().map(|c| c.gross_profit).collect();
            Some(CustomerSummary {
                total_customers: rows.len(),
                avg_profit_per_customer: mean(&profits).unwrap_or(0.0),
                top_customers: rows.into_iter().take(config.top_n).collect(),
            })
        } else {
            None
        };

        Self {
            total_sales,
            total_gross_profit,
            overall_margin_pct: margin_pct(total_gross_profit, total_sales),
            total_units: dataset.total_units(),
            first_order_date: dataset.first_order_date(),
            last_order_date: dataset.last_order_date(),
            avg_record_margin_pct: mean(&margins).unwrap_or(0.0),
            top_product: products.first().map(highlight),
            bottom_product: products.last().map(highlight),
            divisions: logged("division_performance", division_performance(dataset)),
            pareto_threshold_pct: config.pareto_threshold_pct,
            pareto_products: pareto_coverage(&pareto, config.pareto_threshold_pct),
            distinct_products,
            cost_margin_correlation: cost_margin_correlation(dataset),
            cost_breakdown: logged("cost_breakdown", cost_breakdown(dataset)),
            monthly: logged("monthly_trends", monthly_trends(dataset)),
            top_states,
            customers,
        }
    }

    /// Share of distinct products needed to reach the Pareto threshold.
    pub fn pareto_share_pct(&self) -> f64 {
        100.0 * self.pareto_products as f64 / self.distinct_products.max(1) as f64
    }
}

fn logged<T>(insight: &str, result: crate::error::Result<Vec<T>>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        warn!("Report section {} skipped: {}", insight, e);
        Vec::new()
    })
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Executive Summary Metrics ---")?;
        writeln!(f, "Total Sales: ${}", fmt_money(self.total_sales))?;
        writeln!(f, "Total Gross Profit: ${}", fmt_money(self.total_gross_profit))?;
        writeln!(f, "Overall Gross Margin: {:.2}%", self.overall_margin_pct)?;
        writeln!(f, "Average Record Margin: {:.2}%", self.avg_record_margin_pct)?;
        writeln!(f, "Total Units: {}", fmt_thousands(self.total_units.round() as i64))?;
        if let (Some(first), Some(last)) = (self.first_order_date, self.last_order_date) {
            writeln!(f, "Order Period: {} to {}", first, last)?;
        }
        writeln!(f)?;

        writeln!(f, "--- Product Performance ---")?;
        match (&self.top_product, &self.bottom_product) {
            (Some(top), Some(bottom)) => {
                writeln!(f, "Top Product: {} (${})", top.product_name, fmt_money(top.gross_profit))?;
                writeln!(
                    f,
                    "Bottom Product: {} (${})",
                    bottom.product_name,
                    fmt_money(bottom.gross_profit)
                )?;
            }
            _ => writeln!(f, "No products")?,
        }
        writeln!(f)?;

        writeln!(f, "--- Division Performance ---")?;
        writeln!(
            f,
            "{:<20} {:>14} {:>14} {:>10} {:>9}",
            "Division", "Sales", "Gross Profit", "Units", "Margin %"
        )?;
        for d in &self.divisions {
            writeln!(
                f,
                "{:<20} {:>14.2} {:>14.2} {:>10.0} {:>9.2}",
                d.division, d.sales, d.gross_profit, d.units, d.gross_margin_pct
            )?;
        }
        writeln!(f)?;

        writeln!(f, "--- Pareto Analysis ---")?;
        writeln!(
            f,
            "Products for {:.0}% Profit: {} out of {} ({:.1}%)",
            self.pareto_threshold_pct,
            self.pareto_products,
            self.distinct_products,
            self.pareto_share_pct()
        )?;
        writeln!(f)?;

        writeln!(f, "--- Cost Diagnostics ---")?;
        match self.cost_margin_correlation {
            Some(r) => writeln!(f, "Cost-Margin Correlation: {:.4}", r)?,
            None => writeln!(f, "Cost-Margin Correlation: n/a")?,
        }
        if !self.cost_breakdown.is_empty() {
            writeln!(f, "\nSimulated Cost Breakdown:")?;
            for c in &self.cost_breakdown {
                writeln!(f, "{:<20} {:>16.2}", c.component, c.total_cost)?;
            }
        }
        writeln!(f)?;

        writeln!(f, "--- Temporal Trends ---")?;
        writeln!(
            f,
            "{:<8} {:>14} {:>14} {:>9}",
            "Month", "Sales", "Gross Profit", "Margin %"
        )?;
        for m in &self.monthly {
            writeln!(
                f,
                "{:<8} {:>14.2} {:>14.2} {:>9.2}",
                m.month, m.sales, m.gross_profit, m.gross_margin_pct
            )?;
        }
        writeln!(f)?;

        writeln!(f, "--- Top {} States ---", self.top_states.len())?;
        for s in &self.top_states {
            writeln!(
                f,
                "{:<24} {:>14.2} {:>14.2} {:>9.2}",
                s.state_province, s.sales, s.gross_profit, s.gross_margin_pct
            )?;
        }
        writeln!(f)?;

        writeln!(f, "--- Customer Insights ---")?;
        match &self.customers {
            Some(c) => {
                writeln!(f, "Total Customers: {}", c.total_customers)?;
                writeln!(f, "Avg Profit/Customer: ${}", fmt_money(c.avg_profit_per_customer))?;
                writeln!(f, "Top {} Customers:", c.top_customers.len())?;
                for row in &c.top_customers {
                    writeln!(
                        f,
                        "{:<12} {:>14.2} {:>14.2} {:>9.2}",
                        row.customer_id, row.sales, row.gross_profit, row.gross_margin_pct
                    )?;
                }
            }
            None => writeln!(f, "No customer data")?,
        }

        Ok(())
    }
}

/// `1234567.891` -> `1,234,567.89`
fn fmt_money(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as i64;
    let sign = if value < 0.0 && cents != 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, fmt_thousands(cents / 100), cents % 100)
}

fn fmt_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
