use crate::config::ForecastConfig;
use crate::error::{ProfitabilityError, Result};
use crate::schema::Dataset;
use crate::seasonality::{HoltWinters, SmoothingParams};
use crate::utils::{following_month_ends, month_end};
use chrono::NaiveDate;
use log::{info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SALES_METRIC: &str = "Sales";
pub const GROSS_PROFIT_METRIC: &str = "Gross Profit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum SeriesType {
    Historical,
    Forecast,
}

/// One month of the combined history + forecast series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ForecastPoint {
    /// Month-end date of the period.
    #[serde(rename = "Period")]
    pub period: NaiveDate,
    #[serde(rename = "Sales")]
    pub sales: f64,
    #[serde(rename = "Gross Profit")]
    pub gross_profit: f64,
    #[serde(rename = "Type")]
    pub kind: SeriesType,
}

/// How a metric's forecast rows were produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum ForecastMethod {
    HoltWinters { params: SmoothingParams },
    /// Last observation repeated, used when the seasonal model could not be fit.
    Naive { reason: String },
}

impl ForecastMethod {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ForecastMethod::Naive { .. })
    }
}

/// Monthly sums keyed by month-end date. Months without records are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyHistory {
    pub periods: Vec<NaiveDate>,
    pub sales: Vec<f64>,
    pub gross_profit: Vec<f64>,
}

impl MonthlyHistory {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut months: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
        for record in dataset {
            let Some(period) = record.order_date.and_then(month_end) else {
                continue;
            };
            let entry = months.entry(period).or_insert((0.0, 0.0));
            entry.0 += record.sales;
            entry.1 += record.gross_profit;
        }

        let mut history = Self::default();
        for (period, (sales, profit)) in months {
            history.periods.push(period);
            history.sales.push(sales);
            history.gross_profit.push(profit);
        }
        history
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn last_period(&self) -> Option<NaiveDate> {
        self.periods.last().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub series: Vec<ForecastPoint>,
    pub sales_method: ForecastMethod,
    pub gross_profit_method: ForecastMethod,
}

impl ForecastResult {
    pub fn historical(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.series
            .iter()
            .filter(|p| p.kind == SeriesType::Historical)
    }

    pub fn projected(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.series.iter().filter(|p| p.kind == SeriesType::Forecast)
    }

    /// Summed forecast sales and gross profit over the horizon.
    pub fn forecast_totals(&self) -> (f64, f64) {
        self.projected()
            .fold((0.0, 0.0), |(s, p), point| (s + point.sales, p + point.gross_profit))
    }
}

pub struct Forecaster {
    model: HoltWinters,
    horizon_months: usize,
}

impl Forecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Self {
            model: HoltWinters::new(config.seasonal_period),
            horizon_months: config.horizon_months,
        }
    }

    pub fn with_horizon(mut self, horizon_months: usize) -> Self {
        self.horizon_months = horizon_months;
        self
    }

    /// History plus `horizon_months` of projection for sales and gross profit.
    ///
    /// Each metric is fitted on its own; a failed fit falls back to repeating
    /// that metric's last observation without affecting the other.
    pub fn forecast(&self, dataset: &Dataset) -> ForecastResult {
        let history = MonthlyHistory::from_dataset(dataset);

        let mut series: Vec<ForecastPoint> = history
            .periods
            .iter()
            .zip(history.sales.iter().zip(&history.gross_profit))
            .map(|(&period, (&sales, &gross_profit))| ForecastPoint {
                period,
                sales,
                gross_profit,
                kind: SeriesType::Historical,
            })
            .collect();

        let (sales_values, sales_method) = self.forecast_metric(SALES_METRIC, &history.sales);
        let (profit_values, gross_profit_method) =
            self.forecast_metric(GROSS_PROFIT_METRIC, &history.gross_profit);

        if let Some(last) = history.last_period() {
            let periods = following_month_ends(last, self.horizon_months);
            for (i, period) in periods.into_iter().enumerate() {
                series.push(ForecastPoint {
                    period,
                    sales: sales_values.get(i).copied().unwrap_or(0.0),
                    gross_profit: profit_values.get(i).copied().unwrap_or(0.0),
                    kind: SeriesType::Forecast,
                });
            }
        }

        info!(
            "Forecast {} months from {} months of history, period {} (sales: {}, gross profit: {})",
            self.horizon_months,
            history.len(),
            self.model.period(),
            method_label(&sales_method),
            method_label(&gross_profit_method)
        );

        ForecastResult {
            series,
            sales_method,
            gross_profit_method,
        }
    }

    /// Fits the seasonal model for one metric, without any fallback.
    pub fn try_forecast_metric(&self, metric: &str, values: &[f64]) -> Result<(Vec<f64>, SmoothingParams)> {
        let fitted = self.model.fit(values, metric)?;
        let projection = fitted.forecast(self.horizon_months);
        if projection.iter().any(|v| !v.is_finite()) {
            return Err(ProfitabilityError::ModelFit {
                metric: metric.to_string(),
                details: "projection is not finite".to_string(),
            });
        }
        Ok((projection, fitted.params))
    }

    fn forecast_metric(&self, metric: &str, values: &[f64]) -> (Vec<f64>, ForecastMethod) {
        match self.try_forecast_metric(metric, values) {
            Ok((projection, params)) => (projection, ForecastMethod::HoltWinters { params }),
            Err(e) => {
                warn!("Falling back to naive forecast for {}: {}", metric, e);
                (
                    naive_forecast(values, self.horizon_months),
                    ForecastMethod::Naive {
                        reason: e.to_string(),
                    },
                )
            }
        }
    }
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::new(ForecastConfig::default())
    }
}

/// Repeats the last observation `horizon` times. Empty history gives no rows.
pub fn naive_forecast(values: &[f64], horizon: usize) -> Vec<f64> {
    match values.last() {
        Some(&last) => vec![last; horizon],
        None => Vec::new(),
    }
}

fn method_label(method: &ForecastMethod) -> &'static str {
    match method {
        ForecastMethod::HoltWinters { .. } => "holt-winters",
        ForecastMethod::Naive { .. } => "naive",
    }
}
