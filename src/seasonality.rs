//! Additive Holt-Winters (triple exponential smoothing).
//!
//! Level, trend and a repeating seasonal component are all additive. Smoothing
//! parameters are chosen by minimizing the one-step-ahead squared error over a
//! bounded grid with `beta <= alpha` and `gamma <= 1 - alpha`.

use crate::error::{ProfitabilityError, Result};
use log::debug;
use serde::{Deserialize, Serialize};

const GRID_STEP: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingParams {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

/// A fitted model, holding the final state after the last observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedHoltWinters {
    pub params: SmoothingParams,
    pub level: f64,
    pub trend: f64,
    /// Seasonal offsets indexed by `t % period`.
    pub seasonal: Vec<f64>,
    pub sse: f64,
    observations: usize,
}

impl FittedHoltWinters {
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        let period = self.seasonal.len();
        (1..=horizon)
            .map(|h| {
                let idx = (self.observations + h - 1) % period;
                self.level + h as f64 * self.trend + self.seasonal[idx]
            })
            .collect()
    }

    pub fn observations(&self) -> usize {
        self.observations
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HoltWinters {
    period: usize,
}

impl HoltWinters {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Two full cycles are needed to initialize level, trend and season.
    pub fn min_observations(&self) -> usize {
        2 * self.period
    }

    pub fn fit(&self, values: &[f64], metric: &str) -> Result<FittedHoltWinters> {
        if self.period < 2 {
            return Err(ProfitabilityError::ModelFit {
                metric: metric.to_string(),
                details: format!("seasonal period must be at least 2, got {}", self.period),
            });
        }

        if values.len() < self.min_observations() {
            return Err(ProfitabilityError::InsufficientHistory {
                metric: metric.to_string(),
                required: self.min_observations(),
                actual: values.len(),
            });
        }

        if values.iter().any(|v| !v.is_finite()) {
            return Err(ProfitabilityError::ModelFit {
                metric: metric.to_string(),
                details: "history contains non-finite values".to_string(),
            });
        }

        let mut best: Option<FittedHoltWinters> = None;
        for params in parameter_grid() {
            let candidate = self.run(values, params);
            if !candidate.sse.is_finite() {
                continue;
            }
            if best.as_ref().map_or(true, |b| candidate.sse < b.sse) {
                best = Some(candidate);
            }
        }

        let fitted = best.ok_or_else(|| ProfitabilityError::ModelFit {
            metric: metric.to_string(),
            details: "no parameter combination produced a finite error".to_string(),
        })?;

        if !fitted.level.is_finite()
            || !fitted.trend.is_finite()
            || fitted.seasonal.iter().any(|s| !s.is_finite())
        {
            return Err(ProfitabilityError::ModelFit {
                metric: metric.to_string(),
                details: "smoothing state diverged".to_string(),
            });
        }

        debug!(
            "Fitted Holt-Winters for {}: alpha={:.2} beta={:.2} gamma={:.2} sse={:.4}",
            metric, fitted.params.alpha, fitted.params.beta, fitted.params.gamma, fitted.sse
        );

        Ok(fitted)
    }

    fn run(&self, values: &[f64], params: SmoothingParams) -> FittedHoltWinters {
        let m = self.period;
        let first_cycle = values[..m].iter().sum::<f64>() / m as f64;
        let second_cycle = values[m..2 * m].iter().sum::<f64>() / m as f64;

        // First-cycle mean sits at the cycle midpoint; seasonal offsets are
        // measured against the detrended first cycle, and the starting level is
        // placed one step before the first observation.
        let mut trend = (second_cycle - first_cycle) / m as f64;
        let midpoint = (m as f64 - 1.0) / 2.0;
        let mut seasonal: Vec<f64> = values[..m]
            .iter()
            .enumerate()
            .map(|(i, v)| v - (first_cycle + (i as f64 - midpoint) * trend))
            .collect();
        let mut level = first_cycle - (midpoint + 1.0) * trend;

        let SmoothingParams { alpha, beta, gamma } = params;
        let mut sse = 0.0;

        for (t, &y) in values.iter().enumerate() {
            let s_idx = t % m;
            let prediction = level + trend + seasonal[s_idx];
            let error = y - prediction;
            sse += error * error;

            let prev_level = level;
            level = alpha * (y - seasonal[s_idx]) + (1.0 - alpha) * (level + trend);
            trend = beta * (level - prev_level) + (1.0 - beta) * trend;
            seasonal[s_idx] = gamma * (y - level) + (1.0 - gamma) * seasonal[s_idx];
        }

        FittedHoltWinters {
            params,
            level,
            trend,
            seasonal,
            sse,
            observations: values.len(),
        }
    }
}

fn parameter_grid() -> Vec<SmoothingParams> {
    let steps = (1.0 / GRID_STEP).round() as usize;
    let mut grid = Vec::new();

    for a in 1..steps {
        let alpha = a as f64 * GRID_STEP;
        for b in 0..=a {
            let beta = b as f64 * GRID_STEP;
            for g in 0..=(steps - a) {
                let gamma = g as f64 * GRID_STEP;
                grid.push(SmoothingParams { alpha, beta, gamma });
            }
        }
    }

    grid
}
