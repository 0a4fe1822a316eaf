use crate::schema::{CustomerSegment, Dataset, TransactionRecord};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

/// Sub-dataset selection. `None` / empty criteria do not restrict.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub divisions: Vec<String>,
    pub product_categories: Vec<String>,
    pub customer_segments: Vec<CustomerSegment>,
    pub min_gross_margin_pct: Option<f64>,
    /// Case-insensitive substring of the product name.
    pub product_search: Option<String>,
}

impl DatasetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn divisions<I, S>(mut self, divisions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.divisions = divisions.into_iter().map(Into::into).collect();
        self
    }

    pub fn product_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.product_categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn customer_segments(mut self, segments: impl IntoIterator<Item = CustomerSegment>) -> Self {
        self.customer_segments = segments.into_iter().collect();
        self
    }

    pub fn min_gross_margin_pct(mut self, threshold: f64) -> Self {
        self.min_gross_margin_pct = Some(threshold);
        self
    }

    pub fn product_search(mut self, term: impl Into<String>) -> Self {
        self.product_search = Some(term.into());
        self
    }

    pub fn matches(&self, record: &TransactionRecord) -> bool {
        if self.start_date.is_some() || self.end_date.is_some() {
            let Some(date) = record.order_date else {
                return false;
            };
            if self.start_date.is_some_and(|start| date < start)
                || self.end_date.is_some_and(|end| date > end)
            {
                return false;
            }
        }

        if !self.divisions.is_empty() && !self.divisions.contains(&record.division) {
            return false;
        }

        if !self.product_categories.is_empty() {
            match record.product_category() {
                Some(category) if self.product_categories.iter().any(|c| c == category) => {}
                _ => return false,
            }
        }

        if !self.customer_segments.is_empty() {
            match record.customer_segment() {
                Some(segment) if self.customer_segments.contains(&segment) => {}
                _ => return false,
            }
        }

        if let Some(min) = self.min_gross_margin_pct {
            if record.gross_margin_pct() < min {
                return false;
            }
        }

        if let Some(term) = &self.product_search {
            let term = term.to_lowercase();
            if !term.is_empty() && !record.product_name.to_lowercase().contains(&term) {
                return false;
            }
        }

        true
    }

    /// A new dataset holding the matching records in their original order.
    pub fn apply(&self, dataset: &Dataset) -> Dataset {
        let records: Vec<TransactionRecord> =
            dataset.iter().filter(|r| self.matches(r)).cloned().collect();
        debug!("Filter kept {} of {} records", records.len(), dataset.len());
        Dataset::new(records, dataset.has_cost_column)
    }
}
