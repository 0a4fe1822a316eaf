use crate::error::{ProfitabilityError, Result};
use crate::ingestion::{
    RawTable, COST, DIVISION, GROSS_PROFIT, ORDER_DATE, PRODUCT_NAME, SALES, SHIP_DATE,
    STATE_PROVINCE, UNITS,
};
use crate::schema::{Dataset, TransactionRecord};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Counts collected while cleaning, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningStats {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
    pub unparseable_dates: usize,
}

pub struct Cleaner {
    date_format: String,
}

impl Cleaner {
    pub fn new(date_format: impl Into<String>) -> Self {
        Self {
            date_format: date_format.into(),
        }
    }

    /// Parses, filters and orders the raw table.
    ///
    /// Fails only when one of the critical columns is missing from the header.
    pub fn clean(&self, table: &RawTable) -> Result<(Dataset, CleaningStats)> {
        let sales_idx = require_column(table, SALES)?;
        let units_idx = require_column(table, UNITS)?;
        let profit_idx = require_column(table, GROSS_PROFIT)?;

        let order_idx = table.column_index(ORDER_DATE);
        let ship_idx = table.column_index(SHIP_DATE);
        let cost_idx = table.column_index(COST);
        let division_idx = table.column_index(DIVISION);
        let product_idx = table.column_index(PRODUCT_NAME);
        let state_idx = table.column_index(STATE_PROVINCE);

        let mut stats = CleaningStats {
            rows_read: table.len(),
            ..Default::default()
        };

        let mut records = Vec::with_capacity(table.len());

        for row in 0..table.len() {
            let text = |idx: Option<usize>| idx.map(|i| table.cell(row, i)).unwrap_or("");

            let order_date = self.parse_date(text(order_idx), &mut stats);
            let ship_date = self.parse_date(text(ship_idx), &mut stats);

            let (sales, units, gross_profit) = match (
                parse_number(table.cell(row, sales_idx)),
                parse_number(table.cell(row, units_idx)),
                parse_number(table.cell(row, profit_idx)),
            ) {
                (Some(s), Some(u), Some(p)) => (s, u, p),
                _ => {
                    stats.rows_dropped += 1;
                    continue;
                }
            };

            records.push(TransactionRecord {
                order_date,
                ship_date,
                sales,
                units,
                gross_profit,
                cost: cost_idx.and_then(|i| parse_number(table.cell(row, i))),
                division: text(division_idx).to_string(),
                product_name: text(product_idx).to_string(),
                state_province: text(state_idx).to_string(),
                derived: None,
                dimensions: None,
                cost_breakdown: None,
            });
        }

        // Stable: equal dates keep source order, undated rows go last.
        records.sort_by(|a, b| match (a.order_date, b.order_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        stats.rows_kept = records.len();

        if stats.unparseable_dates > 0 {
            debug!(
                "{} date cells could not be parsed with format '{}'",
                stats.unparseable_dates, self.date_format
            );
        }
        info!(
            "Cleaned {} rows: kept {}, dropped {}",
            stats.rows_read, stats.rows_kept, stats.rows_dropped
        );

        Ok((Dataset::new(records, cost_idx.is_some()), stats))
    }

    fn parse_date(&self, text: &str, stats: &mut CleaningStats) -> Option<NaiveDate> {
        if text.is_empty() {
            return None;
        }
        match NaiveDate::parse_from_str(text, &self.date_format) {
            Ok(date) => Some(date),
            Err(_) => {
                stats.unparseable_dates += 1;
                None
            }
        }
    }
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_DATE_FORMAT)
    }
}

/// Degrading form: a cleaning failure yields an empty dataset and is logged.
pub fn clean_or_empty(cleaner: &Cleaner, table: &RawTable) -> Dataset {
    match cleaner.clean(table) {
        Ok((dataset, _)) => dataset,
        Err(e) => {
            warn!("Cleaning failed, continuing with an empty dataset: {}", e);
            Dataset::empty()
        }
    }
}

fn require_column(table: &RawTable, name: &str) -> Result<usize> {
    table
        .column_index(name)
        .ok_or_else(|| ProfitabilityError::MissingColumn(name.to_string()))
}

/// Lenient numeric coercion. Empty, non-numeric and non-finite cells are null.
fn parse_number(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::load_from_reader;

    fn table(csv: &str) -> RawTable {
        load_from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_drops_rows_with_missing_critical_fields() {
        let raw = table(
            "Order Date,Sales,Units,Gross Profit,Cost,Product Name\n\
             01-01-2023,100,2,20,80,A\n\
             02-01-2023,abc,2,20,80,B\n\
             03-01-2023,50,,10,40,C\n\
             04-01-2023,60,3,15,,D\n",
        );

        let (dataset, stats) = Cleaner::default().clean(&raw).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(stats.rows_read, 4);
        assert_eq!(stats.rows_dropped, 2);
        assert_eq!(dataset.records[0].product_name, "A");
        assert_eq!(dataset.records[1].product_name, "D");
        assert_eq!(dataset.records[1].cost, None);
        assert!(dataset.has_cost_column);
    }

    #[test]
    fn test_sorted_by_order_date_with_undated_last() {
        let raw = table(
            "Order Date,Sales,Units,Gross Profit,Product Name\n\
             15-03-2023,1,1,1,March\n\
             not-a-date,1,1,1,Undated\n\
             01-01-2023,1,1,1,January\n\
             15-03-2023,1,1,1,March-2\n",
        );

        let (dataset, stats) = Cleaner::default().clean(&raw).unwrap();
        let names: Vec<&str> = dataset
            .iter()
            .map(|r| r.product_name.as_str())
            .collect();

        assert_eq!(names, vec!["January", "March", "March-2", "Undated"]);
        assert_eq!(stats.unparseable_dates, 1);
        assert_eq!(dataset.records[3].order_date, None);
    }

    #[test]
    fn test_parses_source_date_format() {
        let raw = table("Order Date,Ship Date,Sales,Units,Gross Profit\n31-12-2022,02-01-2023,5,1,2\n");
        let (dataset, _) = Cleaner::default().clean(&raw).unwrap();
        let record = &dataset.records[0];
        assert_eq!(record.order_date, NaiveDate::from_ymd_opt(2022, 12, 31));
        assert_eq!(record.ship_date, NaiveDate::from_ymd_opt(2023, 1, 2));
    }

    #[test]
    fn test_missing_critical_column_fails() {
        let raw = table("Order Date,Sales,Units\n01-01-2023,1,1\n");
        let err = Cleaner::default().clean(&raw).unwrap_err();
        assert!(matches!(err, ProfitabilityError::MissingColumn(ref c) if c == "Gross Profit"));

        let dataset = clean_or_empty(&Cleaner::default(), &raw);
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_missing_cost_column_recorded() {
        let raw = table("Sales,Units,Gross Profit\n10,1,2\n");
        let (dataset, _) = Cleaner::default().clean(&raw).unwrap();
        assert!(!dataset.has_cost_column);
        assert_eq!(dataset.records[0].cost, None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 1234.5 "), Some(1234.5));
        assert_eq!(parse_number("1,234.5"), None);
        assert_eq!(parse_number("-3"), Some(-3.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("NaN"), None);
    }
}
