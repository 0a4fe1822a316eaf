//! Loader: reads delimited text into an untyped in-memory table.
//!
//! No business semantics are applied here. Every cell stays a string and the
//! cleaner decides what parses.

use crate::error::Result;
use log::{debug, info};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const ORDER_DATE: &str = "Order Date";
pub const SHIP_DATE: &str = "Ship Date";
pub const SALES: &str = "Sales";
pub const UNITS: &str = "Units";
pub const GROSS_PROFIT: &str = "Gross Profit";
pub const COST: &str = "Cost";
pub const DIVISION: &str = "Division";
pub const PRODUCT_NAME: &str = "Product Name";
pub const STATE_PROVINCE: &str = "State/Province";

/// Raw rows exactly as read, plus a header lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    header_map: HashMap<String, usize>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers: Vec<String> = headers.iter().map(|h| normalize_header_name(h)).collect();
        let header_map = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        Self {
            headers,
            rows,
            header_map,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header_map.get(name).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.header_map.contains_key(name)
    }

    /// Cell at `(row, column)`; short rows read as empty.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Loads a CSV file with a header row.
pub fn load(path: impl AsRef<Path>) -> Result<RawTable> {
    let path = path.as_ref();
    info!("Loading sales data from {}", path.display());
    let file = File::open(path)?;
    load_from_reader(file)
}

pub fn load_from_reader<R: Read>(reader: R) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    debug!("Read {} rows across {} columns", rows.len(), headers.len());

    Ok(RawTable::new(headers, rows))
}

fn normalize_header_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_string()
}
