use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum CustomerSegment {
    #[schemars(description = "Bulk buyers reselling to stores (40% of simulated customers)")]
    Wholesale,

    #[schemars(description = "Store-front retail customers (30% of simulated customers)")]
    Retail,

    #[schemars(description = "Web shop orders (20% of simulated customers)")]
    Online,

    #[schemars(description = "Corporate gifting and events (10% of simulated customers)")]
    Corporate,
}

impl CustomerSegment {
    pub const ALL: [CustomerSegment; 4] = [
        CustomerSegment::Wholesale,
        CustomerSegment::Retail,
        CustomerSegment::Online,
        CustomerSegment::Corporate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerSegment::Wholesale => "Wholesale",
            CustomerSegment::Retail => "Retail",
            CustomerSegment::Online => "Online",
            CustomerSegment::Corporate => "Corporate",
        }
    }
}

impl fmt::Display for CustomerSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ratio metrics computed per record by the enricher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DerivedMetrics {
    #[serde(rename = "Gross Margin (%)")]
    pub gross_margin_pct: f64,
    #[serde(rename = "Profit per Unit")]
    pub profit_per_unit: f64,
}

/// Simulated customer and product dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SyntheticDimensions {
    #[serde(rename = "Customer ID")]
    pub customer_id: String,
    #[serde(rename = "Customer Segment")]
    pub customer_segment: CustomerSegment,
    #[serde(rename = "Product Category")]
    pub product_category: String,
}

/// Split of a record's total cost into its components.
///
/// `manufacturing + shipping + overhead == cost` within floating tolerance, and
/// `overhead` is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CostBreakdown {
    #[serde(rename = "Manufacturing Cost")]
    pub manufacturing: f64,
    #[serde(rename = "Shipping Cost")]
    pub shipping: f64,
    #[serde(rename = "Overhead Cost")]
    pub overhead: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.manufacturing + self.shipping + self.overhead
    }
}

/// One sales line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TransactionRecord {
    #[serde(rename = "Order Date")]
    pub order_date: Option<NaiveDate>,
    #[serde(rename = "Ship Date")]
    pub ship_date: Option<NaiveDate>,
    #[serde(rename = "Sales")]
    pub sales: f64,
    #[serde(rename = "Units")]
    pub units: f64,
    #[serde(rename = "Gross Profit")]
    pub gross_profit: f64,
    #[serde(rename = "Cost")]
    pub cost: Option<f64>,
    #[serde(rename = "Division")]
    pub division: String,
    #[serde(rename = "Product Name")]
    pub product_name: String,
    #[serde(rename = "State/Province")]
    pub state_province: String,

    #[serde(flatten, default)]
    pub derived: Option<DerivedMetrics>,
    #[serde(flatten, default)]
    pub dimensions: Option<SyntheticDimensions>,
    #[serde(flatten, default)]
    pub cost_breakdown: Option<CostBreakdown>,
}

impl TransactionRecord {
    /// A cleaned record with no enrichment applied yet.
    pub fn new(
        product_name: impl Into<String>,
        division: impl Into<String>,
        sales: f64,
        units: f64,
        gross_profit: f64,
    ) -> Self {
        Self {
            order_date: None,
            ship_date: None,
            sales,
            units,
            gross_profit,
            cost: None,
            division: division.into(),
            product_name: product_name.into(),
            state_province: String::new(),
            derived: None,
            dimensions: None,
            cost_breakdown: None,
        }
    }

    /// Margin of this record, computed on the fly if the enricher has not run.
    pub fn gross_margin_pct(&self) -> f64 {
        self.derived
            .map(|d| d.gross_margin_pct)
            .unwrap_or_else(|| crate::utils::ratio(self.gross_profit, self.sales) * 100.0)
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.dimensions.as_ref().map(|d| d.customer_id.as_str())
    }

    pub fn customer_segment(&self) -> Option<CustomerSegment> {
        self.dimensions.as_ref().map(|d| d.customer_segment)
    }

    pub fn product_category(&self) -> Option<&str> {
        self.dimensions.as_ref().map(|d| d.product_category.as_str())
    }
}

/// The canonical in-memory table the analytics run over.
///
/// Records are kept in ascending `order_date` order once cleaned. `has_cost_column`
/// tracks whether the source carried a `Cost` column at all, independently of
/// whether individual values parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub records: Vec<TransactionRecord>,
    pub has_cost_column: bool,
}

impl Dataset {
    pub fn new(records: Vec<TransactionRecord>, has_cost_column: bool) -> Self {
        Self {
            records,
            has_cost_column,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TransactionRecord> {
        self.records.iter()
    }

    pub fn has_cost_breakdown(&self) -> bool {
        self.records.iter().any(|r| r.cost_breakdown.is_some())
    }

    pub fn has_customer_ids(&self) -> bool {
        self.records.iter().any(|r| r.dimensions.is_some())
    }

    pub fn total_sales(&self) -> f64 {
        self.records.iter().map(|r| r.sales).sum()
    }

    pub fn total_gross_profit(&self) -> f64 {
        self.records.iter().map(|r| r.gross_profit).sum()
    }

    pub fn total_units(&self) -> f64 {
        self.records.iter().map(|r| r.units).sum()
    }

    pub fn first_order_date(&self) -> Option<NaiveDate> {
        self.records.iter().filter_map(|r| r.order_date).min()
    }

    pub fn last_order_date(&self) -> Option<NaiveDate> {
        self.records.iter().filter_map(|r| r.order_date).max()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a TransactionRecord;
    type IntoIter = std::slice::Iter<'a, TransactionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_margin_without_enrichment() {
        let record = TransactionRecord::new("Wonka Bar", "Chocolate", 200.0, 10.0, 50.0);
        assert!((record.gross_margin_pct() - 25.0).abs() < 1e-10);

        let free = TransactionRecord::new("Sample", "Other", 0.0, 1.0, 5.0);
        assert_eq!(free.gross_margin_pct(), 0.0);
    }

    #[test]
    fn test_record_serializes_with_source_column_names() {
        let mut record = TransactionRecord::new("Wonka Bar", "Chocolate", 200.0, 10.0, 50.0);
        record.cost_breakdown = Some(CostBreakdown {
            manufacturing: 105.0,
            shipping: 30.0,
            overhead: 15.0,
        });

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["Product Name"], "Wonka Bar");
        assert_eq!(json["Gross Profit"], 50.0);
        assert_eq!(json["Manufacturing Cost"], 105.0);
        assert!(json.get("Customer ID").is_none());
    }

    #[test]
    fn test_dataset_totals() {
        let dataset = Dataset::new(
            vec![
                TransactionRecord::new("A", "Chocolate", 100.0, 4.0, 20.0),
                TransactionRecord::new("B", "Sugar", 50.0, 1.0, 5.0),
            ],
            false,
        );
        assert_eq!(dataset.len(), 2);
        assert!((dataset.total_sales() - 150.0).abs() < 1e-10);
        assert!((dataset.total_gross_profit() - 25.0).abs() < 1e-10);
        assert!((dataset.total_units() - 5.0).abs() < 1e-10);
        assert!(!dataset.has_cost_breakdown());
        assert!(!dataset.has_customer_ids());
    }
}
