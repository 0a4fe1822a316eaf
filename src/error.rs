use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfitabilityError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Aggregation error in {insight}: {details}")]
    Aggregation { insight: String, details: String },

    #[error("Insufficient history for {metric}: need at least {required} monthly points, got {actual}")]
    InsufficientHistory {
        metric: String,
        required: usize,
        actual: usize,
    },

    #[error("Model fit failed for {metric}: {details}")]
    ModelFit { metric: String, details: String },

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Customer segment weights are invalid: {0}")]
    InvalidSegmentWeights(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProfitabilityError {
    /// True for failures of the source itself (unreadable or unparseable input).
    pub fn is_source_error(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Csv(_))
    }
}

pub type Result<T> = std::result::Result<T, ProfitabilityError>;
