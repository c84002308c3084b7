use thiserror::Error;

#[derive(Error, Debug)]
pub enum FunnelError {
    #[error("Invalid configuration for unit '{unit}': {field} {reason}")]
    InvalidConfig {
        unit:   String,
        field:  &'static str,
        reason: String,
    },

    #[error("Degenerate seasonality baseline in Q{quarter}: raw weights must sum to a positive value")]
    DegenerateBaseline { quarter: usize },

    #[error("Invalid target for unit '{unit}': {reason}")]
    InvalidTarget { unit: String, reason: String },

    #[error("Business unit '{unit}' not found")]
    UnknownUnit { unit: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type FunnelResult<T> = Result<T, FunnelError>;
