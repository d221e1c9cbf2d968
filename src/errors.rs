/// Domain-specific error types for the forecasting and pricing pipeline.
/// Every failure is local and recoverable; callers decide whether to retry.
/// The only place errors are deliberately absorbed is the ensemble, which
/// records each member's failure in its result instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PricerError {
    #[error("insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("model not fitted: {0}")]
    NotFitted(&'static str),

    #[error("GARCH parameters are non-stationary: alpha={alpha} beta={beta} (alpha + beta must be < 1)")]
    ModelInstability { alpha: f64, beta: f64 },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("computation error: {0}")]
    Computation(String),

    #[error("unknown volatility model: {0}")]
    UnknownModel(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for PricerError {
    fn from(e: std::io::Error) -> Self {
        PricerError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for PricerError {
    fn from(e: serde_json::Error) -> Self {
        PricerError::Serialization(e.to_string())
    }
}

pub type PricerResult<T> = Result<T, PricerError>;

/// Reject a non-positive or non-finite input.
#[inline]
pub(crate) fn ensure_positive(name: &str, value: f64) -> PricerResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PricerError::InvalidParameter(format!("{name} must be > 0, got {value}")))
    }
}

#[inline]
pub(crate) fn ensure_finite(name: &str, value: f64) -> PricerResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PricerError::InvalidParameter(format!("{name} must be finite, got {value}")))
    }
}
