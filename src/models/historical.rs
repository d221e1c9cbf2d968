use crate::errors::{PricerError, PricerResult};
use crate::models::returns::{sample_variance, ReturnSeries};
use crate::models::{annualized, check_horizon, require_returns, VolatilityModel};

pub const DEFAULT_WINDOW: usize = 30;

/// Rolling-window historical volatility: unbiased sample standard deviation
/// of the most recent `window` returns, annualized with sqrt(252).
#[derive(Debug, Clone, Copy)]
pub struct HistoricalVolatility {
    window: usize,
}

impl HistoricalVolatility {
    pub fn new(window: usize) -> PricerResult<Self> {
        if window < 2 {
            return Err(PricerError::InvalidParameter(format!(
                "historical window must be >= 2, got {window}"
            )));
        }
        Ok(Self { window })
    }

    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }

    /// Uses the last `min(window, len)` returns. A window of identical
    /// returns has no volatility and is a `Computation` error.
    pub fn estimate(&self, returns: &ReturnSeries) -> PricerResult<f64> {
        let recent = returns.tail(self.window);
        if recent.len() < 2 {
            return Err(PricerError::InsufficientData { needed: 2, got: recent.len() });
        }
        annualized("historical", sample_variance(recent))
    }
}

impl Default for HistoricalVolatility {
    fn default() -> Self {
        Self { window: DEFAULT_WINDOW }
    }
}

impl VolatilityModel for HistoricalVolatility {
    #[inline]
    fn name(&self) -> &'static str {
        "historical"
    }

    fn predict(&mut self, recent: Option<&ReturnSeries>, horizon: usize) -> PricerResult<f64> {
        check_horizon(horizon)?;
        self.estimate(require_returns(recent, 2)?)
    }
}
