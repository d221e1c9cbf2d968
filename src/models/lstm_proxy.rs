use crate::errors::{PricerError, PricerResult};
use crate::models::returns::{population_variance, ReturnSeries};
use crate::models::{annualized, check_horizon, require_returns, VolatilityModel};

pub const DEFAULT_LOOKBACK: usize = 20;

/// Stand-in for an untrained sequence model.
///
/// Forecasts the population standard deviation of the last `lookback`
/// returns (all of them when fewer are available), annualized. It exists so
/// ensembles can name a second member; it is not a learned model.
#[derive(Debug, Clone, Copy)]
pub struct LstmProxy {
    lookback: usize,
}

impl LstmProxy {
    pub fn new(lookback: usize) -> PricerResult<Self> {
        if lookback == 0 {
            return Err(PricerError::InvalidParameter("proxy lookback must be >= 1".into()));
        }
        Ok(Self { lookback })
    }

    pub fn estimate(&self, returns: &ReturnSeries) -> PricerResult<f64> {
        if returns.is_empty() {
            return Err(PricerError::InsufficientData { needed: 1, got: 0 });
        }
        let recent = returns.tail(self.lookback);
        annualized("lstm_proxy", population_variance(recent))
    }
}

impl Default for LstmProxy {
    fn default() -> Self {
        Self { lookback: DEFAULT_LOOKBACK }
    }
}

impl VolatilityModel for LstmProxy {
    #[inline]
    fn name(&self) -> &'static str {
        "lstm_proxy"
    }

    fn predict(&mut self, recent: Option<&ReturnSeries>, horizon: usize) -> PricerResult<f64> {
        check_horizon(horizon)?;
        self.estimate(require_returns(recent, 1)?)
    }
}
