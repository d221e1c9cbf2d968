pub mod returns;
pub mod historical;
pub mod ewma;
pub mod garch;
pub mod lstm_proxy;
pub mod ensemble;

use crate::errors::{PricerError, PricerResult};
use returns::ReturnSeries;

/// All volatility estimators implement this trait.
///
/// Each variant carries only the state it needs: stateless estimators accept
/// `fit` as a no-op and must be given returns in `predict`, while GARCH keeps
/// its fitted variance and can forecast from it alone.
/// Send + Sync so fitted models can be moved onto worker threads.
pub trait VolatilityModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Estimate model state from the full return history.
    fn fit(&mut self, _returns: &ReturnSeries) -> PricerResult<()> {
        Ok(())
    }

    /// Annualized volatility forecast `horizon` periods ahead.
    /// `recent` optionally supplies fresh returns to condition on.
    fn predict(&mut self, recent: Option<&ReturnSeries>, horizon: usize) -> PricerResult<f64>;

    /// Fit on `returns`, then forecast from the fitted state.
    fn forecast(&mut self, returns: &ReturnSeries, horizon: usize) -> PricerResult<f64> {
        self.fit(returns)?;
        self.predict(Some(returns), horizon)
    }
}

#[inline]
pub(crate) fn check_horizon(horizon: usize) -> PricerResult<()> {
    if horizon == 0 {
        return Err(PricerError::InvalidParameter("forecast horizon must be >= 1".into()));
    }
    Ok(())
}

/// Annualize a per-period variance. Only finite, strictly positive
/// volatilities are valid output.
#[inline]
pub(crate) fn annualized(model: &str, variance: f64) -> PricerResult<f64> {
    let vol = (variance * crate::types::TRADING_DAYS_PER_YEAR).sqrt();
    if vol.is_finite() && vol > 0.0 {
        Ok(vol)
    } else {
        Err(PricerError::Computation(format!("{model} produced volatility {vol}")))
    }
}

/// Stateless estimators have nothing to forecast from without data.
#[inline]
pub(crate) fn require_returns<'a>(
    recent: Option<&'a ReturnSeries>,
    needed: usize,
) -> PricerResult<&'a ReturnSeries> {
    recent.ok_or(PricerError::InsufficientData { needed, got: 0 })
}
