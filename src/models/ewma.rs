use crate::errors::{PricerError, PricerResult};
use crate::models::returns::ReturnSeries;
use crate::models::{annualized, check_horizon, require_returns, VolatilityModel};

/// EWMA decay factor (lambda = 0.94 is the RiskMetrics daily standard)
pub const EWMA_LAMBDA: f64 = 0.94;

/// Exponentially weighted variance estimator.
///
/// variance_0 = r_0^2
/// variance_t = lambda * variance_{t-1} + (1 - lambda) * r_t^2
///
/// Strictly sequential: returns must be in chronological order.
#[derive(Debug, Clone, Copy)]
pub struct EwmaVolatility {
    lambda: f64,
}

impl EwmaVolatility {
    pub fn new(lambda: f64) -> PricerResult<Self> {
        if !(lambda > 0.0 && lambda < 1.0) {
            return Err(PricerError::InvalidParameter(format!(
                "EWMA lambda must be in (0, 1), got {lambda}"
            )));
        }
        Ok(Self { lambda })
    }

    #[inline]
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Final per-period variance after folding over all returns.
    pub fn variance(&self, returns: &ReturnSeries) -> PricerResult<f64> {
        let (first, rest) = returns
            .as_slice()
            .split_first()
            .ok_or(PricerError::InsufficientData { needed: 1, got: 0 })?;
        Ok(rest
            .iter()
            .fold(first * first, |var, r| self.lambda * var + (1.0 - self.lambda) * r * r))
    }

    pub fn estimate(&self, returns: &ReturnSeries) -> PricerResult<f64> {
        annualized("ewma", self.variance(returns)?)
    }
}

impl Default for EwmaVolatility {
    fn default() -> Self {
        Self { lambda: EWMA_LAMBDA }
    }
}

impl VolatilityModel for EwmaVolatility {
    #[inline]
    fn name(&self) -> &'static str {
        "ewma"
    }

    fn predict(&mut self, recent: Option<&ReturnSeries>, horizon: usize) -> PricerResult<f64> {
        check_horizon(horizon)?;
        self.estimate(require_returns(recent, 1)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_return() {
        let r = ReturnSeries::from_raw(vec![0.02]).unwrap();
        let vol = EwmaVolatility::default().estimate(&r).unwrap();
        assert!((vol - 0.02 * 252_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_recursion_by_hand() {
        let r = ReturnSeries::from_raw(vec![0.01, 0.02, -0.03]).unwrap();
        let model = EwmaVolatility::new(0.9).unwrap();
        let mut var = 0.01 * 0.01;
        var = 0.9 * var + 0.1 * 0.02 * 0.02;
        var = 0.9 * var + 0.1 * 0.03 * 0.03;
        let got = model.variance(&r).unwrap();
        assert!((got - var).abs() < 1e-15, "got={got} expected={var}");
    }

    #[test]
    fn test_order_matters() {
        let fwd = ReturnSeries::from_raw(vec![0.05, 0.001, 0.001, 0.001]).unwrap();
        let rev = ReturnSeries::from_raw(vec![0.001, 0.001, 0.001, 0.05]).unwrap();
        let m = EwmaVolatility::default();
        let a = m.estimate(&fwd).unwrap();
        let b = m.estimate(&rev).unwrap();
        assert!(b < a, "a late shock weighs less than an initial seed: fwd={a} rev={b}");
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(EwmaVolatility::new(1.0).is_err());
        assert!(EwmaVolatility::new(0.0).is_err());
        let empty = ReturnSeries::from_raw(vec![]).unwrap();
        assert_eq!(
            EwmaVolatility::default().estimate(&empty),
            Err(PricerError::InsufficientData { needed: 1, got: 0 })
        );
        // Flat prices: zero variance is not a forecast
        let flat = ReturnSeries::from_raw(vec![0.0; 5]).unwrap();
        assert!(matches!(
            EwmaVolatility::default().estimate(&flat),
            Err(PricerError::Computation(_))
        ));
    }
}
