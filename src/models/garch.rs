use crate::errors::{PricerError, PricerResult};
use crate::models::returns::{sample_variance, PriceSeries, ReturnSeries};
use crate::models::{annualized, check_horizon, VolatilityModel};

/// ARCH coefficient (weight on the last squared return)
pub const DEFAULT_ALPHA: f64 = 0.1;
/// GARCH coefficient (weight on the last variance)
pub const DEFAULT_BETA: f64 = 0.85;
/// Returns used when rolling the variance forward on fresh data
pub const DEFAULT_LOOKBACK: usize = 30;

/// GARCH(1,1) model state. Owned by exactly one [`GarchPredictor`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct GarchState {
    pub omega: f64,
    pub alpha: f64,
    pub beta: f64,
    pub current_variance: f64,
    pub is_fitted: bool,
}

/// GARCH(1,1) volatility predictor.
///
/// sigma^2_t = omega + alpha * r_t^2 + beta * sigma^2_{t-1}
///
/// `omega` is estimated by moment matching against the sample variance with
/// alpha and beta held fixed: omega = Var(r) * (1 - alpha - beta). This is a
/// known approximation, not maximum likelihood.
///
/// Unfitted -> Fitted via `fit`. `predict` with fresh data rolls the variance
/// forward but never un-fits the model.
#[derive(Debug, Clone)]
pub struct GarchPredictor {
    state: GarchState,
    lookback_window: usize,
}

impl GarchPredictor {
    pub fn new() -> Self {
        Self {
            state: GarchState {
                omega: 0.0,
                alpha: DEFAULT_ALPHA,
                beta: DEFAULT_BETA,
                current_variance: 0.0,
                is_fitted: false,
            },
            lookback_window: DEFAULT_LOOKBACK,
        }
    }

    /// Custom coefficients. Rejects anything outside (0, 1) and any
    /// non-stationary pair (alpha + beta >= 1).
    pub fn with_params(alpha: f64, beta: f64, lookback_window: usize) -> PricerResult<Self> {
        if !(alpha > 0.0 && alpha < 1.0) || !(beta > 0.0 && beta < 1.0) {
            return Err(PricerError::InvalidParameter(format!(
                "GARCH alpha and beta must be in (0, 1), got alpha={alpha} beta={beta}"
            )));
        }
        if alpha + beta >= 1.0 {
            return Err(PricerError::ModelInstability { alpha, beta });
        }
        if lookback_window == 0 {
            return Err(PricerError::InvalidParameter("GARCH lookback window must be >= 1".into()));
        }
        let mut model = Self::new();
        model.state.alpha = alpha;
        model.state.beta = beta;
        model.lookback_window = lookback_window;
        Ok(model)
    }

    #[inline]
    pub fn state(&self) -> &GarchState {
        &self.state
    }

    #[inline]
    pub fn is_fitted(&self) -> bool {
        self.state.is_fitted
    }

    #[inline]
    pub fn persistence(&self) -> f64 {
        self.state.alpha + self.state.beta
    }

    /// omega / (1 - alpha - beta). Undefined for non-stationary parameters.
    pub fn long_run_variance(&self) -> PricerResult<f64> {
        let persistence = self.persistence();
        if persistence >= 1.0 {
            return Err(PricerError::ModelInstability {
                alpha: self.state.alpha,
                beta: self.state.beta,
            });
        }
        Ok(self.state.omega / (1.0 - persistence))
    }

    pub fn fit(&mut self, prices: &PriceSeries) -> PricerResult<()> {
        self.fit_returns(&prices.returns()?)
    }

    pub fn fit_returns(&mut self, returns: &ReturnSeries) -> PricerResult<()> {
        let r = returns.as_slice();
        if r.len() < 2 {
            return Err(PricerError::InsufficientData { needed: 2, got: r.len() });
        }
        let persistence = self.persistence();
        if persistence >= 1.0 {
            return Err(PricerError::ModelInstability {
                alpha: self.state.alpha,
                beta: self.state.beta,
            });
        }

        let unconditional = sample_variance(r);
        self.state.omega = unconditional * (1.0 - persistence);
        self.state.current_variance = self.roll(unconditional, r);
        self.state.is_fitted = true;

        tracing::debug!(
            omega = self.state.omega,
            alpha = self.state.alpha,
            beta = self.state.beta,
            variance = self.state.current_variance,
            observations = r.len(),
            "GARCH fitted"
        );
        Ok(())
    }

    /// Annualized volatility `horizon` steps ahead. If prices are supplied,
    /// the variance is first rolled forward over their last
    /// `lookback_window` returns.
    pub fn predict(&mut self, prices: Option<&PriceSeries>, horizon: usize) -> PricerResult<f64> {
        if !self.state.is_fitted {
            return Err(PricerError::NotFitted("garch"));
        }
        let returns = prices.map(PriceSeries::returns).transpose()?;
        self.predict_returns(returns.as_ref(), horizon)
    }

    pub fn predict_returns(
        &mut self,
        recent: Option<&ReturnSeries>,
        horizon: usize,
    ) -> PricerResult<f64> {
        if !self.state.is_fitted {
            return Err(PricerError::NotFitted("garch"));
        }
        check_horizon(horizon)?;

        if let Some(recent) = recent {
            let window = recent.tail(self.lookback_window);
            self.state.current_variance = self.roll(self.state.current_variance, window);
        }

        annualized("garch", self.forecast_variance(horizon)?)
    }

    /// Per-period variance forecast. Mean-reverts toward the long-run
    /// variance at rate (alpha + beta)^horizon.
    pub fn forecast_variance(&self, horizon: usize) -> PricerResult<f64> {
        if horizon <= 1 {
            return Ok(self.state.current_variance);
        }
        let long_run = self.long_run_variance()?;
        let decay = self.persistence().powi(horizon.min(i32::MAX as usize) as i32);
        Ok(long_run + decay * (self.state.current_variance - long_run))
    }

    #[inline]
    fn roll(&self, start: f64, returns: &[f64]) -> f64 {
        let GarchState { omega, alpha, beta, .. } = self.state;
        returns
            .iter()
            .fold(start, |var, r| omega + alpha * r * r + beta * var)
    }
}

impl Default for GarchPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl VolatilityModel for GarchPredictor {
    #[inline]
    fn name(&self) -> &'static str {
        "garch"
    }

    fn fit(&mut self, returns: &ReturnSeries) -> PricerResult<()> {
        self.fit_returns(returns)
    }

    fn predict(&mut self, recent: Option<&ReturnSeries>, horizon: usize) -> PricerResult<f64> {
        self.predict_returns(recent, horizon)
    }

    /// The fit already ran the recursion over the full history, so the
    /// forecast comes straight from the fitted variance.
    fn forecast(&mut self, returns: &ReturnSeries, horizon: usize) -> PricerResult<f64> {
        self.fit_returns(returns)?;
        self.predict_returns(None, horizon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_data::generate_gbm_prices;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_prices(seed: u64) -> PriceSeries {
        let mut rng = StdRng::seed_from_u64(seed);
        generate_gbm_prices(500, 100.0, 0.05, 0.2, &mut rng).unwrap()
    }

    #[test]
    fn test_predict_before_fit() {
        let mut model = GarchPredictor::new();
        assert_eq!(model.predict(None, 1), Err(PricerError::NotFitted("garch")));
        let prices = sample_prices(1);
        assert_eq!(model.predict(Some(&prices), 5), Err(PricerError::NotFitted("garch")));
        assert!(!model.is_fitted());
    }

    #[test]
    fn test_fit_matches_recursion_by_hand() {
        let prices = PriceSeries::new(vec![100.0, 101.0, 99.5, 100.5, 102.0]).unwrap();
        let r = prices.returns().unwrap();
        let mut model = GarchPredictor::new();
        model.fit(&prices).unwrap();

        let v = sample_variance(r.as_slice());
        let omega = v * (1.0 - 0.1 - 0.85);
        let mut var = v;
        for x in r.as_slice() {
            var = omega + 0.1 * x * x + 0.85 * var;
        }
        let s = model.state();
        assert!(s.is_fitted);
        assert!((s.omega - omega).abs() < 1e-18);
        assert!((s.current_variance - var).abs() < 1e-18);

        let one_step = model.predict(None, 1).unwrap();
        assert!((one_step - (var * 252.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_long_horizon_converges_to_long_run() {
        let mut model = GarchPredictor::new();
        model.fit(&sample_prices(42)).unwrap();
        let long_run = model.long_run_variance().unwrap();
        let far = model.predict(None, 1000).unwrap();
        let expected = (long_run * 252.0).sqrt();
        assert!(
            (far - expected).abs() < 1e-9,
            "horizon-1000 forecast {far} should equal long-run vol {expected}"
        );
        // Long-run variance is the sample variance by construction
        let lr_vol = expected;
        assert!(lr_vol > 0.1 && lr_vol < 0.3, "long-run vol={lr_vol}");
    }

    #[test]
    fn test_multi_step_formula() {
        let mut model = GarchPredictor::new();
        model.fit(&sample_prices(3)).unwrap();
        let s = *model.state();
        let long_run = s.omega / (1.0 - s.alpha - s.beta);
        let expected = long_run + 0.95_f64.powi(10) * (s.current_variance - long_run);
        let got = model.forecast_variance(10).unwrap();
        assert!((got - expected).abs() < 1e-18, "got={got} expected={expected}");
    }

    #[test]
    fn test_predict_with_prices_updates_state() {
        let mut model = GarchPredictor::new();
        model.fit(&sample_prices(5)).unwrap();
        let before = model.state().current_variance;

        // A violent fresh window must push the variance up
        let shock = PriceSeries::new(vec![100.0, 120.0, 90.0, 125.0, 85.0]).unwrap();
        let vol = model.predict(Some(&shock), 1).unwrap();
        let after = model.state().current_variance;
        assert!(after > before, "variance should rise: {before} -> {after}");
        assert!((vol - (after * 252.0).sqrt()).abs() < 1e-12);
        assert!(model.is_fitted());
    }

    #[test]
    fn test_not_fitted_wins_over_short_prices() {
        let mut model = GarchPredictor::new();
        let one = PriceSeries::new(vec![100.0]).unwrap();
        assert_eq!(model.predict(Some(&one), 1), Err(PricerError::NotFitted("garch")));
    }

    #[test]
    fn test_flat_history_is_not_a_forecast() {
        let mut model = GarchPredictor::new();
        model.fit(&PriceSeries::new(vec![100.0; 10]).unwrap()).unwrap();
        assert!(matches!(model.predict(None, 1), Err(PricerError::Computation(_))));
        assert!(matches!(model.predict(None, 5), Err(PricerError::Computation(_))));
    }

    #[test]
    fn test_non_stationary_params_rejected() {
        assert_eq!(
            GarchPredictor::with_params(0.5, 0.5, 30).unwrap_err(),
            PricerError::ModelInstability { alpha: 0.5, beta: 0.5 }
        );
        assert!(matches!(
            GarchPredictor::with_params(0.5, 0.6, 30),
            Err(PricerError::ModelInstability { .. })
        ));
        assert!(matches!(
            GarchPredictor::with_params(0.0, 0.5, 30),
            Err(PricerError::InvalidParameter(_))
        ));
        assert!(GarchPredictor::with_params(0.05, 0.9, 30).is_ok());
    }

    #[test]
    fn test_zero_horizon_and_short_history() {
        let mut model = GarchPredictor::new();
        let two = PriceSeries::new(vec![100.0, 101.0]).unwrap();
        assert!(matches!(model.fit(&two), Err(PricerError::InsufficientData { .. })));
        model.fit(&sample_prices(9)).unwrap();
        assert!(model.predict(None, 0).is_err());
    }
}
