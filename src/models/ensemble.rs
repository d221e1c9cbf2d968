use crate::errors::{PricerError, PricerResult};
use crate::models::garch::GarchPredictor;
use crate::models::lstm_proxy::LstmProxy;
use crate::models::returns::ReturnSeries;
use crate::models::VolatilityModel;
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// Model name -> non-negative weight. Weights need not sum to 1.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EnsembleWeights(BTreeMap<String, f64>);

impl EnsembleWeights {
    pub fn new<I, S>(weights: I) -> PricerResult<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (name, w) in weights {
            let name = name.into();
            if !w.is_finite() || w < 0.0 {
                return Err(PricerError::InvalidParameter(format!(
                    "ensemble weight for {name} must be finite and >= 0, got {w}"
                )));
            }
            map.insert(name, w);
        }
        Ok(Self(map))
    }

    /// Members without an entry carry no weight.
    #[inline]
    pub fn weight(&self, name: &str) -> f64 {
        self.0.get(name).copied().unwrap_or(0.0)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.keys().map(String::as_str)
    }

    #[inline]
    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self(BTreeMap::from([
            ("garch".to_string(), 0.6),
            ("lstm_proxy".to_string(), 0.4),
        ]))
    }
}

/// What one member contributed: its forecast, or why it has none.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ModelOutcome {
    pub model: &'static str,
    pub weight: f64,
    pub result: Result<f64, String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EnsembleForecast {
    /// Weighted sum over the members that succeeded
    pub volatility: f64,
    /// Sum of the weights that actually contributed
    pub weight_used: f64,
    pub outcomes: SmallVec<[ModelOutcome; 4]>,
}

impl EnsembleForecast {
    /// Sum `weight * forecast` over successful members.
    ///
    /// Failed members are dropped together with their weight and the rest are
    /// NOT rescaled, so a missing member lowers the combined value. Fails
    /// when no positively weighted member produced a forecast.
    pub fn from_outcomes(outcomes: SmallVec<[ModelOutcome; 4]>) -> PricerResult<Self> {
        let mut volatility = 0.0;
        let mut weight_used = 0.0;
        for o in outcomes.iter().filter(|o| o.weight > 0.0) {
            if let Ok(v) = o.result {
                volatility += o.weight * v;
                weight_used += o.weight;
            }
        }

        if weight_used <= 0.0 || !volatility.is_finite() || volatility <= 0.0 {
            let reasons: Vec<String> = outcomes
                .iter()
                .map(|o| match &o.result {
                    Err(e) => format!("{}: {e}", o.model),
                    Ok(_) => format!("{}: zero weight", o.model),
                })
                .collect();
            return Err(PricerError::Computation(format!(
                "no weighted ensemble member produced a forecast ({})",
                reasons.join("; ")
            )));
        }

        Ok(Self {
            volatility,
            weight_used,
            outcomes,
        })
    }

    /// Names of the members that failed to contribute.
    pub fn failed(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.outcomes.iter().filter(|o| o.result.is_err()).map(|o| o.model)
    }
}

/// Fixed-weight linear combination of volatility models.
pub struct Ensemble {
    members: Vec<Box<dyn VolatilityModel>>,
    weights: EnsembleWeights,
}

impl Ensemble {
    pub fn new(members: Vec<Box<dyn VolatilityModel>>, weights: EnsembleWeights) -> Self {
        for m in &members {
            if weights.weight(m.name()) == 0.0 {
                tracing::debug!(model = m.name(), "ensemble member has no weight");
            }
        }
        Self { members, weights }
    }

    #[inline]
    pub fn weights(&self) -> &EnsembleWeights {
        &self.weights
    }

    pub fn member_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.members.iter().map(|m| m.name())
    }

    /// Fit every member on `returns` and forecast, keeping per-member outcomes.
    pub fn forecast_detailed(
        &mut self,
        returns: &ReturnSeries,
        horizon: usize,
    ) -> PricerResult<EnsembleForecast> {
        self.collect(|m| m.forecast(returns, horizon))
    }

    /// Forecast from each member's current state, keeping per-member outcomes.
    pub fn predict_detailed(
        &mut self,
        recent: Option<&ReturnSeries>,
        horizon: usize,
    ) -> PricerResult<EnsembleForecast> {
        self.collect(|m| m.predict(recent, horizon))
    }

    fn collect<F>(&mut self, mut run: F) -> PricerResult<EnsembleForecast>
    where
        F: FnMut(&mut dyn VolatilityModel) -> PricerResult<f64>,
    {
        let mut outcomes: SmallVec<[ModelOutcome; 4]> = SmallVec::new();
        for member in self.members.iter_mut() {
            let model = member.name();
            let weight = self.weights.weight(model);
            let result = run(member.as_mut()).and_then(|v| {
                if v.is_finite() && v > 0.0 {
                    Ok(v)
                } else {
                    Err(PricerError::Computation(format!("{model} produced volatility {v}")))
                }
            });
            match &result {
                Ok(v) => tracing::debug!(model, weight, volatility = v, "ensemble member forecast"),
                Err(e) => tracing::warn!(model, error = %e, "ensemble member dropped"),
            }
            outcomes.push(ModelOutcome {
                model,
                weight,
                result: result.map_err(|e| e.to_string()),
            });
        }
        EnsembleForecast::from_outcomes(outcomes)
    }
}

impl Default for Ensemble {
    /// GARCH at 0.6 and the recent-window proxy at 0.4.
    fn default() -> Self {
        Self::new(
            vec![Box::new(GarchPredictor::new()), Box::new(LstmProxy::default())],
            EnsembleWeights::default(),
        )
    }
}

impl VolatilityModel for Ensemble {
    #[inline]
    fn name(&self) -> &'static str {
        "ensemble"
    }

    /// Member fit failures are not fatal; those members fail again at
    /// prediction time and are dropped there.
    fn fit(&mut self, returns: &ReturnSeries) -> PricerResult<()> {
        for member in self.members.iter_mut() {
            if let Err(e) = member.fit(returns) {
                tracing::warn!(model = member.name(), error = %e, "ensemble member failed to fit");
            }
        }
        Ok(())
    }

    fn predict(&mut self, recent: Option<&ReturnSeries>, horizon: usize) -> PricerResult<f64> {
        Ok(self.predict_detailed(recent, horizon)?.volatility)
    }

    fn forecast(&mut self, returns: &ReturnSeries, horizon: usize) -> PricerResult<f64> {
        Ok(self.forecast_detailed(returns, horizon)?.volatility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::historical::HistoricalVolatility;

    /// Always fails, to exercise the drop path.
    struct Broken;

    impl VolatilityModel for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn predict(&mut self, _recent: Option<&ReturnSeries>, _horizon: usize) -> PricerResult<f64> {
            Err(PricerError::Computation("no signal".into()))
        }
    }

    /// Returns a fixed volatility.
    struct Fixed(f64);

    impl VolatilityModel for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn predict(&mut self, _recent: Option<&ReturnSeries>, _horizon: usize) -> PricerResult<f64> {
            Ok(self.0)
        }
    }

    fn returns() -> ReturnSeries {
        ReturnSeries::from_raw(vec![0.01, -0.012, 0.008, -0.005, 0.011, -0.009, 0.004]).unwrap()
    }

    #[test]
    fn test_failed_member_is_dropped_without_renormalization() {
        let weights = EnsembleWeights::new([("broken", 0.6), ("fixed", 0.4)]).unwrap();
        let mut ens = Ensemble::new(vec![Box::new(Broken), Box::new(Fixed(0.25))], weights);
        let out = ens.forecast_detailed(&returns(), 1).unwrap();

        // Exactly the survivor scaled by its own weight, not rescaled to 0.25
        assert!((out.volatility - 0.4 * 0.25).abs() < 1e-15, "vol={}", out.volatility);
        assert!((out.weight_used - 0.4).abs() < 1e-15);
        assert_eq!(out.failed().collect::<Vec<_>>(), vec!["broken"]);
        assert_eq!(out.outcomes.len(), 2);
    }

    #[test]
    fn test_all_members_fail() {
        let weights = EnsembleWeights::new([("broken", 1.0)]).unwrap();
        let mut ens = Ensemble::new(vec![Box::new(Broken)], weights);
        let err = ens.forecast_detailed(&returns(), 1).unwrap_err();
        match err {
            PricerError::Computation(msg) => assert!(msg.contains("broken"), "msg={msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_only_unweighted_members_succeed() {
        let weights = EnsembleWeights::new([("garch", 0.6)]).unwrap();
        let mut ens = Ensemble::new(
            vec![Box::new(GarchPredictor::new()), Box::new(HistoricalVolatility::default())],
            weights,
        );
        // GARCH is unfitted and historical carries no weight
        let r = returns();
        assert!(matches!(ens.predict(Some(&r), 1), Err(PricerError::Computation(_))));
        assert!(matches!(
            ens.predict_detailed(Some(&r), 1),
            Err(PricerError::Computation(_))
        ));
    }

    #[test]
    fn test_weighted_sum_of_real_models() {
        let weights = EnsembleWeights::new([("historical", 0.5), ("fixed", 0.5)]).unwrap();
        let mut ens = Ensemble::new(
            vec![Box::new(HistoricalVolatility::default()), Box::new(Fixed(0.3))],
            weights,
        );
        let r = returns();
        let hist = HistoricalVolatility::default().estimate(&r).unwrap();
        let v = ens.forecast(&r, 1).unwrap();
        assert!((v - (0.5 * hist + 0.15)).abs() < 1e-12);
    }

    #[test]
    fn test_unweighted_member_contributes_nothing() {
        let weights = EnsembleWeights::new([("fixed", 1.0)]).unwrap();
        let mut ens = Ensemble::new(
            vec![Box::new(Fixed(0.2)), Box::new(HistoricalVolatility::default())],
            weights,
        );
        let out = ens.forecast_detailed(&returns(), 1).unwrap();
        assert!((out.volatility - 0.2).abs() < 1e-15);
    }

    #[test]
    fn test_default_predict_before_fit_drops_garch() {
        let mut ens = Ensemble::default();
        let r = returns();
        // GARCH is not fitted yet; only the proxy (weight 0.4) contributes
        let out = ens.predict_detailed(Some(&r), 1).unwrap();
        assert_eq!(out.failed().collect::<Vec<_>>(), vec!["garch"]);
        let proxy = LstmProxy::default().estimate(&r).unwrap();
        assert!((out.volatility - 0.4 * proxy).abs() < 1e-15);

        // After fitting both members contribute
        let full = ens.forecast_detailed(&r, 1).unwrap();
        assert_eq!(full.failed().count(), 0);
        assert!((full.weight_used - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_negative_weight_rejected() {
        assert!(EnsembleWeights::new([("garch", -0.1)]).is_err());
        assert!(EnsembleWeights::new([("garch", f64::NAN)]).is_err());
        assert!((EnsembleWeights::default().total() - 1.0).abs() < 1e-12);
    }
}
