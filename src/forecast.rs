use crate::errors::{PricerError, PricerResult};
use crate::models::ensemble::{Ensemble, EnsembleForecast, EnsembleWeights};
use crate::models::ewma::EwmaVolatility;
use crate::models::garch::GarchPredictor;
use crate::models::historical::HistoricalVolatility;
use crate::models::lstm_proxy::LstmProxy;
use crate::models::returns::ReturnSeries;
use crate::models::VolatilityModel;
use crate::types::{MarketParams, OptionContract, VolatilityForecast};
use std::collections::BTreeMap;
use std::str::FromStr;

// ── Model selection ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Historical,
    Ewma,
    Garch,
    LstmProxy,
    Ensemble,
}

impl ModelKind {
    pub const ALL: [ModelKind; 5] = [
        Self::Historical,
        Self::Ewma,
        Self::Garch,
        Self::LstmProxy,
        Self::Ensemble,
    ];

    /// Models that can sit inside an ensemble.
    pub const BASE: [ModelKind; 4] = [Self::Historical, Self::Ewma, Self::Garch, Self::LstmProxy];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Historical => "historical",
            Self::Ewma => "ewma",
            Self::Garch => "garch",
            Self::LstmProxy => "lstm_proxy",
            Self::Ensemble => "ensemble",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = PricerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == name)
            .ok_or(PricerError::UnknownModel(name))
    }
}

// ── Estimator settings ──

#[derive(Debug, Clone)]
pub struct ForecastSettings {
    pub historical_window: usize,
    pub ewma_lambda: f64,
    pub garch_alpha: f64,
    pub garch_beta: f64,
    pub lookback_window: usize,
    pub proxy_lookback: usize,
    pub horizon: usize,
    pub weights: EnsembleWeights,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            historical_window: crate::models::historical::DEFAULT_WINDOW,
            ewma_lambda: crate::models::ewma::EWMA_LAMBDA,
            garch_alpha: crate::models::garch::DEFAULT_ALPHA,
            garch_beta: crate::models::garch::DEFAULT_BETA,
            lookback_window: crate::models::garch::DEFAULT_LOOKBACK,
            proxy_lookback: crate::models::lstm_proxy::DEFAULT_LOOKBACK,
            horizon: 1,
            weights: EnsembleWeights::default(),
        }
    }
}

/// Every model's forecast, plus the models that could not produce one.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ForecastSet {
    pub forecasts: BTreeMap<ModelKind, VolatilityForecast>,
    pub failures: BTreeMap<ModelKind, String>,
    /// Per-member breakdown behind the ensemble entry
    pub ensemble: Option<EnsembleForecast>,
}

impl ForecastSet {
    #[inline]
    pub fn get(&self, kind: ModelKind) -> Option<&VolatilityForecast> {
        self.forecasts.get(&kind)
    }
}

// ── Orchestrator ──

/// Entry point of the pipeline: selects estimators by name, runs them on a
/// return series and turns forecasts into priceable contracts.
///
/// Holds validated, unfitted prototypes; every forecast runs on a fresh copy
/// so calls never share mutable model state.
#[derive(Debug, Clone)]
pub struct Forecaster {
    historical: HistoricalVolatility,
    ewma: EwmaVolatility,
    garch: GarchPredictor,
    proxy: LstmProxy,
    weights: EnsembleWeights,
    horizon: usize,
}

impl Forecaster {
    /// Fails with `UnknownModel` if a weight names anything other than a
    /// base model.
    pub fn new(settings: ForecastSettings) -> PricerResult<Self> {
        crate::models::check_horizon(settings.horizon)?;
        for name in settings.weights.names() {
            match name.parse::<ModelKind>() {
                Ok(kind) if ModelKind::BASE.contains(&kind) => {}
                _ => return Err(PricerError::UnknownModel(name.to_string())),
            }
        }
        Ok(Self {
            historical: HistoricalVolatility::new(settings.historical_window)?,
            ewma: EwmaVolatility::new(settings.ewma_lambda)?,
            garch: GarchPredictor::with_params(
                settings.garch_alpha,
                settings.garch_beta,
                settings.lookback_window,
            )?,
            proxy: LstmProxy::new(settings.proxy_lookback)?,
            weights: settings.weights,
            horizon: settings.horizon,
        })
    }

    /// A fresh, unfitted instance of the requested model.
    pub fn build(&self, kind: ModelKind) -> Box<dyn VolatilityModel> {
        match kind {
            ModelKind::Historical => Box::new(self.historical),
            ModelKind::Ewma => Box::new(self.ewma),
            ModelKind::Garch => Box::new(self.garch.clone()),
            ModelKind::LstmProxy => Box::new(self.proxy),
            ModelKind::Ensemble => Box::new(self.build_ensemble()),
        }
    }

    /// Ensemble over the base models that carry a positive weight.
    pub fn build_ensemble(&self) -> Ensemble {
        let members = ModelKind::BASE
            .into_iter()
            .filter(|k| self.weights.weight(k.as_str()) > 0.0)
            .map(|k| self.build(k))
            .collect();
        Ensemble::new(members, self.weights.clone())
    }

    pub fn forecast(&self, returns: &ReturnSeries, kind: ModelKind) -> PricerResult<VolatilityForecast> {
        let mut model = self.build(kind);
        let vol = model.forecast(returns, self.horizon)?;
        let forecast = VolatilityForecast::new(kind.as_str(), vol)?;
        tracing::debug!(model = %kind, volatility = vol, "volatility forecast");
        Ok(forecast)
    }

    /// Same as [`Forecaster::forecast`], selecting the model by name.
    pub fn forecast_named(&self, returns: &ReturnSeries, name: &str) -> PricerResult<VolatilityForecast> {
        self.forecast(returns, name.parse()?)
    }

    /// Ensemble forecast with each member's outcome.
    pub fn forecast_ensemble(&self, returns: &ReturnSeries) -> PricerResult<EnsembleForecast> {
        self.build_ensemble().forecast_detailed(returns, self.horizon)
    }

    /// Runs every model once. Never fails as a whole; failures are reported
    /// by name.
    pub fn forecast_all(&self, returns: &ReturnSeries) -> ForecastSet {
        let mut set = ForecastSet::default();
        for kind in ModelKind::ALL {
            let outcome = match kind {
                ModelKind::Ensemble => self.forecast_ensemble(returns).and_then(|detail| {
                    let f = VolatilityForecast::new(kind.as_str(), detail.volatility)?;
                    set.ensemble = Some(detail);
                    Ok(f)
                }),
                _ => self.forecast(returns, kind),
            };
            match outcome {
                Ok(f) => {
                    set.forecasts.insert(kind, f);
                }
                Err(e) => {
                    tracing::warn!(model = %kind, error = %e, "model could not forecast");
                    set.failures.insert(kind, e.to_string());
                }
            }
        }
        set
    }

    /// Combine a forecast with caller-supplied market parameters.
    pub fn contract(
        &self,
        forecast: &VolatilityForecast,
        market: &MarketParams,
    ) -> PricerResult<OptionContract> {
        OptionContract::from_market(market, forecast.annualized_volatility)
    }
}

impl Default for Forecaster {
    fn default() -> Self {
        Self {
            historical: HistoricalVolatility::default(),
            ewma: EwmaVolatility::default(),
            garch: GarchPredictor::new(),
            proxy: LstmProxy::default(),
            weights: EnsembleWeights::default(),
            horizon: 1,
        }
    }
}
