use rand::rngs::StdRng;
use rand::SeedableRng;
use vol_pricer::config::AppConfig;
use vol_pricer::errors::{PricerError, PricerResult};
use vol_pricer::export::write_pricing_config;
use vol_pricer::forecast::{ForecastSet, ForecastSettings, Forecaster, ModelKind};
use vol_pricer::pricing::black_scholes::BlackScholes;
use vol_pricer::pricing::monte_carlo::MonteCarloEngine;
use vol_pricer::pricing::{price_both, PricingReport};
use vol_pricer::sample_data::generate_gbm_prices;

#[derive(Debug, serde::Serialize)]
struct RunReport {
    generated_at: chrono::DateTime<chrono::Utc>,
    history_days: usize,
    selected_model: ModelKind,
    forecasts: ForecastSet,
    pricing: PricingReport,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("vol_pricer starting");

    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    match run(&cfg).and_then(|report| render(&report)) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!("pipeline error: {e}");
            std::process::exit(1);
        }
    }
}

fn render(report: &RunReport) -> PricerResult<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

fn run(cfg: &AppConfig) -> PricerResult<RunReport> {
    // ── History ──
    let mut rng = StdRng::seed_from_u64(cfg.history_seed);
    let prices = generate_gbm_prices(
        cfg.history_days,
        cfg.market.spot,
        cfg.history_drift,
        cfg.history_volatility,
        &mut rng,
    )?;
    let returns = prices.returns()?;
    tracing::info!(
        days = prices.len(),
        returns = returns.len(),
        seed = cfg.history_seed,
        "price history generated"
    );

    // ── Forecasts ──
    let forecaster = Forecaster::new(ForecastSettings {
        historical_window: cfg.lookback_window,
        lookback_window: cfg.lookback_window,
        ..ForecastSettings::default()
    })?;
    let forecasts = forecaster.forecast_all(&returns);
    for (kind, f) in &forecasts.forecasts {
        tracing::info!(model = %kind, volatility = f.annualized_volatility, "forecast");
    }
    for (kind, reason) in &forecasts.failures {
        tracing::warn!(model = %kind, reason = %reason, "forecast failed");
    }

    let selected = forecasts.get(cfg.vol_model).ok_or_else(|| {
        let reason = forecasts
            .failures
            .get(&cfg.vol_model)
            .map(String::as_str)
            .unwrap_or("no forecast");
        PricerError::Computation(format!("{} forecast unavailable: {reason}", cfg.vol_model))
    })?;

    // ── Pricing ──
    let contract = forecaster.contract(selected, &cfg.market)?;
    let engine = MonteCarloEngine::new(cfg.mc_simulations, cfg.mc_steps, cfg.mc_seed)?;
    let pricing = price_both(&contract, &BlackScholes::new(), &engine)?;

    if let Some(path) = &cfg.export_path {
        write_pricing_config(path, &cfg.market, forecasts.forecasts.values())?;
    }

    Ok(RunReport {
        generated_at: chrono::Utc::now(),
        history_days: prices.len(),
        selected_model: cfg.vol_model,
        forecasts,
        pricing,
    })
}
