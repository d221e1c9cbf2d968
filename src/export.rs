//! Flat `key=value` pricing configuration consumed by downstream pricers.

use crate::errors::PricerResult;
use crate::types::{MarketParams, VolatilityForecast};
use std::path::Path;

const HEADER: &str = "# Volatility pricing configuration";

/// Render the configuration text. One `volatility_<model>` line per forecast,
/// sorted by model name; all numbers with six decimals.
pub fn render_pricing_config<'a, I>(market: &MarketParams, forecasts: I) -> String
where
    I: IntoIterator<Item = &'a VolatilityForecast>,
{
    let mut forecasts: Vec<&VolatilityForecast> = forecasts.into_iter().collect();
    forecasts.sort_by(|a, b| a.model_name.cmp(&b.model_name));

    let mut out = String::with_capacity(256);
    out.push_str(HEADER);
    out.push('\n');
    out.push_str(&format!("spot_price={:.6}\n", market.spot));
    out.push_str(&format!("strike_price={:.6}\n", market.strike));
    out.push_str(&format!("risk_free_rate={:.6}\n", market.risk_free_rate));
    out.push_str(&format!("time_to_maturity={:.6}\n", market.time_to_maturity));
    for f in forecasts {
        out.push_str(&format!(
            "volatility_{}={:.6}\n",
            f.model_name, f.annualized_volatility
        ));
    }
    out.push_str(&format!("option_type={}\n", market.option_type));
    out
}

pub fn write_pricing_config<'a, I>(
    path: impl AsRef<Path>,
    market: &MarketParams,
    forecasts: I,
) -> PricerResult<()>
where
    I: IntoIterator<Item = &'a VolatilityForecast>,
{
    let path = path.as_ref();
    let text = render_pricing_config(market, forecasts);
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, text)?;
    tracing::info!(path = %path.display(), "pricing config written");
    Ok(())
}
