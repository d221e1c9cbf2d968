use crate::errors::{PricerError, PricerResult};
use crate::forecast::ModelKind;
use crate::types::{MarketParams, OptionType};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub market: MarketParams,
    pub vol_model: ModelKind,
    pub mc_simulations: usize,
    pub mc_steps: usize,
    pub mc_seed: Option<u64>,
    pub history_days: usize,
    pub history_drift: f64,
    pub history_volatility: f64,
    pub history_seed: u64,
    pub lookback_window: usize,
    pub export_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> PricerResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> PricerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let option_type = env
            .or("OPTION_TYPE", "call")
            .parse::<OptionType>()
            .map_err(|e| PricerError::Config(format!("OPTION_TYPE: {e}")))?;

        let vol_model = env
            .or("VOL_MODEL", "ensemble")
            .parse::<ModelKind>()
            .map_err(|e| PricerError::Config(format!("VOL_MODEL: {e}")))?;

        let market = MarketParams {
            spot: env.parse("SPOT_PRICE", "100")?,
            strike: env.parse("STRIKE_PRICE", "100")?,
            risk_free_rate: env.parse("RISK_FREE_RATE", "0.05")?,
            time_to_maturity: env.parse("TIME_TO_MATURITY", "1.0")?,
            option_type,
        };

        Ok(Self {
            market,
            vol_model,
            mc_simulations: env.parse("MC_SIMULATIONS", "100000")?,
            mc_steps: env.parse("MC_STEPS", "252")?,
            mc_seed: env.parse_opt("MC_SEED")?,
            history_days: env.parse("HISTORY_DAYS", "252")?,
            history_drift: env.parse("HISTORY_DRIFT", "0.05")?,
            history_volatility: env.parse("HISTORY_VOLATILITY", "0.2")?,
            history_seed: env.parse("HISTORY_SEED", "42")?,
            lookback_window: env.parse("LOOKBACK_WINDOW", "30")?,
            export_path: env.get("EXPORT_PATH").map(PathBuf::from),
        })
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Set and non-blank.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &str, default: &str) -> PricerResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.or(key, default)
            .parse::<T>()
            .map_err(|e| PricerError::Config(format!("{key}: {e}")))
    }

    fn parse_opt<T>(&self, key: &str) -> PricerResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|v| v.parse::<T>())
            .transpose()
            .map_err(|e| PricerError::Config(format!("{key}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> PricerResult<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.market.spot, 100.0);
        assert_eq!(cfg.market.strike, 100.0);
        assert_eq!(cfg.market.risk_free_rate, 0.05);
        assert_eq!(cfg.market.time_to_maturity, 1.0);
        assert_eq!(cfg.market.option_type, OptionType::Call);
        assert_eq!(cfg.vol_model, ModelKind::Ensemble);
        assert_eq!(cfg.mc_simulations, 100_000);
        assert_eq!(cfg.mc_steps, 252);
        assert_eq!(cfg.mc_seed, None);
        assert_eq!(cfg.history_days, 252);
        assert_eq!(cfg.history_seed, 42);
        assert_eq!(cfg.lookback_window, 30);
        assert!(cfg.export_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let cfg = load(&[
            ("SPOT_PRICE", "250.5"),
            ("OPTION_TYPE", "PUT"),
            ("VOL_MODEL", "garch"),
            ("MC_SEED", "7"),
            ("MC_STEPS", " 12 "),
            ("EXPORT_PATH", "out/pricing.txt"),
        ])
        .unwrap();
        assert_eq!(cfg.market.spot, 250.5);
        assert_eq!(cfg.market.option_type, OptionType::Put);
        assert_eq!(cfg.vol_model, ModelKind::Garch);
        assert_eq!(cfg.mc_seed, Some(7));
        assert_eq!(cfg.mc_steps, 12);
        assert_eq!(cfg.export_path, Some(PathBuf::from("out/pricing.txt")));
    }

    #[test]
    fn test_blank_values_fall_back() {
        let cfg = load(&[("MC_SEED", ""), ("SPOT_PRICE", "  ")]).unwrap();
        assert_eq!(cfg.mc_seed, None);
        assert_eq!(cfg.market.spot, 100.0);
    }

    #[test]
    fn test_parse_errors_name_the_key() {
        let err = load(&[("MC_SIMULATIONS", "lots")]).unwrap_err();
        assert!(matches!(&err, PricerError::Config(m) if m.starts_with("MC_SIMULATIONS")), "{err}");

        let err = load(&[("VOL_MODEL", "lstm")]).unwrap_err();
        assert!(matches!(&err, PricerError::Config(m) if m.starts_with("VOL_MODEL")), "{err}");

        assert!(load(&[("OPTION_TYPE", "straddle")]).is_err());
        assert!(load(&[("MC_SEED", "-1")]).is_err());
    }
}
