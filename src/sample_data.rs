//! Synthetic price histories for demos and tests.
//!
//! Randomness always comes from the caller's RNG; nothing here seeds or
//! touches global state.

use crate::errors::{ensure_finite, ensure_positive, PricerError, PricerResult};
use crate::models::returns::PriceSeries;
use crate::types::TRADING_DAYS_PER_YEAR;
use rand::Rng;
use rand_distr::StandardNormal;

/// Daily prices following geometric Brownian motion with annual drift `mu`
/// and annual volatility `sigma`, starting at `initial_price`.
pub fn generate_gbm_prices<R: Rng + ?Sized>(
    n_days: usize,
    initial_price: f64,
    mu: f64,
    sigma: f64,
    rng: &mut R,
) -> PricerResult<PriceSeries> {
    if n_days < 2 {
        return Err(PricerError::InvalidParameter(format!(
            "need at least 2 days of history, got {n_days}"
        )));
    }
    ensure_positive("initial_price", initial_price)?;
    ensure_positive("sigma", sigma)?;
    ensure_finite("mu", mu)?;

    let dt = 1.0 / TRADING_DAYS_PER_YEAR;
    let drift = (mu - 0.5 * sigma * sigma) * dt;
    let diffusion = sigma * dt.sqrt();

    let mut prices = Vec::with_capacity(n_days);
    let mut p = initial_price;
    prices.push(p);
    for _ in 1..n_days {
        let z: f64 = rng.sample(StandardNormal);
        p *= (drift + diffusion * z).exp();
        prices.push(p);
    }
    PriceSeries::new(prices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::historical::HistoricalVolatility;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_same_seed_same_history() {
        let a = generate_gbm_prices(100, 50.0, 0.05, 0.3, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = generate_gbm_prices(100, 50.0, 0.05, 0.3, &mut StdRng::seed_from_u64(42)).unwrap();
        let c = generate_gbm_prices(100, 50.0, 0.05, 0.3, &mut StdRng::seed_from_u64(43)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 100);
        assert_eq!(a.as_slice()[0], 50.0);
    }

    #[test]
    fn test_realized_vol_matches_input() {
        let mut rng = StdRng::seed_from_u64(2024);
        let prices = generate_gbm_prices(5000, 100.0, 0.0, 0.25, &mut rng).unwrap();
        let returns = prices.returns().unwrap();
        let vol = HistoricalVolatility::new(5000).unwrap().estimate(&returns).unwrap();
        assert!((vol - 0.25).abs() < 0.02, "realized vol={vol}");
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate_gbm_prices(1, 100.0, 0.05, 0.2, &mut rng).is_err());
        assert!(generate_gbm_prices(10, 0.0, 0.05, 0.2, &mut rng).is_err());
        assert!(generate_gbm_prices(10, 100.0, 0.05, -0.2, &mut rng).is_err());
    }
}
