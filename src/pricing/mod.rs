pub mod black_scholes;
pub mod monte_carlo;

use crate::errors::PricerResult;
use crate::types::{Greeks, MonteCarloResult, OptionContract};
use black_scholes::BlackScholes;
use monte_carlo::MonteCarloEngine;

/// All option pricers implement this trait.
/// price() is deterministic for deterministic engines; Monte Carlo engines
/// are deterministic only when seeded.
pub trait PricingEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Present value of the contract in the currency units of spot/strike.
    fn price(&self, contract: &OptionContract) -> PricerResult<f64>;
}

/// Analytical and simulated valuation of one contract.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PricingReport {
    pub contract: OptionContract,
    pub black_scholes: f64,
    pub greeks: Greeks,
    pub monte_carlo: MonteCarloResult,
    /// |MC - BS| measured in Monte Carlo standard errors
    pub mc_error_in_se: f64,
}

/// Price a contract with both engines.
pub fn price_both(
    contract: &OptionContract,
    analytic: &BlackScholes,
    engine: &MonteCarloEngine,
) -> PricerResult<PricingReport> {
    let black_scholes = analytic.price_contract(contract)?;
    let greeks = analytic.greeks(contract)?;
    let monte_carlo = engine.simulate(contract)?;
    let mc_error_in_se = if monte_carlo.standard_error > 0.0 {
        (monte_carlo.price - black_scholes).abs() / monte_carlo.standard_error
    } else {
        0.0
    };

    tracing::info!(
        option = %contract.option_type,
        volatility = contract.volatility,
        black_scholes,
        monte_carlo = monte_carlo.price,
        standard_error = monte_carlo.standard_error,
        "contract priced"
    );

    Ok(PricingReport {
        contract: *contract,
        black_scholes,
        greeks,
        monte_carlo,
        mc_error_in_se,
    })
}
