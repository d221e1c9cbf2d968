use crate::errors::PricerResult;
use crate::pricing::PricingEngine;
use crate::types::{Greeks, OptionContract, OptionType};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// Black-Scholes European option pricing.
///
/// d1 = (ln(S/K) + (r + sigma^2/2)*T) / (sigma * sqrt(T))
/// d2 = d1 - sigma * sqrt(T)
///
/// call = S*N(d1) - K*e^{-rT}*N(d2)
/// put  = K*e^{-rT}*N(-d2) - S*N(-d1)
pub struct BlackScholes {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl BlackScholes {
    pub fn new() -> Self {
        Self {
            normal: Normal::standard(),
        }
    }

    /// Fails with `InvalidParameter` if S, K, T or sigma is not positive.
    pub fn price_contract(&self, contract: &OptionContract) -> PricerResult<f64> {
        contract.validate()?;
        let p = contract.params();
        let n = &self.normal;
        let price = match contract.option_type {
            OptionType::Call => {
                contract.spot * n.cdf(p.d1) - contract.strike * p.discount * n.cdf(p.d2)
            }
            OptionType::Put => {
                contract.strike * p.discount * n.cdf(-p.d2) - contract.spot * n.cdf(-p.d1)
            }
        };
        Ok(price)
    }

    pub fn greeks(&self, contract: &OptionContract) -> PricerResult<Greeks> {
        contract.validate()?;
        let p = contract.params();
        let n = &self.normal;
        let pdf_d1 = n.pdf(p.d1);
        let k_disc = contract.strike * p.discount;

        let gamma = pdf_d1 / (contract.spot * p.sigma_sqrt_t);
        let vega = contract.spot * pdf_d1 * p.sqrt_t;
        let decay = -(contract.spot * pdf_d1 * contract.volatility) / (2.0 * p.sqrt_t);

        let greeks = match contract.option_type {
            OptionType::Call => Greeks {
                delta: n.cdf(p.d1),
                gamma,
                vega,
                theta: decay - contract.risk_free_rate * k_disc * n.cdf(p.d2),
                rho: contract.time_to_maturity * k_disc * n.cdf(p.d2),
            },
            OptionType::Put => Greeks {
                delta: n.cdf(p.d1) - 1.0,
                gamma,
                vega,
                theta: decay + contract.risk_free_rate * k_disc * n.cdf(-p.d2),
                rho: -contract.time_to_maturity * k_disc * n.cdf(-p.d2),
            },
        };
        Ok(greeks)
    }
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingEngine for BlackScholes {
    #[inline]
    fn name(&self) -> &'static str {
        "Black-Scholes"
    }

    fn price(&self, contract: &OptionContract) -> PricerResult<f64> {
        self.price_contract(contract)
    }
}

/// Free-function form of the pricer.
pub fn black_scholes_price(
    spot: f64,
    strike: f64,
    rate: f64,
    time: f64,
    sigma: f64,
    option_type: OptionType,
) -> PricerResult<f64> {
    let contract = OptionContract::new(spot, strike, rate, time, sigma, option_type)?;
    BlackScholes::new().price_contract(&contract)
}
