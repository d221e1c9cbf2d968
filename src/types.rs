use crate::errors::{ensure_finite, ensure_positive, PricerError, PricerResult};
use std::str::FromStr;

/// Trading days per year. Every per-period estimate is annualized with sqrt(252).
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// z-score of the two-sided 95% normal confidence interval.
pub const Z_95: f64 = 1.96;

// ── Option side ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Intrinsic value at expiry.
    #[inline]
    pub fn payoff(self, terminal: f64, strike: f64) -> f64 {
        match self {
            Self::Call => (terminal - strike).max(0.0),
            Self::Put => (strike - terminal).max(0.0),
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

impl FromStr for OptionType {
    type Err = PricerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" => Ok(Self::Call),
            "put" => Ok(Self::Put),
            other => Err(PricerError::InvalidParameter(format!(
                "option type must be call or put, got {other:?}"
            ))),
        }
    }
}

// ── Market inputs supplied by the caller ──

/// Everything needed to price an option except the volatility.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct MarketParams {
    pub spot: f64,
    pub strike: f64,
    pub risk_free_rate: f64,
    pub time_to_maturity: f64,
    pub option_type: OptionType,
}

// ── European option contract ──

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct OptionContract {
    pub spot: f64,
    pub strike: f64,
    pub risk_free_rate: f64,
    pub time_to_maturity: f64,
    pub volatility: f64,
    pub option_type: OptionType,
}

impl OptionContract {
    /// Build a validated contract. Spot, strike, maturity and volatility must
    /// be strictly positive; the rate may be any finite number.
    pub fn new(
        spot: f64,
        strike: f64,
        risk_free_rate: f64,
        time_to_maturity: f64,
        volatility: f64,
        option_type: OptionType,
    ) -> PricerResult<Self> {
        let contract = Self {
            spot,
            strike,
            risk_free_rate,
            time_to_maturity,
            volatility,
            option_type,
        };
        contract.validate()?;
        Ok(contract)
    }

    pub fn from_market(market: &MarketParams, volatility: f64) -> PricerResult<Self> {
        Self::new(
            market.spot,
            market.strike,
            market.risk_free_rate,
            market.time_to_maturity,
            volatility,
            market.option_type,
        )
    }

    pub fn validate(&self) -> PricerResult<()> {
        ensure_positive("spot", self.spot)?;
        ensure_positive("strike", self.strike)?;
        ensure_positive("time_to_maturity", self.time_to_maturity)?;
        ensure_positive("volatility", self.volatility)?;
        ensure_finite("risk_free_rate", self.risk_free_rate)
    }

    /// Same contract with the other side.
    #[inline]
    pub fn with_type(&self, option_type: OptionType) -> Self {
        Self { option_type, ..*self }
    }

    #[inline]
    pub fn discount_factor(&self) -> f64 {
        (-self.risk_free_rate * self.time_to_maturity).exp()
    }

    #[inline]
    pub fn params(&self) -> ContractParams {
        ContractParams::new(self)
    }
}

// ── Precomputed pricing terms (stack, no alloc) ──

#[derive(Debug, Clone, Copy)]
pub struct ContractParams {
    pub ln_s_k: f64,
    pub sqrt_t: f64,
    pub sigma_sqrt_t: f64,
    pub discount: f64,
    pub d1: f64,
    pub d2: f64,
}

impl ContractParams {
    #[inline]
    pub fn new(c: &OptionContract) -> Self {
        let ln_s_k = (c.spot / c.strike).ln();
        let sqrt_t = c.time_to_maturity.sqrt();
        let sigma_sqrt_t = c.volatility * sqrt_t;
        let half_sigma_sq = 0.5 * c.volatility * c.volatility;
        let d1 = (ln_s_k + (c.risk_free_rate + half_sigma_sq) * c.time_to_maturity) / sigma_sqrt_t;
        Self {
            ln_s_k,
            sqrt_t,
            sigma_sqrt_t,
            discount: c.discount_factor(),
            d1,
            d2: d1 - sigma_sqrt_t,
        }
    }
}

// ── Outputs ──

/// Annualized volatility produced by one model, as a decimal fraction.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct VolatilityForecast {
    pub model_name: String,
    pub annualized_volatility: f64,
}

impl VolatilityForecast {
    /// Only finite, strictly positive volatilities are valid forecasts.
    pub fn new(model_name: impl Into<String>, annualized_volatility: f64) -> PricerResult<Self> {
        let model_name = model_name.into();
        if !annualized_volatility.is_finite() || annualized_volatility <= 0.0 {
            return Err(PricerError::Computation(format!(
                "{model_name} produced an invalid volatility: {annualized_volatility}"
            )));
        }
        Ok(Self {
            model_name,
            annualized_volatility,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct MonteCarloResult {
    pub price: f64,
    pub standard_error: f64,
    /// (lower, upper) = price -/+ 1.96 * standard_error
    pub confidence_interval_95: (f64, f64),
    pub num_simulations: usize,
}

impl MonteCarloResult {
    pub fn new(price: f64, standard_error: f64, num_simulations: usize) -> Self {
        let half_width = Z_95 * standard_error;
        Self {
            price,
            standard_error,
            confidence_interval_95: (price - half_width, price + half_width),
            num_simulations,
        }
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        let (lo, hi) = self.confidence_interval_95;
        value >= lo && value <= hi
    }
}

/// Black-Scholes sensitivities. Vega is per unit of volatility, theta per
/// year, rho per unit of rate.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub vega: f64,
    pub theta: f64,
    pub rho: f64,
}
