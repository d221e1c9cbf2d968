use crate::errors::{PricerError, PricerResult};
use crate::pricing::PricingEngine;
use crate::types::{MonteCarloResult, OptionContract};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rayon::prelude::*;

/// Paths simulated per RNG stream. Fixed so that results for a given seed do
/// not depend on how rayon schedules the batches.
const BATCH_SIZE: usize = 4096;

pub const DEFAULT_SIMULATIONS: usize = 100_000;
pub const DEFAULT_STEPS: usize = 252;

/// Monte Carlo pricer for European options under geometric Brownian motion.
///
/// Each step uses the exact lognormal solution
///
/// S_{t+dt} = S_t * exp((r - sigma^2/2)*dt + sigma*sqrt(dt)*Z),  Z ~ N(0,1)
///
/// so there is no discretization bias at any step count. Paths are split into
/// fixed-size batches simulated in parallel; batch `i` draws from its own
/// `StdRng` seeded with `seed + i`, and batch statistics are merged in batch
/// order.
#[derive(Debug, Clone, Copy)]
pub struct MonteCarloEngine {
    num_simulations: usize,
    num_steps: usize,
    seed: Option<u64>,
}

impl MonteCarloEngine {
    /// `seed = None` draws a fresh base seed on every call.
    pub fn new(num_simulations: usize, num_steps: usize, seed: Option<u64>) -> PricerResult<Self> {
        if num_simulations < 2 {
            return Err(PricerError::InvalidParameter(format!(
                "num_simulations must be >= 2, got {num_simulations}"
            )));
        }
        if num_steps == 0 {
            return Err(PricerError::InvalidParameter("num_steps must be >= 1".into()));
        }
        Ok(Self {
            num_simulations,
            num_steps,
            seed,
        })
    }

    #[inline]
    pub fn num_simulations(&self) -> usize {
        self.num_simulations
    }

    #[inline]
    pub fn num_steps(&self) -> usize {
        self.num_steps
    }

    #[inline]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Discounted mean payoff, its standard error and 95% interval.
    pub fn simulate(&self, contract: &OptionContract) -> PricerResult<MonteCarloResult> {
        contract.validate()?;
        let base_seed = self.seed.unwrap_or_else(rand::random);
        let stepper = GbmStepper::new(contract, self.num_steps);
        let n = self.num_simulations;
        let batches = n.div_ceil(BATCH_SIZE);

        let partials: Vec<PayoffStats> = (0..batches)
            .into_par_iter()
            .map(|b| {
                let len = BATCH_SIZE.min(n - b * BATCH_SIZE);
                let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(b as u64));
                let mut stats = PayoffStats::default();
                for _ in 0..len {
                    let terminal = stepper.terminal(contract.spot, &mut rng);
                    stats.push(contract.option_type.payoff(terminal, contract.strike));
                }
                stats
            })
            .collect();

        let stats = partials.into_iter().fold(PayoffStats::default(), PayoffStats::merge);
        let discount = contract.discount_factor();
        let price = discount * stats.mean;
        let standard_error = discount * (stats.sample_variance() / n as f64).sqrt();

        if !price.is_finite() || !standard_error.is_finite() {
            return Err(PricerError::Computation(format!(
                "Monte Carlo produced non-finite output: price={price} se={standard_error}"
            )));
        }

        tracing::debug!(
            seed = base_seed,
            paths = n,
            steps = self.num_steps,
            price,
            standard_error,
            "Monte Carlo pricing complete"
        );
        Ok(MonteCarloResult::new(price, standard_error, n))
    }

    /// One full trajectory of `num_steps + 1` prices starting at spot.
    pub fn generate_path<R: Rng + ?Sized>(
        &self,
        contract: &OptionContract,
        rng: &mut R,
    ) -> PricerResult<Vec<f64>> {
        contract.validate()?;
        let stepper = GbmStepper::new(contract, self.num_steps);
        let mut path = Vec::with_capacity(self.num_steps + 1);
        let mut s = contract.spot;
        path.push(s);
        for _ in 0..self.num_steps {
            s = stepper.step(s, rng);
            path.push(s);
        }
        Ok(path)
    }
}

impl Default for MonteCarloEngine {
    fn default() -> Self {
        Self {
            num_simulations: DEFAULT_SIMULATIONS,
            num_steps: DEFAULT_STEPS,
            seed: None,
        }
    }
}

impl PricingEngine for MonteCarloEngine {
    #[inline]
    fn name(&self) -> &'static str {
        "Monte-Carlo"
    }

    fn price(&self, contract: &OptionContract) -> PricerResult<f64> {
        Ok(self.simulate(contract)?.price)
    }
}

/// Precomputed per-step drift and diffusion.
#[derive(Debug, Clone, Copy)]
struct GbmStepper {
    drift: f64,
    diffusion: f64,
    steps: usize,
}

impl GbmStepper {
    fn new(contract: &OptionContract, steps: usize) -> Self {
        let dt = contract.time_to_maturity / steps as f64;
        let sigma = contract.volatility;
        Self {
            drift: (contract.risk_free_rate - 0.5 * sigma * sigma) * dt,
            diffusion: sigma * dt.sqrt(),
            steps,
        }
    }

    #[inline]
    fn step<R: Rng + ?Sized>(&self, s: f64, rng: &mut R) -> f64 {
        let z: f64 = rng.sample(StandardNormal);
        s * (self.drift + self.diffusion * z).exp()
    }

    #[inline]
    fn terminal<R: Rng + ?Sized>(&self, spot: f64, rng: &mut R) -> f64 {
        (0..self.steps).fold(spot, |s, _| self.step(s, rng))
    }
}

/// Running mean and sum of squared deviations (Welford), mergeable across
/// batches (Chan et al.).
#[derive(Debug, Clone, Copy, Default)]
struct PayoffStats {
    count: usize,
    mean: f64,
    m2: f64,
}

impl PayoffStats {
    #[inline]
    fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn merge(self, other: Self) -> Self {
        if self.count == 0 {
            return other;
        }
        if other.count == 0 {
            return self;
        }
        let na = self.count as f64;
        let nb = other.count as f64;
        let n = na + nb;
        let delta = other.mean - self.mean;
        Self {
            count: self.count + other.count,
            mean: self.mean + delta * nb / n,
            m2: self.m2 + other.m2 + delta * delta * na * nb / n,
        }
    }

    /// Divisor n-1.
    #[inline]
    fn sample_variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        self.m2 / (self.count - 1) as f64
    }
}
