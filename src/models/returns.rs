use crate::errors::{PricerError, PricerResult};

/// Chronological sequence of strictly positive prices. Immutable once built.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PriceSeries(Vec<f64>);

impl PriceSeries {
    pub fn new(prices: Vec<f64>) -> PricerResult<Self> {
        if let Some((i, p)) = prices
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || **p <= 0.0)
        {
            return Err(PricerError::InvalidParameter(format!(
                "price at index {i} must be positive and finite, got {p}"
            )));
        }
        Ok(Self(prices))
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn last(&self) -> Option<f64> {
        self.0.last().copied()
    }

    pub fn returns(&self) -> PricerResult<ReturnSeries> {
        ReturnSeries::from_prices(self)
    }
}

/// Log returns derived from a [`PriceSeries`]; one shorter than the prices.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ReturnSeries(Vec<f64>);

impl ReturnSeries {
    /// `r[i] = ln(p[i+1] / p[i])`. Needs at least two prices.
    pub fn from_prices(prices: &PriceSeries) -> PricerResult<Self> {
        let p = prices.as_slice();
        if p.len() < 2 {
            return Err(PricerError::InsufficientData { needed: 2, got: p.len() });
        }
        Ok(Self(p.windows(2).map(|w| (w[1] / w[0]).ln()).collect()))
    }

    /// Wrap returns that were produced elsewhere (e.g. a data collaborator).
    pub fn from_raw(returns: Vec<f64>) -> PricerResult<Self> {
        if returns.iter().any(|r| !r.is_finite()) {
            return Err(PricerError::InvalidParameter("returns must be finite".into()));
        }
        Ok(Self(returns))
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The most recent `n` returns (all of them if fewer).
    #[inline]
    pub fn tail(&self, n: usize) -> &[f64] {
        &self.0[self.0.len().saturating_sub(n)..]
    }
}

/// Sample variance with divisor n-1. Caller guarantees `data.len() >= 2`.
#[inline]
pub(crate) fn sample_variance(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    data.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / (n - 1.0)
}

/// Population variance with divisor n. Caller guarantees `!data.is_empty()`.
#[inline]
pub(crate) fn population_variance(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    data.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_return_is_ln_ratio() {
        let prices = PriceSeries::new(vec![100.0, 105.0]).unwrap();
        let r = prices.returns().unwrap();
        assert_eq!(r.len(), 1);
        assert!((r.as_slice()[0] - 1.05_f64.ln()).abs() < 1e-15);
        assert!((r.as_slice()[0] - 0.04879).abs() < 1e-5);
    }

    #[test]
    fn test_length_is_one_shorter() {
        for n in 2..20 {
            let prices = PriceSeries::new((0..n).map(|i| 100.0 + i as f64).collect()).unwrap();
            assert_eq!(prices.returns().unwrap().len(), n - 1);
        }
    }

    #[test]
    fn test_too_few_prices() {
        let one = PriceSeries::new(vec![100.0]).unwrap();
        assert_eq!(
            one.returns(),
            Err(PricerError::InsufficientData { needed: 2, got: 1 })
        );
        let none = PriceSeries::new(vec![]).unwrap();
        assert!(none.returns().is_err());
    }

    #[test]
    fn test_rejects_non_positive_prices() {
        assert!(PriceSeries::new(vec![100.0, 0.0, 101.0]).is_err());
        assert!(PriceSeries::new(vec![100.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_tail_and_variance() {
        let r = ReturnSeries::from_raw(vec![0.01, -0.02, 0.03, 0.0]).unwrap();
        assert_eq!(r.tail(2), &[0.03, 0.0]);
        assert_eq!(r.tail(10).len(), 4);

        let v = sample_variance(&[1.0, 2.0, 3.0]);
        assert!((v - 1.0).abs() < 1e-12, "sample variance={v}");
        let pv = population_variance(&[1.0, 2.0, 3.0]);
        assert!((pv - 2.0 / 3.0).abs() < 1e-12, "population variance={pv}");
    }
}
