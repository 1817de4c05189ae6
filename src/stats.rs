// stats.rs - Sample statistics of chain lengths

use crate::error::{RubberBandError, Result};

/// Welford online stats.
#[derive(Debug, Default, Clone, Copy)]
pub struct OnlineStats {
    n:    u64,
    mean: f64,
    m2:   f64,
}

impl OnlineStats {
    pub fn push(&mut self, x: f64) {
        self.n += 1;
        let delta  = x - self.mean;
        self.mean += delta / self.n as f64;
        let delta2 = x - self.mean;
        self.m2   += delta * delta2;
    }
    pub fn count(&self) -> u64 { self.n }
    pub fn mean(&self) -> f64 { self.mean }
    /// Population variance (divides by `n`), matching the spread of the PMF.
    pub fn var(&self)  -> f64 { if self.n > 0 { self.m2 / self.n as f64 } else { 0.0 } }
    /// Unbiased sample variance (divides by `n - 1`).
    pub fn sample_var(&self) -> f64 { if self.n > 1 { self.m2 / (self.n - 1) as f64 } else { 0.0 } }
    pub fn std(&self)  -> f64 { self.var().sqrt() }
    /// Standard error of the mean.
    pub fn sem(&self)  -> f64 { if self.n > 1 { (self.sample_var() / self.n as f64).sqrt() } else { 0.0 } }
}

impl FromIterator<f64> for OnlineStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut s = Self::default();
        iter.into_iter().for_each(|x| s.push(x));
        s
    }
}

/// `Σ w_i x_i / Σ w_i`.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> Result<f64> {
    if values.len() != weights.len() {
        return Err(RubberBandError::LengthMismatch {
            field: "weights",
            expected: values.len(),
            actual: weights.len(),
        });
    }
    let sum_w: f64 = weights.iter().sum();
    if !(sum_w > 0.0 && sum_w.is_finite()) {
        return Err(RubberBandError::DegenerateWeights(sum_w));
    }
    Ok(values.iter().zip(weights).map(|(x, w)| x * w).sum::<f64>() / sum_w)
}

/// Least-squares straight line through `(x, y)` points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Sum of squared residuals.
    pub residual: f64,
}

impl LinearFit {
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Ordinary least squares `y = slope * x + intercept`.
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Result<LinearFit> {
    if xs.len() != ys.len() {
        return Err(RubberBandError::LengthMismatch {
            field: "ys",
            expected: xs.len(),
            actual: ys.len(),
        });
    }
    if xs.len() < 2 {
        return Err(RubberBandError::EmptyInput("fit points (need at least 2)"));
    }

    let n = xs.len() as f64;
    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_xx: f64 = xs.iter().map(|x| x * x).sum();
    let sum_xy: f64 = xs.iter().zip(ys).map(|(x, y)| x * y).sum();

    let det = n * sum_xx - sum_x * sum_x;
    if det.abs() < 1e-300 {
        return Err(RubberBandError::invalid("xs", det, "all abscissae coincide"));
    }
    let slope = (n * sum_xy - sum_x * sum_y) / det;
    let intercept = (sum_y - slope * sum_x) / n;
    let residual = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
        .sum();

    Ok(LinearFit { slope, intercept, residual })
}
