// weights.rs - Boltzmann reweighting of unbiased ensembles

use tracing::{debug, warn};

use crate::chain::Chain;
use crate::ensemble::Ensemble;
use crate::error::{check_finite, check_inverse_temperature, RubberBandError, Result};

/// Below this fraction of `M` the effective sample size is reported as a warning.
pub const LOW_ESS_FRACTION: f64 = 0.01;

/// A chain length together with its relative importance weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedSample {
    pub length: f64,
    pub weight: f64,
}

/// Reweights chains drawn at zero force to a target force.
///
/// Weights are always recomputed from the chain; nothing is stored on it.
#[derive(Debug, Clone, Copy)]
pub struct ImportanceWeighter {
    force: f64,
    inverse_temperature: f64,
}

impl ImportanceWeighter {
    pub fn new(force: f64, inverse_temperature: f64) -> Result<Self> {
        check_finite("force", force)?;
        check_inverse_temperature(inverse_temperature)?;
        Ok(Self { force, inverse_temperature })
    }

    pub fn force(&self) -> f64 {
        self.force
    }

    /// `ln w = β f L`.
    #[inline]
    pub fn log_weight_of_length(&self, length: f64) -> f64 {
        self.inverse_temperature * self.force * length
    }

    pub fn log_weight(&self, chain: &Chain) -> f64 {
        self.log_weight_of_length(chain.length())
    }

    /// Absolute Boltzmann factor `exp(β f L)`.
    ///
    /// Overflows to infinity once `β f L` exceeds ~709; use
    /// [`ImportanceWeighter::relative_weights`] for anything that gets summed.
    pub fn weight(&self, chain: &Chain) -> f64 {
        self.log_weight(chain).exp()
    }

    /// `exp(ln w_i - max_j ln w_j)` for each length; the largest weight is 1.
    pub fn relative_weights(&self, lengths: &[f64]) -> Result<Vec<f64>> {
        if lengths.is_empty() {
            return Err(RubberBandError::EmptyInput("lengths"));
        }
        let log_w: Vec<f64> = lengths.iter().map(|&l| self.log_weight_of_length(l)).collect();
        let max = log_w.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        check_finite("max log weight", max)?;
        Ok(log_w.into_iter().map(|lw| (lw - max).exp()).collect())
    }

    /// Relative weights for every chain of `ensemble`, in order.
    pub fn weights(&self, ensemble: &Ensemble) -> Result<Vec<f64>> {
        self.relative_weights(&ensemble.lengths())
    }

    pub fn weighted_samples(&self, ensemble: &Ensemble) -> Result<Vec<WeightedSample>> {
        let lengths = ensemble.lengths();
        let weights = self.relative_weights(&lengths)?;
        Ok(lengths
            .into_iter()
            .zip(weights)
            .map(|(length, weight)| WeightedSample { length, weight })
            .collect())
    }
}

/// Importance weights reweighting `ensemble` to force `f` at inverse temperature `β`.
///
/// Returned relative to the largest weight, which is exactly 1; at `f = 0`
/// every weight is exactly 1.
pub fn importance_weights(ensemble: &Ensemble, force: f64, inverse_temperature: f64) -> Result<Vec<f64>> {
    ImportanceWeighter::new(force, inverse_temperature)?.weights(ensemble)
}

/// Effective sample size `(Σw)² / Σw²`.
///
/// Weights are scaled by their maximum first so the squares cannot overflow.
/// Equals `M` when all weights are equal and tends to 1 as the mass
/// concentrates on a single sample.
pub fn effective_sample_size(weights: &[f64]) -> Result<f64> {
    if weights.is_empty() {
        return Err(RubberBandError::EmptyInput("weights"));
    }
    if let Some(&bad) = weights.iter().find(|w| !(w.is_finite() && **w >= 0.0)) {
        return Err(RubberBandError::invalid("weight", bad, "must be finite and >= 0"));
    }

    let max = weights.iter().copied().fold(0.0, f64::max);
    if max == 0.0 {
        return Err(RubberBandError::DegenerateWeights(0.0));
    }

    let (sum, sum_sq) = weights.iter().fold((0.0, 0.0), |(s, s2), &w| {
        let x = w / max;
        (s + x, s2 + x * x)
    });
    let ess = sum * sum / sum_sq;

    let m = weights.len() as f64;
    if ess < LOW_ESS_FRACTION * m {
        warn!(ess, m, "effective sample size is a small fraction of the ensemble");
    } else {
        debug!(ess, m, "effective sample size");
    }
    Ok(ess)
}
