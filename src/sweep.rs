//! Force sweeps: one independent sample-reweight-compare pass per force.

use std::str::FromStr;

use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::ensemble::{chain_generator, Ensemble, EnsembleGenerator};
use crate::error::{RubberBandError, Result};
use crate::histogram::{Comparison, HistogramComparator};
use crate::stats::{linear_fit, weighted_mean, LinearFit, OnlineStats};
use crate::theory::{mean_length_exact, TheoreticalPmf};
use crate::utils::rng::{seeded_rng, stream_rng};
use crate::weights::{effective_sample_size, ImportanceWeighter};

/// How a forced ensemble is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepMode {
    /// Unbiased chains reweighted by `exp(β f L)`.
    Reweighted,
    /// Chains drawn directly from the tilted bond distribution.
    Biased,
}

impl SweepMode {
    pub fn from_biased(biased: bool) -> Self {
        if biased { Self::Biased } else { Self::Reweighted }
    }
}

/// `count` evenly spaced values from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (count - 1) as f64;
            (0..count)
                .map(|i| if i == count - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// One `linspace` piece of a force grid, written `start:stop:count`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSegment {
    pub start: f64,
    pub stop: f64,
    pub count: usize,
}

impl GridSegment {
    pub fn values(&self) -> Vec<f64> {
        linspace(self.start, self.stop, self.count)
    }
}

impl FromStr for GridSegment {
    type Err = RubberBandError;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || RubberBandError::invalid("grid_segment", f64::NAN, "expected start:stop:count");
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let [start, stop, count] = parts.as_slice() else {
            return Err(bad());
        };
        let start: f64 = start.parse().map_err(|_| bad())?;
        let stop: f64 = stop.parse().map_err(|_| bad())?;
        let count: usize = count.parse().map_err(|_| bad())?;
        if !(start.is_finite() && stop.is_finite()) {
            return Err(bad());
        }
        Ok(Self { start, stop, count })
    }
}

/// Segments laid end to end, e.g. a dense grid at small force followed by a
/// coarse one. Shared endpoints are kept twice.
pub fn concat_grids(segments: &[GridSegment]) -> Vec<f64> {
    segments.iter().flat_map(GridSegment::values).collect()
}

/// Scalar summary of one force.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint {
    pub force: f64,
    pub chi_squared: f64,
    pub reduced_chi_squared: f64,
    pub p_value: f64,
    /// Effective sample size; `M` for unweighted comparisons.
    pub effective_sample_size: f64,
    /// `ess / M`.
    pub ess_fraction: f64,
    /// Sample (or importance-weighted) mean length.
    pub mean_length: f64,
    pub std_length: f64,
    /// `⟨L⟩` from the exact PMF.
    pub theory_mean_length: f64,
    /// `N a tanh(β f a)`.
    pub closed_form_mean_length: f64,
}

/// Full result for one force: the summary plus the binned comparison.
#[derive(Debug, Clone)]
pub struct ForceAnalysis {
    pub point: SweepPoint,
    pub comparison: Comparison,
}

/// Compare `ensemble` with the exact PMF at `force`.
///
/// `Reweighted` treats the ensemble as drawn at zero force and weights it to
/// `force`; `Biased` treats it as already drawn at `force`.
pub fn analyze_ensemble(
    ensemble: &Ensemble,
    force: f64,
    inverse_temperature: f64,
    mode: SweepMode,
) -> Result<ForceAnalysis> {
    let n_bonds = ensemble.n_bonds();
    let bond_length = ensemble.bond_length();
    let pmf = TheoreticalPmf::new(n_bonds, bond_length, force, inverse_temperature)?;
    let comparator = HistogramComparator::new(&pmf.lengths, &pmf.probabilities)?;

    let lengths = ensemble.lengths();
    let m = lengths.len();

    let (comparison, ess, mean_length, std_length) = match mode {
        SweepMode::Biased => {
            let stats: OnlineStats = lengths.iter().copied().collect();
            let comparison = comparator.compare(&lengths, None, m)?;
            (comparison, m as f64, stats.mean(), stats.std())
        }
        SweepMode::Reweighted => {
            let weights = ImportanceWeighter::new(force, inverse_temperature)?.relative_weights(&lengths)?;
            let ess = effective_sample_size(&weights)?;
            let mean = weighted_mean(&lengths, &weights)?;
            let sq_dev: Vec<f64> = lengths.iter().map(|l| (l - mean).powi(2)).collect();
            let var = weighted_mean(&sq_dev, &weights)?;
            let comparison = comparator.compare(&lengths, Some(&weights), m)?;
            (comparison, ess, mean, var.sqrt())
        }
    };

    let point = SweepPoint {
        force,
        chi_squared: comparison.chi_squared,
        reduced_chi_squared: comparison.reduced_chi_squared,
        p_value: comparison.p_value(),
        effective_sample_size: ess,
        ess_fraction: ess / m as f64,
        mean_length,
        std_length,
        theory_mean_length: pmf.mean_length(),
        closed_form_mean_length: mean_length_exact(n_bonds, bond_length, force, inverse_temperature),
    };
    debug!(?point, "force analysed");
    Ok(ForceAnalysis { point, comparison })
}

fn generator_for(cfg: &SimulationConfig, force: f64) -> Result<EnsembleGenerator> {
    let chain = chain_generator(
        cfg.n_bonds,
        cfg.bond_length,
        force,
        cfg.biased,
        cfg.inverse_temperature,
    )?;
    EnsembleGenerator::new(chain, cfg.n_chains)
}

/// Generate a fresh ensemble for `force` from `rng` and analyse it.
pub fn run_force<R: Rng + ?Sized>(cfg: &SimulationConfig, force: f64, rng: &mut R) -> Result<ForceAnalysis> {
    let ensemble = generator_for(cfg, force)?.generate(rng);
    analyze_ensemble(&ensemble, force, cfg.inverse_temperature, SweepMode::from_biased(cfg.biased))
}

/// Single-force run seeded from `cfg.seed`; uses the first configured force.
///
/// With `cfg.parallel` the ensemble is built block-parallel (see
/// [`EnsembleGenerator::generate_parallel`]), otherwise from one stream.
pub fn run_single(cfg: &SimulationConfig) -> Result<ForceAnalysis> {
    cfg.validate()?;
    let force = cfg.forces[0];
    let gen = generator_for(cfg, force)?;
    let ensemble = if cfg.parallel {
        gen.generate_parallel(cfg.seed)
    } else {
        gen.generate(&mut seeded_rng(cfg.seed))
    };
    analyze_ensemble(&ensemble, force, cfg.inverse_temperature, SweepMode::from_biased(cfg.biased))
}

/// One fresh ensemble per force, in parallel over forces.
///
/// Point `i` draws from `stream_rng(cfg.seed, i)`, so results depend on the
/// seed and the force list only. `on_point` fires once per finished force,
/// from whichever worker finished it.
pub fn sweep<F>(cfg: &SimulationConfig, on_point: F) -> Result<Vec<SweepPoint>>
where
    F: Fn(&SweepPoint) + Sync,
{
    cfg.validate()?;
    info!(
        n_forces = cfg.forces.len(),
        n_bonds = cfg.n_bonds,
        n_chains = cfg.n_chains,
        biased = cfg.biased,
        "starting force sweep"
    );
    cfg.forces
        .par_iter()
        .enumerate()
        .map(|(i, &force)| {
            let mut rng = stream_rng(cfg.seed, i);
            let point = run_force(cfg, force, &mut rng)?.point;
            on_point(&point);
            Ok(point)
        })
        .collect()
}

/// Reweight a single unbiased ensemble to each of `forces`.
pub fn reweight_sweep(ensemble: &Ensemble, forces: &[f64], inverse_temperature: f64) -> Result<Vec<ForceAnalysis>> {
    if forces.is_empty() {
        return Err(RubberBandError::EmptyInput("forces"));
    }
    forces
        .iter()
        .map(|&f| analyze_ensemble(ensemble, f, inverse_temperature, SweepMode::Reweighted))
        .collect()
}

/// Straight-line fit of mean length against force over the leading
/// `fraction` of `points`; its slope estimates the Hooke stiffness `N a² β`.
pub fn hooke_fit(points: &[SweepPoint], fraction: f64) -> Result<LinearFit> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(RubberBandError::invalid("fraction", fraction, "must be in (0, 1]"));
    }
    let take = ((points.len() as f64 * fraction) as usize).max(2).min(points.len());
    let xs: Vec<f64> = points[..take].iter().map(|p| p.force).collect();
    let ys: Vec<f64> = points[..take].iter().map(|p| p.mean_length).collect();
    linear_fit(&xs, &ys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_endpoints() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(2.0, 3.0, 1), vec![2.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(*linspace(0.0001, 0.5, 250).last().unwrap(), 0.5);
    }

    #[test]
    fn grids_concatenate_in_order() {
        let segments: Vec<GridSegment> = ["0:0.1:3", "0.5:1:2"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        assert_eq!(concat_grids(&segments), vec![0.0, 0.05, 0.1, 0.5, 1.0]);
        assert_eq!(
            "-0.5 : 0 : 11".parse::<GridSegment>().unwrap(),
            GridSegment { start: -0.5, stop: 0.0, count: 11 }
        );
        assert!("0:1".parse::<GridSegment>().is_err());
        assert!("0:1:x".parse::<GridSegment>().is_err());
        assert!("nan:1:3".parse::<GridSegment>().is_err());
        assert!(concat_grids(&[]).is_empty());
    }

    #[test]
    fn hooke_fit_needs_points() {
        assert!(hooke_fit(&[], 0.5).is_err());
        assert!(hooke_fit(&[], 0.0).is_err());
    }
}
