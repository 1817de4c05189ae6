// histogram.rs - Weighted histograms on the discrete length support and
// chi-squared goodness of fit against the exact distribution.

use tracing::debug;

use crate::error::{RubberBandError, Result};

/// Smallest expected count a chi-squared cell may have. Runs of sparser bins
/// are pooled with their neighbours before scoring.
pub const MIN_EXPECTED_COUNT: f64 = 5.0;

/// Outcome of binning a sample against a theoretical PMF.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Bin centres (the theoretical lengths).
    pub lengths: Vec<f64>,
    /// Theoretical probability per bin, as passed in.
    pub theoretical_probs: Vec<f64>,
    /// Normalised (weighted) histogram.
    pub empirical_probs: Vec<f64>,
    /// Observed counts; in weighted mode `total_samples * empirical_probs`.
    pub observed_counts: Vec<f64>,
    /// `total_samples * theoretical_probs`.
    pub expected_counts: Vec<f64>,
    pub chi_squared: f64,
    pub degrees_of_freedom: usize,
    pub reduced_chi_squared: f64,
    /// Bins left out of the statistic because their theoretical probability is 0.
    pub excluded_bins: usize,
    /// Cells scored after pooling sparse bins; `degrees_of_freedom + 1` unless
    /// only one cell is left.
    pub pooled_cells: usize,
    /// Samples that fell outside every bin and were dropped.
    pub out_of_range: usize,
}

impl Comparison {
    /// Per-bin ratio MC / theory; `None` where the theory is zero.
    pub fn ratio(&self) -> Vec<Option<f64>> {
        self.empirical_probs
            .iter()
            .zip(&self.theoretical_probs)
            .map(|(&e, &t)| (t > 0.0).then(|| e / t))
            .collect()
    }

    /// Upper-tail probability of a chi-squared variate with
    /// `degrees_of_freedom` exceeding the observed statistic.
    pub fn p_value(&self) -> f64 {
        chi_squared_sf(self.chi_squared, self.degrees_of_freedom)
    }
}

/// Bin edges centred on each length.
///
/// Interior edges are midpoints of neighbours, the outer ones mirror the first
/// and last spacing; on the support `a(2n - N)` every bin has half-width `a`.
pub fn bin_edges(centres: &[f64]) -> Result<Vec<f64>> {
    if centres.len() < 2 {
        return Err(RubberBandError::LengthMismatch {
            field: "theoretical_lengths",
            expected: 2,
            actual: centres.len(),
        });
    }
    if centres.iter().any(|c| !c.is_finite()) || centres.windows(2).any(|w| w[1] <= w[0]) {
        return Err(RubberBandError::invalid(
            "theoretical_lengths",
            f64::NAN,
            "must be finite and strictly ascending",
        ));
    }

    let k = centres.len();
    let mut edges = Vec::with_capacity(k + 1);
    edges.push(centres[0] - 0.5 * (centres[1] - centres[0]));
    edges.extend(centres.windows(2).map(|w| 0.5 * (w[0] + w[1])));
    edges.push(centres[k - 1] + 0.5 * (centres[k - 1] - centres[k - 2]));
    Ok(edges)
}

/// Bin of `x`: half-open `[e_i, e_{i+1})`, last bin closed on the right.
fn bin_index(edges: &[f64], x: f64) -> Option<usize> {
    let last = edges.len() - 1;
    if !(x >= edges[0] && x <= edges[last]) {
        return None;
    }
    if x == edges[last] {
        return Some(last - 1);
    }
    Some(edges.partition_point(|&e| e <= x) - 1)
}

/// Bins samples on a theoretical support and scores them with chi-squared.
#[derive(Debug, Clone)]
pub struct HistogramComparator {
    lengths: Vec<f64>,
    probs: Vec<f64>,
    edges: Vec<f64>,
    min_expected: f64,
}

impl HistogramComparator {
    pub fn new(theoretical_lengths: &[f64], theoretical_probs: &[f64]) -> Result<Self> {
        if theoretical_probs.len() != theoretical_lengths.len() {
            return Err(RubberBandError::LengthMismatch {
                field: "theoretical_probs",
                expected: theoretical_lengths.len(),
                actual: theoretical_probs.len(),
            });
        }
        if let Some(&bad) = theoretical_probs.iter().find(|p| !(p.is_finite() && **p >= 0.0)) {
            return Err(RubberBandError::invalid(
                "theoretical_prob",
                bad,
                "must be finite and >= 0",
            ));
        }
        if theoretical_probs.iter().all(|&p| p == 0.0) {
            return Err(RubberBandError::DegenerateTheory);
        }
        let edges = bin_edges(theoretical_lengths)?;
        Ok(Self {
            lengths: theoretical_lengths.to_vec(),
            probs: theoretical_probs.to_vec(),
            edges,
            min_expected: MIN_EXPECTED_COUNT,
        })
    }

    /// Override the pooling threshold. `0.0` scores every bin with non-zero
    /// probability on its own.
    pub fn with_min_expected(mut self, min_expected: f64) -> Result<Self> {
        if !(min_expected.is_finite() && min_expected >= 0.0) {
            return Err(RubberBandError::invalid(
                "min_expected",
                min_expected,
                "must be finite and >= 0",
            ));
        }
        self.min_expected = min_expected;
        Ok(self)
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Sum of weights (or plain counts) per bin, plus the number dropped.
    fn accumulate(&self, lengths: &[f64], weights: Option<&[f64]>) -> (Vec<f64>, usize) {
        let mut bins = vec![0.0; self.lengths.len()];
        let mut dropped = 0;
        for (i, &l) in lengths.iter().enumerate() {
            match bin_index(&self.edges, l) {
                Some(b) => bins[b] += weights.map_or(1.0, |w| w[i]),
                None => dropped += 1,
            }
        }
        (bins, dropped)
    }

    /// Histogram `lengths` (optionally weighted) and compare with the theory.
    ///
    /// Unweighted: `empirical[n] = count[n] / total_samples`.
    /// Weighted: `empirical[n] = Σ_{i in n} w_i / Σ_i w_i`, and the observed
    /// count entering chi-squared is `total_samples * empirical[n]`.
    /// Bins are pooled into cells of at least `min_expected` expected counts
    /// before scoring; the per-bin vectors in the result are not pooled.
    pub fn compare(
        &self,
        lengths: &[f64],
        weights: Option<&[f64]>,
        total_samples: usize,
    ) -> Result<Comparison> {
        if total_samples == 0 {
            return Err(RubberBandError::invalid("total_samples", 0.0, "must be >= 1"));
        }
        if lengths.is_empty() {
            return Err(RubberBandError::EmptyInput("lengths"));
        }
        let total = total_samples as f64;

        let weight_sum = match weights {
            None => None,
            Some(w) => {
                if w.len() != lengths.len() {
                    return Err(RubberBandError::LengthMismatch {
                        field: "weights",
                        expected: lengths.len(),
                        actual: w.len(),
                    });
                }
                if let Some(&bad) = w.iter().find(|x| !(x.is_finite() && **x >= 0.0)) {
                    return Err(RubberBandError::invalid("weight", bad, "must be finite and >= 0"));
                }
                let sum: f64 = w.iter().sum();
                if !(sum.is_finite() && sum > 0.0) {
                    return Err(RubberBandError::DegenerateWeights(sum));
                }
                Some(sum)
            }
        };

        let (bins, out_of_range) = self.accumulate(lengths, weights);
        let (empirical_probs, observed_counts) = match weight_sum {
            None => (bins.iter().map(|c| c / total).collect::<Vec<_>>(), bins),
            Some(sum) => {
                let empirical: Vec<f64> = bins.iter().map(|b| b / sum).collect();
                let observed = empirical.iter().map(|e| e * total).collect();
                (empirical, observed)
            }
        };

        let expected_counts: Vec<f64> = self.probs.iter().map(|p| p * total).collect();

        let included = expected_counts.iter().filter(|&&e| e > 0.0).count();
        if included == 0 {
            return Err(RubberBandError::DegenerateTheory);
        }
        let excluded_bins = self.lengths.len() - included;
        let cells = pool_cells(&observed_counts, &expected_counts, self.min_expected);
        let chi_squared: f64 = cells.iter().map(|(obs, exp)| (obs - exp).powi(2) / exp).sum();
        let pooled_cells = cells.len();
        let degrees_of_freedom = pooled_cells.saturating_sub(1).max(1);
        let reduced_chi_squared = chi_squared / degrees_of_freedom as f64;

        debug!(
            chi_squared,
            reduced_chi_squared,
            excluded_bins,
            pooled_cells,
            out_of_range,
            weighted = weights.is_some(),
            "histogram compared"
        );

        Ok(Comparison {
            lengths: self.lengths.clone(),
            theoretical_probs: self.probs.clone(),
            empirical_probs,
            observed_counts,
            expected_counts,
            chi_squared,
            degrees_of_freedom,
            reduced_chi_squared,
            excluded_bins,
            pooled_cells,
            out_of_range,
        })
    }
}

/// Merge consecutive bins, in support order, into `(observed, expected)`
/// cells whose expected count reaches `min_expected`. Bins with zero expected
/// count are skipped. A sparse remainder at the upper end joins the last cell.
fn pool_cells(observed: &[f64], expected: &[f64], min_expected: f64) -> Vec<(f64, f64)> {
    let mut cells: Vec<(f64, f64)> = Vec::new();
    let (mut obs_run, mut exp_run) = (0.0, 0.0);
    let mut open = false;
    for (&obs, &exp) in observed.iter().zip(expected) {
        if exp <= 0.0 {
            continue;
        }
        obs_run += obs;
        exp_run += exp;
        open = true;
        if exp_run >= min_expected {
            cells.push((obs_run, exp_run));
            (obs_run, exp_run, open) = (0.0, 0.0, false);
        }
    }
    if open {
        match cells.last_mut() {
            Some(last) => {
                last.0 += obs_run;
                last.1 += exp_run;
            }
            None => cells.push((obs_run, exp_run)),
        }
    }
    cells
}

/// `(empirical_probs, reduced_chi_squared)` for a sample against a PMF.
pub fn compare_histogram(
    lengths: &[f64],
    theoretical_lengths: &[f64],
    theoretical_probs: &[f64],
    weights: Option<&[f64]>,
    total_samples: usize,
) -> Result<(Vec<f64>, f64)> {
    let comparison = HistogramComparator::new(theoretical_lengths, theoretical_probs)?
        .compare(lengths, weights, total_samples)?;
    Ok((comparison.empirical_probs, comparison.reduced_chi_squared))
}

// ---------------------------------------------------------------------------
// Chi-squared tail probability
// ---------------------------------------------------------------------------

/// `P(X > chi2)` for `X ~ χ²(dof)`, i.e. `Q(dof/2, chi2/2)`.
pub fn chi_squared_sf(chi2: f64, dof: usize) -> f64 {
    if dof == 0 || chi2.is_nan() {
        return f64::NAN;
    }
    if chi2 <= 0.0 {
        return 1.0;
    }
    upper_regularized_gamma(dof as f64 / 2.0, chi2 / 2.0)
}

/// Stirling series with upward recursion below 12.
fn ln_gamma(x: f64) -> f64 {
    let mut z = x;
    let mut shift = 0.0;
    while z < 12.0 {
        shift -= z.ln();
        z += 1.0;
    }
    let inv = 1.0 / z;
    let inv2 = inv * inv;
    shift
        + (z - 0.5) * z.ln() - z
        + 0.5 * (2.0 * std::f64::consts::PI).ln()
        + inv * (1.0 / 12.0 - inv2 * (1.0 / 360.0 - inv2 / 1260.0))
}

fn upper_regularized_gamma(a: f64, x: f64) -> f64 {
    const EPS: f64 = 1e-14;
    const MAX_ITER: usize = 500;
    let prefactor = (-x + a * x.ln() - ln_gamma(a)).exp();

    if x < a + 1.0 {
        // Series for P(a, x).
        let mut term = 1.0 / a;
        let mut sum = term;
        for n in 1..MAX_ITER {
            term *= x / (a + n as f64);
            sum += term;
            if term.abs() < EPS * sum.abs() {
                break;
            }
        }
        (1.0 - sum * prefactor).clamp(0.0, 1.0)
    } else {
        // Lentz continued fraction for Q(a, x).
        let tiny = 1e-300;
        let mut b = x + 1.0 - a;
        let mut c = 1.0 / tiny;
        let mut d = 1.0 / b;
        let mut h = d;
        for i in 1..MAX_ITER {
            let an = -(i as f64) * (i as f64 - a);
            b += 2.0;
            d = an * d + b;
            if d.abs() < tiny {
                d = tiny;
            }
            c = b + an / c;
            if c.abs() < tiny {
                c = tiny;
            }
            d = 1.0 / d;
            let delta = d * c;
            h *= delta;
            if (delta - 1.0).abs() < EPS {
                break;
            }
        }
        (prefactor * h).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_have_half_width_of_spacing() {
        let edges = bin_edges(&[-4.0, -2.0, 0.0, 2.0, 4.0]).unwrap();
        assert_eq!(edges, vec![-5.0, -3.0, -1.0, 1.0, 3.0, 5.0]);
        assert!(bin_edges(&[1.0]).is_err());
        assert!(bin_edges(&[1.0, 1.0]).is_err());
    }

    #[test]
    fn bin_lookup_matches_half_open_bins() {
        let edges = [-5.0, -3.0, -1.0, 1.0, 3.0, 5.0];
        assert_eq!(bin_index(&edges, -4.0), Some(0));
        assert_eq!(bin_index(&edges, -3.0), Some(1));
        assert_eq!(bin_index(&edges, 4.0), Some(4));
        assert_eq!(bin_index(&edges, 5.0), Some(4));
        assert_eq!(bin_index(&edges, 5.5), None);
        assert_eq!(bin_index(&edges, f64::NAN), None);
    }

    #[test]
    fn sparse_bins_pool_into_neighbours() {
        let obs = [1.0, 0.0, 3.0, 9.0, 0.0, 2.0, 1.0];
        let exp = [0.5, 0.0, 4.0, 10.0, 0.0, 2.0, 0.5];
        // 0.5 + 4 + 10 closes the first cell; the 2 + 0.5 tail joins it.
        assert_eq!(pool_cells(&obs, &exp, 5.0), vec![(16.0, 17.0)]);
        assert_eq!(pool_cells(&obs, &exp, 0.0).len(), 5);
        assert_eq!(pool_cells(&[2.0, 1.0], &[1.0, 2.0], 5.0), vec![(3.0, 3.0)]);
    }

    #[test]
    fn ln_gamma_matches_factorials() {
        assert!(ln_gamma(1.0).abs() < 1e-10);
        assert!((ln_gamma(5.0) - 24f64.ln()).abs() < 1e-10);
        assert!((ln_gamma(0.5) - std::f64::consts::PI.sqrt().ln()).abs() < 1e-10);
    }

    #[test]
    fn survival_function_reference_values() {
        // χ²(2) has Q = exp(-x/2).
        assert!((chi_squared_sf(3.0, 2) - (-1.5f64).exp()).abs() < 1e-10);
        // 95th percentile of χ²(1) and χ²(10).
        assert!((chi_squared_sf(3.841458820694124, 1) - 0.05).abs() < 1e-8);
        assert!((chi_squared_sf(18.307038053275146, 10) - 0.05).abs() < 1e-8);
        assert_eq!(chi_squared_sf(0.0, 4), 1.0);
    }
}
