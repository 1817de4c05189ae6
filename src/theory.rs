// theory.rs - Exact length distribution of the rubber band under a force

use tracing::debug;

use crate::error::{check_bond_length, check_bonds, check_finite, check_inverse_temperature, Result};

/// Largest `N` whose binomial row fits exactly in `u128`.
/// C(128, 64) ≈ 2.4e37 < u128::MAX.
pub const EXACT_BINOMIAL_MAX: usize = 128;

/// `ln C(N, n)` for `n = 0..=N`.
///
/// Up to [`EXACT_BINOMIAL_MAX`] the row is built exactly in integers (Pascal)
/// and converted once. Above that the integers no longer fit, so the row is
/// accumulated from the exact ratio `C(N, n) / C(N, n-1) = (N - n + 1) / n`
/// in log space, mirrored so that `ln C(N, n) == ln C(N, N - n)` bit for bit.
pub fn ln_binomial_row(n_bonds: usize) -> Vec<f64> {
    if n_bonds <= EXACT_BINOMIAL_MAX {
        let mut row = vec![0u128; n_bonds + 1];
        row[0] = 1;
        for k in 1..=n_bonds {
            for j in (1..=k).rev() {
                row[j] += row[j - 1];
            }
        }
        return row.into_iter().map(|c| (c as f64).ln()).collect();
    }

    let mut ln_c = vec![0.0; n_bonds + 1];
    let half = n_bonds / 2;
    for n in 1..=half {
        ln_c[n] = ln_c[n - 1] + ((n_bonds - n + 1) as f64).ln() - (n as f64).ln();
    }
    for n in (half + 1)..=n_bonds {
        ln_c[n] = ln_c[n_bonds - n];
    }
    ln_c
}

/// The achievable lengths `L_n = a (2n - N)`, `n = 0..=N`.
pub fn support(n_bonds: usize, bond_length: f64) -> Vec<f64> {
    (0..=n_bonds)
        .map(|n| bond_length * (2 * n as i64 - n_bonds as i64) as f64)
        .collect()
}

/// `ln Σ exp(x_i)`, shifted by the maximum so no term overflows.
pub fn log_sum_exp(xs: &[f64]) -> f64 {
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + xs.iter().map(|&x| (x - max).exp()).sum::<f64>().ln()
}

/// Exact length distribution for one `(N, a, f, β)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TheoreticalPmf {
    pub n_bonds: usize,
    pub bond_length: f64,
    pub force: f64,
    pub inverse_temperature: f64,
    /// `L_0 .. L_N`, ascending.
    pub lengths: Vec<f64>,
    /// `P(L_n)`, summing to one.
    pub probabilities: Vec<f64>,
    /// `ln Z`, with `Z = Σ C(N, n) exp(β f L_n)`.
    pub log_partition: f64,
}

impl TheoreticalPmf {
    /// Canonical distribution `P(L_n) ∝ C(N, n) exp(β f L_n)`.
    ///
    /// Everything is evaluated in log space and normalised with log-sum-exp,
    /// so `N` in the hundreds with large `|f|` stays finite.
    pub fn new(
        n_bonds: usize,
        bond_length: f64,
        force: f64,
        inverse_temperature: f64,
    ) -> Result<Self> {
        check_bonds(n_bonds)?;
        check_bond_length(bond_length)?;
        check_finite("force", force)?;
        check_inverse_temperature(inverse_temperature)?;

        let lengths = support(n_bonds, bond_length);
        let ln_c = ln_binomial_row(n_bonds);
        let log_omega: Vec<f64> = ln_c
            .iter()
            .zip(&lengths)
            .map(|(&lc, &l)| lc + inverse_temperature * force * l)
            .collect();

        let log_partition = log_sum_exp(&log_omega);
        let probabilities = log_omega
            .iter()
            .map(|&lw| (lw - log_partition).exp())
            .collect();

        debug!(n_bonds, force, log_partition, "theoretical pmf");
        Ok(Self {
            n_bonds,
            bond_length,
            force,
            inverse_temperature,
            lengths,
            probabilities,
            log_partition,
        })
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// `⟨L⟩` from the PMF.
    pub fn mean_length(&self) -> f64 {
        self.lengths
            .iter()
            .zip(&self.probabilities)
            .map(|(l, p)| l * p)
            .sum()
    }

    /// `⟨L²⟩ - ⟨L⟩²` from the PMF.
    pub fn variance(&self) -> f64 {
        let mean = self.mean_length();
        self.lengths
            .iter()
            .zip(&self.probabilities)
            .map(|(l, p)| p * (l - mean).powi(2))
            .sum()
    }

    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.lengths, self.probabilities)
    }
}

/// `(lengths, probabilities)` for `(N, a, f, β)`; see [`TheoreticalPmf::new`].
pub fn theoretical_pmf(
    n_bonds: usize,
    bond_length: f64,
    force: f64,
    inverse_temperature: f64,
) -> Result<(Vec<f64>, Vec<f64>)> {
    Ok(TheoreticalPmf::new(n_bonds, bond_length, force, inverse_temperature)?.into_parts())
}

/// Closed form `⟨L⟩ = N a tanh(β f a)`.
pub fn mean_length_exact(n_bonds: usize, bond_length: f64, force: f64, inverse_temperature: f64) -> f64 {
    n_bonds as f64 * bond_length * (inverse_temperature * force * bond_length).tanh()
}

/// Closed form `Var L = N a² sech²(β f a)`.
pub fn variance_exact(n_bonds: usize, bond_length: f64, force: f64, inverse_temperature: f64) -> f64 {
    let sech = 1.0 / (inverse_temperature * force * bond_length).cosh();
    n_bonds as f64 * bond_length.powi(2) * sech * sech
}

/// Small-force (Hooke) limit `⟨L⟩ ≈ N a² β f`.
pub fn mean_length_hooke(n_bonds: usize, bond_length: f64, force: f64, inverse_temperature: f64) -> f64 {
    n_bonds as f64 * bond_length.powi(2) * inverse_temperature * force
}
