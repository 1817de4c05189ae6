//! Bonds and chains of the one-dimensional freely-jointed rubber band.

use rand::Rng;
use rand_distr::{Bernoulli, Distribution};

use crate::error::{
    check_bond_length, check_bonds, check_finite, check_inverse_temperature, RubberBandError, Result,
};

/// One step of the chain, pointing left or right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum Bond {
    Left = -1,
    Right = 1,
}

impl Bond {
    /// Signed direction, -1 or +1.
    #[inline(always)]
    pub fn direction(self) -> i64 {
        self as i8 as i64
    }
}

/// Probability that a single bond points along the force.
///
/// Two-state Boltzmann factors `exp(±βfa)` normalised over both states give
/// `0.5 * (1 + tanh(βfa))`.
pub fn right_probability(bias_force: f64, bond_length: f64, inverse_temperature: f64) -> f64 {
    0.5 * (1.0 + (inverse_temperature * bias_force * bond_length).tanh())
}

/// Draws bond orientations, either fair or tilted by a force.
#[derive(Debug, Clone, Copy)]
pub struct BondSampler {
    p_right: f64,
    dist: Bernoulli,
}

impl BondSampler {
    /// Fair coin: `Right` with probability exactly 1/2.
    pub fn unbiased() -> Self {
        Self {
            p_right: 0.5,
            dist: Bernoulli::new(0.5).expect("0.5 is a valid probability"),
        }
    }

    /// Sampler for the canonical single-bond distribution under `bias_force`.
    pub fn biased(bias_force: f64, bond_length: f64, inverse_temperature: f64) -> Result<Self> {
        check_finite("bias_force", bias_force)?;
        check_bond_length(bond_length)?;
        check_inverse_temperature(inverse_temperature)?;

        let p_right = right_probability(bias_force, bond_length, inverse_temperature);
        let dist = Bernoulli::new(p_right)
            .map_err(|_| RubberBandError::invalid("p_right", p_right, "not a probability"))?;
        Ok(Self { p_right, dist })
    }

    pub fn p_right(&self) -> f64 {
        self.p_right
    }

    /// Consume one draw from `rng`.
    #[inline]
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Bond {
        if self.dist.sample(rng) {
            Bond::Right
        } else {
            Bond::Left
        }
    }
}

impl Default for BondSampler {
    fn default() -> Self {
        Self::unbiased()
    }
}

/// A rubber band: `N` bonds of length `a`. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    bonds: Vec<Bond>,
    bond_length: f64,
}

impl Chain {
    /// Build a chain from explicit bonds.
    pub fn from_bonds(bonds: Vec<Bond>, bond_length: f64) -> Result<Self> {
        check_bonds(bonds.len())?;
        check_bond_length(bond_length)?;
        Ok(Self { bonds, bond_length })
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn n_bonds(&self) -> usize {
        self.bonds.len()
    }

    pub fn bond_length(&self) -> f64 {
        self.bond_length
    }

    /// Number of bonds pointing right; also the index of the chain's length
    /// in the theoretical support.
    pub fn n_right(&self) -> usize {
        self.bonds.iter().filter(|&&b| b == Bond::Right).count()
    }

    /// Signed sum of directions, in `[-N, N]` with the parity of `N`.
    pub fn net_steps(&self) -> i64 {
        self.bonds.iter().map(|b| b.direction()).sum()
    }

    /// End-to-end length `a * Σ directions`.
    pub fn length(&self) -> f64 {
        self.bond_length * self.net_steps() as f64
    }
}

/// Builds chains of fixed size from a bond sampler.
#[derive(Debug, Clone, Copy)]
pub struct ChainGenerator {
    n_bonds: usize,
    bond_length: f64,
    sampler: BondSampler,
}

impl ChainGenerator {
    /// Generator with fair bonds.
    pub fn new(n_bonds: usize, bond_length: f64) -> Result<Self> {
        check_bonds(n_bonds)?;
        check_bond_length(bond_length)?;
        Ok(Self {
            n_bonds,
            bond_length,
            sampler: BondSampler::unbiased(),
        })
    }

    /// Generator whose bonds follow the canonical distribution under `bias_force`.
    pub fn biased(
        n_bonds: usize,
        bond_length: f64,
        bias_force: f64,
        inverse_temperature: f64,
    ) -> Result<Self> {
        check_bonds(n_bonds)?;
        let sampler = BondSampler::biased(bias_force, bond_length, inverse_temperature)?;
        Ok(Self {
            n_bonds,
            bond_length,
            sampler,
        })
    }

    pub fn n_bonds(&self) -> usize {
        self.n_bonds
    }

    pub fn bond_length(&self) -> f64 {
        self.bond_length
    }

    pub fn sampler(&self) -> &BondSampler {
        &self.sampler
    }

    /// Draw `N` bonds and assemble a chain.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Chain {
        let bonds = (0..self.n_bonds).map(|_| self.sampler.draw(rng)).collect();
        Chain {
            bonds,
            bond_length: self.bond_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn length_is_signed_sum_times_bond_length() {
        let chain = Chain::from_bonds(
            vec![Bond::Right, Bond::Right, Bond::Left, Bond::Right],
            0.5,
        )
        .unwrap();
        assert_eq!(chain.net_steps(), 2);
        assert_eq!(chain.n_right(), 3);
        assert!((chain.length() - 1.0).abs() < 1e-15);
    }

    #[test]
    fn right_probability_limits() {
        assert_eq!(right_probability(0.0, 1.0, 1.0), 0.5);
        assert!(right_probability(50.0, 1.0, 1.0) > 1.0 - 1e-12);
        assert!(right_probability(-50.0, 1.0, 1.0) < 1e-12);
        assert!(right_probability(0.3, 1.0, 1.0) > 0.5);
    }

    #[test]
    fn invalid_generator_parameters() {
        assert!(ChainGenerator::new(0, 1.0).is_err());
        assert!(ChainGenerator::new(10, 0.0).is_err());
        assert!(ChainGenerator::biased(10, 1.0, f64::INFINITY, 1.0).is_err());
        assert!(Chain::from_bonds(Vec::new(), 1.0).is_err());
    }

    #[test]
    fn generated_chain_has_requested_size() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let gen = ChainGenerator::biased(37, 2.0, 0.4, 1.0).unwrap();
        let chain = gen.generate(&mut rng);
        assert_eq!(chain.n_bonds(), 37);
        assert_eq!(chain.bond_length(), 2.0);
        assert_eq!(chain.net_steps().rem_euclid(2), 1);
    }
}
