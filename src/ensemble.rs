//! Monte Carlo populations of independent chains.

use rand::Rng;
use rayon::prelude::*;
use tracing::debug;

use crate::chain::{Chain, ChainGenerator};
use crate::error::{check_finite, RubberBandError, Result};
use crate::utils::rng::stream_rng;

/// Chains per independent stream in parallel generation.
pub const PAR_BLOCK: usize = 1024;

/// An ordered population of chains sharing `(N, a)`.
#[derive(Debug, Clone)]
pub struct Ensemble {
    chains: Vec<Chain>,
    n_bonds: usize,
    bond_length: f64,
}

impl Ensemble {
    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chain> {
        self.chains.iter()
    }

    /// Number of chains `M`.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn n_bonds(&self) -> usize {
        self.n_bonds
    }

    pub fn bond_length(&self) -> f64 {
        self.bond_length
    }

    /// End-to-end length of every chain, in generation order.
    pub fn lengths(&self) -> Vec<f64> {
        self.chains.iter().map(Chain::length).collect()
    }
}

impl<'a> IntoIterator for &'a Ensemble {
    type Item = &'a Chain;
    type IntoIter = std::slice::Iter<'a, Chain>;

    fn into_iter(self) -> Self::IntoIter {
        self.chains.iter()
    }
}

/// Produces ensembles of `M` chains from one chain generator.
#[derive(Debug, Clone, Copy)]
pub struct EnsembleGenerator {
    chain: ChainGenerator,
    n_chains: usize,
}

impl EnsembleGenerator {
    pub fn new(chain: ChainGenerator, n_chains: usize) -> Result<Self> {
        if n_chains == 0 {
            return Err(RubberBandError::invalid("n_chains", 0.0, "must be >= 1"));
        }
        Ok(Self { chain, n_chains })
    }

    pub fn n_chains(&self) -> usize {
        self.n_chains
    }

    pub fn chain_generator(&self) -> &ChainGenerator {
        &self.chain
    }

    /// Serial generation from a single stream; chain `i` is the `i`-th built.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Ensemble {
        let chains = (0..self.n_chains).map(|_| self.chain.generate(rng)).collect();
        self.wrap(chains)
    }

    /// Parallel generation. Block `b` of [`PAR_BLOCK`] chains draws from
    /// `stream_rng(seed, b)`, so the result depends on `seed` only.
    pub fn generate_parallel(&self, seed: u64) -> Ensemble {
        let n_blocks = self.n_chains.div_ceil(PAR_BLOCK);
        let chains: Vec<Chain> = (0..n_blocks)
            .into_par_iter()
            .flat_map_iter(|block| {
                let mut rng = stream_rng(seed, block);
                let start = block * PAR_BLOCK;
                let end = (start + PAR_BLOCK).min(self.n_chains);
                (start..end)
                    .map(|_| self.chain.generate(&mut rng))
                    .collect::<Vec<_>>()
            })
            .collect();
        debug!(n_chains = chains.len(), n_blocks, "parallel ensemble generated");
        self.wrap(chains)
    }

    fn wrap(&self, chains: Vec<Chain>) -> Ensemble {
        Ensemble {
            chains,
            n_bonds: self.chain.n_bonds(),
            bond_length: self.chain.bond_length(),
        }
    }
}

/// Build the chain generator for `(N, a, force, biased, β)`.
///
/// With `biased == false` the force is ignored and bonds are fair coins.
pub fn chain_generator(
    n_bonds: usize,
    bond_length: f64,
    bias_force: f64,
    biased: bool,
    inverse_temperature: f64,
) -> Result<ChainGenerator> {
    check_finite("bias_force", bias_force)?;
    if biased {
        ChainGenerator::biased(n_bonds, bond_length, bias_force, inverse_temperature)
    } else {
        ChainGenerator::new(n_bonds, bond_length)
    }
}

/// `M` independent chains of `N` bonds drawn serially from `rng`.
pub fn generate_ensemble<R: Rng + ?Sized>(
    n_chains: usize,
    n_bonds: usize,
    bond_length: f64,
    bias_force: f64,
    biased: bool,
    inverse_temperature: f64,
    rng: &mut R,
) -> Result<Ensemble> {
    let chain = chain_generator(n_bonds, bond_length, bias_force, biased, inverse_temperature)?;
    let ensemble = EnsembleGenerator::new(chain, n_chains)?.generate(rng);
    debug!(n_chains, n_bonds, bias_force, biased, "ensemble generated");
    Ok(ensemble)
}
