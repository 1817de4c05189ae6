//! Run-time configuration consumed by the engine (single source of truth).

use crate::error::{check_bond_length, check_bonds, check_finite, check_inverse_temperature, RubberBandError, Result};

/// Parameters of one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Bond count `N`.
    pub n_bonds:             usize,
    /// Bond length `a`.
    pub bond_length:         f64,
    /// One or more target forces.
    pub forces:              Vec<f64>,
    /// `β = 1 / k_B T`.
    pub inverse_temperature: f64,
    /// Ensemble size `M`.
    pub n_chains:            usize,
    /// Draw bonds from the force-tilted distribution instead of reweighting.
    pub biased:              bool,
    pub seed:                u64,
    /// Generate ensembles on the rayon pool with per-block streams.
    pub parallel:            bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n_bonds:             100,
            bond_length:         1.0,
            forces:              vec![0.0],
            inverse_temperature: 1.0,
            n_chains:            10_000,
            biased:              false,
            seed:                12345,
            parallel:            false,
        }
    }
}

impl SimulationConfig {
    /// Reject anything the engine would refuse later.
    pub fn validate(&self) -> Result<()> {
        check_bonds(self.n_bonds)?;
        check_bond_length(self.bond_length)?;
        check_inverse_temperature(self.inverse_temperature)?;
        if self.n_chains == 0 {
            return Err(RubberBandError::invalid("n_chains", 0.0, "must be >= 1"));
        }
        if self.forces.is_empty() {
            return Err(RubberBandError::EmptyInput("forces"));
        }
        for &f in &self.forces {
            check_finite("force", f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn bad_fields_are_rejected() {
        let bad = [
            SimulationConfig { n_bonds: 0, ..Default::default() },
            SimulationConfig { bond_length: -0.5, ..Default::default() },
            SimulationConfig { inverse_temperature: 0.0, ..Default::default() },
            SimulationConfig { n_chains: 0, ..Default::default() },
            SimulationConfig { forces: vec![], ..Default::default() },
            SimulationConfig { forces: vec![0.1, f64::NAN], ..Default::default() },
        ];
        for cfg in &bad {
            assert!(cfg.validate().is_err(), "{cfg:?} should be rejected");
        }
    }
}
