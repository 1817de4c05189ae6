//! Error types for the rubber band engine.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RubberBandError>;

/// Everything the engine can refuse to do.
///
/// Validation variants mean the caller passed bad inputs and must fix them.
/// The two degeneracy variants mean the inputs are well formed but the
/// requested statistic is undefined (change the force or the sample size).
#[derive(Debug, Error)]
pub enum RubberBandError {
    /// A scalar parameter is out of its admissible range.
    #[error("invalid {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// Two arrays that must line up do not.
    #[error("length mismatch for {field}: expected {expected}, got {actual}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An input array that must be non-empty is empty.
    #[error("{0} must not be empty")]
    EmptyInput(&'static str),

    /// Weight sum is zero (or not finite); reweighting is undefined.
    #[error("importance weights are degenerate: sum = {0}")]
    DegenerateWeights(f64),

    /// Every theoretical bin probability is zero; chi-squared is undefined.
    #[error("all theoretical bin probabilities are zero")]
    DegenerateTheory,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl RubberBandError {
    pub(crate) fn invalid(name: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidParameter { name, value, reason }
    }
}

/// Bond count must be at least one.
pub(crate) fn check_bonds(n_bonds: usize) -> Result<()> {
    if n_bonds == 0 {
        return Err(RubberBandError::invalid("n_bonds", 0.0, "must be >= 1"));
    }
    Ok(())
}

/// Bond length must be strictly positive and finite.
pub(crate) fn check_bond_length(bond_length: f64) -> Result<()> {
    if !(bond_length.is_finite() && bond_length > 0.0) {
        return Err(RubberBandError::invalid(
            "bond_length",
            bond_length,
            "must be finite and > 0",
        ));
    }
    Ok(())
}

/// Inverse temperature must be strictly positive and finite.
pub(crate) fn check_inverse_temperature(beta: f64) -> Result<()> {
    if !(beta.is_finite() && beta > 0.0) {
        return Err(RubberBandError::invalid(
            "inverse_temperature",
            beta,
            "must be finite and > 0",
        ));
    }
    Ok(())
}

pub(crate) fn check_finite(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(RubberBandError::invalid(name, value, "must be finite"));
    }
    Ok(())
}
