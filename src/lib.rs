pub mod error;
pub mod config;
pub mod utils;
pub mod chain;
pub mod ensemble;
pub mod theory;
pub mod weights;
pub mod histogram;
pub mod stats;
pub mod sweep;
pub mod export;

pub use error::{RubberBandError, Result};
pub use config::SimulationConfig;
pub use chain::{Bond, BondSampler, Chain, ChainGenerator};
pub use ensemble::{generate_ensemble, Ensemble, EnsembleGenerator};
pub use theory::{theoretical_pmf, TheoreticalPmf};
pub use weights::{effective_sample_size, importance_weights, ImportanceWeighter, WeightedSample};
pub use histogram::{compare_histogram, Comparison, HistogramComparator};
pub use sweep::{SweepMode, SweepPoint};
