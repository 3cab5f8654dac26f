use thiserror::Error;

use super::config::ConfigError;
use super::utils::sampling::SamplingError;
use crate::core::forcefield::params::PotentialError;
use crate::core::geometry::GeometryError;
use crate::core::models::space::SpaceError;
use crate::core::species::SpeciesError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Species table error: {source}")]
    Species {
        #[from]
        source: SpeciesError,
    },

    #[error("Invalid space: {source}")]
    Space {
        #[from]
        source: SpaceError,
    },

    #[error("Geometry error: {source}")]
    Geometry {
        #[from]
        source: GeometryError,
    },

    #[error("Failed to build pair potential: {source}")]
    Potential {
        #[from]
        source: PotentialError,
    },

    #[error("Move selection failed: {source}")]
    Sampling {
        #[from]
        source: SamplingError,
    },

    #[error("Energy of {context} is not finite: {value}")]
    NonFiniteEnergy { context: &'static str, value: f64 },

    #[error(
        "Induced dipoles did not converge after {iterations} iterations (residual {residual:.3e})"
    )]
    PolarizationNotConverged { iterations: usize, residual: f64 },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
