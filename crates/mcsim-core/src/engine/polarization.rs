use super::error::EngineError;
use crate::core::forcefield::pair::PairPotential;
use crate::core::geometry::{Geometry, Point};
use crate::core::models::particle::Dipole;
use crate::core::models::space::Configuration;
use crate::core::species::AtomTable;
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PolarizationParams {
    /// Mean per-particle change of the dipole moment (eÅ) below which the moments are converged.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_tolerance() -> f64 {
    1e-3
}

fn default_max_iterations() -> usize {
    1000
}

impl Default for PolarizationParams {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
        }
    }
}

/// Electric field at every particle from all other particles.
pub fn fields<P: PairPotential + ?Sized>(
    config: &Configuration,
    geometry: &Geometry,
    potential: &P,
) -> Vec<Point> {
    let particles = config.particles();
    let rows = 0..particles.len();

    #[cfg(not(feature = "parallel"))]
    let iterator = rows;

    #[cfg(feature = "parallel")]
    let iterator = rows.into_par_iter();

    iterator
        .map(|i| {
            let target = &particles[i];
            particles
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .fold(Point::zeros(), |field, (_, source)| {
                    field + potential.field(source, &geometry.vdist(&target.pos, &source.pos))
                })
        })
        .collect()
}

/// Iterates induced dipole moments to self-consistency.
///
/// Each sweep computes the field at every particle from the moments of the previous sweep and
/// sets `moment = alpha * field + permanent` for every polarizable particle. Iteration stops
/// once the summed norm of the corrections falls below `N * tolerance`. Returns the number of
/// sweeps performed.
#[instrument(level = "debug", skip_all, name = "polarization_relax")]
pub fn relax_induced_dipoles<P: PairPotential + ?Sized>(
    config: &mut Configuration,
    geometry: &Geometry,
    potential: &P,
    table: &AtomTable,
    params: &PolarizationParams,
) -> Result<usize, EngineError> {
    let polarizable: Vec<usize> = config
        .particles()
        .iter()
        .enumerate()
        .filter(|(_, p)| table[p.id].is_polarizable())
        .map(|(i, _)| i)
        .collect();
    if polarizable.is_empty() {
        return Ok(0);
    }
    for &i in &polarizable {
        let particle = &mut config.particles_mut()[i];
        if particle.dipole.is_none() {
            particle.dipole = Some(Dipole::permanent(Point::zeros()));
        }
    }

    let limit = config.len() as f64 * params.tolerance;
    let mut residual = f64::INFINITY;
    for iteration in 1..=params.max_iterations {
        let field = fields(config, geometry, potential);
        residual = 0.0;
        for &i in &polarizable {
            let particle = &mut config.particles_mut()[i];
            let alpha = &table[particle.id].polarizability;
            if let Some(dipole) = particle.dipole.as_mut() {
                let updated = alpha * field[i] + dipole.permanent;
                residual += (updated - dipole.moment()).norm();
                dipole.set_moment(updated);
            }
        }
        trace!(iteration, residual, "Induced dipole sweep.");
        if !residual.is_finite() {
            break;
        }
        if residual <= limit {
            return Ok(iteration);
        }
    }
    Err(EngineError::PolarizationNotConverged {
        iterations: params.max_iterations,
        residual,
    })
}
