use super::{Move, MoveContext, MoveStats, Repeat};
use crate::core::forcefield::units::molar_to_number_density;
use crate::core::models::change::{Change, GroupChange};
use crate::core::models::particle::Particle;
use crate::core::models::space::Space;
use crate::core::species::{AtomTable, SpeciesId};
use crate::engine::config::ConfigError;
use crate::engine::error::EngineError;
use rand::{Rng, RngCore};

/// Grand canonical insertion and deletion of atomic species in one group.
///
/// Every attempt picks one species with positive activity and, with equal probability, tries
/// to insert a particle of it at a uniformly random position or to delete a randomly chosen
/// existing one. The ideal-gas part of the acceptance probability enters as
/// `-ln(zV/(N+1))` for insertions and `-ln(N/(zV))` for deletions, with `z` the activity as a
/// number density.
#[derive(Debug, Clone)]
pub struct InsertDelete {
    name: String,
    group: usize,
    species: Vec<(SpeciesId, f64)>,
    repeat: Repeat,
    bias: f64,
    stats: MoveStats,
}

impl InsertDelete {
    pub fn new(table: &AtomTable, space: &Space, group: usize) -> Result<Self, ConfigError> {
        if !space.geometry().volume().is_finite() {
            return Err(ConfigError::InvalidParameter {
                parameter: "geometry".to_string(),
                reason: "insertion requires a container with finite volume".to_string(),
            });
        }
        let species: Vec<(SpeciesId, f64)> = table
            .iter()
            .filter(|a| a.activity > 0.0)
            .map(|a| (a.id, molar_to_number_density(a.activity)))
            .collect();
        if species.is_empty() {
            return Err(ConfigError::InvalidParameter {
                parameter: "activity".to_string(),
                reason: "no species has a positive activity".to_string(),
            });
        }
        Ok(Self {
            name: "insert-delete".to_string(),
            group,
            species,
            repeat: Repeat::Fixed(1),
            bias: 0.0,
            stats: MoveStats::default(),
        })
    }

    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Species eligible for exchange with their activities in Å⁻³.
    pub fn species(&self) -> &[(SpeciesId, f64)] {
        &self.species
    }
}

impl Move for InsertDelete {
    fn name(&self) -> &str {
        &self.name
    }

    fn propose(
        &mut self,
        space: &mut Space,
        ctx: &MoveContext,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Change>, EngineError> {
        self.bias = 0.0;
        let (species, z) = self.species[rng.gen_range(0..self.species.len())];
        let volume = space.geometry().volume();
        let zv = z * volume;
        let present: Vec<usize> = space
            .current()
            .group_particles(self.group)
            .iter()
            .enumerate()
            .filter(|(_, p)| p.id == species)
            .map(|(i, _)| i)
            .collect();
        let n = present.len() as f64;

        if rng.r#gen::<bool>() {
            let pos = space.geometry().random_position(rng)?;
            let particle = Particle::from_species(&ctx.table[species], pos);
            space.trial_mut().insert_particle(self.group, particle);
            self.bias = -(zv / (n + 1.0)).ln();
        } else {
            if present.is_empty() {
                return Ok(None);
            }
            let victim = present[rng.gen_range(0..present.len())];
            space.trial_mut().remove_particle(self.group, victim);
            self.bias = -(n / zv).ln();
        }
        Ok(Some(Change::new().with(GroupChange::resized(self.group))))
    }

    fn acceptance_bias(&self, _space: &Space, _change: &Change) -> f64 {
        self.bias
    }

    fn repeat(&self, space: &Space) -> usize {
        self.repeat.count(space.current(), self.group)
    }

    fn stats(&self) -> &MoveStats {
        &self.stats
    }

    fn stats_mut(&mut self) -> &mut MoveStats {
        &mut self.stats
    }
}
