use super::change::Change;
use super::group::{Group, PartitionError, check_partition};
use super::particle::Particle;
use crate::core::geometry::{Geometry, GeometryError};
use crate::core::species::{AtomTable, SpeciesId};
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpaceError {
    #[error("Invalid group layout: {0}")]
    Partition(#[from] PartitionError),
    #[error("Particle {index} refers to unknown species {species}")]
    UnknownSpecies { index: usize, species: SpeciesId },
    #[error("Particle {index} lies outside the container")]
    OutsideContainer { index: usize },
    #[error("Group layout expects {expected} particles but {found} records were given")]
    LayoutMismatch { expected: usize, found: usize },
    #[error("Cannot place particles: {0}")]
    Geometry(#[from] GeometryError),
}

/// Particle array plus its partition into groups.
///
/// This is the unit that the energy evaluator reads: the evaluator receives one
/// `Configuration` for the energy before a move and one for the energy after it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Configuration {
    particles: Vec<Particle>,
    groups: Vec<Group>,
    revision: u64,
}

impl Configuration {
    pub fn new(particles: Vec<Particle>, groups: Vec<Group>) -> Result<Self, PartitionError> {
        check_partition(&groups, particles.len())?;
        Ok(Self {
            particles,
            groups,
            revision: 0,
        })
    }

    #[inline]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    #[inline]
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    #[inline]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    #[inline]
    pub fn group(&self, index: usize) -> &Group {
        &self.groups[index]
    }

    pub fn group_index(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.name() == name)
    }

    #[inline]
    pub fn group_particles(&self, index: usize) -> &[Particle] {
        &self.particles[self.groups[index].range()]
    }

    #[inline]
    pub fn group_particles_mut(&mut self, index: usize) -> &mut [Particle] {
        let range = self.groups[index].range();
        &mut self.particles[range]
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Counter bumped by every insertion or removal; unchanged by plain moves.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of particles of `species` inside the group.
    pub fn count_species(&self, group_index: usize, species: SpeciesId) -> usize {
        self.group_particles(group_index)
            .iter()
            .filter(|p| p.id == species)
            .count()
    }

    /// Appends a particle to the end of a group and shifts every later group up by one.
    ///
    /// Returns the absolute index of the inserted particle.
    pub fn insert_particle(&mut self, group_index: usize, particle: Particle) -> usize {
        let at = self.groups[group_index].end();
        self.particles.insert(at, particle);
        self.groups[group_index].grow();
        for group in &mut self.groups[group_index + 1..] {
            group.shift_up();
        }
        self.revision += 1;
        self.assert_partition();
        at
    }

    /// Removes the particle at `relative` from a group and shifts every later group down by one.
    pub fn remove_particle(&mut self, group_index: usize, relative: usize) -> Particle {
        let at = self.groups[group_index].absolute(relative);
        let particle = self.particles.remove(at);
        self.groups[group_index].shrink();
        for group in &mut self.groups[group_index + 1..] {
            group.shift_down();
        }
        self.revision += 1;
        self.assert_partition();
        particle
    }

    pub fn check_partition(&self) -> Result<(), PartitionError> {
        check_partition(&self.groups, self.particles.len())
    }

    fn assert_partition(&self) {
        if let Err(e) = self.check_partition() {
            panic!("group partition invariant violated: {e}");
        }
    }

    /// Copies the parts of `source` named by `change` into `self`.
    fn sync_from(&mut self, source: &Configuration, change: &Change) {
        if change.resizes() || self.particles.len() != source.particles.len() {
            self.clone_from(source);
            return;
        }
        for g in change.groups() {
            let group = &source.groups[g.index];
            if g.all {
                let range = group.range();
                self.particles[range.clone()].copy_from_slice(&source.particles[range]);
            } else {
                for &rel in &g.atoms {
                    let i = group.absolute(rel);
                    self.particles[i] = source.particles[i];
                }
            }
        }
    }
}

/// The simulation space: accepted ("current") and work-in-progress ("trial") configurations.
///
/// Moves write only to the trial configuration. Accepting copies trial into current and
/// rejecting copies current back into trial, so that outside an in-flight move both are
/// identical. The space is created once per run and mutated in place afterwards.
#[derive(Debug, Clone)]
pub struct Space {
    geometry: Geometry,
    current: Configuration,
    trial: Configuration,
}

impl Space {
    /// Creates a space from an initial configuration, validating the group partition,
    /// species ids and container membership.
    pub fn new(
        geometry: Geometry,
        particles: Vec<Particle>,
        groups: Vec<Group>,
        table: &AtomTable,
    ) -> Result<Self, SpaceError> {
        let mut configuration = Configuration::new(particles, groups)?;
        for (index, particle) in configuration.particles.iter_mut().enumerate() {
            if !table.contains(particle.id) {
                return Err(SpaceError::UnknownSpecies {
                    index,
                    species: particle.id,
                });
            }
            geometry.boundary(&mut particle.pos);
            if geometry.collision(&particle.pos) {
                return Err(SpaceError::OutsideContainer { index });
            }
        }
        Ok(Self {
            geometry,
            trial: configuration.clone(),
            current: configuration,
        })
    }

    pub fn builder(geometry: Geometry) -> SpaceBuilder {
        SpaceBuilder::new(geometry)
    }

    /// Rebuilds a space from a flat checkpoint record list and a group layout of
    /// `(name, particle count)` pairs derived from the run configuration.
    pub fn from_records(
        geometry: Geometry,
        records: Vec<Particle>,
        layout: &[(String, usize)],
        table: &AtomTable,
    ) -> Result<Self, SpaceError> {
        let expected: usize = layout.iter().map(|(_, n)| n).sum();
        if expected != records.len() {
            return Err(SpaceError::LayoutMismatch {
                expected,
                found: records.len(),
            });
        }
        let mut begin = 0;
        let groups = layout
            .iter()
            .map(|(name, n)| {
                let group = Group::new(name, begin..begin + n);
                begin += n;
                group
            })
            .collect();
        Self::new(geometry, records, groups, table)
    }

    /// Exports the accepted configuration as a flat, ordered record list.
    pub fn to_records(&self) -> Vec<Particle> {
        self.current.particles.clone()
    }

    /// Group layout as `(name, particle count)` pairs, suitable for [`Space::from_records`].
    pub fn layout(&self) -> Vec<(String, usize)> {
        self.current
            .groups
            .iter()
            .map(|g| (g.name().to_string(), g.len()))
            .collect()
    }

    #[inline]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[inline]
    pub fn current(&self) -> &Configuration {
        &self.current
    }

    #[inline]
    pub fn trial(&self) -> &Configuration {
        &self.trial
    }

    #[inline]
    pub fn trial_mut(&mut self) -> &mut Configuration {
        &mut self.trial
    }

    /// Geometry together with mutable access to the trial configuration.
    #[inline]
    pub fn split_trial(&mut self) -> (&Geometry, &mut Configuration) {
        (&self.geometry, &mut self.trial)
    }

    /// Commits the trial configuration for the parts named by `change`.
    pub fn accept(&mut self, change: &Change) {
        self.current.sync_from(&self.trial, change);
    }

    /// Discards the trial configuration for the parts named by `change`.
    pub fn reject(&mut self, change: &Change) {
        self.trial.sync_from(&self.current, change);
    }

    /// Discards every pending trial modification.
    pub fn reset_trial(&mut self) {
        self.trial.clone_from(&self.current);
    }

    /// Replaces both configurations at once. Intended for whole-system updates performed
    /// outside of a move, such as the initial dipole relaxation.
    pub fn replace(&mut self, configuration: Configuration) {
        self.trial.clone_from(&configuration);
        self.current = configuration;
    }

    /// Rescales the container to `volume` and every position by the same linear factor.
    ///
    /// This is the only way the geometry of a live space changes, and it must happen between
    /// moves: pending trial modifications are discarded. Returns the linear scale factor.
    pub fn set_volume(&mut self, volume: f64) -> Result<f64, SpaceError> {
        let geometry = self.geometry.with_volume(volume)?;
        let scale = (volume / self.geometry.volume()).cbrt();
        for particle in &mut self.current.particles {
            particle.pos *= scale;
        }
        self.geometry = geometry;
        self.reset_trial();
        Ok(scale)
    }

    /// Whether current and trial are identical, as required outside of an in-flight move.
    pub fn is_synchronized(&self) -> bool {
        self.current == self.trial
    }
}

/// Incremental construction of a [`Space`] group by group.
#[derive(Debug, Clone)]
pub struct SpaceBuilder {
    geometry: Geometry,
    particles: Vec<Particle>,
    groups: Vec<Group>,
}

impl SpaceBuilder {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            particles: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Appends a group holding the given particles.
    pub fn add_group(mut self, name: &str, particles: Vec<Particle>) -> Self {
        let begin = self.particles.len();
        self.particles.extend(particles);
        self.groups.push(Group::new(name, begin..self.particles.len()));
        self
    }

    /// Appends a group of `count` particles of one species at random positions.
    pub fn add_random<R: Rng + ?Sized>(
        self,
        name: &str,
        table: &AtomTable,
        species: SpeciesId,
        count: usize,
        rng: &mut R,
    ) -> Result<Self, SpaceError> {
        let atom = table.get(species).ok_or(SpaceError::UnknownSpecies {
            index: self.particles.len(),
            species,
        })?;
        let particles = (0..count)
            .map(|_| {
                self.geometry
                    .random_position(rng)
                    .map(|pos| Particle::from_species(atom, pos))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.add_group(name, particles))
    }

    pub fn build(self, table: &AtomTable) -> Result<Space, SpaceError> {
        Space::new(self.geometry, self.particles, self.groups, table)
    }
}
