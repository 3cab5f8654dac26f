use super::{Candidates, Move, MoveContext, MoveStats, Repeat};
use crate::core::geometry::Point;
use crate::core::models::change::{Change, GroupChange};
use crate::core::models::space::Space;
use crate::core::species::AtomTable;
use crate::engine::error::EngineError;
use nalgebra::{Rotation3, Unit};
use rand::{Rng, RngCore};
use rand_distr::{Distribution, UnitSphere};
use tracing::debug;

/// Rotates the dipole of one particle of the target group per attempt.
///
/// The axis is drawn uniformly from the unit sphere and the angle uniformly from
/// `[-δrot, δrot]`, with δrot the species' `dprot` in degrees. Only particles carrying a dipole
/// are candidates; rotating a bare point particle changes nothing.
#[derive(Debug, Clone)]
pub struct AtomicRotation {
    name: String,
    candidates: Candidates,
    dprot: Vec<f64>,
    repeat: Repeat,
    last_angle: f64,
    stats: MoveStats,
}

impl AtomicRotation {
    pub fn new(table: &AtomTable, group: usize) -> Self {
        Self {
            name: "rotate".to_string(),
            candidates: Candidates::new(group),
            dprot: table.iter().map(|a| a.dprot.to_radians()).collect(),
            repeat: Repeat::default(),
            last_angle: 0.0,
            stats: MoveStats::default(),
        }
    }

    /// Uses the same maximum angle (degrees) for every species with a nonzero table `dprot`.
    pub fn with_angle(mut self, degrees: f64) -> Self {
        let radians = degrees.to_radians();
        self.dprot
            .iter_mut()
            .filter(|d| **d > 0.0)
            .for_each(|d| *d = radians);
        self
    }

    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Angle of the last proposed rotation in radians.
    pub fn last_angle(&self) -> f64 {
        self.last_angle
    }

    pub fn movable_count(&mut self, space: &Space) -> usize {
        let dprot = &self.dprot;
        self.candidates
            .refresh(space.current(), |p| {
                dprot[p.id.index()] > 0.0 && p.dipole.is_some()
            })
            .len()
    }
}

impl Move for AtomicRotation {
    fn name(&self) -> &str {
        &self.name
    }

    fn propose(
        &mut self,
        space: &mut Space,
        _ctx: &MoveContext,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Change>, EngineError> {
        self.last_angle = 0.0;
        if self.movable_count(space) == 0 {
            debug!(mc_move = %self.name, "No rotatable particles in target group.");
            return Ok(None);
        }
        let Some(index) = self.candidates.pick(rng) else {
            return Ok(None);
        };
        let group = self.candidates.group();
        let particle = &mut space.trial_mut().group_particles_mut(group)[index];
        let [x, y, z]: [f64; 3] = UnitSphere.sample(rng);
        let axis = Unit::new_normalize(Point::new(x, y, z));
        let angle = self.dprot[particle.id.index()] * (2.0 * rng.r#gen::<f64>() - 1.0);
        particle.rotate(&Rotation3::from_axis_angle(&axis, angle));
        self.last_angle = angle;
        Ok(Some(Change::new().with(GroupChange::atoms(group, [index]))))
    }

    fn repeat(&self, space: &Space) -> usize {
        self.repeat.count(space.current(), self.candidates.group())
    }

    fn stats(&self) -> &MoveStats {
        &self.stats
    }

    fn stats_mut(&mut self) -> &mut MoveStats {
        &mut self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::core::forcefield::pair::{CombinedPotential, DipoleDipole};
    use crate::core::geometry::{Geometry, Point};
    use crate::core::models::particle::Particle;
    use crate::core::species::{AtomData, AtomTable, SpeciesId};
    use crate::engine::nonbonded::Nonbonded;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn rotation_preserves_position_and_moment_magnitude() {
        let table = table();
        let nonbonded = nonbonded(&table);
        let ctx = MoveContext {
            nonbonded: &nonbonded,
            table: &table,
        };
        let mut space = space(&table, Geometry::cube(20.0).unwrap());
        let mut mv = AtomicRotation::new(&table, 0);
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..50 {
            let change = mv.propose(&mut space, &ctx, &mut rng).unwrap().unwrap();
            let i = change.groups()[0].atoms[0];
            let (before, after) = (space.current().particles()[i], space.trial().particles()[i]);
            assert_eq!(before.pos, after.pos);
            let (db, da) = (before.dipole.unwrap(), after.dipole.unwrap());
            assert!((db.magnitude - da.magnitude).abs() < 1e-12);
            assert!((da.direction.norm() - 1.0).abs() < 1e-12);
            let cos = db.direction.dot(&da.direction).clamp(-1.0, 1.0);
            assert!(cos.acos() <= 30f64.to_radians() + 1e-9);
            assert!(mv.last_angle().abs() <= 30f64.to_radians());
            space.reject(&change);
        }
    }

    #[test]
    fn rotating_dipoles_samples_with_dipole_potential() {
        let table = table();
        let nonbonded = Nonbonded::new(CombinedPotential::new().with(DipoleDipole::new(7.0)));
        let ctx = MoveContext {
            nonbonded: &nonbonded,
            table: &table,
        };
        let mut space = space(&table, Geometry::cube(20.0).unwrap());
        let mut mv = AtomicRotation::new(&table, 0);
        let mut rng = StdRng::seed_from_u64(9);
        let mut tracked = nonbonded.system_energy(space.geometry(), space.current());
        for _ in 0..100 {
            tracked += mv.perform(&mut space, &ctx, &mut rng).unwrap();
        }
        let fresh = nonbonded.system_energy(space.geometry(), space.current());
        assert!((tracked - fresh).abs() < 1e-9);
        assert!(mv.stats().accepted > 0);
        assert_eq!(mv.stats().attempts, 400);
    }

    #[test]
    fn angle_override_keeps_non_rotating_dipoles_fixed() {
        let mut spinning = AtomData::new("spinning");
        spinning.dprot = 20.0;
        spinning.dipole_moment = 1.0;
        let mut locked = AtomData::new("locked");
        locked.dipole_moment = 1.0;
        let table = AtomTable::from_atoms([spinning, locked]).unwrap();
        let particles = (0..4)
            .map(|i| {
                let atom = &table[SpeciesId::new(i % 2)];
                Particle::from_species(atom, Point::new(3.0 * i as f64, 0.0, 0.0))
            })
            .collect();
        let mut space = Space::builder(Geometry::cube(30.0).unwrap())
            .add_group("dipoles", particles)
            .build(&table)
            .unwrap();
        let nonbonded = Nonbonded::new(CombinedPotential::new().with(DipoleDipole::new(7.0)));
        let ctx = MoveContext {
            nonbonded: &nonbonded,
            table: &table,
        };
        let locked_before = [space.current().particles()[1], space.current().particles()[3]];
        let mut mv = AtomicRotation::new(&table, 0).with_angle(90.0);
        assert_eq!(mv.movable_count(&space), 2);
        let mut rng = StdRng::seed_from_u64(12);
        for _ in 0..100 {
            mv.perform(&mut space, &ctx, &mut rng).unwrap();
        }
        assert_eq!(space.current().particles()[1], locked_before[0]);
        assert_eq!(space.current().particles()[3], locked_before[1]);
        assert!(mv.stats().accepted > 0);
    }
}
