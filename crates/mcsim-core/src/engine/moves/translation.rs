use super::{Candidates, Move, MoveContext, MoveStats, Repeat};
use crate::core::geometry::Point;
use crate::core::models::change::{Change, GroupChange};
use crate::core::models::space::Space;
use crate::core::species::AtomTable;
use crate::engine::error::EngineError;
use rand::{Rng, RngCore};
use tracing::debug;

/// Displaces one particle of the target group per attempt.
///
/// Each Cartesian component of the displacement is drawn uniformly from `[-δ, δ]`, where δ is
/// the species' `dp` unless overridden for the move, and scaled by a direction mask so that a
/// move can be restricted to a plane or an axis.
#[derive(Debug, Clone)]
pub struct AtomicTranslation {
    name: String,
    candidates: Candidates,
    dp: Vec<f64>,
    direction: Point,
    repeat: Repeat,
    last_square_displacement: f64,
    stats: MoveStats,
}

impl AtomicTranslation {
    pub fn new(table: &AtomTable, group: usize) -> Self {
        Self {
            name: "translate".to_string(),
            candidates: Candidates::new(group),
            dp: table.iter().map(|a| a.dp).collect(),
            direction: Point::new(1.0, 1.0, 1.0),
            repeat: Repeat::default(),
            last_square_displacement: 0.0,
            stats: MoveStats::default(),
        }
    }

    /// Uses the same displacement parameter for every mobile species instead of the table value.
    /// Species frozen in the table (`dp == 0`) stay frozen.
    pub fn with_displacement(mut self, dp: f64) -> Self {
        self.dp.iter_mut().filter(|d| **d > 0.0).for_each(|d| *d = dp);
        self
    }

    pub fn with_direction(mut self, direction: Point) -> Self {
        self.direction = direction;
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

    /// Number of particles in the target group that this move can pick.
    pub fn movable_count(&mut self, space: &Space) -> usize {
        let dp = &self.dp;
        let direction = self.direction;
        self.candidates
            .refresh(space.current(), |p| {
                dp[p.id.index()] > 0.0 && direction != Point::zeros()
            })
            .len()
    }
}

impl Move for AtomicTranslation {
    fn name(&self) -> &str {
        &self.name
    }

    fn propose(
        &mut self,
        space: &mut Space,
        _ctx: &MoveContext,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Change>, EngineError> {
        self.last_square_displacement = 0.0;
        if self.movable_count(space) == 0 {
            debug!(mc_move = %self.name, "No movable particles in target group.");
            return Ok(None);
        }
        let Some(index) = self.candidates.pick(rng) else {
            return Ok(None);
        };
        let group = self.candidates.group();
        let (geometry, trial) = space.split_trial();
        let particle = &mut trial.group_particles_mut(group)[index];
        let dp = self.dp[particle.id.index()];
        let displacement = Point::new(
            self.direction.x * dp * (2.0 * rng.r#gen::<f64>() - 1.0),
            self.direction.y * dp * (2.0 * rng.r#gen::<f64>() - 1.0),
            self.direction.z * dp * (2.0 * rng.r#gen::<f64>() - 1.0),
        );
        let original = particle.pos;
        particle.pos += displacement;
        geometry.boundary(&mut particle.pos);
        if geometry.collision(&particle.pos) {
            particle.pos = original;
            return Ok(None);
        }
        self.last_square_displacement = displacement.norm_squared();
        Ok(Some(Change::new().with(GroupChange::atoms(group, [index]))))
    }

    fn last_square_displacement(&self) -> f64 {
        self.last_square_displacement
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
    use crate::core::geometry::Geometry;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn frozen_species_are_never_displaced() {
        let table = table();
        let nonbonded = nonbonded(&table);
        let ctx = MoveContext {
            nonbonded: &nonbonded,
            table: &table,
        };
        let mut space = space(&table, Geometry::cube(20.0).unwrap());
        let frozen_before = [space.current().particles()[1], space.current().particles()[3]];
        let mut mv = AtomicTranslation::new(&table, 0);
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..200 {
            mv.perform(&mut space, &ctx, &mut rng).unwrap();
        }
        assert_eq!(space.current().particles()[1], frozen_before[0]);
        assert_eq!(space.current().particles()[3], frozen_before[1]);
        assert_eq!(mv.stats().attempts, 800);
        assert!(mv.stats().accepted > 0);
        assert!(space.is_synchronized());
    }

    #[test]
    fn displacement_override_keeps_frozen_species_in_place() {
        let table = table();
        let nonbonded = nonbonded(&table);
        let ctx = MoveContext {
            nonbonded: &nonbonded,
            table: &table,
        };
        let mut space = space(&table, Geometry::cube(20.0).unwrap());
        let frozen_before = [space.current().particles()[1], space.current().particles()[3]];
        let mut mv = AtomicTranslation::new(&table, 0).with_displacement(0.5);
        assert_eq!(mv.movable_count(&space), 2);
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..200 {
            mv.perform(&mut space, &ctx, &mut rng).unwrap();
        }
        assert_eq!(space.current().particles()[1], frozen_before[0]);
        assert_eq!(space.current().particles()[3], frozen_before[1]);
        assert!(space.is_synchronized());
    }

    #[test]
    fn displacement_stays_within_step_and_direction_mask() {
        let table = table();
        let mut space = space(&table, Geometry::cube(50.0).unwrap());
        let nonbonded = nonbonded(&table);
        let ctx = MoveContext {
            nonbonded: &nonbonded,
            table: &table,
        };
        let mut mv = AtomicTranslation::new(&table, 0)
            .with_displacement(0.5)
            .with_direction(Point::new(1.0, 0.0, 0.0));
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let before = space.current().clone();
            let change = mv.propose(&mut space, &ctx, &mut rng).unwrap().unwrap();
            let group = &change.groups()[0];
            let i = group.atoms[0];
            let d = space.trial().particles()[i].pos - before.particles()[i].pos;
            assert!(d.x.abs() <= 0.5);
            assert_eq!((d.y, d.z), (0.0, 0.0));
            assert!((mv.last_square_displacement() - d.norm_squared()).abs() < 1e-12);
            space.reject(&change);
        }
    }

    #[test]
    fn leaving_spherical_container_is_vetoed_without_touching_trial() {
        let table = table();
        let nonbonded = nonbonded(&table);
        let ctx = MoveContext {
            nonbonded: &nonbonded,
            table: &table,
        };
        let mut space = space(&table, Geometry::sphere(3.0).unwrap());
        let mut mv = AtomicTranslation::new(&table, 0).with_displacement(100.0);
        let mut rng = StdRng::seed_from_u64(8);
        let mut vetoed = 0;
        for _ in 0..20 {
            if mv.propose(&mut space, &ctx, &mut rng).unwrap().is_none() {
                vetoed += 1;
                assert!(space.is_synchronized());
            } else {
                space.reset_trial();
            }
        }
        assert!(vetoed > 0);
    }

    #[test]
    fn periodic_boundary_wraps_displaced_particle() {
        let table = table();
        let nonbonded = nonbonded(&table);
        let ctx = MoveContext {
            nonbonded: &nonbonded,
            table: &table,
        };
        let mut space = space(&table, Geometry::cube(6.0).unwrap());
        let mut mv = AtomicTranslation::new(&table, 0).with_displacement(50.0);
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..20 {
            let change = mv.propose(&mut space, &ctx, &mut rng).unwrap().unwrap();
            let i = change.groups()[0].atoms[0];
            assert!(!space.geometry().collision(&space.trial().particles()[i].pos));
            space.reject(&change);
        }
    }
}
