//! # Moves
//!
//! Elementary Monte Carlo perturbations and the Metropolis acceptance machinery.
//!
//! Every attempt runs through the same sequence: the move *proposes* a perturbation by writing
//! to the trial configuration and returning a [`Change`]; the change is *evaluated* by the
//! nonbonded evaluator; the Metropolis test then either *commits* the trial into the current
//! configuration or *reverts* the trial to the current one. The sequence is implemented once in
//! [`Move::perform`]; concrete moves only provide the proposal.

pub mod insert_delete;
pub mod polarize;
pub mod rotation;
pub mod translation;

pub use insert_delete::InsertDelete;
pub use polarize::PolarizeMove;
pub use rotation::AtomicRotation;
pub use translation::AtomicTranslation;

use super::error::EngineError;
use super::nonbonded::Nonbonded;
use crate::core::models::change::Change;
use crate::core::models::particle::Particle;
use crate::core::models::space::{Configuration, Space};
use crate::core::species::AtomTable;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::{trace, warn};

/// Outcome of the Metropolis test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
    /// The energy change was NaN or negative infinity and must not be compared with a draw.
    Invalid,
}

/// Metropolis criterion on an energy change in kT.
///
/// `draw` is only called when `du > 0` and must return a uniform number in `[0, 1)`.
pub fn metropolis(du: f64, draw: impl FnOnce() -> f64) -> Decision {
    if du.is_nan() || du == f64::NEG_INFINITY {
        return Decision::Invalid;
    }
    if du <= 0.0 || draw() < (-du).exp() {
        Decision::Accept
    } else {
        Decision::Reject
    }
}

/// Per-move counters exposed read-only to observers.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MoveStats {
    pub attempts: u64,
    pub accepted: u64,
    pub rejected: u64,
    /// Attempts rejected because the energy change was not a number.
    pub invalid: u64,
    /// Sum of the energy changes of accepted attempts, in kT.
    pub sum_accepted_du: f64,
    /// Running mean over all attempts of the squared displacement (Å²), zero for rejections.
    pub mean_square_displacement: f64,
    /// Energy change of the most recent accepted attempt.
    pub last_accepted_du: Option<f64>,
}

impl MoveStats {
    pub fn acceptance_ratio(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.accepted as f64 / self.attempts as f64
        }
    }

    fn record(&mut self, square_displacement: f64) {
        self.attempts += 1;
        self.mean_square_displacement +=
            (square_displacement - self.mean_square_displacement) / self.attempts as f64;
    }

    fn record_accepted(&mut self, du: f64, square_displacement: f64) {
        self.record(square_displacement);
        self.accepted += 1;
        self.sum_accepted_du += du;
        self.last_accepted_du = Some(du);
    }

    fn record_rejected(&mut self) {
        self.record(0.0);
        self.rejected += 1;
    }

    fn record_invalid(&mut self) {
        self.record(0.0);
        self.rejected += 1;
        self.invalid += 1;
    }
}

/// How many elementary attempts one invocation of a move performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Repeat {
    Fixed(usize),
    /// Current size of the target group.
    #[default]
    GroupSize,
}

impl Repeat {
    pub fn count(&self, configuration: &Configuration, group: usize) -> usize {
        match *self {
            Self::Fixed(n) => n,
            Self::GroupSize => configuration.group(group).len(),
        }
    }
}

/// Read-only collaborators shared by all moves of a simulation.
#[derive(Debug, Clone, Copy)]
pub struct MoveContext<'a> {
    pub nonbonded: &'a Nonbonded,
    pub table: &'a AtomTable,
}

pub trait Move: Debug + Send {
    fn name(&self) -> &str;

    /// Writes a perturbation into the trial configuration.
    ///
    /// Returns `None` when the perturbation was vetoed before evaluation (for example, a
    /// particle left a hard container); in that case the trial configuration must already be
    /// identical to the current one.
    fn propose(
        &mut self,
        space: &mut Space,
        ctx: &MoveContext,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Change>, EngineError>;

    /// Additional term added to the energy change in the acceptance test, in kT.
    fn acceptance_bias(&self, _space: &Space, _change: &Change) -> f64 {
        0.0
    }

    /// Squared displacement of the last proposal.
    fn last_square_displacement(&self) -> f64 {
        0.0
    }

    fn repeat(&self, space: &Space) -> usize;

    fn stats(&self) -> &MoveStats;

    fn stats_mut(&mut self) -> &mut MoveStats;

    /// Runs one proposal through evaluation and the acceptance test.
    ///
    /// Returns the energy change if the attempt was committed, `0` otherwise.
    fn attempt(
        &mut self,
        space: &mut Space,
        ctx: &MoveContext,
        rng: &mut dyn RngCore,
    ) -> Result<f64, EngineError> {
        let Some(change) = self.propose(space, ctx, rng)? else {
            self.stats_mut().record_rejected();
            return Ok(0.0);
        };
        let du = ctx.nonbonded.change_energy(space, &change).delta();
        let bias = self.acceptance_bias(space, &change);
        match metropolis(du + bias, || rng.r#gen::<f64>()) {
            Decision::Accept => {
                space.accept(&change);
                let displacement = self.last_square_displacement();
                self.stats_mut().record_accepted(du, displacement);
                trace!(mc_move = self.name(), du, bias, "Accepted.");
                Ok(du)
            }
            Decision::Reject => {
                space.reject(&change);
                self.stats_mut().record_rejected();
                trace!(mc_move = self.name(), du, bias, "Rejected.");
                Ok(0.0)
            }
            Decision::Invalid => {
                space.reject(&change);
                self.stats_mut().record_invalid();
                warn!(
                    mc_move = self.name(),
                    du, bias, "Energy change is not a finite comparison value; attempt rejected."
                );
                Ok(0.0)
            }
        }
    }

    /// Performs [`Move::repeat`] attempts and returns the summed energy change of all
    /// committed attempts.
    fn perform(
        &mut self,
        space: &mut Space,
        ctx: &MoveContext,
        rng: &mut dyn RngCore,
    ) -> Result<f64, EngineError> {
        let n = self.repeat(space);
        let mut sum = 0.0;
        for _ in 0..n {
            sum += self.attempt(space, ctx, rng)?;
        }
        Ok(sum)
    }
}

/// Relative indices of the particles in a group that a move may pick.
///
/// The list is rebuilt only when the layout revision of the configuration changes, so frozen
/// species are filtered out once rather than on every attempt.
#[derive(Debug, Clone)]
pub(crate) struct Candidates {
    group: usize,
    revision: Option<u64>,
    indices: Vec<usize>,
}

impl Candidates {
    pub(crate) fn new(group: usize) -> Self {
        Self {
            group,
            revision: None,
            indices: Vec::new(),
        }
    }

    pub(crate) fn group(&self) -> usize {
        self.group
    }

    pub(crate) fn refresh(
        &mut self,
        configuration: &Configuration,
        movable: impl Fn(&Particle) -> bool,
    ) -> &[usize] {
        if self.revision != Some(configuration.revision()) {
            self.indices = configuration
                .group_particles(self.group)
                .iter()
                .enumerate()
                .filter(|(_, p)| movable(p))
                .map(|(i, _)| i)
                .collect();
            self.revision = Some(configuration.revision());
        }
        &self.indices
    }

    pub(crate) fn pick(&self, rng: &mut dyn RngCore) -> Option<usize> {
        if self.indices.is_empty() {
            None
        } else {
            Some(self.indices[rng.gen_range(0..self.indices.len())])
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::core::geometry::{Geometry, Point};
    use crate::core::models::change::GroupChange;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn non_positive_energy_change_is_accepted_without_a_draw() {
        for du in [0.0, -1e-300, -3.0, -1e12] {
            let decision = metropolis(du, || panic!("draw must not be requested"));
            assert_eq!(decision, Decision::Accept);
        }
    }

    #[test]
    fn positive_energy_change_compares_draw_with_boltzmann_factor() {
        let factor = (-1.0f64).exp();
        assert_eq!(metropolis(1.0, || factor - 1e-12), Decision::Accept);
        assert_eq!(metropolis(1.0, || factor), Decision::Reject);
        assert_eq!(metropolis(f64::INFINITY, || 0.0), Decision::Reject);
    }

    #[test]
    fn nan_energy_change_is_never_accepted() {
        assert_eq!(metropolis(f64::NAN, || 0.0), Decision::Invalid);
        assert_eq!(metropolis(f64::NEG_INFINITY, || 0.0), Decision::Invalid);
    }

    #[test]
    fn stats_track_acceptance_and_displacement() {
        let mut stats = MoveStats::default();
        stats.record_accepted(-1.0, 4.0);
        stats.record_rejected();
        stats.record_invalid();
        stats.record_accepted(0.5, 2.0);
        assert_eq!(stats.attempts, 4);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.rejected, 2);
        assert_eq!(stats.invalid, 1);
        assert_eq!(stats.sum_accepted_du, -0.5);
        assert_eq!(stats.last_accepted_du, Some(0.5));
        assert!((stats.mean_square_displacement - 1.5).abs() < 1e-12);
        assert_eq!(stats.acceptance_ratio(), 0.5);
    }

    #[derive(Debug, Default)]
    struct Scripted {
        stats: MoveStats,
        target: Point,
        vetoed: bool,
    }

    impl Move for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn propose(
            &mut self,
            space: &mut Space,
            _ctx: &MoveContext,
            _rng: &mut dyn RngCore,
        ) -> Result<Option<Change>, EngineError> {
            if self.vetoed {
                return Ok(None);
            }
            space.trial_mut().particles_mut()[0].pos = self.target;
            Ok(Some(Change::new().with(GroupChange::atoms(0, [0]))))
        }

        fn repeat(&self, _space: &Space) -> usize {
            1
        }

        fn stats(&self) -> &MoveStats {
            &self.stats
        }

        fn stats_mut(&mut self) -> &mut MoveStats {
            &mut self.stats
        }
    }

    #[test]
    fn rejected_attempt_leaves_current_configuration_bit_identical() {
        let table = table();
        let nonbonded = nonbonded(&table);
        let ctx = MoveContext {
            nonbonded: &nonbonded,
            table: &table,
        };
        let mut space = space(&table, Geometry::cube(20.0).unwrap());
        let before = space.current().clone();
        let mut mv = Scripted {
            target: Point::new(2.4, 0.1, 0.0),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let du = mv.perform(&mut space, &ctx, &mut rng).unwrap();
        assert_eq!(du, 0.0);
        assert_eq!(mv.stats().rejected, 1);
        assert_eq!(space.current(), &before);
        assert!(space.is_synchronized());
    }

    #[test]
    fn downhill_attempt_is_committed_and_returned() {
        let table = table();
        let nonbonded = nonbonded(&table);
        let ctx = MoveContext {
            nonbonded: &nonbonded,
            table: &table,
        };
        let mut space = space(&table, Geometry::cube(20.0).unwrap());
        let expected = {
            let mut trial = space.current().clone();
            trial.particles_mut()[0].pos = Point::new(0.0, 0.3, 0.0);
            nonbonded.system_energy(space.geometry(), &trial)
                - nonbonded.system_energy(space.geometry(), space.current())
        };
        assert!(expected < 0.0);
        let mut mv = Scripted {
            target: Point::new(0.0, 0.3, 0.0),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let du = mv.perform(&mut space, &ctx, &mut rng).unwrap();
        assert!((du - expected).abs() < 1e-12);
        assert_eq!(mv.stats().accepted, 1);
        assert_eq!(space.current().particles()[0].pos, Point::new(0.0, 0.3, 0.0));
        assert!(space.is_synchronized());
    }

    #[test]
    fn nan_energy_change_is_counted_invalid_and_reverted() {
        let table = table();
        let nonbonded = nonbonded(&table);
        let ctx = MoveContext {
            nonbonded: &nonbonded,
            table: &table,
        };
        let mut space = space(&table, Geometry::cube(20.0).unwrap());
        let before = space.current().clone();
        let mut mv = Scripted {
            target: Point::new(f64::NAN, 0.0, 0.0),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let du = mv.perform(&mut space, &ctx, &mut rng).unwrap();
        assert_eq!(du, 0.0);
        assert_eq!(mv.stats().attempts, 1);
        assert_eq!(mv.stats().invalid, 1);
        assert_eq!(mv.stats().rejected, 1);
        assert_eq!(mv.stats().accepted, 0);
        assert_eq!(mv.stats().last_accepted_du, None);
        assert_eq!(space.current(), &before);
        assert!(space.is_synchronized());
    }

    #[test]
    fn vetoed_proposal_counts_as_rejection() {
        let table = table();
        let nonbonded = nonbonded(&table);
        let ctx = MoveContext {
            nonbonded: &nonbonded,
            table: &table,
        };
        let mut space = space(&table, Geometry::cube(20.0).unwrap());
        let mut mv = Scripted {
            vetoed: true,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        mv.perform(&mut space, &ctx, &mut rng).unwrap();
        assert_eq!(mv.stats().attempts, 1);
        assert_eq!(mv.stats().rejected, 1);
        assert_eq!(nonbonded.group_pair_evaluations(), 0);
    }

    #[test]
    fn candidates_skip_frozen_particles() {
        let table = table();
        let space = space(&table, Geometry::cube(20.0).unwrap());
        let mut candidates = Candidates::new(0);
        let picked = candidates
            .refresh(space.current(), |p| table[p.id].dp > 0.0)
            .to_vec();
        assert_eq!(picked, vec![0, 2]);
        let mut rng = StdRng::seed_from_u64(2);
        assert!((0..50).all(|_| matches!(candidates.pick(&mut rng), Some(0 | 2))));
    }
}
