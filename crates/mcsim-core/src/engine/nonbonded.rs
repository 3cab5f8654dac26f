use crate::core::forcefield::pair::{CombinedPotential, PairPotential};
use crate::core::forcefield::term::EnergyChange;
use crate::core::geometry::Geometry;
use crate::core::models::change::{Change, GroupChange};
use crate::core::models::particle::Particle;
use crate::core::models::space::{Configuration, Space};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::instrument;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Which group pairs the change evaluator sums besides touched↔static.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TouchedPairPolicy {
    /// Only touched↔static group pairs, whole touched groups included. Energies between two
    /// touched groups and inside a touched group are not evaluated.
    StaticOnly,
    /// Touched↔static pairs for the moved particles, every unordered touched↔touched group
    /// pair once, and intra-group pairs involving a moved particle.
    #[default]
    Complete,
}

#[derive(Debug, Clone, Copy)]
enum Selection<'a> {
    All,
    Atoms(&'a [usize]),
}

impl<'a> Selection<'a> {
    fn of(change: &'a GroupChange) -> Self {
        if change.all {
            Self::All
        } else {
            Self::Atoms(&change.atoms)
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Job<'a> {
    /// Selected particles of group `a` against every particle of group `b`.
    Cross { a: usize, sel: Selection<'a>, b: usize },
    /// Pairs across two touched groups with at least one moved partner.
    Touched {
        a: usize,
        sel_a: Selection<'a>,
        b: usize,
        sel_b: Selection<'a>,
    },
    /// Pairs inside one group with at least one moved partner.
    Internal { group: usize, sel: Selection<'a> },
}

/// Pairwise nonbonded energy of whole configurations and of the parts touched by a move.
///
/// The evaluator never mutates a configuration. Group-pair work items are evaluated
/// independently (in parallel with the `parallel` feature) and their partial sums are combined
/// in a fixed order, so results do not depend on the number of worker threads.
#[derive(Debug)]
pub struct Nonbonded<P = CombinedPotential> {
    potential: P,
    policy: TouchedPairPolicy,
    group_pairs: AtomicU64,
}

impl<P: PairPotential> Nonbonded<P> {
    pub fn new(potential: P) -> Self {
        Self {
            potential,
            policy: TouchedPairPolicy::default(),
            group_pairs: AtomicU64::new(0),
        }
    }

    pub fn with_policy(mut self, policy: TouchedPairPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn potential(&self) -> &P {
        &self.potential
    }

    pub fn policy(&self) -> TouchedPairPolicy {
        self.policy
    }

    /// Number of group-pair work items evaluated so far.
    pub fn group_pair_evaluations(&self) -> u64 {
        self.group_pairs.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn pair_energy(&self, geometry: &Geometry, a: &Particle, b: &Particle) -> f64 {
        self.potential.energy(a, b, &geometry.vdist(&a.pos, &b.pos))
    }

    /// Energy of the parts named by `change` before (`old`) and after (`new`) a move.
    ///
    /// Returns zeros without evaluating anything when `change` is empty.
    #[instrument(level = "trace", skip_all, name = "nonbonded_change_energy")]
    pub fn energy(
        &self,
        geometry: &Geometry,
        old: &Configuration,
        new: &Configuration,
        change: &Change,
    ) -> EnergyChange {
        if change.is_empty() {
            return EnergyChange::default();
        }
        let jobs = self.plan(change, old.groups().len());
        self.group_pairs.fetch_add(jobs.len() as u64, Ordering::Relaxed);

        #[cfg(not(feature = "parallel"))]
        let iterator = jobs.iter();

        #[cfg(feature = "parallel")]
        let iterator = jobs.par_iter();

        let parts: Vec<EnergyChange> = iterator
            .map(|job| {
                EnergyChange::new(
                    self.job_energy(geometry, old, job),
                    self.job_energy(geometry, new, job),
                )
            })
            .collect();
        parts.into_iter().sum()
    }

    /// Change energy between the accepted and the trial configuration of `space`.
    pub fn change_energy(&self, space: &Space, change: &Change) -> EnergyChange {
        self.energy(space.geometry(), space.current(), space.trial(), change)
    }

    /// Sum over every unordered particle pair of the configuration.
    #[instrument(level = "debug", skip_all, name = "system_energy")]
    pub fn system_energy(&self, geometry: &Geometry, configuration: &Configuration) -> f64 {
        let particles = configuration.particles();
        let rows = 0..particles.len();

        #[cfg(not(feature = "parallel"))]
        let iterator = rows;

        #[cfg(feature = "parallel")]
        let iterator = rows.into_par_iter();

        let partial: Vec<f64> = iterator
            .map(|i| self.one_to_many(geometry, &particles[i], &particles[i + 1..]))
            .collect();
        partial.into_iter().sum()
    }

    fn plan<'a>(&self, change: &'a Change, group_count: usize) -> Vec<Job<'a>> {
        let fixed: Vec<usize> = (0..group_count)
            .filter(|&i| !change.is_touched(i))
            .collect();
        let mut jobs = Vec::new();
        for moved in change.groups() {
            let sel = match self.policy {
                TouchedPairPolicy::StaticOnly => Selection::All,
                TouchedPairPolicy::Complete => Selection::of(moved),
            };
            jobs.extend(fixed.iter().map(|&b| Job::Cross {
                a: moved.index,
                sel,
                b,
            }));
        }
        if self.policy == TouchedPairPolicy::Complete {
            for (x, y) in change.groups().iter().tuple_combinations() {
                jobs.push(Job::Touched {
                    a: x.index,
                    sel_a: Selection::of(x),
                    b: y.index,
                    sel_b: Selection::of(y),
                });
            }
            for moved in change.groups() {
                let rigid = moved.all && !moved.internal;
                let idle = !moved.all && moved.atoms.is_empty();
                if !rigid && !idle {
                    jobs.push(Job::Internal {
                        group: moved.index,
                        sel: Selection::of(moved),
                    });
                }
            }
        }
        jobs
    }

    fn job_energy(&self, geometry: &Geometry, config: &Configuration, job: &Job) -> f64 {
        match *job {
            Job::Cross { a, sel, b } => {
                let members = config.group_particles(a);
                let others = config.group_particles(b);
                match sel {
                    Selection::All => members
                        .iter()
                        .map(|p| self.one_to_many(geometry, p, others))
                        .sum(),
                    Selection::Atoms(moved) => moved
                        .iter()
                        .map(|&i| self.one_to_many(geometry, &members[i], others))
                        .sum(),
                }
            }
            Job::Touched {
                a,
                sel_a,
                b,
                sel_b,
            } => match (sel_a, sel_b) {
                (Selection::Atoms(moved_a), Selection::Atoms(moved_b)) => {
                    let group_a = config.group_particles(a);
                    let group_b = config.group_particles(b);
                    let moved_a_to_b: f64 = moved_a
                        .iter()
                        .map(|&i| self.one_to_many(geometry, &group_a[i], group_b))
                        .sum();
                    let rest_a_to_moved_b: f64 = group_a
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| moved_a.binary_search(i).is_err())
                        .map(|(_, p)| {
                            moved_b
                                .iter()
                                .map(|&j| self.pair_energy(geometry, p, &group_b[j]))
                                .sum::<f64>()
                        })
                        .sum();
                    moved_a_to_b + rest_a_to_moved_b
                }
                _ => {
                    let group_b = config.group_particles(b);
                    config
                        .group_particles(a)
                        .iter()
                        .map(|p| self.one_to_many(geometry, p, group_b))
                        .sum()
                }
            },
            Job::Internal { group, sel } => {
                let members = config.group_particles(group);
                match sel {
                    Selection::All => members
                        .iter()
                        .enumerate()
                        .map(|(i, p)| self.one_to_many(geometry, p, &members[i + 1..]))
                        .sum(),
                    Selection::Atoms(moved) => moved
                        .iter()
                        .map(|&i| {
                            members
                                .iter()
                                .enumerate()
                                .filter(|&(j, _)| {
                                    j != i && (j > i || moved.binary_search(&j).is_err())
                                })
                                .map(|(_, q)| self.pair_energy(geometry, &members[i], q))
                                .sum::<f64>()
                        })
                        .sum(),
                }
            }
        }
    }

    #[inline]
    fn one_to_many(&self, geometry: &Geometry, p: &Particle, others: &[Particle]) -> f64 {
        others.iter().map(|q| self.pair_energy(geometry, p, q)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::pair::Coulomb;
    use crate::core::geometry::Point;
    use crate::core::models::group::Group;
    use crate::core::species::{AtomData, AtomTable, SpeciesId};

    const LB: f64 = 7.0;

    fn table() -> AtomTable {
        let mut cation = AtomData::new("+");
        cation.charge = 1.0;
        let mut anion = AtomData::new("-");
        anion.charge = -1.0;
        AtomTable::from_atoms([cation, anion]).unwrap()
    }

    fn particle(id: usize, x: f64, y: f64, z: f64) -> Particle {
        Particle::new(SpeciesId::new(id), Point::new(x, y, z))
    }

    fn evaluator(policy: TouchedPairPolicy) -> Nonbonded<Coulomb> {
        Nonbonded::new(Coulomb::new(&table(), LB)).with_policy(policy)
    }

    fn space() -> Space {
        Space::builder(Geometry::cube(30.0).unwrap())
            .add_group(
                "a",
                vec![
                    particle(0, 0.0, 0.0, 0.0),
                    particle(1, 3.0, 0.0, 0.0),
                    particle(0, 0.0, 4.0, 1.0),
                ],
            )
            .add_group("b", vec![particle(1, -5.0, 2.0, 0.0), particle(0, 6.0, -1.0, 2.0)])
            .add_group("c", vec![particle(1, 1.0, 1.0, 7.0), particle(1, -2.0, -6.0, -3.0)])
            .build(&table())
            .unwrap()
    }

    fn full_difference(nb: &Nonbonded<Coulomb>, space: &Space) -> f64 {
        nb.system_energy(space.geometry(), space.trial())
            - nb.system_energy(space.geometry(), space.current())
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn empty_change_returns_zero_without_evaluating_group_pairs() {
        let nb = evaluator(TouchedPairPolicy::Complete);
        let mut space = space();
        space.trial_mut().particles_mut()[0].pos.x = 2.0;
        let result = nb.change_energy(&space, &Change::new());
        assert_eq!(result, EnergyChange::default());
        assert_eq!(nb.group_pair_evaluations(), 0);
    }

    #[test]
    fn system_energy_sums_every_unordered_pair_once() {
        let nb = evaluator(TouchedPairPolicy::Complete);
        let space = space();
        let particles = space.current().particles();
        let mut expected = 0.0;
        for i in 0..particles.len() {
            for j in i + 1..particles.len() {
                expected += nb.pair_energy(space.geometry(), &particles[i], &particles[j]);
            }
        }
        assert!(approx_eq(nb.system_energy(space.geometry(), space.current()), expected));
    }

    #[test]
    fn single_atom_move_matches_full_recompute() {
        let nb = evaluator(TouchedPairPolicy::Complete);
        let mut space = space();
        space.trial_mut().group_particles_mut(0)[1].pos = Point::new(2.0, 1.0, -1.0);
        let change = Change::new().with(GroupChange::atoms(0, [1]));
        let du = nb.change_energy(&space, &change).delta();
        assert!(approx_eq(du, full_difference(&nb, &space)));
    }

    #[test]
    fn static_only_policy_omits_intra_group_energy() {
        let nb = evaluator(TouchedPairPolicy::StaticOnly);
        let mut space = space();
        space.trial_mut().group_particles_mut(0)[1].pos = Point::new(2.0, 1.0, -1.0);
        let change = Change::new().with(GroupChange::atoms(0, [1]));
        let du = nb.change_energy(&space, &change).delta();
        assert!(!approx_eq(du, full_difference(&nb, &space)));
    }

    #[test]
    fn two_perturbed_groups_expose_missing_touched_pairs_under_static_only() {
        let complete = evaluator(TouchedPairPolicy::Complete);
        let static_only = evaluator(TouchedPairPolicy::StaticOnly);
        let mut space = space();
        space.trial_mut().group_particles_mut(0)[0].pos = Point::new(-1.0, 0.5, 0.0);
        space.trial_mut().group_particles_mut(1)[0].pos = Point::new(-2.0, 1.5, 0.5);
        let change = Change::new()
            .with(GroupChange::atoms(0, [0]))
            .with(GroupChange::atoms(1, [0]));
        let expected = full_difference(&complete, &space);

        let du = complete.change_energy(&space, &change).delta();
        assert!(approx_eq(du, expected));

        let du = static_only.change_energy(&space, &change).delta();
        assert!(!approx_eq(du, expected));
    }

    #[test]
    fn partial_and_whole_group_changes_combine_correctly() {
        let nb = evaluator(TouchedPairPolicy::Complete);
        let mut space = space();
        for p in space.trial_mut().group_particles_mut(2) {
            p.pos += Point::new(0.5, -0.5, 1.0);
        }
        space.trial_mut().group_particles_mut(0)[2].pos = Point::new(1.0, 2.0, 3.0);
        let change = Change::new()
            .with(GroupChange::rigid(2))
            .with(GroupChange::atoms(0, [2]));
        let du = nb.change_energy(&space, &change).delta();
        assert!(approx_eq(du, full_difference(&nb, &space)));
    }

    #[test]
    fn whole_group_internal_change_matches_full_recompute() {
        let nb = evaluator(TouchedPairPolicy::Complete);
        let mut space = space();
        space.trial_mut().group_particles_mut(1)[0].pos = Point::new(4.0, 4.0, 4.0);
        space.trial_mut().group_particles_mut(1)[1].pos = Point::new(-4.0, 2.0, -8.0);
        let change = Change::new().with(GroupChange::everything(1));
        let du = nb.change_energy(&space, &change).delta();
        assert!(approx_eq(du, full_difference(&nb, &space)));
    }

    #[test]
    fn insertion_is_evaluated_against_resized_group() {
        let nb = evaluator(TouchedPairPolicy::Complete);
        let mut space = space();
        space.trial_mut().insert_particle(1, particle(0, 9.0, 9.0, -9.0));
        let change = Change::new().with(GroupChange::resized(1));
        let energy = nb.change_energy(&space, &change);
        assert!(approx_eq(energy.delta(), full_difference(&nb, &space)));
        assert_eq!(space.trial().groups()[2], Group::new("c", 6..8));
    }

    #[test]
    fn change_energy_uses_minimum_image_separation() {
        let nb = evaluator(TouchedPairPolicy::Complete);
        let mut space = Space::builder(Geometry::cube(10.0).unwrap())
            .add_group("ions", vec![particle(0, 4.5, 0.0, 0.0), particle(1, -4.0, 0.0, 0.0)])
            .build(&table())
            .unwrap();
        space.trial_mut().particles_mut()[1].pos.x = -4.5;
        let change = Change::new().with(GroupChange::atoms(0, [1]));
        let energy = nb.change_energy(&space, &change);
        assert!(approx_eq(energy.old, -LB / 1.5));
        assert!(approx_eq(energy.new, -LB / 1.0));
    }
}
