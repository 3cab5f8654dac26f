use crate::core::forcefield::params::build_potential;
use crate::core::geometry::Point;
use crate::core::models::group::Group;
use crate::core::models::particle::{Particle, ParticleRecord};
use crate::core::models::space::Space;
use crate::core::species::AtomTable;
use crate::engine::config::{ConfigError, LoopConfig, MoveKind, MoveSpec, SimulationConfig};
use crate::engine::drift::{DriftReport, EnergyDrift};
use crate::engine::error::EngineError;
use crate::engine::mcloop::{CancelToken, McLoop, Timing};
use crate::engine::moves::{
    AtomicRotation, AtomicTranslation, InsertDelete, Move, MoveContext, MoveStats, PolarizeMove,
    Repeat,
};
use crate::engine::nonbonded::Nonbonded;
use crate::engine::polarization::{PolarizationParams, relax_induced_dipoles};
use crate::engine::progress::{MacroSummary, Phase, Progress, ProgressReporter};
use crate::engine::utils::sampling::WeightedSelector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome of [`Simulation::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub completed_macro_steps: usize,
    pub cancelled: bool,
    /// Energy tracked by the ledger at the end of the run, in kT.
    pub energy: f64,
    /// Report of the last drift check, default when no macro step finished.
    pub drift: DriftReport,
    pub timing: Timing,
}

/// Read-only view of the simulation state between macro steps.
#[derive(Debug)]
pub struct Snapshot<'a> {
    pub particles: &'a [Particle],
    pub groups: &'a [Group],
    /// Energy change of the most recently accepted attempt, `None` before the first acceptance.
    pub last_accepted_du: Option<f64>,
    pub ledger: &'a EnergyDrift,
    pub moves: Vec<(&'a str, &'a MoveStats)>,
}

/// A configured Metropolis Monte Carlo run over one space.
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    table: Arc<AtomTable>,
    space: Space,
    nonbonded: Nonbonded,
    moves: Vec<Box<dyn Move>>,
    selector: WeightedSelector,
    ledger: EnergyDrift,
    rng: StdRng,
    seed: u64,
    cancel: CancelToken,
    last_accepted_du: Option<f64>,
}

impl Simulation {
    /// Assembles a simulation over an existing space.
    ///
    /// The space keeps its own geometry; `config.geometry` is only used by
    /// [`Simulation::from_config`] and [`Simulation::from_records`].
    pub fn new(
        config: SimulationConfig,
        table: Arc<AtomTable>,
        space: Space,
        reporter: &ProgressReporter,
    ) -> Result<Self, EngineError> {
        let seed = resolve_seed(&config);
        let rng = StdRng::seed_from_u64(seed);
        Self::assemble(config, table, space, rng, seed, reporter)
    }

    /// Places the configured groups at random positions inside the configured geometry.
    pub fn from_config(
        config: SimulationConfig,
        table: Arc<AtomTable>,
        reporter: &ProgressReporter,
    ) -> Result<Self, EngineError> {
        let seed = resolve_seed(&config);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut builder = Space::builder(config.geometry.build()?);
        for group in &config.groups {
            let species = table.id_of(&group.species)?;
            builder = builder.add_random(&group.name, &table, species, group.count, &mut rng)?;
        }
        let space = builder.build(&table)?;
        Self::assemble(config, table, space, rng, seed, reporter)
    }

    /// Restarts from a checkpoint written with [`Space::to_records`]. Group boundaries come
    /// from the group layout of `config`.
    pub fn from_records(
        config: SimulationConfig,
        table: Arc<AtomTable>,
        records: Vec<ParticleRecord>,
        reporter: &ProgressReporter,
    ) -> Result<Self, EngineError> {
        let space = Space::from_records(
            config.geometry.build()?,
            records,
            &config.layout(),
            &table,
        )?;
        Self::new(config, table, space, reporter)
    }

    #[instrument(skip_all, name = "simulation_setup")]
    fn assemble(
        config: SimulationConfig,
        table: Arc<AtomTable>,
        mut space: Space,
        rng: StdRng,
        seed: u64,
        reporter: &ProgressReporter,
    ) -> Result<Self, EngineError> {
        reporter.report(Progress::PhaseStarted(Phase::Assemble));
        let potential = build_potential(&config.potentials, &table, &config.medium)?;
        info!(
            potential = %potential.describe(),
            bjerrum_length = config.medium.bjerrum_length(),
            policy = ?config.pair_policy,
            seed,
            "Assembling simulation."
        );
        let nonbonded = Nonbonded::new(potential).with_policy(config.pair_policy);

        let polarization = polarization_params(&config);
        if let Some(params) = &polarization {
            reporter.report(Progress::PhaseStarted(Phase::Relax));
            let (geometry, trial) = space.split_trial();
            let sweeps =
                relax_induced_dipoles(trial, geometry, nonbonded.potential(), &table, params)?;
            let relaxed = space.trial().clone();
            space.replace(relaxed);
            debug!(sweeps, "Relaxed initial induced dipoles.");
            reporter.report(Progress::DipolesRelaxed { sweeps });
            reporter.report(Progress::PhaseFinished(Phase::Relax));
        }

        let mut moves: Vec<Box<dyn Move>> = Vec::new();
        let mut weights = Vec::new();
        for (index, spec) in config.moves.iter().enumerate() {
            let Some(mv) = build_move(index, spec, &table, &mut space)? else {
                reporter.report(Progress::MoveSkipped {
                    name: move_name(spec),
                });
                continue;
            };
            let mv: Box<dyn Move> = match (&polarization, spec.polarize) {
                (Some(params), true) => Box::new(PolarizeMove::new(mv, *params)),
                _ => mv,
            };
            moves.push(mv);
            weights.push(spec.weight);
        }
        if moves.is_empty() {
            return Err(ConfigError::InvalidParameter {
                parameter: "move".to_string(),
                reason: "no configured move has anything to act on".to_string(),
            }
            .into());
        }
        let selector = WeightedSelector::new(&weights)?;

        let initial = nonbonded.system_energy(space.geometry(), space.current());
        if !initial.is_finite() {
            return Err(EngineError::NonFiniteEnergy {
                context: "initial configuration",
                value: initial,
            });
        }
        let mut ledger =
            EnergyDrift::new(config.drift.tolerance).with_rebaseline(config.drift.rebaseline);
        ledger.init(initial);
        info!(
            particles = space.current().len(),
            groups = space.current().groups().len(),
            moves = moves.len(),
            energy = initial,
            "Simulation ready."
        );
        reporter.report(Progress::PhaseFinished(Phase::Assemble));

        Ok(Self {
            config,
            table,
            space,
            nonbonded,
            moves,
            selector,
            ledger,
            rng,
            seed,
            cancel: CancelToken::new(),
            last_accepted_du: None,
        })
    }

    /// Drives the configured macro/micro loop.
    ///
    /// Every micro step selects one move by weight and performs it; every macro step ends with
    /// a full energy recomputation compared against the ledger. Cancellation through
    /// [`Simulation::cancel_token`] takes effect at the next macro boundary.
    #[instrument(skip_all, name = "simulation_run")]
    pub fn run(&mut self, reporter: &ProgressReporter) -> Result<RunSummary, EngineError> {
        let LoopConfig {
            macro_steps,
            micro_steps,
        } = self.config.mc_loop;
        let mut mcloop =
            McLoop::new(macro_steps, micro_steps).with_cancel_token(self.cancel.clone());
        info!(
            macro_steps = mcloop.macro_steps(),
            micro_steps = mcloop.micro_steps(),
            "Starting Monte Carlo run."
        );
        reporter.report(Progress::PhaseStarted(Phase::Run));
        reporter.report(Progress::RunStarted {
            macro_steps: mcloop.macro_steps(),
            micro_steps: mcloop.micro_steps(),
        });

        let mut completed = 0;
        let mut drift = DriftReport::default();
        while mcloop.next_macro() {
            while mcloop.next_micro() {
                let index = self.selector.select(&mut self.rng);
                let ctx = MoveContext {
                    nonbonded: &self.nonbonded,
                    table: self.table.as_ref(),
                };
                let mv = &mut self.moves[index];
                let accepted = mv.stats().accepted;
                let du = mv.perform(&mut self.space, &ctx, &mut self.rng)?;
                if mv.stats().accepted > accepted {
                    self.last_accepted_du = mv.stats().last_accepted_du;
                }
                self.ledger += du;
            }

            let recomputed = self
                .nonbonded
                .system_energy(self.space.geometry(), self.space.current());
            drift = self.ledger.check_drift(recomputed);
            completed = mcloop.current_macro();

            let timing = mcloop.timing();
            let summary = MacroSummary {
                step: completed,
                energy: self.ledger.total(),
                drift,
                acceptance: self.acceptance(),
                elapsed: timing.elapsed,
            };
            info!(
                step = completed,
                energy = summary.energy,
                drift = drift.absolute,
                particles = self.space.current().len(),
                remaining = ?timing.remaining,
                "Macro step finished."
            );
            reporter.report(Progress::MacroStepFinished(summary));
        }

        let cancelled = mcloop.is_cancelled();
        reporter.report(Progress::RunFinished {
            completed_macro_steps: completed,
            cancelled,
        });
        reporter.report(Progress::PhaseFinished(Phase::Run));
        if cancelled {
            warn!(completed, "Run cancelled before all macro steps finished.");
        }
        for mv in &self.moves {
            let stats = mv.stats();
            info!(
                mc_move = mv.name(),
                attempts = stats.attempts,
                acceptance = stats.acceptance_ratio(),
                invalid = stats.invalid,
                msd = stats.mean_square_displacement,
                "Move statistics."
            );
        }

        Ok(RunSummary {
            completed_macro_steps: completed,
            cancelled,
            energy: self.ledger.total(),
            drift,
            timing: mcloop.timing(),
        })
    }

    fn acceptance(&self) -> Vec<(String, f64)> {
        self.moves
            .iter()
            .map(|mv| (mv.name().to_string(), mv.stats().acceptance_ratio()))
            .collect()
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        let current = self.space.current();
        Snapshot {
            particles: current.particles(),
            groups: current.groups(),
            last_accepted_du: self.last_accepted_du,
            ledger: &self.ledger,
            moves: self.moves.iter().map(|mv| (mv.name(), mv.stats())).collect(),
        }
    }

    /// Token that stops [`Simulation::run`] at the next macro boundary when cancelled.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn table(&self) -> &AtomTable {
        &self.table
    }

    pub fn space(&self) -> &Space {
        &self.space
    }

    pub fn into_space(self) -> Space {
        self.space
    }

    pub fn nonbonded(&self) -> &Nonbonded {
        &self.nonbonded
    }

    pub fn moves(&self) -> &[Box<dyn Move>] {
        &self.moves
    }

    pub fn ledger(&self) -> &EnergyDrift {
        &self.ledger
    }

    /// Seed the random number generator was started from.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

fn resolve_seed(config: &SimulationConfig) -> u64 {
    config.seed.unwrap_or_else(|| rand::thread_rng().r#gen())
}

/// Moves flagged `polarize` fall back to default relaxation parameters.
fn polarization_params(config: &SimulationConfig) -> Option<PolarizationParams> {
    config
        .polarization
        .or_else(|| config.moves.iter().any(|m| m.polarize).then(PolarizationParams::default))
}

fn move_name(spec: &MoveSpec) -> String {
    let kind = match spec.kind {
        MoveKind::Translate { .. } => "translate",
        MoveKind::Rotate { .. } => "rotate",
        MoveKind::InsertDelete => "insert-delete",
    };
    format!("{kind}[{}]", spec.group)
}

fn build_move(
    index: usize,
    spec: &MoveSpec,
    table: &AtomTable,
    space: &mut Space,
) -> Result<Option<Box<dyn Move>>, EngineError> {
    let group = space
        .current()
        .group_index(&spec.group)
        .ok_or_else(|| ConfigError::InvalidParameter {
            parameter: format!("move[{index}].group"),
            reason: format!("no group named '{}'", spec.group),
        })?;
    let repeat = spec.repeat.map(Repeat::Fixed);

    let mv: Box<dyn Move> = match spec.kind {
        MoveKind::Translate { dp, direction } => {
            let mut mv = AtomicTranslation::new(table, group).with_name(&move_name(spec));
            if let Some(dp) = dp {
                mv = mv.with_displacement(dp);
            }
            if let Some([x, y, z]) = direction {
                mv = mv.with_direction(Point::new(x, y, z));
            }
            if let Some(repeat) = repeat {
                mv = mv.with_repeat(repeat);
            }
            if mv.movable_count(space) == 0 {
                debug!(group = %spec.group, "Skipping translation: no movable particles.");
                return Ok(None);
            }
            Box::new(mv)
        }
        MoveKind::Rotate { dprot } => {
            let mut mv = AtomicRotation::new(table, group).with_name(&move_name(spec));
            if let Some(degrees) = dprot {
                mv = mv.with_angle(degrees);
            }
            if let Some(repeat) = repeat {
                mv = mv.with_repeat(repeat);
            }
            if mv.movable_count(space) == 0 {
                debug!(group = %spec.group, "Skipping rotation: no rotatable particles.");
                return Ok(None);
            }
            Box::new(mv)
        }
        MoveKind::InsertDelete => {
            let mut mv = InsertDelete::new(table, space, group)?.with_name(&move_name(spec));
            if let Some(repeat) = repeat {
                mv = mv.with_repeat(repeat);
            }
            Box::new(mv)
        }
    };
    Ok(Some(mv))
}
