use super::drift::DriftReport;
use std::time::Duration;

/// Per-macro-step summary handed to progress observers.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroSummary {
    /// One-based index of the finished macro step.
    pub step: usize,
    /// Energy tracked by the drift ledger, in kT.
    pub energy: f64,
    pub drift: DriftReport,
    /// Acceptance ratio of every registered move, in registration order.
    pub acceptance: Vec<(String, f64)>,
    pub elapsed: Duration,
}

/// Stages of a simulation's lifetime, in the order they occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Building the potential, the moves and the energy ledger.
    Assemble,
    /// Self-consistent relaxation of the initial induced dipoles. Skipped without polarization.
    Relax,
    /// The macro/micro sampling loop.
    Run,
}

#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStarted(Phase),
    PhaseFinished(Phase),

    DipolesRelaxed { sweeps: usize },
    /// A configured move was dropped because its group holds nothing it can act on.
    MoveSkipped { name: String },

    RunStarted { macro_steps: usize, micro_steps: usize },
    MacroStepFinished(MacroSummary),
    RunFinished { completed_macro_steps: usize, cancelled: bool },
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn reporter_without_callback_ignores_events() {
        ProgressReporter::new().report(Progress::PhaseStarted(Phase::Run));
    }

    #[test]
    fn callback_receives_every_event_in_order() {
        let seen = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            let tag = match event {
                Progress::PhaseStarted(phase) => format!("start {phase:?}"),
                Progress::DipolesRelaxed { sweeps } => format!("relaxed {sweeps}"),
                Progress::PhaseFinished(phase) => format!("finish {phase:?}"),
                _ => "other".to_string(),
            };
            seen.lock().unwrap().push(tag);
        }));
        reporter.report(Progress::PhaseStarted(Phase::Relax));
        reporter.report(Progress::DipolesRelaxed { sweeps: 7 });
        reporter.report(Progress::PhaseFinished(Phase::Relax));
        reporter.report(Progress::MoveSkipped {
            name: "rotate[ions]".to_string(),
        });
        drop(reporter);
        assert_eq!(
            seen.into_inner().unwrap(),
            vec!["start Relax", "relaxed 7", "finish Relax", "other"]
        );
    }
}
