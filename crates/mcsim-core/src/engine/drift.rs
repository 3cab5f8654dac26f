use std::ops::AddAssign;
use tracing::{debug, warn};

/// Outcome of comparing the tracked energy with a full recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriftReport {
    /// `|tracked - recomputed|` in kT.
    pub absolute: f64,
    /// Absolute drift divided by `|recomputed|`, or `absolute` when the recomputed energy is zero.
    pub relative: f64,
    pub exceeded: bool,
}

/// Running ledger of accepted energy changes.
///
/// The ledger starts from a reference energy given to [`EnergyDrift::init`]; every accepted
/// move adds its `du`. Periodically the caller recomputes the full system energy and calls
/// [`EnergyDrift::check_drift`], which only reports. Exceeding the tolerance is never corrected
/// automatically unless rebaselining was requested explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyDrift {
    initial: f64,
    accumulated: f64,
    latest_recompute: Option<f64>,
    last_drift: f64,
    max_drift: f64,
    tolerance: f64,
    rebaseline: bool,
    checks: usize,
    violations: usize,
}

impl EnergyDrift {
    pub fn new(tolerance: f64) -> Self {
        Self {
            initial: 0.0,
            accumulated: 0.0,
            latest_recompute: None,
            last_drift: 0.0,
            max_drift: 0.0,
            tolerance,
            rebaseline: false,
            checks: 0,
            violations: 0,
        }
    }

    /// Re-baseline to the recomputed energy after every check.
    pub fn with_rebaseline(mut self, rebaseline: bool) -> Self {
        self.rebaseline = rebaseline;
        self
    }

    /// Sets the reference energy and clears all history.
    pub fn init(&mut self, reference: f64) {
        self.initial = reference;
        self.accumulated = 0.0;
        self.latest_recompute = None;
        self.last_drift = 0.0;
        self.max_drift = 0.0;
        self.checks = 0;
        self.violations = 0;
    }

    /// Reference energy plus every accepted change since the last baseline.
    #[inline]
    pub fn total(&self) -> f64 {
        self.initial + self.accumulated
    }

    pub fn initial(&self) -> f64 {
        self.initial
    }

    pub fn accumulated(&self) -> f64 {
        self.accumulated
    }

    pub fn latest_recompute(&self) -> Option<f64> {
        self.latest_recompute
    }

    pub fn last_drift(&self) -> f64 {
        self.last_drift
    }

    pub fn max_drift(&self) -> f64 {
        self.max_drift
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn checks(&self) -> usize {
        self.checks
    }

    pub fn violations(&self) -> usize {
        self.violations
    }

    pub fn check_drift(&mut self, recomputed: f64) -> DriftReport {
        let tracked = self.total();
        let absolute = (tracked - recomputed).abs();
        let relative = if recomputed != 0.0 {
            absolute / recomputed.abs()
        } else {
            absolute
        };
        let exceeded = absolute.is_nan() || absolute > self.tolerance;

        self.checks += 1;
        self.latest_recompute = Some(recomputed);
        self.last_drift = absolute;
        if absolute > self.max_drift || absolute.is_nan() {
            self.max_drift = absolute;
        }
        if exceeded {
            self.violations += 1;
            warn!(
                tracked,
                recomputed,
                absolute,
                relative,
                tolerance = self.tolerance,
                "Energy drift exceeds tolerance."
            );
        } else {
            debug!(tracked, recomputed, absolute, "Energy drift within tolerance.");
        }
        if self.rebaseline {
            self.initial = recomputed;
            self.accumulated = 0.0;
        }
        DriftReport {
            absolute,
            relative,
            exceeded,
        }
    }
}

impl AddAssign<f64> for EnergyDrift {
    fn add_assign(&mut self, du: f64) {
        self.accumulated += du;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_reference_plus_accepted_changes() {
        let mut drift = EnergyDrift::new(1e-9);
        drift.init(-10.0);
        drift += 1.5;
        drift += -0.25;
        assert_eq!(drift.total(), -8.75);
        assert_eq!(drift.accumulated(), 1.25);
    }

    #[test]
    fn matching_recompute_is_within_tolerance() {
        let mut drift = EnergyDrift::new(1e-9);
        drift.init(2.0);
        drift += 1.0;
        let report = drift.check_drift(3.0);
        assert_eq!(report.absolute, 0.0);
        assert!(!report.exceeded);
        assert_eq!(drift.checks(), 1);
        assert_eq!(drift.violations(), 0);
    }

    #[test]
    fn exceeding_tolerance_is_reported_but_not_corrected() {
        let mut drift = EnergyDrift::new(1e-3);
        drift.init(4.0);
        let report = drift.check_drift(5.0);
        assert!(report.exceeded);
        assert!((report.absolute - 1.0).abs() < 1e-15);
        assert!((report.relative - 0.2).abs() < 1e-15);
        assert_eq!(drift.total(), 4.0);
        assert_eq!(drift.violations(), 1);
        assert_eq!(drift.max_drift(), 1.0);
        assert_eq!(drift.latest_recompute(), Some(5.0));
    }

    #[test]
    fn rebaseline_adopts_recomputed_energy() {
        let mut drift = EnergyDrift::new(1e-3).with_rebaseline(true);
        drift.init(4.0);
        drift += 0.5;
        drift.check_drift(5.0);
        assert_eq!(drift.total(), 5.0);
        assert_eq!(drift.accumulated(), 0.0);
    }

    #[test]
    fn nan_recompute_counts_as_violation() {
        let mut drift = EnergyDrift::new(1.0);
        drift.init(0.0);
        let report = drift.check_drift(f64::NAN);
        assert!(report.exceeded);
        assert_eq!(drift.violations(), 1);
    }
}
