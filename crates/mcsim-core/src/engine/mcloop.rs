use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Cooperative cancellation flag, checked only between macro steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub elapsed: Duration,
    /// Mean wall time of a finished macro step.
    pub per_macro: Duration,
    /// Estimate for the macro steps not yet started.
    pub remaining: Duration,
}

/// Nested macro/micro step counters with wall-clock bookkeeping.
///
/// ```ignore
/// while mcloop.next_macro() {
///     while mcloop.next_micro() {
///         // one move
///     }
///     // drift check, sampling
/// }
/// ```
#[derive(Debug, Clone)]
pub struct McLoop {
    macro_steps: usize,
    micro_steps: usize,
    macro_count: usize,
    micro_count: usize,
    started: Option<Instant>,
    cancel: CancelToken,
}

impl McLoop {
    pub fn new(macro_steps: usize, micro_steps: usize) -> Self {
        Self {
            macro_steps,
            micro_steps,
            macro_count: 0,
            micro_count: 0,
            started: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Advances to the next macro step.
    ///
    /// Returns `false` when all steps are done or cancellation was requested.
    pub fn next_macro(&mut self) -> bool {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
        if self.cancel.is_cancelled() || self.macro_count >= self.macro_steps {
            return false;
        }
        self.macro_count += 1;
        self.micro_count = 0;
        true
    }

    pub fn next_micro(&mut self) -> bool {
        if self.micro_count >= self.micro_steps {
            return false;
        }
        self.micro_count += 1;
        true
    }

    pub fn macro_steps(&self) -> usize {
        self.macro_steps
    }

    pub fn micro_steps(&self) -> usize {
        self.micro_steps
    }

    /// Number of macro steps started so far.
    pub fn current_macro(&self) -> usize {
        self.macro_count
    }

    pub fn current_micro(&self) -> usize {
        self.micro_count
    }

    pub fn total_steps(&self) -> usize {
        self.macro_steps * self.micro_steps
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn timing(&self) -> Timing {
        let elapsed = self.started.map_or(Duration::ZERO, |t| t.elapsed());
        let finished = if self.micro_count >= self.micro_steps {
            self.macro_count
        } else {
            self.macro_count.saturating_sub(1)
        };
        let per_macro = match u32::try_from(finished) {
            Ok(n) if n > 0 => elapsed / n,
            _ => Duration::ZERO,
        };
        let left = u32::try_from(self.macro_steps.saturating_sub(finished)).unwrap_or(u32::MAX);
        Timing {
            elapsed,
            per_macro,
            remaining: per_macro * left,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_visits_every_micro_step_of_every_macro_step() {
        let mut mcloop = McLoop::new(3, 4);
        let mut visited = 0;
        while mcloop.next_macro() {
            while mcloop.next_micro() {
                visited += 1;
            }
        }
        assert_eq!(visited, 12);
        assert_eq!(mcloop.current_macro(), 3);
        assert_eq!(mcloop.total_steps(), 12);
        assert_eq!(mcloop.timing().remaining, Duration::ZERO);
    }

    #[test]
    fn cancellation_stops_at_next_macro_boundary() {
        let mut mcloop = McLoop::new(10, 2);
        let token = mcloop.cancel_token();
        let mut micro = 0;
        while mcloop.next_macro() {
            while mcloop.next_micro() {
                micro += 1;
                token.cancel();
            }
        }
        assert_eq!(micro, 2);
        assert_eq!(mcloop.current_macro(), 1);
        assert!(mcloop.is_cancelled());
    }

    #[test]
    fn zero_micro_steps_still_runs_macro_boundaries() {
        let mut mcloop = McLoop::new(2, 0);
        let mut macros = 0;
        while mcloop.next_macro() {
            assert!(!mcloop.next_micro());
            macros += 1;
        }
        assert_eq!(macros, 2);
    }
}
