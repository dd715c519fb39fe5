//! Fixed-step simulation loop.
//!
//! Measured wall-clock time is added to an accumulator and the world is
//! advanced in whole, fixed steps. Time beyond `max_backlog` is dropped with
//! a warning instead of being simulated in a burst.

use crate::world::World;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

/// Result of feeding one time measurement into the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Less than one step accumulated; nothing to run yet
    Idle { sleep_for: Duration },
    /// Run `steps` fixed updates. `clamped` is set when backlog was dropped.
    Stepped { steps: u32, clamped: bool },
}

/// Pure accumulator state of the fixed-step loop.
#[derive(Debug, Clone)]
pub struct Accumulator {
    step: Duration,
    max_backlog: Duration,
    accumulated: Duration,
}

impl Accumulator {
    /// `step` must be non-zero.
    pub fn new(step: Duration, max_backlog: Duration) -> Self {
        debug_assert!(!step.is_zero());
        Self {
            step,
            max_backlog,
            accumulated: Duration::ZERO,
        }
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Time accumulated but not yet simulated.
    pub fn remainder(&self) -> Duration {
        self.accumulated
    }

    pub fn feed(&mut self, elapsed: Duration) -> TickOutcome {
        self.accumulated += elapsed;

        if self.accumulated < self.step {
            return TickOutcome::Idle {
                sleep_for: self.step - self.accumulated,
            };
        }

        let clamped = self.accumulated > self.max_backlog;
        if clamped {
            self.accumulated = self.max_backlog;
        }

        let mut steps = 0;
        while self.accumulated >= self.step {
            self.accumulated -= self.step;
            steps += 1;
        }
        TickOutcome::Stepped { steps, clamped }
    }
}

/// Runs the simulation until `shutdown` fires.
///
/// Every update receives exactly `step`, never the measured delta.
pub async fn run(
    world: Arc<dyn World>,
    step: Duration,
    max_backlog: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut accumulator = Accumulator::new(step, max_backlog);
    let mut previous = Instant::now();
    info!("🕒 Simulation loop started with a {:?} step", step);

    loop {
        let now = Instant::now();
        let outcome = accumulator.feed(now - previous);
        previous = now;

        match outcome {
            TickOutcome::Idle { sleep_for } => {
                tokio::select! {
                    _ = sleep(sleep_for) => {}
                    _ = shutdown.recv() => break,
                }
            }
            TickOutcome::Stepped { steps, clamped } => {
                if clamped {
                    warn!(
                        "🐢 Server is running slow, dropping simulation time beyond {:?}",
                        max_backlog
                    );
                }
                for _ in 0..steps {
                    world.update_step(step).await;
                }
                if !matches!(shutdown.try_recv(), Err(broadcast::error::TryRecvError::Empty)) {
                    break;
                }
            }
        }
    }

    info!("🕒 Simulation loop stopped");
}
