//! Busy-spin back-off policies (§4.1, §9: "encapsulated as a small value
//! with `pause` and `reset`").
//!
//! The two suspension points in the whole system — a producer waiting for
//! ring space, and a consumer waiting for the next sequence — both use one
//! of these policies instead of a blocking primitive, so neither ever
//! parks the OS thread on the fast path.

use std::time::Duration;

/// Which back-off policy a [`super::Bus`] uses on its two suspension
/// points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// CPU pause then yield. Intended for threads pinned to isolated
    /// cores, where sleeping would waste a core that has nothing else to
    /// do anyway.
    Aggressive,
    /// Short pause, then an early transition to microsecond sleeps.
    /// Intended for shared cores where yielding CPU time to other work
    /// matters more than shaving the last nanoseconds of latency.
    Relaxed,
    /// Staged pause -> yield -> short sleep -> long sleep, with the stage
    /// counter reset after a long sleep so a newly-busy bus ramps back up
    /// quickly rather than staying parked at the slowest stage.
    Adaptive,
}

const SPIN_ITERATIONS: u32 = 100;
const YIELD_ITERATIONS: u32 = 200;
const SHORT_SLEEP: Duration = Duration::from_micros(10);
const LONG_SLEEP: Duration = Duration::from_micros(500);

/// Mutable back-off state for one waiter. Not `Clone`-shared between
/// threads — each producer/consumer loop owns its own `Backoff`.
#[derive(Debug)]
pub struct Backoff {
    policy: BackoffPolicy,
    stage: u32,
}

impl Backoff {
    /// Create a fresh back-off at stage zero for `policy`.
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy, stage: 0 }
    }

    /// Wait one step, escalating according to the policy.
    pub fn pause(&mut self) {
        match self.policy {
            BackoffPolicy::Aggressive => {
                if self.stage < SPIN_ITERATIONS {
                    std::hint::spin_loop();
                } else {
                    std::thread::yield_now();
                }
                self.stage = self.stage.saturating_add(1);
            }
            BackoffPolicy::Relaxed => {
                if self.stage < SPIN_ITERATIONS / 4 {
                    std::hint::spin_loop();
                } else {
                    std::thread::sleep(SHORT_SLEEP);
                }
                self.stage = self.stage.saturating_add(1);
            }
            BackoffPolicy::Adaptive => {
                if self.stage < SPIN_ITERATIONS {
                    std::hint::spin_loop();
                } else if self.stage < SPIN_ITERATIONS + YIELD_ITERATIONS {
                    std::thread::yield_now();
                } else if self.stage < SPIN_ITERATIONS + YIELD_ITERATIONS + 50 {
                    std::thread::sleep(SHORT_SLEEP);
                } else {
                    std::thread::sleep(LONG_SLEEP);
                    self.reset();
                    return;
                }
                self.stage = self.stage.saturating_add(1);
            }
        }
    }

    /// Reset to stage zero, e.g. after successfully observing progress.
    pub fn reset(&mut self) {
        self.stage = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_returns_to_spin_stage() {
        let mut b = Backoff::new(BackoffPolicy::Adaptive);
        for _ in 0..400 {
            b.pause();
        }
        assert!(b.stage > 0);
        b.reset();
        assert_eq!(b.stage, 0);
    }
}
