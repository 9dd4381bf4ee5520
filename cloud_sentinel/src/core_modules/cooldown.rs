// THEORY:
// The `CooldownGate` is the sentinel's rate limiter: a fixed-interval, two-state
// machine that decides, on every frame tick, whether enough time has passed to
// spend another call on the vision model.
//
//   Idle --(elapsed >= cooldown)--> Sampling --(complete)--> Idle
//
// The gate starts `Idle` with no reference time, which counts as "cooldown
// already elapsed", so the very first frame is always analysed. It does not
// back off on errors and does not batch missed samples. Time is passed in by
// the caller, which keeps the gate a pure, testable state machine.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Waiting out the cooldown.
    Idle,
    /// A sample was granted and has not been completed yet.
    Sampling,
}

/// The gate's verdict for one frame tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    /// Analyse this frame now.
    Sample,
    /// Keep waiting. `progress` is the clamped fraction of the cooldown elapsed.
    Wait { progress: f64 },
}

#[derive(Debug, Clone)]
pub struct CooldownGate {
    cooldown: Duration,
    /// When the last sample was granted (or completed). `None` until the first one.
    last_sample: Option<Instant>,
    state: GateState,
}

impl CooldownGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_sample: None,
            state: GateState::Idle,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn last_sample(&self) -> Option<Instant> {
        self.last_sample
    }

    /// Time since the reference point, or `None` before the first sample.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.last_sample.map(|last| now.saturating_duration_since(last))
    }

    /// Fraction of the cooldown that has elapsed, clamped into `[0.0, 1.0]`.
    pub fn progress(&self, now: Instant) -> f64 {
        let Some(elapsed) = self.elapsed(now) else {
            return 1.0;
        };
        if self.cooldown.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f64() / self.cooldown.as_secs_f64()).clamp(0.0, 1.0)
    }

    fn is_due(&self, now: Instant) -> bool {
        match self.elapsed(now) {
            None => true,
            Some(elapsed) => elapsed >= self.cooldown,
        }
    }

    /// Decides whether the frame seen at `now` should be analysed. Granting a
    /// sample moves the reference time to `now`.
    pub fn tick(&mut self, now: Instant) -> Tick {
        if self.is_due(now) {
            self.state = GateState::Sampling;
            self.last_sample = Some(now);
            Tick::Sample
        } else {
            self.state = GateState::Idle;
            Tick::Wait {
                progress: self.progress(now),
            }
        }
    }

    /// Ends a granted sample. The reference time moves to `now`, so a slow
    /// analysis pushes the next eligible tick back by its own duration.
    pub fn complete(&mut self, now: Instant) {
        self.state = GateState::Idle;
        self.last_sample = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn first_tick_always_samples() {
        let t0 = Instant::now();
        let mut gate = CooldownGate::new(secs(15));
        assert_eq!(gate.state(), GateState::Idle);
        assert_eq!(gate.progress(t0), 1.0);
        assert_eq!(gate.tick(t0), Tick::Sample);
        assert_eq!(gate.state(), GateState::Sampling);
        assert_eq!(gate.last_sample(), Some(t0));
    }

    #[test]
    fn ticks_inside_the_cooldown_wait() {
        let t0 = Instant::now();
        let mut gate = CooldownGate::new(secs(15));
        gate.tick(t0);

        match gate.tick(t0 + secs(10)) {
            Tick::Wait { progress } => assert!((progress - 10.0 / 15.0).abs() < 1e-9),
            other => panic!("expected wait, got {other:?}"),
        }
        assert_eq!(gate.state(), GateState::Idle);
        assert_eq!(gate.last_sample(), Some(t0));
    }

    #[test]
    fn tick_at_the_boundary_samples_and_resets_reference() {
        let t0 = Instant::now();
        let mut gate = CooldownGate::new(secs(15));
        gate.tick(t0);

        assert_eq!(gate.tick(t0 + secs(15)), Tick::Sample);
        assert_eq!(gate.last_sample(), Some(t0 + secs(15)));
        assert!(matches!(gate.tick(t0 + secs(20)), Tick::Wait { .. }));
        assert_eq!(gate.tick(t0 + secs(31)), Tick::Sample);
    }

    #[test]
    fn progress_is_clamped() {
        let t0 = Instant::now();
        let mut gate = CooldownGate::new(secs(15));
        gate.tick(t0);
        assert_eq!(gate.progress(t0 + secs(40)), 1.0);
        assert_eq!(gate.progress(t0), 0.0);
    }

    #[test]
    fn clock_going_backwards_is_zero_progress() {
        let t0 = Instant::now() + secs(100);
        let mut gate = CooldownGate::new(secs(15));
        gate.tick(t0);
        assert_eq!(gate.progress(t0 - secs(5)), 0.0);
        assert!(matches!(gate.tick(t0 - secs(5)), Tick::Wait { .. }));
    }

    #[test]
    fn complete_moves_reference_to_completion_time() {
        let t0 = Instant::now();
        let mut gate = CooldownGate::new(secs(15));
        gate.tick(t0);
        // A slow analysis finishing 8s later delays the next sample.
        gate.complete(t0 + secs(8));
        assert_eq!(gate.state(), GateState::Idle);
        assert!(matches!(gate.tick(t0 + secs(15)), Tick::Wait { .. }));
        assert_eq!(gate.tick(t0 + secs(23)), Tick::Sample);
    }

    #[test]
    fn zero_cooldown_samples_every_tick() {
        let t0 = Instant::now();
        let mut gate = CooldownGate::new(Duration::ZERO);
        for i in 0..5 {
            assert_eq!(gate.tick(t0 + Duration::from_millis(i)), Tick::Sample);
            gate.complete(t0 + Duration::from_millis(i));
        }
    }
}
