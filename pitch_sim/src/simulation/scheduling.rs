// pitch_sim/src/simulation/scheduling.rs

//! Time sources that drive a [`Simulator`]: a wall-clock driver for live use
//! and a fixed-step driver for deterministic runs.

use bevy::prelude::*;
use pitch_core::types::{secs_to_nanos, Nanos, NANOS_PER_MILLI};
use std::time::{Duration, Instant};

use crate::simulation::config::TimingConfig;
use crate::simulation::simulator::Simulator;

/// Simulation time as the consumers see it. Only moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VirtualClock {
    now: Nanos,
}

impl VirtualClock {
    pub fn new(now: Nanos) -> Self {
        Self { now }
    }

    pub fn now(&self) -> Nanos {
        self.now
    }

    pub fn advance(&mut self, delta: Nanos) {
        self.now += delta.max(0);
    }
}

/// Decides when the next tick happens and how far the clock moves.
pub trait TickSource {
    /// Moves `clock` to the time of the next tick. Returns false if no tick
    /// should run.
    fn advance(&mut self, clock: &mut VirtualClock, scaling: f64) -> bool;

    /// Runs one tick if the simulator is running and a tick is due.
    fn tick(&mut self, simulator: &mut Simulator) -> bool {
        if !simulator.is_running() {
            return false;
        }
        let scaling = simulator.scaling();
        if !self.advance(simulator.clock_mut(), scaling) {
            return false;
        }
        simulator.process();
        true
    }
}

// =========================================================================
// == Fixed Steps ==
// =========================================================================

/// Advances the clock by a fixed period per tick, independent of the wall
/// clock and of the scaling.
#[derive(Debug, Clone, Copy)]
pub struct StepDriver {
    period: Nanos,
}

impl StepDriver {
    pub fn new(period: Nanos) -> Self {
        Self {
            period: period.max(1),
        }
    }

    pub fn from_config(timing: &TimingConfig) -> Self {
        Self::new(timing.tick_nanos())
    }

    pub fn period(&self) -> Nanos {
        self.period
    }

    /// Runs ticks until `delta` of simulated time has passed.
    pub fn go_delta(&mut self, simulator: &mut Simulator, delta: Nanos) {
        self.go_delta_with(simulator, delta, delta.max(1), |_| {});
    }

    /// Like [`Self::go_delta`], calling `callback` at the start and then every
    /// `interval` of simulated time, including at the very end.
    pub fn go_delta_with<F>(
        &mut self,
        simulator: &mut Simulator,
        delta: Nanos,
        interval: Nanos,
        mut callback: F,
    ) where
        F: FnMut(&mut Simulator),
    {
        let interval = interval.max(1);
        let end = simulator.now() + delta;
        let mut next_callback = simulator.now();
        loop {
            while next_callback <= simulator.now() {
                callback(simulator);
                next_callback += interval;
            }
            if simulator.now() >= end || !self.tick(simulator) {
                break;
            }
        }
    }
}

impl TickSource for StepDriver {
    fn advance(&mut self, clock: &mut VirtualClock, _scaling: f64) -> bool {
        clock.advance(self.period);
        true
    }
}

// =========================================================================
// == Wall Clock ==
// =========================================================================

/// Advances the clock by the elapsed wall time times the scaling.
#[derive(Debug, Default)]
pub struct RealtimeDriver {
    last_wall: Option<Instant>,
}

impl RealtimeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wall time between ticks. Faster simulation ticks more often, but never
    /// more than once per millisecond.
    pub fn period(scaling: f64) -> Duration {
        let base = Duration::from_nanos(5 * NANOS_PER_MILLI as u64);
        if scaling <= 0.0 {
            return base;
        }
        base.div_f64(scaling).max(Duration::from_millis(1))
    }

    /// Ticks for `duration` of wall time, calling `on_tick` after each tick.
    pub fn run_for<F>(&mut self, simulator: &mut Simulator, duration: Duration, mut on_tick: F)
    where
        F: FnMut(&mut Simulator),
    {
        let deadline = Instant::now() + duration;
        while Instant::now() < deadline {
            if self.tick(simulator) {
                on_tick(simulator);
            }
            std::thread::sleep(Self::period(simulator.scaling()));
        }
        debug!("Realtime run ended at {} ns", simulator.now());
    }
}

impl TickSource for RealtimeDriver {
    fn advance(&mut self, clock: &mut VirtualClock, scaling: f64) -> bool {
        if scaling <= 0.0 {
            self.last_wall = None;
            return false;
        }
        let now = Instant::now();
        if let Some(last) = self.last_wall {
            let elapsed = now.duration_since(last).as_secs_f64();
            clock.advance(secs_to_nanos(elapsed * scaling));
        }
        self.last_wall = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_clock_never_moves_back() {
        let mut clock = VirtualClock::new(10);
        clock.advance(-5);
        assert_eq!(clock.now(), 10);
        clock.advance(5);
        assert_eq!(clock.now(), 15);
    }

    #[test]
    fn test_realtime_period_follows_scaling() {
        assert_eq!(RealtimeDriver::period(1.0), Duration::from_millis(5));
        assert_eq!(RealtimeDriver::period(2.0), Duration::from_micros(2_500));
        assert_eq!(RealtimeDriver::period(100.0), Duration::from_millis(1));
        assert_eq!(RealtimeDriver::period(0.5), Duration::from_millis(10));
    }

    #[test]
    fn test_paused_realtime_driver_does_not_tick() {
        let mut driver = RealtimeDriver::new();
        let mut clock = VirtualClock::default();
        assert!(!driver.advance(&mut clock, 0.0));
        assert!(driver.advance(&mut clock, 1.0));
        assert_eq!(clock.now(), 0);
    }
}
