//! Time management for the simulation
//!
//! The simulation advances in discrete cycles. A clock tick spans `period`
//! cycles, and every cycle stands for a fixed number of nanoseconds of wall
//! time. This module provides deterministic time advancement and the
//! conversions between bytes on a link and cycles.

use serde::{Deserialize, Serialize};

/// Virtual time unit of the simulation.
pub type Cycle = u64;

/// Manages simulation time in discrete cycles and clock ticks
///
/// # Example
/// ```
/// use pifo_sim_core::Clock;
///
/// let mut clock = Clock::new(1, 5.0); // 1 cycle per tick, 5 ns per cycle
/// assert_eq!(clock.now(), 0);
///
/// clock.advance_to(3);
/// assert_eq!(clock.now(), 3);
/// assert_eq!(clock.next_edge(), 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clock {
    /// Cycles elapsed since simulation start
    now: Cycle,
    /// Number of cycles in one clock tick
    period: Cycle,
    /// Wall-clock nanoseconds represented by one cycle
    ns_per_cycle: f64,
}

impl Clock {
    /// Create a new Clock
    ///
    /// # Arguments
    /// * `period` - Cycles per clock tick
    /// * `ns_per_cycle` - Nanoseconds represented by one cycle
    ///
    /// # Panics
    /// Panics if `period` is zero or `ns_per_cycle` is not positive.
    pub fn new(period: Cycle, ns_per_cycle: f64) -> Self {
        assert!(period > 0, "period must be positive");
        assert!(ns_per_cycle > 0.0, "ns_per_cycle must be positive");
        Self {
            now: 0,
            period,
            ns_per_cycle,
        }
    }

    /// Move time forward to `cycle`
    ///
    /// Time never runs backwards; an earlier cycle is ignored.
    pub fn advance_to(&mut self, cycle: Cycle) {
        self.now = self.now.max(cycle);
    }

    /// Current cycle
    pub fn now(&self) -> Cycle {
        self.now
    }

    /// Number of whole ticks elapsed
    ///
    /// # Example
    /// ```
    /// use pifo_sim_core::Clock;
    ///
    /// let mut clock = Clock::new(4, 5.0);
    /// clock.advance_to(9);
    /// assert_eq!(clock.current_tick(), 2);
    /// ```
    pub fn current_tick(&self) -> u64 {
        self.now / self.period
    }

    /// Cycle at which a stage waiting one tick from now resumes
    pub fn next_edge(&self) -> Cycle {
        self.now + self.period
    }

    /// Cycles per tick
    pub fn period(&self) -> Cycle {
        self.period
    }

    /// Nanoseconds per cycle
    pub fn ns_per_cycle(&self) -> f64 {
        self.ns_per_cycle
    }

    /// Convert a cycle count into nanoseconds
    pub fn cycles_to_ns(&self, cycles: Cycle) -> f64 {
        cycles as f64 * self.ns_per_cycle
    }

    /// Cycles needed to serialize `len_bytes` onto a link of `gbps`
    ///
    /// Rounded to the nearest cycle; a zero or negative rate means the link
    /// is not modelled and costs no time.
    ///
    /// # Example
    /// ```
    /// use pifo_sim_core::Clock;
    ///
    /// let clock = Clock::new(1, 5.0);
    /// // 100 bytes at 4 Gbps = 200 ns = 40 cycles
    /// assert_eq!(clock.transmit_cycles(100, 4.0), 40);
    /// ```
    pub fn transmit_cycles(&self, len_bytes: usize, gbps: f64) -> Cycle {
        if gbps <= 0.0 {
            return 0;
        }
        let ns = len_bytes as f64 * 8.0 / gbps;
        (ns / self.ns_per_cycle + 0.5) as Cycle
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(1, 5.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "period must be positive")]
    fn test_zero_period_panics() {
        Clock::new(0, 5.0);
    }

    #[test]
    fn test_advance_never_rewinds() {
        let mut clock = Clock::default();
        clock.advance_to(10);
        clock.advance_to(4);
        assert_eq!(clock.now(), 10);
    }
}
