//! Tests for Clock and the event kernel's use of it

use pifo_sim_core::sim::{Kernel, Stage};
use pifo_sim_core::Clock;

#[test]
fn test_clock_new() {
    let clock = Clock::new(1, 5.0);
    assert_eq!(clock.now(), 0);
    assert_eq!(clock.current_tick(), 0);
    assert_eq!(clock.period(), 1);
    assert_eq!(clock.ns_per_cycle(), 5.0);
}

#[test]
fn test_advance_never_rewinds() {
    let mut clock = Clock::new(2, 5.0);
    clock.advance_to(10);
    clock.advance_to(4);
    assert_eq!(clock.now(), 10);
    assert_eq!(clock.current_tick(), 5);
    assert_eq!(clock.next_edge(), 12);
}

#[test]
fn test_cycles_to_ns() {
    let clock = Clock::new(1, 5.0);
    assert_eq!(clock.cycles_to_ns(200), 1000.0);
}

#[test]
fn test_transmit_cycles_rounds_to_nearest() {
    let clock = Clock::new(1, 5.0);
    // 1500 B at 10 Gbps = 1200 ns = 240 cycles
    assert_eq!(clock.transmit_cycles(1500, 10.0), 240);
    // 64 B at 100 Gbps = 5.12 ns = 1.024 cycles
    assert_eq!(clock.transmit_cycles(64, 100.0), 1);
    // 64 B at 40 Gbps = 12.8 ns = 2.56 cycles
    assert_eq!(clock.transmit_cycles(64, 40.0), 3);
    assert_eq!(clock.transmit_cycles(64, 0.0), 0);
}

#[test]
#[should_panic(expected = "period must be positive")]
fn test_zero_period_panics() {
    Clock::new(0, 5.0);
}

#[test]
fn test_kernel_tick_waits_follow_period() {
    let mut kernel = Kernel::new(Clock::new(3, 5.0));
    kernel.wait_ticks(Stage::Stats, 1);
    kernel.wait_ticks(Stage::Monitor, 2);
    kernel.wait_cycles(Stage::Read, 4);

    let mut seen = Vec::new();
    while let Some(stage) = kernel.advance() {
        seen.push((kernel.now(), stage));
    }
    assert_eq!(
        seen,
        vec![(3, Stage::Stats), (4, Stage::Read), (6, Stage::Monitor)]
    );
    assert_eq!(kernel.clock().current_tick(), 2);
}
