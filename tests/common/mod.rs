//! Shared test utilities for raw_serial tests.
//!
//! This module provides common test infrastructure including:
//! - Simulated devices with an already opened transport
//! - Timing assertions for the blocking wait

#![allow(dead_code)]

use raw_serial::port::{MockSerialPort, OpenFlags};
use raw_serial::{create_rxtx_with, RawSerial, SerialRxTx};
use std::time::{Duration, Instant};

/// Name every simulated device in the suite answers to.
pub const SIM_PORT: &str = "COM-SIM";

/// Slack allowed on top of a deadline for scheduling jitter.
pub const SCHEDULING_SLACK: Duration = Duration::from_millis(150);

/// Create a simulated device and a transport opened on it.
pub fn open_sim(baud_rate: u32) -> (MockSerialPort, Box<dyn SerialRxTx>) {
    let device = MockSerialPort::new(SIM_PORT);
    let mut rxtx = create_rxtx_with(device.clone());
    rxtx.bind(SIM_PORT, baud_rate, OpenFlags::NONE)
        .expect("bind simulated port");
    rxtx.open().expect("open simulated port");
    (device, rxtx)
}

/// Same as [`open_sim`], but keeps the concrete type.
pub fn open_sim_raw(baud_rate: u32) -> (MockSerialPort, RawSerial) {
    let device = MockSerialPort::new(SIM_PORT);
    let mut rxtx = RawSerial::new(device.clone());
    rxtx.open_with(SIM_PORT, baud_rate, OpenFlags::NONE)
        .expect("open simulated port");
    (device, rxtx)
}

/// Run `f` and return its result together with the elapsed time.
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let value = f();
    (value, start.elapsed())
}

/// Assert that `elapsed` lies in `[lower, upper + SCHEDULING_SLACK]`.
pub fn assert_elapsed_within(elapsed: Duration, lower: Duration, upper: Duration) {
    assert!(
        elapsed >= lower,
        "returned after {:?}, expected at least {:?}",
        elapsed,
        lower
    );
    assert!(
        elapsed <= upper + SCHEDULING_SLACK,
        "returned after {:?}, expected at most {:?} (+{:?} slack)",
        elapsed,
        upper,
        SCHEDULING_SLACK
    );
}
