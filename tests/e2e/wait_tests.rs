//! Bounded wait-for-data behaviour.

use crate::common::{assert_elapsed_within, open_sim, open_sim_raw, timed, SIM_PORT};
use raw_serial::port::MockSerialPort;
use raw_serial::{create_rxtx_with, SerialRxTx, TransportError};
use std::thread;
use std::time::Duration;

#[test]
fn test_data_already_queued_returns_immediately() {
    // Arrange
    let (device, mut rxtx) = open_sim(115200);
    device.enqueue_read(&[0u8; 32]);

    // Act / Assert: every target up to the queued count succeeds at once
    for target in [0, 1, 16, 32] {
        let (result, elapsed) = timed(|| rxtx.wait_for_data(target, Duration::from_secs(5)));
        assert_eq!(result.unwrap(), 32);
        assert!(elapsed < Duration::from_millis(50), "took {:?}", elapsed);
    }
}

#[test]
fn test_injected_bytes_satisfy_wait_before_deadline() {
    // Arrange
    let device = MockSerialPort::new(SIM_PORT);
    let mut rxtx = create_rxtx_with(device.clone());
    rxtx.bind(SIM_PORT, 115200, Default::default()).unwrap();
    rxtx.open().unwrap();

    // Act
    device.enqueue_read(b"0123456789");
    let (result, elapsed) = timed(|| rxtx.wait_for_data(10, Duration::from_millis(1000)));

    // Assert
    assert_eq!(result.unwrap(), 10);
    assert!(elapsed < Duration::from_millis(500), "took {:?}", elapsed);
}

#[test]
fn test_bytes_arriving_later_wake_the_wait() {
    let (device, mut rxtx) = open_sim(115200);

    let feeder = device.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        feeder.enqueue_read(b"0123456789");
    });

    let (result, elapsed) = timed(|| rxtx.wait_for_data(10, Duration::from_millis(1000)));
    assert_eq!(result.unwrap(), 10);
    assert_elapsed_within(elapsed, Duration::from_millis(25), Duration::from_millis(500));
    handle.join().unwrap();
}

#[test]
fn test_empty_channel_times_out() {
    let (_device, mut rxtx) = open_sim(115200);

    let (result, elapsed) = timed(|| rxtx.wait_for_data(5, Duration::from_millis(50)));

    assert!(matches!(result, Err(TransportError::Timeout(t)) if t == Duration::from_millis(50)));
    assert_elapsed_within(elapsed, Duration::from_millis(50), Duration::from_millis(50));
    assert_eq!(rxtx.rx_queue_count(), 0);
}

#[test]
fn test_source_that_never_completes_times_out() {
    // Some bytes arrive, but never enough.
    let (device, mut rxtx) = open_sim(9600);
    device.enqueue_read(b"abc");

    let feeder = device.clone();
    let handle = thread::spawn(move || {
        for _ in 0..5 {
            thread::sleep(Duration::from_millis(10));
            feeder.enqueue_read(b"x");
        }
    });

    let (result, elapsed) = timed(|| rxtx.wait_for_data(100, Duration::from_millis(120)));
    assert!(matches!(result, Err(TransportError::Timeout(_))));
    assert_elapsed_within(elapsed, Duration::from_millis(120), Duration::from_millis(120));
    handle.join().unwrap();
}

#[test]
fn test_partial_arrival_uses_line_rate_sleep() {
    // 4 of 8 bytes queued at 9600 baud: the rest needs ~3.3ms on the wire.
    let (device, mut rxtx) = open_sim_raw(9600);
    device.enqueue_read(b"abcd");

    let feeder = device.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        feeder.enqueue_read(b"efgh");
    });

    let (result, elapsed) = timed(|| rxtx.wait_for_data(8, Duration::from_secs(2)));
    assert_eq!(result.unwrap(), 8);
    assert!(elapsed < Duration::from_millis(500), "took {:?}", elapsed);
    handle.join().unwrap();
}

#[test]
fn test_closed_transport_reports_device_error() {
    let (_device, mut rxtx) = open_sim(115200);
    rxtx.close();

    let (result, elapsed) = timed(|| rxtx.wait_for_data(1, Duration::from_secs(1)));
    let err = result.unwrap_err();
    assert!(matches!(err, TransportError::NotOpen));
    assert!(err.is_device_error());
    assert!(elapsed < Duration::from_millis(50));
}

#[test]
fn test_query_failure_reports_device_error() {
    let (device, mut rxtx) = open_sim(115200);
    device.set_fail_queries(true);

    let err = rxtx.wait_for_data(1, Duration::from_millis(100)).unwrap_err();
    assert!(matches!(err, TransportError::Device(_)));
    assert_eq!(rxtx.rx_queue_count(), 0);
}
