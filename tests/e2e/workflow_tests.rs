//! Lifecycle and transfer workflows.

use crate::common::{open_sim, SIM_PORT};
use pretty_assertions::assert_eq;
use raw_serial::port::{ClearTarget, MockSerialPort, OpenFlags, PortConfiguration};
use raw_serial::{create_rxtx_with, release_rxtx, SerialRxTx, TransportError};
use std::time::Duration;

#[test]
fn test_full_session() {
    // Arrange
    let (device, mut rxtx) = open_sim(115200);

    // Act: request / response exchange
    assert_eq!(rxtx.send(&[0xA5, 0x20]), 2);
    device.enqueue_read(&[0xA5, 0x5A, 0x05, 0x00, 0x00, 0x40, 0x81]);
    let queued = rxtx.wait_for_data(7, Duration::from_millis(200)).unwrap();

    let mut response = vec![0u8; queued];
    let n = rxtx.receive(&mut response);

    // Assert
    assert_eq!(device.written_bytes(), vec![0xA5, 0x20]);
    assert_eq!(n, 7);
    assert_eq!(response, vec![0xA5, 0x5A, 0x05, 0x00, 0x00, 0x40, 0x81]);
    assert_eq!(rxtx.wait_for_sent(Duration::ZERO), 2);
    assert_eq!(rxtx.wait_for_received(Duration::ZERO).unwrap(), 7);

    release_rxtx(rxtx);
    assert_eq!(device.open_handles(), 0);
}

#[test]
fn test_empty_send_does_not_touch_channel() {
    let (device, mut rxtx) = open_sim(115200);

    assert_eq!(rxtx.send(&[]), 0);
    assert!(device.get_write_log().is_empty());
}

#[test]
fn test_closed_transport_is_inert() {
    let device = MockSerialPort::new(SIM_PORT);
    let mut rxtx = create_rxtx_with(device.clone());
    device.enqueue_read(b"pending");

    let mut buffer = [0u8; 16];
    assert_eq!(rxtx.receive(&mut buffer), 0);
    assert_eq!(rxtx.rx_queue_count(), 0);
    assert_eq!(rxtx.send(b"data"), 0);
    rxtx.flush(ClearTarget::All);

    assert!(device.get_write_log().is_empty());
    assert_eq!(device.available_bytes(), 7);
    assert!(matches!(
        rxtx.wait_for_received(Duration::ZERO),
        Err(TransportError::NotOpen)
    ));
    assert!(matches!(rxtx.send_all(b"data"), Err(TransportError::NotOpen)));
}

#[test]
fn test_close_twice_is_same_as_once() {
    let (device, mut rxtx) = open_sim(115200);

    rxtx.close();
    assert!(!rxtx.is_open());
    assert_eq!(device.open_handles(), 0);

    rxtx.close();
    assert!(!rxtx.is_open());
    assert_eq!(device.open_handles(), 0);
}

#[test]
fn test_reopen_replaces_channel() {
    // Arrange
    let (device, mut rxtx) = open_sim(115200);
    device.enqueue_read(b"old");

    // Act
    rxtx.open_with(SIM_PORT, 9600, OpenFlags::from_bits(1)).unwrap();

    // Assert: one live handle, new parameters, stale bytes discarded
    assert!(rxtx.is_open());
    assert_eq!(device.open_handles(), 1);
    assert_eq!(device.open_count(), 2);
    assert_eq!(
        device.last_config(),
        Some(PortConfiguration::new(9600, OpenFlags::from_bits(1)))
    );
    assert_eq!(rxtx.rx_queue_count(), 0);
}

#[test]
fn test_open_failure_leaves_transport_closed() {
    let (device, mut rxtx) = open_sim(115200);

    device.set_fail_configure(true);
    let err = rxtx.open().unwrap_err();
    assert!(err.is_device_error());
    assert!(!rxtx.is_open());
    assert_eq!(device.open_handles(), 0);

    device.set_fail_configure(false);
    device.set_fail_open(true);
    assert!(matches!(rxtx.open(), Err(TransportError::Device(_))));
    assert!(!rxtx.is_open());

    device.set_fail_open(false);
    rxtx.open().unwrap();
    assert!(rxtx.is_open());
}

#[test]
fn test_open_unknown_port() {
    let device = MockSerialPort::new(SIM_PORT);
    let mut rxtx = create_rxtx_with(device);

    let err = rxtx.open_with("COM-MISSING", 115200, OpenFlags::NONE).unwrap_err();
    assert!(matches!(err, TransportError::Device(raw_serial::PortError::NotFound(_))));
    assert!(!rxtx.is_open());
}

#[test]
fn test_zero_baud_rejected() {
    let (device, mut rxtx) = open_sim(115200);

    assert!(matches!(
        rxtx.bind(SIM_PORT, 0, OpenFlags::NONE),
        Err(TransportError::InvalidConfig(_))
    ));
    assert!(matches!(
        rxtx.open_with(SIM_PORT, 0, OpenFlags::NONE),
        Err(TransportError::InvalidConfig(_))
    ));
    assert!(!rxtx.is_open());
    assert_eq!(device.open_handles(), 0);
}

#[test]
fn test_send_all_reports_partial_transfer() {
    let (device, mut rxtx) = open_sim(115200);
    device.set_write_budget(Some(3));

    let err = rxtx.send_all(b"abcdef").unwrap_err();
    match err {
        TransportError::PartialTransfer { written, requested } => {
            assert_eq!(written, 3);
            assert_eq!(requested, 6);
        }
        other => panic!("expected PartialTransfer, got {:?}", other),
    }
    assert_eq!(rxtx.wait_for_sent(Duration::ZERO), 3);

    device.set_write_budget(None);
    rxtx.send_all(b"gh").unwrap();
    assert_eq!(device.written_bytes(), b"abcgh".to_vec());
}

#[test]
fn test_send_loops_over_short_writes() {
    let (device, mut rxtx) = open_sim(115200);
    device.set_write_chunk(Some(3));

    assert_eq!(rxtx.send(b"0123456789"), 10);
    assert_eq!(device.get_write_log().len(), 4);
    assert_eq!(device.written_bytes(), b"0123456789".to_vec());
}

#[test]
fn test_receive_error_counts_as_zero() {
    let (device, mut rxtx) = open_sim(115200);
    device.enqueue_read(b"abc");
    device.set_should_timeout(true);

    let mut buffer = [0u8; 8];
    assert_eq!(rxtx.receive(&mut buffer), 0);
    assert_eq!(rxtx.wait_for_received(Duration::ZERO).unwrap(), 0);
    assert_eq!(rxtx.receive(&mut buffer), 3);
}

#[test]
fn test_flush_discards_input() {
    let (device, mut rxtx) = open_sim(115200);
    device.reset_cleared_flag();
    device.enqueue_read(b"noise");

    rxtx.flush(ClearTarget::Output);
    assert_eq!(rxtx.rx_queue_count(), 5);

    rxtx.flush(ClearTarget::All);
    assert!(device.was_cleared());
    assert_eq!(rxtx.rx_queue_count(), 0);
}

#[test]
fn test_bind_does_not_reopen() {
    let (device, mut rxtx) = open_sim(115200);

    rxtx.bind(SIM_PORT, 9600, OpenFlags::NONE).unwrap();
    assert_eq!(device.open_count(), 1);
    assert_eq!(device.last_config().map(|c| c.baud_rate), Some(115200));

    rxtx.open().unwrap();
    assert_eq!(device.open_count(), 2);
    assert_eq!(device.last_config().map(|c| c.baud_rate), Some(9600));
}
