//! Raw serial line transport.
//!
//! A byte-oriented transport for device driver stacks (ranging sensors,
//! lidars, other UART peripherals) that exchange raw bytes over a character
//! device. It covers the port lifecycle (bind, open, close), non-blocking
//! transfers and a bounded wait-for-data that pairs readiness notification
//! with sleeps sized from the baud rate.
//!
//! # Modules
//!
//! - `port`: channel abstraction over the OS binding, plus a simulated device
//! - `transport`: the `SerialRxTx` interface and its `RawSerial` implementation
//! - `factory`: creation and release behind `Box<dyn SerialRxTx>`
//! - `config`: Configuration management with TOML support
//! - `logging`: `tracing` subscriber setup
//!
//! # Example
//!
//! ```
//! use raw_serial::port::{MockSerialPort, OpenFlags};
//! use raw_serial::{create_rxtx_with, release_rxtx, SerialRxTx};
//! use std::time::Duration;
//!
//! let device = MockSerialPort::new("COM-SIM");
//! let mut rxtx = create_rxtx_with(device.clone());
//! rxtx.bind("COM-SIM", 115200, OpenFlags::NONE)?;
//! rxtx.open()?;
//!
//! device.enqueue_read(&[0xA5, 0x5A, 0x05, 0x00, 0x00]);
//! let queued = rxtx.wait_for_data(5, Duration::from_millis(100))?;
//! assert_eq!(queued, 5);
//!
//! let mut header = [0u8; 5];
//! assert_eq!(rxtx.receive(&mut header), 5);
//! release_rxtx(rxtx);
//! # Ok::<(), raw_serial::TransportError>(())
//! ```

pub mod config;
pub mod factory;
pub mod logging;
pub mod port;
pub mod transport;

// Re-export commonly used types for convenience
pub use factory::{create_rxtx, create_rxtx_with, release_rxtx};
pub use port::{
    ClearTarget, MockSerialPort, NativeOpener, OpenFlags, PortConfiguration, PortError,
    PortOpener, SerialPortAdapter, SyncSerialPort,
};
pub use transport::{CancelHandle, RawSerial, SerialRxTx, TransportError, TransportResult};

pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
