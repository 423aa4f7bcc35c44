//! Port abstraction layer for serial communication.
//!
//! Wraps the raw I/O primitives (open, read, write, queued-count query,
//! readiness wait, buffer discard) behind traits so the transport can be
//! driven by real hardware or by a simulated device.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::{MockChannel, MockSerialPort};
pub use sync_port::{NativeOpener, SyncSerialPort};
pub use traits::*;
