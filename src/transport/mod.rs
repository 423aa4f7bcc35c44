//! Serial transport: lifecycle, transfers and the adaptive bounded wait.

pub mod error;
pub mod raw_serial;
pub mod traits;

pub use error::{TransportError, TransportResult};
pub use raw_serial::{transfer_time, RawSerial, DEFAULT_CANCEL_POLL, MAX_PORT_NAME_LEN};
pub use traits::{CancelHandle, SerialRxTx};
