//! Construction and release of transports behind the capability interface.
//!
//! Callers that only hold a `Box<dyn SerialRxTx>` never depend on which OS
//! binding sits underneath.

use crate::port::{NativeOpener, PortOpener};
use crate::transport::{RawSerial, SerialRxTx};

/// Create a closed transport over the operating system's serial ports.
pub fn create_rxtx() -> Box<dyn SerialRxTx> {
    create_rxtx_with(NativeOpener)
}

/// Create a closed transport that opens channels through `opener`.
pub fn create_rxtx_with(opener: impl PortOpener + 'static) -> Box<dyn SerialRxTx> {
    Box::new(RawSerial::new(opener))
}

/// Close and destroy a transport.
///
/// Equivalent to dropping it; spelled out for callers that pair every
/// `create` with an explicit release.
pub fn release_rxtx(mut rxtx: Box<dyn SerialRxTx>) {
    rxtx.close();
}
