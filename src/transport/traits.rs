//! The capability interface callers program against.

use super::error::{TransportError, TransportResult};
use crate::port::{ClearTarget, OpenFlags};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared cancellation flag.
///
/// Clones observe the same flag, so a handle taken before a blocking wait can
/// interrupt it from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of any pending wait.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Byte-oriented serial transport.
///
/// One owner drives an instance at a time; the only cross-thread signal is
/// cancellation through [`CancelHandle`]. Transfers report byte counts rather
/// than errors so the caller decides whether a short transfer is fatal.
pub trait SerialRxTx: Send + fmt::Debug {
    /// Record port name, baud rate and flags for a later [`open`](Self::open).
    ///
    /// Never touches hardware, and may be called whether open or closed.
    fn bind(&mut self, port_name: &str, baud_rate: u32, flags: OpenFlags) -> TransportResult<()>;

    /// Open the bound port.
    fn open(&mut self) -> TransportResult<()>;

    /// Open `port_name` with explicit parameters, closing any open channel first.
    ///
    /// On failure the transport is left closed.
    fn open_with(
        &mut self,
        port_name: &str,
        baud_rate: u32,
        flags: OpenFlags,
    ) -> TransportResult<()>;

    /// Release the channel. Idempotent.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Write as much of `data` as the channel accepts; returns the count written.
    fn send(&mut self, data: &[u8]) -> usize;

    /// Like [`send`](Self::send), but a short write is an error.
    fn send_all(&mut self, data: &[u8]) -> TransportResult<()> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        let written = self.send(data);
        if written < data.len() {
            return Err(TransportError::PartialTransfer {
                written,
                requested: data.len(),
            });
        }
        Ok(())
    }

    /// One non-blocking read attempt; returns the count read (0 on any failure).
    fn receive(&mut self, buffer: &mut [u8]) -> usize;

    /// Best-effort discard of buffered bytes.
    fn flush(&mut self, target: ClearTarget);

    /// Byte count of the most recent [`send`](Self::send).
    fn wait_for_sent(&self, timeout: Duration) -> usize;

    /// Byte count of the most recent [`receive`](Self::receive).
    fn wait_for_received(&self, timeout: Duration) -> TransportResult<usize>;

    /// Block until at least `target` bytes are queued, or `timeout` elapses.
    ///
    /// Returns the queued count on success.
    fn wait_for_data(&mut self, target: usize, timeout: Duration) -> TransportResult<usize>;

    /// Bytes currently queued for reading; 0 when closed.
    fn rx_queue_count(&self) -> usize;

    /// Ask a pending [`wait_for_data`](Self::wait_for_data) to give up.
    fn cancel(&self);

    /// Handle sharing this transport's cancellation flag.
    fn cancel_handle(&self) -> CancelHandle;
}
