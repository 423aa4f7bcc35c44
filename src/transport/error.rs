//! Caller-facing transport errors.

use crate::port::PortError;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by [`SerialRxTx`](super::SerialRxTx) operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Operation requires an open channel, but the transport is closed.
    #[error("Operation requires an open serial port, but the port is closed")]
    NotOpen,

    /// `open()` was called without a prior `bind()`.
    #[error("No port has been bound")]
    NotBound,

    /// Rejected port name or baud rate.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The channel layer failed (open, configuration, queue query, readiness wait).
    #[error("Device error: {0}")]
    Device(#[from] PortError),

    /// The deadline elapsed before enough data was queued.
    #[error("Timed out after {0:?} waiting for data")]
    Timeout(Duration),

    /// A cancellation was requested while waiting.
    #[error("Operation cancelled")]
    Cancelled,

    /// Fewer bytes than requested were written.
    #[error("Partial transfer: wrote {written} of {requested} bytes")]
    PartialTransfer { written: usize, requested: usize },
}

impl TransportError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether this belongs to the device-error class: the channel is
    /// missing or the hardware/driver call itself failed.
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::NotOpen | Self::Device(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
