//! Core traits for serial channel abstraction.
//!
//! `PortOpener` acquires and configures a channel; `SerialPortAdapter` is the
//! open channel handle itself. Real hardware and the simulated device both
//! implement them, so the transport never depends on a concrete OS binding.

use super::error::PortError;
use std::fmt;
use std::time::Duration;

/// Opaque configuration bitmask handed through to hardware setup.
///
/// No bits are interpreted by the bundled openers; the value is reserved for
/// raw-mode and parity options of bindings that need them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OpenFlags(u32);

impl OpenFlags {
    /// No options.
    pub const NONE: OpenFlags = OpenFlags(0);

    pub const fn from_bits(bits: u32) -> Self {
        OpenFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: OpenFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl From<u32> for OpenFlags {
    fn from(bits: u32) -> Self {
        OpenFlags(bits)
    }
}

impl fmt::Display for OpenFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Parameters applied when a channel is opened.
///
/// The line format is fixed to raw 8N1 without flow control; only the baud
/// rate and the opaque flags vary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfiguration {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Opaque options passed through to the binding.
    pub flags: OpenFlags,
}

impl PortConfiguration {
    pub fn new(baud_rate: u32, flags: OpenFlags) -> Self {
        Self { baud_rate, flags }
    }
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            flags: OpenFlags::NONE,
        }
    }
}

/// Which direction(s) a buffer discard applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClearTarget {
    /// Bytes received but not yet read.
    Input,
    /// Bytes written but not yet transmitted.
    Output,
    /// Both directions.
    #[default]
    All,
}

impl From<ClearTarget> for serialport::ClearBuffer {
    fn from(target: ClearTarget) -> Self {
        match target {
            ClearTarget::Input => serialport::ClearBuffer::Input,
            ClearTarget::Output => serialport::ClearBuffer::Output,
            ClearTarget::All => serialport::ClearBuffer::All,
        }
    }
}

/// An open, exclusively owned serial channel.
///
/// All calls are non-blocking except `wait_readable`, which blocks for at
/// most `timeout`. Dropping the value releases the underlying handle.
pub trait SerialPortAdapter: Send + fmt::Debug {
    /// Write bytes to the channel.
    ///
    /// Returns the number of bytes actually accepted, which may be fewer
    /// than `data.len()`.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Make one read attempt into the provided buffer.
    ///
    /// Returns the number of bytes read. When nothing is queued the attempt
    /// fails with a would-block style error (see [`PortError::is_would_block`]).
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this channel.
    fn name(&self) -> &str;

    /// Number of bytes received by the driver but not yet read.
    fn bytes_to_read(&self) -> Result<usize, PortError>;

    /// Block until the channel is readable or `timeout` elapses.
    ///
    /// Returns `Ok(true)` when readable and `Ok(false)` when the timeout
    /// expired first (or the wait was interrupted without an event).
    fn wait_readable(&mut self, timeout: Duration) -> Result<bool, PortError>;

    /// Discard buffered bytes in the given direction(s).
    fn clear_buffers(&mut self, target: ClearTarget) -> Result<(), PortError>;
}

/// Acquires and configures channels by port name.
pub trait PortOpener: Send + fmt::Debug {
    /// Open `port_name` in non-blocking raw mode at the configured baud rate.
    ///
    /// The returned channel is fully configured; any failure along the way
    /// must release whatever was acquired.
    fn open_channel(
        &self,
        port_name: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError>;
}
