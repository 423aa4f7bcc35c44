//! Native serial channel implementation.
//!
//! Wraps the `serialport` crate's native port type with our own
//! `SerialPortAdapter` trait. The port is opened with a zero timeout so every
//! read and write is a single non-blocking attempt; the readiness wait is a
//! `poll(2)` on the raw descriptor on unix.

use super::error::PortError;
use super::traits::{ClearTarget, PortConfiguration, PortOpener, SerialPortAdapter};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;
use tracing::debug;

#[cfg(unix)]
type NativePort = serialport::TTYPort;
#[cfg(windows)]
type NativePort = serialport::COMPort;

/// Native serial channel wrapping the platform `serialport` implementation.
pub struct SyncSerialPort {
    /// The underlying serial port implementation.
    port: NativePort,
    /// The port name/path for identification.
    name: String,
}

impl SyncSerialPort {
    /// Open and configure a serial port.
    ///
    /// The line is set to the requested baud rate, 8 data bits, no parity,
    /// one stop bit, no flow control, raw mode. Stale bytes in both
    /// directions are discarded before the channel is handed out.
    ///
    /// # Example
    /// ```no_run
    /// use raw_serial::port::{PortConfiguration, SyncSerialPort};
    ///
    /// let config = PortConfiguration::default();
    /// let port = SyncSerialPort::open("/dev/ttyUSB0", &config)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(port_name: &str, config: &PortConfiguration) -> Result<Self, PortError> {
        if config.baud_rate == 0 {
            return Err(PortError::config("baud rate must be positive"));
        }

        let port = serialport::new(port_name, config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .flow_control(serialport::FlowControl::None)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(Duration::ZERO)
            .open_native()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => PortError::not_found(port_name),
                serialport::ErrorKind::InvalidInput => PortError::config(e.to_string()),
                _ => PortError::Serial(e),
            })?;

        // Dropping `port` on the error path closes the descriptor.
        port.clear(serialport::ClearBuffer::All)
            .map_err(PortError::Serial)?;

        debug!(
            port = port_name,
            baud = config.baud_rate,
            flags = %config.flags,
            "native serial channel configured"
        );

        Ok(Self {
            port,
            name: port_name.to_string(),
        })
    }
}

impl SerialPortAdapter for SyncSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.port.write(data).map_err(PortError::Io)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.port.read(buffer).map_err(PortError::Io)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn bytes_to_read(&self) -> Result<usize, PortError> {
        self.port
            .bytes_to_read()
            .map(|n| n as usize)
            .map_err(PortError::Serial)
    }

    #[cfg(unix)]
    fn wait_readable(&mut self, timeout: Duration) -> Result<bool, PortError> {
        use std::os::unix::io::AsRawFd;

        let mut pfd = libc::pollfd {
            fd: self.port.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        // Round up: a sub-millisecond remainder must still block, not spin.
        let millis = timeout
            .as_micros()
            .div_ceil(1000)
            .min(libc::c_int::MAX as u128) as libc::c_int;

        // SAFETY: `pfd` is a valid, exclusively borrowed pollfd and nfds is 1.
        let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(PortError::Io(err));
        }
        if rc == 0 {
            return Ok(false);
        }

        let readable = pfd.revents & libc::POLLIN != 0;
        if !readable && pfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("serial channel {} reported an error condition", self.name),
            )));
        }
        Ok(readable)
    }

    #[cfg(not(unix))]
    fn wait_readable(&mut self, timeout: Duration) -> Result<bool, PortError> {
        const POLL_STEP: Duration = Duration::from_millis(1);

        let deadline = std::time::Instant::now().checked_add(timeout);
        loop {
            if self.bytes_to_read()? > 0 {
                return Ok(true);
            }
            let step = match deadline {
                Some(deadline) => {
                    let now = std::time::Instant::now();
                    if now >= deadline {
                        return Ok(false);
                    }
                    POLL_STEP.min(deadline - now)
                }
                None => POLL_STEP,
            };
            std::thread::sleep(step);
        }
    }

    fn clear_buffers(&mut self, target: ClearTarget) -> Result<(), PortError> {
        self.port.clear(target.into()).map_err(PortError::Serial)
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("name", &self.name)
            .field("baud_rate", &self.port.baud_rate().ok())
            .finish()
    }
}

/// Opens native serial channels through the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeOpener;

impl PortOpener for NativeOpener {
    fn open_channel(
        &self,
        port_name: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        let port = SyncSerialPort::open(port_name, config)?;
        Ok(Box::new(port))
    }
}
