//! Concrete serial transport.
//!
//! `RawSerial` owns at most one channel handle obtained from a
//! [`PortOpener`]. The interesting part is [`SerialRxTx::wait_for_data`],
//! which combines the channel's readiness wait with a sleep sized from the
//! line rate, so a multi-byte target costs a handful of wake-ups rather than
//! one per arriving byte.

use super::error::{TransportError, TransportResult};
use super::traits::{CancelHandle, SerialRxTx};
use crate::config::SerialConfig;
use crate::port::{
    ClearTarget, NativeOpener, OpenFlags, PortConfiguration, PortOpener, SerialPortAdapter,
};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Longest accepted port name, in bytes.
pub const MAX_PORT_NAME_LEN: usize = 256;

/// Default upper bound on a single readiness wait slice.
pub const DEFAULT_CANCEL_POLL: Duration = Duration::from_millis(20);

/// Time the line needs to carry `bytes` at `baud_rate`, 8 bits per byte.
pub fn transfer_time(bytes: usize, baud_rate: u32) -> Duration {
    let micros = (bytes as u64)
        .saturating_mul(8)
        .saturating_mul(1_000_000)
        .checked_div(u64::from(baud_rate))
        .unwrap_or(u64::MAX);
    Duration::from_micros(micros)
}

#[derive(Debug)]
struct OpenChannel {
    handle: Box<dyn SerialPortAdapter>,
    baud_rate: u32,
}

/// Serial transport over a single exclusively owned channel.
#[derive(Debug)]
pub struct RawSerial {
    opener: Box<dyn PortOpener>,
    port_name: String,
    baud_rate: u32,
    flags: OpenFlags,
    bound: bool,
    channel: Option<OpenChannel>,
    cancel: CancelHandle,
    last_sent: usize,
    last_received: usize,
    cancel_poll: Duration,
}

impl RawSerial {
    /// Create a closed, unbound transport that opens channels through `opener`.
    pub fn new(opener: impl PortOpener + 'static) -> Self {
        Self {
            opener: Box::new(opener),
            port_name: String::new(),
            baud_rate: 0,
            flags: OpenFlags::NONE,
            bound: false,
            channel: None,
            cancel: CancelHandle::new(),
            last_sent: 0,
            last_received: 0,
            cancel_poll: DEFAULT_CANCEL_POLL,
        }
    }

    /// Transport bound to the operating system's serial ports.
    pub fn native() -> Self {
        Self::new(NativeOpener)
    }

    /// Build a transport from the `[serial]` configuration section.
    ///
    /// Binds `default_port` (resolved through the alias table) when one is set.
    pub fn from_config(
        opener: impl PortOpener + 'static,
        config: &SerialConfig,
    ) -> TransportResult<Self> {
        let mut rxtx = Self::new(opener).with_cancel_poll(config.cancel_poll());
        if let Some(port) = &config.default_port {
            rxtx.bind(
                &config.resolve_port(port),
                config.default_baud,
                OpenFlags::from_bits(config.open_flags),
            )?;
        }
        Ok(rxtx)
    }

    /// Bound the latency with which a cancellation interrupts a pending wait.
    pub fn with_cancel_poll(mut self, cancel_poll: Duration) -> Self {
        self.cancel_poll = cancel_poll.max(Duration::from_millis(1));
        self
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

fn validate(port_name: &str, baud_rate: u32) -> TransportResult<()> {
    if port_name.is_empty() {
        return Err(TransportError::invalid_config("port name is empty"));
    }
    if port_name.len() > MAX_PORT_NAME_LEN {
        return Err(TransportError::invalid_config(format!(
            "port name is {} bytes, limit is {}",
            port_name.len(),
            MAX_PORT_NAME_LEN
        )));
    }
    if baud_rate == 0 {
        return Err(TransportError::invalid_config("baud rate must be positive"));
    }
    Ok(())
}

impl SerialRxTx for RawSerial {
    fn bind(&mut self, port_name: &str, baud_rate: u32, flags: OpenFlags) -> TransportResult<()> {
        validate(port_name, baud_rate)?;
        self.port_name = port_name.to_string();
        self.baud_rate = baud_rate;
        self.flags = flags;
        self.bound = true;
        debug!(port = port_name, baud = baud_rate, %flags, "serial port bound");
        Ok(())
    }

    fn open(&mut self) -> TransportResult<()> {
        if !self.bound {
            return Err(TransportError::NotBound);
        }
        let port_name = self.port_name.clone();
        self.open_with(&port_name, self.baud_rate, self.flags)
    }

    fn open_with(
        &mut self,
        port_name: &str,
        baud_rate: u32,
        flags: OpenFlags,
    ) -> TransportResult<()> {
        self.close();
        validate(port_name, baud_rate)?;

        let config = PortConfiguration::new(baud_rate, flags);
        match self.opener.open_channel(port_name, &config) {
            Ok(handle) => {
                self.channel = Some(OpenChannel { handle, baud_rate });
                self.cancel.reset();
                debug!(port = port_name, baud = baud_rate, "serial port opened");
                Ok(())
            }
            Err(e) => {
                warn!(port = port_name, error = %e, "failed to open serial port");
                Err(TransportError::Device(e))
            }
        }
    }

    fn close(&mut self) {
        if let Some(channel) = self.channel.take() {
            debug!(port = channel.handle.name(), "serial port closed");
        }
        self.cancel.reset();
        self.last_sent = 0;
        self.last_received = 0;
    }

    fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    fn send(&mut self, data: &[u8]) -> usize {
        let Some(channel) = self.channel.as_mut() else {
            return 0;
        };
        if data.is_empty() {
            return 0;
        }

        let mut written = 0;
        self.last_sent = 0;
        while written < data.len() {
            match channel.handle.write_bytes(&data[written..]) {
                Ok(0) => break,
                Ok(n) => {
                    written += n;
                    self.last_sent = written;
                }
                Err(e) => {
                    trace!(written, requested = data.len(), error = %e, "write attempt failed");
                    break;
                }
            }
        }
        written
    }

    fn receive(&mut self, buffer: &mut [u8]) -> usize {
        let Some(channel) = self.channel.as_mut() else {
            return 0;
        };

        let n = match channel.handle.read_bytes(buffer) {
            Ok(n) => n,
            Err(e) => {
                if !e.is_would_block() {
                    trace!(error = %e, "read attempt failed");
                }
                0
            }
        };
        self.last_received = n;
        n
    }

    fn flush(&mut self, target: ClearTarget) {
        if let Some(channel) = self.channel.as_mut() {
            if let Err(e) = channel.handle.clear_buffers(target) {
                warn!(port = channel.handle.name(), error = %e, "buffer flush failed");
            }
        }
    }

    fn wait_for_sent(&self, _timeout: Duration) -> usize {
        self.last_sent
    }

    fn wait_for_received(&self, _timeout: Duration) -> TransportResult<usize> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        Ok(self.last_received)
    }

    fn wait_for_data(&mut self, target: usize, timeout: Duration) -> TransportResult<usize> {
        let cancel_poll = self.cancel_poll;
        let cancel = self.cancel.clone();
        let Some(channel) = self.channel.as_mut() else {
            return Err(TransportError::NotOpen);
        };

        let available = channel.handle.bytes_to_read()?;
        if available >= target {
            return Ok(available);
        }

        // A timeout too large to represent as an instant never expires.
        let deadline = Instant::now().checked_add(timeout);
        let time_left = || {
            deadline.map_or(Duration::MAX, |d| d.saturating_duration_since(Instant::now()))
        };
        loop {
            if cancel.is_cancelled() {
                debug!(wanted = target, "wait for data cancelled");
                return Err(TransportError::Cancelled);
            }
            let remaining = time_left();
            if remaining.is_zero() {
                return Err(TransportError::Timeout(timeout));
            }

            if !channel.handle.wait_readable(remaining.min(cancel_poll))? {
                continue;
            }

            let available = channel.handle.bytes_to_read()?;
            if available >= target {
                return Ok(available);
            }

            // Readiness is level-triggered, so re-polling now would return at
            // once. Sleep for as long as the missing bytes need on the wire,
            // capped by the deadline and one poll slice.
            let expected = transfer_time(target - available, channel.baud_rate);
            let pause = expected.min(time_left()).min(cancel_poll);
            trace!(available, wanted = target, ?pause, "waiting for remaining bytes");
            thread::sleep(pause);
        }
    }

    fn rx_queue_count(&self) -> usize {
        self.channel
            .as_ref()
            .and_then(|channel| channel.handle.bytes_to_read().ok())
            .unwrap_or(0)
    }

    fn cancel(&self) {
        self.cancel.cancel();
    }

    fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

impl Drop for RawSerial {
    fn drop(&mut self) {
        self.close();
    }
}
