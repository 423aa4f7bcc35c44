//! Simulated serial device for testing.
//!
//! `MockSerialPort` plays the device side: tests inject bytes into its
//! receive queue, inspect what was written and script failures. It is also a
//! [`PortOpener`], handing out [`MockChannel`] handles that share its state,
//! so a transport driven through the opener sees exactly what the test
//! injects. Readiness is level-triggered like `select(2)`: a wait returns as
//! soon as at least one byte is queued.

use super::error::PortError;
use super::traits::{ClearTarget, PortConfiguration, PortOpener, SerialPortAdapter};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Inner state of the simulated device.
#[derive(Debug, Default)]
struct MockPortState {
    /// Bytes the device has "received" and not yet handed out.
    read_queue: VecDeque<u8>,
    /// Log of all accepted writes.
    write_log: Vec<Vec<u8>>,
    /// Maximum bytes accepted by a single write call.
    write_chunk: Option<usize>,
    /// Total bytes still accepted before writes start failing.
    write_budget: Option<usize>,
    /// Whether the next read/write should time out.
    should_timeout: bool,
    /// Fail acquiring the handle.
    fail_open: bool,
    /// Acquire the handle, then fail configuring it.
    fail_configure: bool,
    /// Fail queued-count queries and readiness waits.
    fail_queries: bool,
    /// Whether buffers have been cleared.
    buffers_cleared: bool,
    /// Number of live channel handles.
    open_handles: usize,
    /// Number of successful opens.
    open_count: usize,
    /// Configuration of the most recent successful open.
    last_config: Option<PortConfiguration>,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<MockPortState>,
    readable: Condvar,
}

/// Simulated serial device and opener.
///
/// Clones share the same device, so a test can keep one clone while the
/// transport owns another.
///
/// # Example
/// ```
/// use raw_serial::port::{MockSerialPort, PortConfiguration, PortOpener, SerialPortAdapter};
///
/// let device = MockSerialPort::new("COM-SIM");
/// let mut channel = device
///     .open_channel("COM-SIM", &PortConfiguration::default())
///     .unwrap();
///
/// device.enqueue_read(b"Hello");
/// assert_eq!(channel.bytes_to_read().unwrap(), 5);
///
/// let mut buffer = [0u8; 8];
/// let n = channel.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"Hello");
///
/// channel.write_bytes(b"Response").unwrap();
/// assert_eq!(device.get_write_log(), vec![b"Response".to_vec()]);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    /// The port name/identifier the device answers to.
    name: String,
    shared: Arc<Shared>,
}

impl MockSerialPort {
    /// Create a new simulated device with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared: Arc::new(Shared::default()),
        }
    }

    /// The name this device answers to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Make bytes arrive on the line, waking any pending readiness wait.
    pub fn enqueue_read(&self, data: &[u8]) {
        let mut state = self.shared.state.lock();
        state.read_queue.extend(data);
        self.shared.readable.notify_all();
    }

    /// Get a copy of all data written to the device.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.shared.state.lock().write_log.clone()
    }

    /// All written bytes, concatenated.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.shared.state.lock().write_log.concat()
    }

    /// Clear the write log.
    pub fn clear_write_log(&self) {
        self.shared.state.lock().write_log.clear();
    }

    /// Limit how many bytes a single write call accepts.
    pub fn set_write_chunk(&self, chunk: Option<usize>) {
        self.shared.state.lock().write_chunk = chunk;
    }

    /// Limit how many bytes are accepted in total before writes fail.
    pub fn set_write_budget(&self, budget: Option<usize>) {
        self.shared.state.lock().write_budget = budget;
    }

    /// Set whether the next read/write operation should time out.
    pub fn set_should_timeout(&self, should_timeout: bool) {
        self.shared.state.lock().should_timeout = should_timeout;
    }

    /// Make acquiring the handle fail.
    pub fn set_fail_open(&self, fail: bool) {
        self.shared.state.lock().fail_open = fail;
    }

    /// Make configuration fail after the handle was acquired.
    pub fn set_fail_configure(&self, fail: bool) {
        self.shared.state.lock().fail_configure = fail;
    }

    /// Make queued-count queries and readiness waits fail.
    pub fn set_fail_queries(&self, fail: bool) {
        self.shared.state.lock().fail_queries = fail;
    }

    /// Get whether buffers have been cleared since the last reset.
    pub fn was_cleared(&self) -> bool {
        self.shared.state.lock().buffers_cleared
    }

    /// Reset the "buffers cleared" flag.
    pub fn reset_cleared_flag(&self) {
        self.shared.state.lock().buffers_cleared = false;
    }

    /// Get the number of bytes waiting to be read.
    pub fn available_bytes(&self) -> usize {
        self.shared.state.lock().read_queue.len()
    }

    /// Number of channel handles currently alive.
    pub fn open_handles(&self) -> usize {
        self.shared.state.lock().open_handles
    }

    /// Number of successful opens so far.
    pub fn open_count(&self) -> usize {
        self.shared.state.lock().open_count
    }

    /// Configuration used by the most recent successful open.
    pub fn last_config(&self) -> Option<PortConfiguration> {
        self.shared.state.lock().last_config.clone()
    }
}

impl PortOpener for MockSerialPort {
    fn open_channel(
        &self,
        port_name: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        if port_name != self.name {
            return Err(PortError::not_found(port_name));
        }

        {
            let state = self.shared.state.lock();
            if state.fail_open {
                return Err(PortError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "simulated open failure",
                )));
            }
        }

        let channel = MockChannel::acquire(self);

        let mut state = self.shared.state.lock();
        if config.baud_rate == 0 {
            return Err(PortError::config("baud rate must be positive"));
        }
        if state.fail_configure {
            return Err(PortError::config("simulated configuration failure"));
        }
        state.read_queue.clear();
        state.buffers_cleared = true;
        state.open_count += 1;
        state.last_config = Some(config.clone());
        drop(state);

        Ok(Box::new(channel))
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

/// Channel handle handed out by [`MockSerialPort`].
///
/// Dropping it releases the handle on the device.
pub struct MockChannel {
    name: String,
    shared: Arc<Shared>,
}

impl MockChannel {
    fn acquire(device: &MockSerialPort) -> Self {
        device.shared.state.lock().open_handles += 1;
        Self {
            name: device.name.clone(),
            shared: Arc::clone(&device.shared),
        }
    }
}

impl Drop for MockChannel {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.open_handles = state.open_handles.saturating_sub(1);
    }
}

impl SerialPortAdapter for MockChannel {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.shared.state.lock();

        if state.should_timeout {
            state.should_timeout = false;
            return Err(PortError::timeout(Duration::ZERO));
        }

        let mut accepted = data.len();
        if let Some(chunk) = state.write_chunk {
            accepted = accepted.min(chunk);
        }
        if let Some(budget) = state.write_budget {
            if budget == 0 {
                return Err(PortError::Io(std::io::Error::new(
                    std::io::ErrorKind::WouldBlock,
                    "Transmit buffer full",
                )));
            }
            accepted = accepted.min(budget);
            state.write_budget = Some(budget - accepted);
        }

        state.write_log.push(data[..accepted].to_vec());
        Ok(accepted)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.shared.state.lock();

        if state.should_timeout {
            state.should_timeout = false;
            return Err(PortError::timeout(Duration::ZERO));
        }

        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 && !buffer.is_empty() {
            Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "No data available",
            )))
        } else {
            Ok(bytes_read)
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn bytes_to_read(&self) -> Result<usize, PortError> {
        let state = self.shared.state.lock();
        if state.fail_queries {
            return Err(PortError::Io(std::io::Error::other(
                "simulated queue query failure",
            )));
        }
        Ok(state.read_queue.len())
    }

    fn wait_readable(&mut self, timeout: Duration) -> Result<bool, PortError> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.shared.state.lock();
        loop {
            if state.fail_queries {
                return Err(PortError::Io(std::io::Error::other(
                    "simulated readiness failure",
                )));
            }
            if !state.read_queue.is_empty() {
                return Ok(true);
            }
            match deadline {
                Some(deadline) => {
                    if self
                        .shared
                        .readable
                        .wait_until(&mut state, deadline)
                        .timed_out()
                    {
                        return Ok(!state.read_queue.is_empty());
                    }
                }
                None => self.shared.readable.wait(&mut state),
            }
        }
    }

    fn clear_buffers(&mut self, target: ClearTarget) -> Result<(), PortError> {
        let mut state = self.shared.state.lock();
        if matches!(target, ClearTarget::Input | ClearTarget::All) {
            state.read_queue.clear();
        }
        state.buffers_cleared = true;
        Ok(())
    }
}

impl std::fmt::Debug for MockChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockChannel")
            .field("name", &self.name)
            .field("available_bytes", &self.shared.state.lock().read_queue.len())
            .finish()
    }
}
