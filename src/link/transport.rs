//! Transport trait for the byte-level link
//!
//! The link driver is written against this trait so the same reader loop
//! drives a real serial port and the in-memory mock used in tests. The
//! serial implementation is deliberately thin: framing, dispatch, and
//! error policy all live in [`crate::link`].

use std::io::{self, Read, Write};
use std::time::Duration;

use crate::error::{DaqError, Result};

/// Byte-level connection to the instrument
///
/// `read` is expected to block for at most the transport's configured
/// timeout and return `ErrorKind::TimedOut` when no bytes arrived; the
/// reader loop relies on that bound to notice shutdown requests.
pub trait Transport: Send {
    /// Read available bytes into `buf`, up to the configured timeout
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all bytes of `buf`
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Flush buffered output
    fn flush(&mut self) -> io::Result<()>;

    /// Clone a handle to the same underlying connection
    ///
    /// The clone is handed to the writer side so outbound sends do not
    /// contend with the blocked reader.
    fn try_clone(&self) -> Result<Box<dyn Transport>>;
}

/// Serial-port transport (8N1, no flow control)
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    /// Open a serial port by name
    pub fn open(port_name: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(read_timeout)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|e| DaqError::Connection(format!("open {port_name}: {e}")))?;
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.port.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }

    fn try_clone(&self) -> Result<Box<dyn Transport>> {
        let port = self
            .port
            .try_clone()
            .map_err(|e| DaqError::Connection(format!("clone serial handle: {e}")))?;
        Ok(Box::new(SerialTransport { port }))
    }
}

/// List the serial ports visible on this machine
pub fn list_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports()
        .map_err(|e| DaqError::Connection(format!("enumerate ports: {e}")))?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
