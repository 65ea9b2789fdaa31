//! In-memory transport for testing and hardware-free runs
//!
//! Mirrors the shape of [`SerialTransport`](super::transport::SerialTransport)
//! without any device: incoming bytes are fed by the test (or by the
//! signal generator), written bytes are captured for inspection, and read
//! failures can be injected to exercise the link-lost path.
//!
//! Available in tests unconditionally and in normal builds behind the
//! `mock-link` feature:
//!
//! ```bash
//! cargo run --features mock-link -- mock
//! ```

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::Result;

use super::transport::Transport;

/// How long a mock read waits before reporting a timeout, standing in
/// for the serial read timeout
const MOCK_READ_WAIT: Duration = Duration::from_millis(2);

#[derive(Debug, Default)]
struct MockInner {
    incoming: VecDeque<u8>,
    written: Vec<u8>,
    fail_reads: bool,
    fail_writes: bool,
}

/// Shared in-memory transport; clones talk to the same buffers
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockInner>>,
}

impl MockTransport {
    /// Create an empty mock transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock whose read side will replay the given lines
    /// (newline terminators appended)
    pub fn scripted(lines: &[&str]) -> Self {
        let mock = Self::new();
        for line in lines {
            mock.push_line(line);
        }
        mock
    }

    /// Feed raw bytes to the read side
    pub fn push_incoming(&self, bytes: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        inner.incoming.extend(bytes.iter().copied());
    }

    /// Feed one line to the read side, appending the newline terminator
    pub fn push_line(&self, line: &str) {
        self.push_incoming(line.as_bytes());
        self.push_incoming(b"\n");
    }

    /// Everything the host has written so far, as a UTF-8 string
    pub fn written(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().unwrap().written).into_owned()
    }

    /// Make every subsequent read fail, simulating a dropped link
    pub fn fail_reads(&self) {
        self.inner.lock().unwrap().fail_reads = true;
    }

    /// Make every subsequent write fail
    pub fn fail_writes(&self) {
        self.inner.lock().unwrap().fail_writes = true;
    }

    /// Whether the read side has unconsumed bytes
    pub fn has_pending(&self) -> bool {
        !self.inner.lock().unwrap().incoming.is_empty()
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.fail_reads {
                return Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "mock link dropped",
                ));
            }
            if !inner.incoming.is_empty() {
                let n = buf.len().min(inner.incoming.len());
                for slot in buf.iter_mut().take(n) {
                    *slot = inner.incoming.pop_front().unwrap();
                }
                return Ok(n);
            }
        }
        // No data: behave like a serial read timeout
        std::thread::sleep(MOCK_READ_WAIT);
        Err(io::Error::new(io::ErrorKind::TimedOut, "mock read timeout"))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock write failed",
            ));
        }
        inner.written.extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn try_clone(&self) -> Result<Box<dyn Transport>> {
        Ok(Box::new(self.clone()))
    }
}

/// Spawn a thread feeding synthetic telemetry into the mock at roughly
/// the instrument's tick rate, for hardware-free monitor runs
pub fn spawn_signal_generator(mock: MockTransport) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let start = std::time::Instant::now();
        loop {
            let t = start.elapsed().as_secs_f64();
            let values: Vec<String> = (0..crate::types::CHANNEL_COUNT)
                .map(|ch| format!("{:.4}", (t * 0.8 + ch as f64).sin()))
                .collect();
            mock.push_line(&format!("D:{}", values.join(",")));
            std::thread::sleep(Duration::from_millis(100));
        }
    })
}
