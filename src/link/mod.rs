//! Link driver: the byte-level connection and its reader thread
//!
//! The driver owns the transport exclusively. On open it spawns a
//! dedicated reader thread that frames incoming bytes into
//! newline-terminated lines (CR stripped) and hands each line to the
//! message dispatcher under the shared-state lock. Outbound commands go
//! through [`LinkDriver::send`], which appends the `#` terminator.
//!
//! # State machine
//!
//! `Idle → Connecting → Open → Closed`, with `Open → Idle` on explicit
//! [`LinkDriver::reset`] and `Open → Closed` on I/O failure or requested
//! stop. Every transport failure leaves the driver in `Closed`, never in
//! an ambiguous half-open state.
//!
//! # Failure reporting
//!
//! Transport failures are conditions, not process errors: the reader
//! pushes them onto a bounded queue and keeps its own lifecycle clean. An
//! unexpected disconnect produces exactly one [`Condition::LinkLost`]
//! before the reader terminates. A failed outbound write is reported and
//! returned to the caller; it never takes the reader down. The
//! [`ConditionReporter`] drains the queue at a coarse interval and
//! forwards to the presentation layer; conditions are rare and not
//! latency-sensitive, so polling is acceptable there.
//!
//! # Lock discipline
//!
//! The shared-state lock is held only while dispatching a parsed line;
//! replies the dispatcher requests (the `END CONT` acknowledgement) are
//! sent after the guard is dropped. Reads block on the transport with a
//! short timeout so [`LinkDriver::close`] can interrupt the loop within
//! that bound.

pub mod transport;

#[cfg(any(test, feature = "mock-link"))]
pub mod mock;

pub use transport::{list_ports, SerialTransport, Transport};

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};

use crate::dispatch;
use crate::error::{DaqError, Result};
use crate::protocol::{Command, TERMINATOR};
use crate::state::SharedHandle;

/// Capacity of the condition queue; conditions are rare, a small bound
/// is plenty and keeps the reader from ever blocking on a report
const CONDITION_QUEUE_CAP: usize = 32;

/// Link lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// No connection; a new open may be attempted
    #[default]
    Idle,
    /// Open in progress
    Connecting,
    /// Reader thread running, sends allowed
    Open,
    /// Terminal state after stop or I/O failure
    Closed,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkState::Idle => write!(f, "Idle"),
            LinkState::Connecting => write!(f, "Connecting"),
            LinkState::Open => write!(f, "Open"),
            LinkState::Closed => write!(f, "Closed"),
        }
    }
}

/// A reportable link condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// The link dropped unexpectedly while reading
    LinkLost(String),
    /// An outbound write failed
    WriteFailed(String),
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::LinkLost(detail) => write!(f, "link lost: {detail}"),
            Condition::WriteFailed(detail) => write!(f, "write failed: {detail}"),
        }
    }
}

/// Create the bounded condition queue between the reader and the reporter
pub fn condition_channel() -> (Sender<Condition>, Receiver<Condition>) {
    bounded(CONDITION_QUEUE_CAP)
}

/// Shared handle to the writer half of the transport
type WriterHandle = Arc<Mutex<Option<Box<dyn Transport>>>>;

/// Owner of the transport and the line-reader thread
pub struct LinkDriver {
    shared: SharedHandle,
    conditions: Sender<Condition>,
    state: Arc<Mutex<LinkState>>,
    writer: WriterHandle,
    running: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl LinkDriver {
    /// Create an idle driver bound to the shared state and the condition
    /// queue
    pub fn new(shared: SharedHandle, conditions: Sender<Condition>) -> Self {
        Self {
            shared,
            conditions,
            state: Arc::new(Mutex::new(LinkState::Idle)),
            writer: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            reader: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> LinkState {
        *self.state.lock().unwrap()
    }

    /// Whether sends are currently allowed
    pub fn is_open(&self) -> bool {
        self.state() == LinkState::Open
    }

    /// Take ownership of an opened transport and start the reader thread
    ///
    /// Resets the connection epoch and raises the store's ready gate. The
    /// caller is responsible for protocol initiation (sending
    /// `START CONT`) once this returns.
    pub fn open(&mut self, transport: Box<dyn Transport>) -> Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            if matches!(*state, LinkState::Connecting | LinkState::Open) {
                return Err(DaqError::Connection("link is already open".to_string()));
            }
            *state = LinkState::Connecting;
        }

        // A reader that terminated on its own (link loss) may not have
        // been joined yet
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }

        let writer = match transport.try_clone() {
            Ok(w) => w,
            Err(e) => {
                *self.state.lock().unwrap() = LinkState::Idle;
                return Err(e);
            }
        };
        *self.writer.lock().unwrap() = Some(writer);

        {
            let mut shared = self.shared.lock().unwrap();
            shared.store.clear();
            shared.store.set_ready(true);
        }

        self.running.store(true, Ordering::SeqCst);
        *self.state.lock().unwrap() = LinkState::Open;

        let shared = self.shared.clone();
        let writer = self.writer.clone();
        let conditions = self.conditions.clone();
        let state = self.state.clone();
        let running = self.running.clone();
        self.reader = Some(std::thread::spawn(move || {
            reader_loop(transport, shared, writer, conditions, state, running);
        }));

        tracing::info!("link open");
        Ok(())
    }

    /// Send one command, appending the `#` terminator
    ///
    /// Fails with [`DaqError::Write`] when the link is not open or the
    /// write itself fails; a failed write is also reported as a
    /// [`Condition::WriteFailed`] but never stops the reader.
    pub fn send(&self, command: Command) -> Result<()> {
        if !self.is_open() {
            return Err(DaqError::Write(format!(
                "cannot send {:?}: link is {}",
                command,
                self.state()
            )));
        }
        match write_command(&self.writer, &command) {
            Ok(()) => {
                tracing::debug!("sent {}", command.encode());
                Ok(())
            }
            Err(e) => {
                let detail = format!("{}: {e}", command.encode());
                report(&self.conditions, Condition::WriteFailed(detail.clone()));
                Err(DaqError::Write(detail))
            }
        }
    }

    /// Stop the reader thread, drop the transport, and transition to
    /// `Closed`
    ///
    /// Idempotent, and safe to call from a thread other than the reader;
    /// the reader wakes within its read timeout and exits.
    pub fn close(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
        *self.writer.lock().unwrap() = None;
        *self.state.lock().unwrap() = LinkState::Closed;
        self.shared.lock().unwrap().store.set_ready(false);
        tracing::info!("link closed");
    }

    /// Close and return to `Idle` so a new open may be attempted
    /// (e.g. after a device-list refresh)
    pub fn reset(&mut self) {
        self.close();
        *self.state.lock().unwrap() = LinkState::Idle;
    }
}

impl Drop for LinkDriver {
    fn drop(&mut self) {
        self.close();
    }
}

/// Write one command body plus terminator through the writer handle
fn write_command(writer: &WriterHandle, command: &Command) -> io::Result<()> {
    let mut guard = writer.lock().unwrap();
    let transport = guard
        .as_mut()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no transport"))?;
    let mut bytes = command.encode().into_bytes();
    bytes.push(TERMINATOR);
    transport.write_all(&bytes)?;
    transport.flush()
}

/// Push a condition without ever blocking the reader
fn report(conditions: &Sender<Condition>, condition: Condition) {
    if conditions.try_send(condition.clone()).is_err() {
        tracing::warn!("condition queue full, dropping: {condition}");
    }
}

/// The dedicated reader loop: frame bytes into lines and dispatch each
fn reader_loop(
    mut transport: Box<dyn Transport>,
    shared: SharedHandle,
    writer: WriterHandle,
    conditions: Sender<Condition>,
    state: Arc<Mutex<LinkState>>,
    running: Arc<AtomicBool>,
) {
    let mut pending: Vec<u8> = Vec::with_capacity(512);
    let mut buf = [0u8; 256];
    let mut lost: Option<String> = None;

    while running.load(Ordering::SeqCst) {
        match transport.read(&mut buf) {
            Ok(0) => {
                lost = Some("end of stream".to_string());
                break;
            }
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                    let raw: Vec<u8> = pending.drain(..=pos).collect();
                    let text = String::from_utf8_lossy(&raw[..raw.len() - 1]);
                    let line = text.trim_end_matches('\r');
                    let reply = {
                        let mut guard = shared.lock().unwrap();
                        dispatch::dispatch_line(line, &mut guard)
                    };
                    // Lock released before any I/O
                    if let Some(command) = reply {
                        if let Err(e) = write_command(&writer, &command) {
                            report(
                                &conditions,
                                Condition::WriteFailed(format!("{}: {e}", command.encode())),
                            );
                        }
                    }
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => {
                if running.load(Ordering::SeqCst) {
                    lost = Some(e.to_string());
                }
                break;
            }
        }
    }

    if let Some(detail) = lost {
        tracing::error!("link lost: {detail}");
        report(&conditions, Condition::LinkLost(detail));
    }

    *state.lock().unwrap() = LinkState::Closed;
    shared.lock().unwrap().store.set_ready(false);
    running.store(false, Ordering::SeqCst);
}

/// Drains the condition queue on its own thread and forwards each
/// condition to the presentation layer's handler
pub struct ConditionReporter {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ConditionReporter {
    /// Spawn the reporter polling at `interval`
    pub fn spawn<F>(receiver: Receiver<Condition>, interval: Duration, mut handler: F) -> Self
    where
        F: FnMut(Condition) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let handle = std::thread::spawn(move || {
            while flag.load(Ordering::SeqCst) {
                loop {
                    match receiver.try_recv() {
                        Ok(condition) => handler(condition),
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => {
                            flag.store(false, Ordering::SeqCst);
                            break;
                        }
                    }
                }
                std::thread::sleep(interval);
            }
        });
        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Stop the reporter and join its thread
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ConditionReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
