//! # daqlink: serial data-acquisition core
//!
//! A host-side acquisition core for an 8-channel sensor instrument on a
//! serial link. The crate owns the protocol and data layer (line
//! framing and dispatch, the telemetry store with its channel remapping,
//! sensor conversion, recording and replay) and leaves rendering and
//! widgets to whatever presentation layer sits on top.
//!
//! ## Architecture
//!
//! - **Link driver** ([`link`]): owns the serial connection, frames
//!   incoming bytes into lines on a dedicated reader thread, and carries
//!   outbound commands (`#`-terminated).
//! - **Protocol** ([`protocol`]): parses each line into a tagged
//!   [`Message`](protocol::Message); unknown lines are tolerated noise.
//! - **Dispatcher** ([`dispatch`]): applies each message to the shared
//!   state under one coarse lock; the sole writer of device state and
//!   the sole source of telemetry appends.
//! - **Telemetry store** ([`store`]): bounded live window plus the
//!   pull-sampled recording buffer; applies [`convert`] when a channel
//!   is in resistive-temperature mode.
//! - **Sessions** ([`session`]): recording start/stop with CSV
//!   persistence, and the replay loader producing live-shaped snapshots.
//!
//! ## Threads
//!
//! Three actors: the link-reader thread (blocked on byte I/O), the
//! condition reporter draining a bounded queue at a coarse interval, and
//! the consumer polling [`TelemetryStore::pull`](store::TelemetryStore::pull)
//! at a configurable cadence. Everything they share sits behind a single
//! mutex ([`state::Shared`]); the lock is never held across I/O.
//!
//! ## Example
//!
//! ```ignore
//! use daqlink::{
//!     config::AppConfig,
//!     link::{condition_channel, ConditionReporter, LinkDriver, SerialTransport},
//!     protocol::Command,
//!     state::new_shared,
//! };
//!
//! let config = AppConfig::load_or_default("daqlink.toml");
//! let shared = new_shared();
//! let (tx, rx) = condition_channel();
//!
//! let reporter = ConditionReporter::spawn(rx, config.reporting.interval(), |c| {
//!     eprintln!("link condition: {c}");
//! });
//!
//! let transport = SerialTransport::open(
//!     "/dev/ttyUSB0",
//!     config.serial.baud_rate,
//!     config.serial.read_timeout(),
//! )?;
//! let mut link = LinkDriver::new(shared.clone(), tx);
//! link.open(Box::new(transport))?;
//! link.send(Command::StartStream)?;
//!
//! loop {
//!     std::thread::sleep(config.sampling.poll_interval());
//!     let snapshot = shared.lock().unwrap().store.pull();
//!     // feed snapshot to the presentation layer
//! }
//! ```

pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod link;
pub mod protocol;
pub mod session;
pub mod state;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{DaqError, Result};
pub use link::{Condition, ConditionReporter, LinkDriver, LinkState, SerialTransport};
pub use protocol::{Command, Message};
pub use session::{RecordingSession, ReplaySession};
pub use state::{new_shared, DeviceState, Shared, SharedHandle};
pub use store::{TelemetrySnapshot, TelemetryStore};
pub use types::{AlarmMode, AlarmStatus, Channel, ChannelMode, VoltageRange};
