//! Recording sessions and offline replay
//!
//! A recording session controls the telemetry store's capture flag and,
//! on stop, serializes the recording buffer to a timestamped CSV file.
//! The replay loader parses such a file back into the same snapshot
//! shape the live store exposes, so downstream consumers need no
//! branching between live and replayed data.
//!
//! # File format
//!
//! - File name: start timestamp formatted `YYYY-MM-DD_HH-MM-SS.csv`
//! - Header row: `Time,<per-channel header>` with headers derived from
//!   the channel modes at stop time (see [`crate::types::channel_header`])
//! - Data rows: a local wall-clock timestamp with millisecond precision
//!   (`YYYY-MM-DD_HH-MM-SS.mmm`) followed by eight numeric fields

pub mod recorder;
pub mod replay;

pub use recorder::{session_file_name, write_session_csv, RecordingSession};
pub use replay::{load, ReplaySession};

/// Wall-clock format of the `Time` column, millisecond precision
pub const ROW_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S%.3f";

/// Wall-clock format used for recorded file names
pub const FILE_NAME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
