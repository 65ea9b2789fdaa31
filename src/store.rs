//! Telemetry store: live window and recording buffer
//!
//! The store owns the two sample buffers of the acquisition core:
//!
//! - **Live window**: the most recent samples per channel, FIFO-trimmed
//!   to a fixed cap (default [`LIVE_WINDOW_CAP`]). This is what real-time
//!   consumers see through [`TelemetryStore::pull`].
//! - **Recording buffer**: an unbounded accumulator that grows only
//!   while a recording session holds the capture flag. It is sampled on
//!   *pull*, not on append: one entry per consumer poll, duplicating
//!   whatever the live window holds at that moment. Recording fidelity is
//!   therefore bounded by the consumer poll cadence, which is an explicit
//!   configuration parameter rather than a hidden constant.
//!
//! Raw values arriving on dual-mode channels are converted to °C here
//! when the channel is in resistive-temperature mode. A conversion whose
//! math is undefined (see [`crate::convert`]) stores `f64::NAN` as a gap
//! sentinel instead of dropping the whole sample, so the nine sequences
//! stay length-synchronized.
//!
//! The store is not internally synchronized; it lives inside the shared
//! state lock (see [`crate::state`]).

use std::collections::VecDeque;
use std::time::Instant;

use chrono::{DateTime, Local};

use crate::convert;
use crate::error::{DaqError, Result};
use crate::types::{channel_header, Channel, ChannelMode, CHANNEL_COUNT, LIVE_WINDOW_CAP};

/// One entry of the recording buffer: a wall-clock instant plus the
/// latest post-conversion reading of every channel
#[derive(Debug, Clone)]
pub struct RecordedSample {
    /// Local wall-clock time the sample was captured at
    pub wall_clock: DateTime<Local>,
    /// Post-conversion values, one per channel
    pub values: [f64; CHANNEL_COUNT],
}

/// A read-only snapshot of the live window
///
/// All nine sequences are length-synchronized: `timestamps.len()` equals
/// every `channels[i].len()`.
#[derive(Debug, Clone, Default)]
pub struct TelemetrySnapshot {
    /// Seconds since the connection epoch, oldest first
    pub timestamps: Vec<f64>,
    /// Per-channel values, index 0 = CH1
    pub channels: [Vec<f64>; CHANNEL_COUNT],
}

impl TelemetrySnapshot {
    /// Number of samples in the snapshot
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the snapshot holds no samples
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// The most recent sample, if any
    pub fn latest(&self) -> Option<(f64, [f64; CHANNEL_COUNT])> {
        let t = *self.timestamps.last()?;
        let mut values = [0.0; CHANNEL_COUNT];
        for (slot, series) in values.iter_mut().zip(&self.channels) {
            *slot = *series.last()?;
        }
        Some((t, values))
    }
}

/// Owner of the live window and the recording buffer
#[derive(Debug)]
pub struct TelemetryStore {
    /// Seconds since `epoch`, one per stored sample
    timestamps: VecDeque<f64>,
    /// Per-channel value deques, index 0 = CH1
    channels: [VecDeque<f64>; CHANNEL_COUNT],
    /// Current interpretation of each channel
    modes: [ChannelMode; CHANNEL_COUNT],
    /// Recording buffer, populated on pull while capturing
    recording: Vec<RecordedSample>,
    /// Capture flag, owned by the recording session
    capturing: bool,
    /// Gate flag: a live connection exists and sampling may begin
    ready: bool,
    /// Connection epoch all live timestamps are relative to
    epoch: Instant,
    /// Live window cap per channel
    window_cap: usize,
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryStore {
    /// Create a store with the default live-window cap
    pub fn new() -> Self {
        Self::with_window_cap(LIVE_WINDOW_CAP)
    }

    /// Create a store with an explicit live-window cap
    pub fn with_window_cap(window_cap: usize) -> Self {
        let mut modes = [ChannelMode::Voltage; CHANNEL_COUNT];
        for channel in Channel::all() {
            modes[channel.index()] = ChannelMode::default_for(channel);
        }
        Self {
            timestamps: VecDeque::with_capacity(window_cap),
            channels: Default::default(),
            modes,
            recording: Vec::new(),
            capturing: false,
            ready: false,
            epoch: Instant::now(),
            window_cap,
        }
    }

    /// Append one raw sample, converting dual-mode channels as needed
    ///
    /// The timestamp is taken now, relative to the connection epoch. Each
    /// channel's window is trimmed to the cap afterwards.
    pub fn append_raw(&mut self, raw: [f64; CHANNEL_COUNT]) {
        let elapsed = self.epoch.elapsed().as_secs_f64();
        self.timestamps.push_back(elapsed);
        if self.timestamps.len() > self.window_cap {
            self.timestamps.pop_front();
        }

        for (index, value) in raw.iter().enumerate() {
            let stored = match self.modes[index] {
                ChannelMode::ResistiveTemperature { sensor, current } => {
                    match convert::convert(*value, current, sensor) {
                        Ok(t) => t,
                        Err(e) => {
                            // NaN keeps the sequences aligned and reads as
                            // a gap downstream
                            tracing::warn!("channel {} conversion failed: {}", index + 1, e);
                            f64::NAN
                        }
                    }
                }
                _ => *value,
            };
            let series = &mut self.channels[index];
            series.push_back(stored);
            if series.len() > self.window_cap {
                series.pop_front();
            }
        }
    }

    /// Snapshot the live window for a consumer
    ///
    /// While the capture flag is set and the window is non-empty, this is
    /// also the point where one entry is appended to the recording buffer
    /// (pull-driven sampling).
    pub fn pull(&mut self) -> TelemetrySnapshot {
        if self.capturing {
            if let Some(values) = self.latest_values() {
                self.recording.push(RecordedSample {
                    wall_clock: Local::now(),
                    values,
                });
            }
        }

        let mut channels: [Vec<f64>; CHANNEL_COUNT] = Default::default();
        for (out, series) in channels.iter_mut().zip(&self.channels) {
            *out = series.iter().copied().collect();
        }
        TelemetrySnapshot {
            timestamps: self.timestamps.iter().copied().collect(),
            channels,
        }
    }

    /// The most recent post-conversion value of every channel
    fn latest_values(&self) -> Option<[f64; CHANNEL_COUNT]> {
        let mut values = [0.0; CHANNEL_COUNT];
        for (slot, series) in values.iter_mut().zip(&self.channels) {
            *slot = *series.back()?;
        }
        Some(values)
    }

    /// Raise the capture flag; the recording buffer grows on each pull
    pub fn start_capture(&mut self) {
        self.capturing = true;
    }

    /// Drop the capture flag and drain the recording buffer
    pub fn stop_capture(&mut self) -> Vec<RecordedSample> {
        self.capturing = false;
        std::mem::take(&mut self.recording)
    }

    /// Whether a recording session is currently capturing
    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Number of entries in the recording buffer
    pub fn recorded_len(&self) -> usize {
        self.recording.len()
    }

    /// Reset the epoch to now and empty both buffers
    pub fn clear(&mut self) {
        self.epoch = Instant::now();
        self.timestamps.clear();
        for series in &mut self.channels {
            series.clear();
        }
        self.recording.clear();
    }

    /// Switch a dual-mode channel between voltage and
    /// resistive-temperature interpretation
    ///
    /// Only relabels the channel and changes how future samples are
    /// interpreted; stored values are never rewritten.
    pub fn set_channel_mode(&mut self, channel: Channel, mode: ChannelMode) -> Result<()> {
        if !channel.is_dual_mode() {
            return Err(DaqError::Channel(format!(
                "{channel} has a fixed mode; only channels 1-4 are switchable"
            )));
        }
        match mode {
            ChannelMode::Voltage | ChannelMode::ResistiveTemperature { .. } => {
                self.modes[channel.index()] = mode;
                Ok(())
            }
            _ => Err(DaqError::Channel(format!(
                "{channel} cannot be set to {mode:?}"
            ))),
        }
    }

    /// Current interpretation of a channel
    pub fn mode(&self, channel: Channel) -> ChannelMode {
        self.modes[channel.index()]
    }

    /// Display/CSV headers for all channels, derived from their modes
    pub fn headers(&self) -> Vec<String> {
        Channel::all()
            .map(|ch| channel_header(ch, &self.modes[ch.index()]))
            .collect()
    }

    /// Number of samples currently in the live window
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the live window is empty
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Whether a live connection exists and sampling may begin
    pub fn ready_to_plot(&self) -> bool {
        self.ready
    }

    /// Toggle the external "ready" gate
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }
}
