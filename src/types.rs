//! Core data types for daqlink
//!
//! This module contains the fundamental data structures used throughout
//! the crate for describing the instrument's channels, channel modes, and
//! per-channel alarm configuration.
//!
//! # Channels
//!
//! The instrument exposes eight numbered inputs:
//!
//! - Channels 1–4 are *dual-mode*: they sample a voltage, and may be
//!   reinterpreted as resistive-temperature channels when an external
//!   sensor is wired in ([`ChannelMode::ResistiveTemperature`]).
//! - Channels 5–7 are fixed acceleration inputs.
//! - Channel 8 is a fixed temperature input.
//!
//! Switching a dual-mode channel relabels its unit/header and changes how
//! *future* samples are interpreted; values already stored are never
//! rewritten.
//!
//! # Headers
//!
//! The display/CSV header for a channel is derived from its mode by the
//! pure function [`channel_header`]; no mutable header strings are kept
//! anywhere.

use serde::{Deserialize, Serialize};

/// Number of input channels on the instrument
pub const CHANNEL_COUNT: usize = 8;

/// Maximum number of samples retained per channel in the live window
pub const LIVE_WINDOW_CAP: usize = 1000;

/// A validated channel identifier in `1..=8`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Channel(u8);

impl Channel {
    /// Create a channel from its 1-based number, `None` if out of range
    pub fn new(n: u8) -> Option<Self> {
        (1..=CHANNEL_COUNT as u8).contains(&n).then_some(Self(n))
    }

    /// The 1-based channel number
    pub fn number(&self) -> u8 {
        self.0
    }

    /// The 0-based index into per-channel arrays
    pub fn index(&self) -> usize {
        self.0 as usize - 1
    }

    /// Whether this channel can be switched between voltage and
    /// resistive-temperature interpretation (channels 1–4)
    pub fn is_dual_mode(&self) -> bool {
        self.0 <= 4
    }

    /// Parse a `CHn` token, e.g. `CH3`
    pub fn parse_token(token: &str) -> Option<Self> {
        let n = token.strip_prefix("CH")?.parse::<u8>().ok()?;
        Self::new(n)
    }

    /// Iterate over all eight channels in order
    pub fn all() -> impl Iterator<Item = Channel> {
        (1..=CHANNEL_COUNT as u8).map(Channel)
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CH{}", self.0)
    }
}

/// Resistive-temperature sensor model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorKind {
    /// NTC thermistor, converted via the 4-coefficient Steinhart–Hart model
    Thermistor,
    /// PT1000 RTD, converted via an inverted polynomial approximation
    Pt1000,
}

impl SensorKind {
    /// Label used in channel headers and recorded files
    pub fn label(&self) -> &'static str {
        match self {
            SensorKind::Thermistor => "Thermistor",
            SensorKind::Pt1000 => "PT1000",
        }
    }
}

/// Excitation current source driving a resistive sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurrentSource {
    /// 200 µA source
    I200uA,
    /// 10 µA source
    I10uA,
}

impl CurrentSource {
    /// The source current in amperes
    pub fn amps(&self) -> f64 {
        match self {
            CurrentSource::I200uA => 200e-6,
            CurrentSource::I10uA => 10e-6,
        }
    }

    /// Label used in channel headers and recorded files
    pub fn label(&self) -> &'static str {
        match self {
            CurrentSource::I200uA => "200uA",
            CurrentSource::I10uA => "10uA",
        }
    }
}

/// Interpretation of one channel's raw readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelMode {
    /// Raw voltage (dual-mode channels 1–4, default)
    Voltage,
    /// Voltage across a resistive temperature sensor, reported in °C
    ResistiveTemperature {
        /// Sensor model wired to the channel
        sensor: SensorKind,
        /// Excitation current selected on the instrument
        current: CurrentSource,
    },
    /// Fixed acceleration input (channels 5–7)
    Acceleration,
    /// Fixed temperature input (channel 8)
    Temperature,
}

impl ChannelMode {
    /// The factory-default mode for a channel
    pub fn default_for(channel: Channel) -> Self {
        match channel.number() {
            1..=4 => ChannelMode::Voltage,
            5..=7 => ChannelMode::Acceleration,
            _ => ChannelMode::Temperature,
        }
    }

    /// Whether samples in this mode are temperatures
    pub fn is_temperature(&self) -> bool {
        matches!(
            self,
            ChannelMode::ResistiveTemperature { .. } | ChannelMode::Temperature
        )
    }
}

/// Derive the display/CSV header for a channel from its mode
///
/// Examples: `CH1 (V)`, `CH5 (m/s^2)`, `CH8 (C)`,
/// `CH2 (C) 200uA Thermistor`.
pub fn channel_header(channel: Channel, mode: &ChannelMode) -> String {
    match mode {
        ChannelMode::Voltage => format!("{channel} (V)"),
        ChannelMode::Acceleration => format!("{channel} (m/s^2)"),
        ChannelMode::Temperature => format!("{channel} (C)"),
        ChannelMode::ResistiveTemperature { sensor, current } => {
            format!("{channel} (C) {} {}", current.label(), sensor.label())
        }
    }
}

/// Input voltage range selected on the instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VoltageRange {
    /// ±1 V range
    #[default]
    OneVolt,
    /// ±10 V range
    TenVolt,
}

/// Per-channel alarm evaluation mode, as reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlarmMode {
    /// Alarm evaluation off
    #[default]
    Disabled,
    /// Alarm tracks the current reading
    Live,
    /// Alarm stays raised until explicitly cleared on the device
    Latching,
}

impl AlarmMode {
    /// Decode the wire code `0..=2`
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(AlarmMode::Disabled),
            1 => Some(AlarmMode::Live),
            2 => Some(AlarmMode::Latching),
            _ => None,
        }
    }

    /// The wire code `0..=2`
    pub fn code(&self) -> u8 {
        match self {
            AlarmMode::Disabled => 0,
            AlarmMode::Live => 1,
            AlarmMode::Latching => 2,
        }
    }
}

/// Per-channel alarm status, as reported by the device
///
/// The status is device-computed; the host stores and displays it but
/// never derives it locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlarmStatus {
    /// No breach
    #[default]
    Off,
    /// Reading fell below the low threshold
    LowerBreach,
    /// Reading rose above the high threshold
    UpperBreach,
}

impl AlarmStatus {
    /// Decode the wire code `0..=2`
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(AlarmStatus::Off),
            1 => Some(AlarmStatus::LowerBreach),
            2 => Some(AlarmStatus::UpperBreach),
            _ => None,
        }
    }
}

/// Low/high alarm thresholds for one channel
///
/// Both bounds are independently settable; no `low < high` invariant is
/// enforced at storage time (validation is a presentation concern).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmThreshold {
    /// Low threshold
    pub low: f64,
    /// High threshold
    pub high: f64,
}
