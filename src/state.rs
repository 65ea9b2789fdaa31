//! Cross-thread shared state
//!
//! Two actors touch the acquisition state concurrently: the link-reader
//! thread (the only writer of device state and the only source of
//! telemetry appends) and the consumer polling for snapshots. Everything
//! they both see lives in one [`Shared`] value behind a single coarse
//! [`Mutex`]: alarm thresholds, modes, statuses, the voltage-range
//! selector, and the telemetry store itself.
//!
//! Lock discipline: the lock is never held across I/O. The dispatcher
//! returns any outbound reply to the caller, which sends it after the
//! guard is dropped, and the recorder drains the buffer under the lock
//! but writes the file outside it.

use std::sync::{Arc, Mutex};

use crate::store::TelemetryStore;
use crate::types::{AlarmMode, AlarmStatus, AlarmThreshold, VoltageRange, CHANNEL_COUNT};

/// Device-reported state mirrored on the host
///
/// Written only by the message dispatcher on behalf of the device; read
/// by the presentation layer.
#[derive(Debug, Clone, Default)]
pub struct DeviceState {
    /// Low/high alarm thresholds per channel
    pub thresholds: [AlarmThreshold; CHANNEL_COUNT],
    /// Alarm mode per channel
    pub alarm_modes: [AlarmMode; CHANNEL_COUNT],
    /// Device-computed alarm status per channel
    pub alarm_statuses: [AlarmStatus; CHANNEL_COUNT],
    /// Input voltage range selector
    pub voltage_range: VoltageRange,
    /// True between `%START CONT` and `END CONT` while the device replays
    /// its configuration snapshot
    pub receiving_snapshot: bool,
}

/// Everything guarded by the coarse lock
#[derive(Debug, Default)]
pub struct Shared {
    /// Mirrored device state
    pub device: DeviceState,
    /// Live window and recording buffer
    pub store: TelemetryStore,
}

impl Shared {
    /// Create fresh shared state
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap in the handle both threads hold
    pub fn into_handle(self) -> SharedHandle {
        Arc::new(Mutex::new(self))
    }
}

/// Handle to the shared state, cloned into every actor
pub type SharedHandle = Arc<Mutex<Shared>>;

/// Create a fresh shared-state handle with default device state
pub fn new_shared() -> SharedHandle {
    Shared::new().into_handle()
}
