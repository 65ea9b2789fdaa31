//! Message dispatch: from parsed line to state effect
//!
//! The dispatcher is the single writer of the mirrored device state and
//! the only source of telemetry appends. It consumes one [`Message`] at a
//! time and mutates the [`Shared`] state accordingly; the caller already
//! holds the coarse lock.
//!
//! Dispatch never performs I/O. When a message calls for an outbound
//! reply (the device expects `END CONT` to be acknowledged), the reply is
//! returned to the caller, which sends it after releasing the lock.
//!
//! Unrecognized lines are dropped here without effect or error; see
//! [`crate::protocol`] for the tolerance policy.

use crate::protocol::{self, Command, Message};
use crate::state::Shared;

/// Apply one parsed message to the shared state
///
/// Returns the outbound reply the caller must send, if any.
pub fn dispatch(message: Message, shared: &mut Shared) -> Option<Command> {
    match message {
        Message::VoltageRange(range) => {
            shared.device.voltage_range = range;
        }
        Message::Data(values) => {
            shared.store.append_raw(values);
        }
        Message::StartSnapshot => {
            shared.device.receiving_snapshot = true;
        }
        Message::EndSnapshot => {
            shared.device.receiving_snapshot = false;
            return Some(Command::EndSnapshotAck);
        }
        Message::BulkHighThresholds(values) => {
            for (slot, value) in shared.device.thresholds.iter_mut().zip(values) {
                if let Some(v) = value {
                    slot.high = v;
                }
            }
        }
        Message::BulkLowThresholds(values) => {
            for (slot, value) in shared.device.thresholds.iter_mut().zip(values) {
                if let Some(v) = value {
                    slot.low = v;
                }
            }
        }
        Message::LowThreshold { channel, value } => {
            shared.device.thresholds[channel.index()].low = value;
        }
        Message::HighThreshold { channel, value } => {
            shared.device.thresholds[channel.index()].high = value;
        }
        Message::AlarmStatus { channel, status } => {
            shared.device.alarm_statuses[channel.index()] = status;
        }
        Message::AlarmMode { channel, mode } => {
            shared.device.alarm_modes[channel.index()] = mode;
        }
        Message::Unrecognized => {}
    }
    None
}

/// Parse and dispatch one decoded line
pub fn dispatch_line(line: &str, shared: &mut Shared) -> Option<Command> {
    dispatch(protocol::parse(line), shared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlarmMode, AlarmStatus, VoltageRange};

    #[test]
    fn test_voltage_range_effect() {
        let mut shared = Shared::new();
        assert!(dispatch_line("V1", &mut shared).is_none());
        assert_eq!(shared.device.voltage_range, VoltageRange::TenVolt);
        dispatch_line("V0", &mut shared);
        assert_eq!(shared.device.voltage_range, VoltageRange::OneVolt);
    }

    #[test]
    fn test_data_line_appends() {
        let mut shared = Shared::new();
        dispatch_line("D:1,2,3,4,5,6,7,8", &mut shared);
        assert_eq!(shared.store.len(), 1);
        let snap = shared.store.pull();
        assert_eq!(snap.channels[0][0], 1.0);
        assert_eq!(snap.channels[7][0], 8.0);
    }

    #[test]
    fn test_malformed_data_line_leaves_store_unchanged() {
        let mut shared = Shared::new();
        dispatch_line("D:1,2,3,4,5,6,7", &mut shared);
        dispatch_line("D:1,2,3,x,5,6,7,8", &mut shared);
        assert!(shared.store.is_empty());
    }

    #[test]
    fn test_snapshot_window_and_ack() {
        let mut shared = Shared::new();
        assert!(dispatch_line("%START CONT", &mut shared).is_none());
        assert!(shared.device.receiving_snapshot);

        let reply = dispatch_line("END CONT", &mut shared);
        assert!(!shared.device.receiving_snapshot);
        assert_eq!(reply, Some(Command::EndSnapshotAck));
    }

    #[test]
    fn test_bulk_thresholds_with_nan_token() {
        let mut shared = Shared::new();
        dispatch_line(
            "HT: CH1:1.0 CH2:NAN CH3:3.0 CH4:4.0 CH5:5.0 CH6:6.0 CH7:7.0 CH8:8.0",
            &mut shared,
        );
        assert_eq!(shared.device.thresholds[0].high, 1.0);
        // NAN maps to zero, neighbours keep their parsed values
        assert_eq!(shared.device.thresholds[1].high, 0.0);
        assert_eq!(shared.device.thresholds[2].high, 3.0);
        assert_eq!(shared.device.thresholds[7].high, 8.0);
    }

    #[test]
    fn test_bulk_malformed_token_skips_only_that_channel() {
        let mut shared = Shared::new();
        shared.device.thresholds[2].low = -9.0;
        dispatch_line(
            "LT: CH1:1.0 CH2:2.0 CH3:bad CH4:4.0 CH5:5.0 CH6:6.0 CH7:7.0 CH8:8.0",
            &mut shared,
        );
        assert_eq!(shared.device.thresholds[0].low, 1.0);
        // Malformed token leaves the previous value in place
        assert_eq!(shared.device.thresholds[2].low, -9.0);
        assert_eq!(shared.device.thresholds[3].low, 4.0);
    }

    #[test]
    fn test_single_threshold_effects() {
        let mut shared = Shared::new();
        dispatch_line("ALT CH3 -0.75", &mut shared);
        dispatch_line("AHT CH3 2.5", &mut shared);
        assert_eq!(shared.device.thresholds[2].low, -0.75);
        assert_eq!(shared.device.thresholds[2].high, 2.5);
    }

    #[test]
    fn test_alarm_status_and_mode_effects() {
        let mut shared = Shared::new();
        dispatch_line("AS CH6 2", &mut shared);
        dispatch_line("AM CH6 1", &mut shared);
        assert_eq!(shared.device.alarm_statuses[5], AlarmStatus::UpperBreach);
        assert_eq!(shared.device.alarm_modes[5], AlarmMode::Live);
    }

    #[test]
    fn test_noise_has_no_effect() {
        let mut shared = Shared::new();
        let before = shared.device.clone();
        assert!(dispatch_line("garbage line", &mut shared).is_none());
        assert!(dispatch_line("", &mut shared).is_none());
        assert_eq!(shared.device.thresholds, before.thresholds);
        assert!(shared.store.is_empty());
    }
}
