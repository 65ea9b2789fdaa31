//! Line protocol for the sensor instrument
//!
//! The instrument speaks a newline-delimited ASCII protocol. Each decoded
//! inbound line is parsed into a [`Message`] by [`parse`]; anything that
//! does not match a known form becomes [`Message::Unrecognized`] and is
//! dropped by the dispatcher without an error. That tolerance is a
//! protocol-level policy: a glitched byte on the wire must never take the
//! acquisition loop down.
//!
//! Outbound traffic is the [`Command`] enum; [`Command::encode`] produces
//! the command body and the link driver appends the `#` terminator when
//! writing.
//!
//! # Inbound forms
//!
//! | Line                        | Message                        |
//! |-----------------------------|--------------------------------|
//! | `V0` / `V1`                 | voltage range 1 V / 10 V       |
//! | `D:v1,...,v8`               | one sample, 8 floats           |
//! | `%START CONT`               | startup snapshot begins        |
//! | `END CONT`                  | startup snapshot complete      |
//! | `HT: CH1:v ... CH8:v`       | bulk high thresholds           |
//! | `LT: CH1:v ... CH8:v`       | bulk low thresholds            |
//! | `ALT CHn v` / `AHT CHn v`   | single low / high threshold    |
//! | `AS CHn c`                  | alarm status, code 0..=2       |
//! | `AM CHn c`                  | alarm mode, code 0..=2         |
//!
//! A `D:` line with the wrong comma count or an unparseable float is
//! dropped whole. Bulk threshold lines are more forgiving: each `CHn:v`
//! token stands alone and malformed tokens are skipped individually, with
//! the literal value `NAN` mapping to `0` (the device reports `NAN` for
//! thresholds that were never set).

use crate::types::{AlarmMode, AlarmStatus, Channel, VoltageRange, CHANNEL_COUNT};

/// Terminator appended to every outbound command
pub const TERMINATOR: u8 = b'#';

/// One parsed inbound line
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Voltage-range selector changed on the device
    VoltageRange(VoltageRange),
    /// One telemetry sample, raw values for all eight channels
    Data([f64; CHANNEL_COUNT]),
    /// The device is about to replay its configuration snapshot
    StartSnapshot,
    /// Configuration snapshot complete; the host acknowledges
    EndSnapshot,
    /// Bulk high thresholds, `None` where the token was malformed
    BulkHighThresholds([Option<f64>; CHANNEL_COUNT]),
    /// Bulk low thresholds, `None` where the token was malformed
    BulkLowThresholds([Option<f64>; CHANNEL_COUNT]),
    /// Single low threshold set
    LowThreshold { channel: Channel, value: f64 },
    /// Single high threshold set
    HighThreshold { channel: Channel, value: f64 },
    /// Device-computed alarm status for one channel
    AlarmStatus { channel: Channel, status: AlarmStatus },
    /// Alarm mode confirmed for one channel
    AlarmMode { channel: Channel, mode: AlarmMode },
    /// Line noise; dropped without effect
    Unrecognized,
}

/// Parse one decoded line (no trailing terminator)
pub fn parse(line: &str) -> Message {
    match line {
        "V0" => return Message::VoltageRange(VoltageRange::OneVolt),
        "V1" => return Message::VoltageRange(VoltageRange::TenVolt),
        "%START CONT" => return Message::StartSnapshot,
        "END CONT" => return Message::EndSnapshot,
        _ => {}
    }

    if let Some(rest) = line.strip_prefix("D:") {
        return parse_data(rest);
    }
    if let Some(rest) = line.strip_prefix("HT: CH") {
        return Message::BulkHighThresholds(parse_bulk_thresholds(rest));
    }
    if let Some(rest) = line.strip_prefix("LT: CH") {
        return Message::BulkLowThresholds(parse_bulk_thresholds(rest));
    }
    if line.starts_with("ALT CH") || line.starts_with("AHT CH") {
        return parse_single_threshold(line);
    }
    if line.starts_with("AS CH") || line.starts_with("AM CH") {
        return parse_alarm(line);
    }

    Message::Unrecognized
}

/// Parse the payload of a `D:` line: exactly 8 comma-separated floats
fn parse_data(payload: &str) -> Message {
    let mut values = [0.0; CHANNEL_COUNT];
    let mut count = 0;
    for field in payload.split(',') {
        if count == CHANNEL_COUNT {
            return Message::Unrecognized;
        }
        match field.trim().parse::<f64>() {
            Ok(v) => values[count] = v,
            Err(_) => return Message::Unrecognized,
        }
        count += 1;
    }
    if count != CHANNEL_COUNT {
        return Message::Unrecognized;
    }
    Message::Data(values)
}

/// Parse the `CHn:v` tokens of a bulk threshold line
///
/// `rest` is the line after the `HT: CH`/`LT: CH` prefix, so the first
/// token has its `CH` already consumed and is re-joined here before the
/// shared token walk.
fn parse_bulk_thresholds(rest: &str) -> [Option<f64>; CHANNEL_COUNT] {
    let mut values = [None; CHANNEL_COUNT];
    let joined = format!("CH{rest}");
    for token in joined.split_whitespace() {
        let Some((name, value)) = token.split_once(':') else {
            continue;
        };
        let Some(channel) = Channel::parse_token(name) else {
            continue;
        };
        // The device reports NAN for thresholds never configured
        let parsed = if value == "NAN" {
            Some(0.0)
        } else {
            value.parse::<f64>().ok()
        };
        if let Some(v) = parsed {
            values[channel.index()] = Some(v);
        }
    }
    values
}

/// Parse `ALT CHn v` / `AHT CHn v`
fn parse_single_threshold(line: &str) -> Message {
    let mut tokens = line.split_whitespace();
    let tag = tokens.next();
    let channel = tokens.next().and_then(Channel::parse_token);
    let value = tokens.next().and_then(|v| v.parse::<f64>().ok());
    match (tag, channel, value, tokens.next()) {
        (Some("ALT"), Some(channel), Some(value), None) => {
            Message::LowThreshold { channel, value }
        }
        (Some("AHT"), Some(channel), Some(value), None) => {
            Message::HighThreshold { channel, value }
        }
        _ => Message::Unrecognized,
    }
}

/// Parse `AS CHn c` / `AM CHn c` with `c` a code in `0..=2`
fn parse_alarm(line: &str) -> Message {
    let mut tokens = line.split_whitespace();
    let tag = tokens.next();
    let channel = tokens.next().and_then(Channel::parse_token);
    let code = tokens.next().and_then(|c| c.parse::<u8>().ok());
    match (tag, channel, code, tokens.next()) {
        (Some("AS"), Some(channel), Some(code), None) => match AlarmStatus::from_code(code) {
            Some(status) => Message::AlarmStatus { channel, status },
            None => Message::Unrecognized,
        },
        (Some("AM"), Some(channel), Some(code), None) => match AlarmMode::from_code(code) {
            Some(mode) => Message::AlarmMode { channel, mode },
            None => Message::Unrecognized,
        },
        _ => Message::Unrecognized,
    }
}

/// One outbound command to the instrument
///
/// [`Command::encode`] yields the body only; the link driver appends the
/// `#` terminator on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Start continuous telemetry
    StartStream,
    /// Stop continuous telemetry
    StopStream,
    /// Acknowledge the end of the startup snapshot
    EndSnapshotAck,
    /// Tell the device the host entered replay mode
    ReplayOn,
    /// Recording started on the host
    RecordOn,
    /// Recording stopped on the host
    RecordOff,
    /// Select the input voltage range
    SetVoltageRange(VoltageRange),
    /// Set one channel's low alarm threshold
    SetLowThreshold { channel: Channel, value: f64 },
    /// Set one channel's high alarm threshold
    SetHighThreshold { channel: Channel, value: f64 },
    /// Set one channel's alarm mode
    SetAlarmMode { channel: Channel, mode: AlarmMode },
}

impl Command {
    /// Encode the command body (without the `#` terminator)
    pub fn encode(&self) -> String {
        match self {
            Command::StartStream => "START CONT".to_string(),
            Command::StopStream => "STOP CONT".to_string(),
            Command::EndSnapshotAck => "END CONT".to_string(),
            Command::ReplayOn => "RPY ON".to_string(),
            Command::RecordOn => "REC ON".to_string(),
            Command::RecordOff => "REC OFF".to_string(),
            Command::SetVoltageRange(VoltageRange::OneVolt) => "V0".to_string(),
            Command::SetVoltageRange(VoltageRange::TenVolt) => "V1".to_string(),
            Command::SetLowThreshold { channel, value } => format!("ALT {channel} {value}"),
            Command::SetHighThreshold { channel, value } => format!("AHT {channel} {value}"),
            Command::SetAlarmMode { channel, mode } => format!("AM {channel} {}", mode.code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_voltage_range() {
        assert_eq!(parse("V0"), Message::VoltageRange(VoltageRange::OneVolt));
        assert_eq!(parse("V1"), Message::VoltageRange(VoltageRange::TenVolt));
        assert_eq!(parse("V2"), Message::Unrecognized);
    }

    #[test]
    fn test_parse_data_line() {
        let msg = parse("D:0.1,0.2,0.3,0.4,9.81,0.0,-9.81,21.5");
        let Message::Data(values) = msg else {
            panic!("expected data message, got {msg:?}");
        };
        assert_eq!(values[0], 0.1);
        assert_eq!(values[4], 9.81);
        assert_eq!(values[6], -9.81);
        assert_eq!(values[7], 21.5);
    }

    #[test]
    fn test_parse_data_wrong_comma_count() {
        // 6 commas: one field short
        assert_eq!(parse("D:1,2,3,4,5,6,7"), Message::Unrecognized);
        // 8 commas: one field too many
        assert_eq!(parse("D:1,2,3,4,5,6,7,8,9"), Message::Unrecognized);
    }

    #[test]
    fn test_parse_data_unparseable_field() {
        assert_eq!(parse("D:1,2,x,4,5,6,7,8"), Message::Unrecognized);
        assert_eq!(parse("D:1,2,,4,5,6,7,8"), Message::Unrecognized);
    }

    #[test]
    fn test_parse_snapshot_markers() {
        assert_eq!(parse("%START CONT"), Message::StartSnapshot);
        assert_eq!(parse("END CONT"), Message::EndSnapshot);
    }

    #[test]
    fn test_parse_bulk_high_thresholds() {
        let line = "HT: CH1:1.5 CH2:2.5 CH3:3.5 CH4:4.5 CH5:5.5 CH6:6.5 CH7:7.5 CH8:8.5";
        let Message::BulkHighThresholds(values) = parse(line) else {
            panic!("expected bulk high thresholds");
        };
        assert_eq!(values[0], Some(1.5));
        assert_eq!(values[7], Some(8.5));
    }

    #[test]
    fn test_parse_bulk_nan_maps_to_zero() {
        let line = "LT: CH1:NAN CH2:-2.0 CH3:NAN CH4:4.0 CH5:5.0 CH6:6.0 CH7:7.0 CH8:8.0";
        let Message::BulkLowThresholds(values) = parse(line) else {
            panic!("expected bulk low thresholds");
        };
        assert_eq!(values[0], Some(0.0));
        assert_eq!(values[1], Some(-2.0));
        assert_eq!(values[2], Some(0.0));
        assert_eq!(values[3], Some(4.0));
    }

    #[test]
    fn test_parse_bulk_skips_malformed_tokens() {
        let line = "HT: CH1:1.0 CH9:2.0 bogus CH3:abc CH4:4.0";
        let Message::BulkHighThresholds(values) = parse(line) else {
            panic!("expected bulk high thresholds");
        };
        assert_eq!(values[0], Some(1.0));
        assert_eq!(values[2], None);
        assert_eq!(values[3], Some(4.0));
        assert_eq!(values[8 - 1], None);
    }

    #[test]
    fn test_parse_single_thresholds() {
        assert_eq!(
            parse("ALT CH3 -1.25"),
            Message::LowThreshold {
                channel: Channel::new(3).unwrap(),
                value: -1.25
            }
        );
        assert_eq!(
            parse("AHT CH8 30"),
            Message::HighThreshold {
                channel: Channel::new(8).unwrap(),
                value: 30.0
            }
        );
        assert_eq!(parse("ALT CH9 1.0"), Message::Unrecognized);
        assert_eq!(parse("AHT CH1"), Message::Unrecognized);
    }

    #[test]
    fn test_parse_alarm_status_and_mode() {
        assert_eq!(
            parse("AS CH2 1"),
            Message::AlarmStatus {
                channel: Channel::new(2).unwrap(),
                status: AlarmStatus::LowerBreach
            }
        );
        assert_eq!(
            parse("AM CH5 2"),
            Message::AlarmMode {
                channel: Channel::new(5).unwrap(),
                mode: AlarmMode::Latching
            }
        );
        // Out-of-range codes are noise, not errors
        assert_eq!(parse("AS CH2 7"), Message::Unrecognized);
        assert_eq!(parse("AM CH5 3"), Message::Unrecognized);
    }

    #[test]
    fn test_parse_noise() {
        assert_eq!(parse(""), Message::Unrecognized);
        assert_eq!(parse("hello"), Message::Unrecognized);
        assert_eq!(parse("D"), Message::Unrecognized);
        assert_eq!(parse("HT:"), Message::Unrecognized);
    }

    #[test]
    fn test_command_encoding() {
        assert_eq!(Command::StartStream.encode(), "START CONT");
        assert_eq!(Command::StopStream.encode(), "STOP CONT");
        assert_eq!(Command::EndSnapshotAck.encode(), "END CONT");
        assert_eq!(Command::ReplayOn.encode(), "RPY ON");
        assert_eq!(Command::RecordOn.encode(), "REC ON");
        assert_eq!(Command::RecordOff.encode(), "REC OFF");
        assert_eq!(
            Command::SetVoltageRange(VoltageRange::TenVolt).encode(),
            "V1"
        );
        assert_eq!(
            Command::SetLowThreshold {
                channel: Channel::new(1).unwrap(),
                value: -0.5
            }
            .encode(),
            "ALT CH1 -0.5"
        );
        assert_eq!(
            Command::SetAlarmMode {
                channel: Channel::new(4).unwrap(),
                mode: AlarmMode::Live
            }
            .encode(),
            "AM CH4 1"
        );
    }
}
