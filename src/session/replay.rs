//! Replay loader: recorded CSV back into snapshot-shaped data

use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::{DaqError, Result};
use crate::store::TelemetrySnapshot;
use crate::types::CHANNEL_COUNT;

use super::ROW_TIME_FORMAT;

/// A recorded session loaded for offline inspection
///
/// The snapshot has the same shape as
/// [`TelemetryStore::pull`](crate::store::TelemetryStore::pull), with
/// timestamps re-based so the first row is `t = 0.0`.
#[derive(Debug, Clone)]
pub struct ReplaySession {
    /// Samples in live-snapshot shape
    pub snapshot: TelemetrySnapshot,
    /// The eight channel headers from the file's header row
    pub headers: Vec<String>,
}

/// Load a recorded session file
///
/// Fails with [`DaqError::Format`] when the header row is missing or
/// malformed, or when any data row cannot be parsed.
pub fn load(path: &Path) -> Result<ReplaySession> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| DaqError::Format(format!("open {}: {e}", path.display())))?;

    let header_row = reader
        .headers()
        .map_err(|e| DaqError::Format(format!("header row: {e}")))?
        .clone();
    if header_row.len() != CHANNEL_COUNT + 1 || header_row.get(0) != Some("Time") {
        return Err(DaqError::Format(format!(
            "expected a Time column and {CHANNEL_COUNT} channel headers, got {} fields",
            header_row.len()
        )));
    }
    let headers: Vec<String> = header_row.iter().skip(1).map(str::to_string).collect();

    let mut snapshot = TelemetrySnapshot::default();
    let mut start: Option<NaiveDateTime> = None;

    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| DaqError::Format(format!("row {}: {e}", index + 1)))?;
        let (time, values) = parse_row(&record, index)?;
        let start = *start.get_or_insert(time);
        let elapsed = (time - start).num_milliseconds() as f64 / 1000.0;
        snapshot.timestamps.push(elapsed);
        for (series, value) in snapshot.channels.iter_mut().zip(values) {
            series.push(value);
        }
    }

    if snapshot.is_empty() {
        return Err(DaqError::Format("file has no data rows".to_string()));
    }

    Ok(ReplaySession { snapshot, headers })
}

/// Parse one data row into its wall-clock time and channel values
fn parse_row(record: &csv::StringRecord, index: usize) -> Result<(NaiveDateTime, [f64; CHANNEL_COUNT])> {
    let row = index + 1;
    if record.len() != CHANNEL_COUNT + 1 {
        return Err(DaqError::Format(format!(
            "row {row}: expected {} fields, got {}",
            CHANNEL_COUNT + 1,
            record.len()
        )));
    }

    let time_field = record.get(0).unwrap_or_default();
    let time = NaiveDateTime::parse_from_str(time_field, ROW_TIME_FORMAT)
        .map_err(|e| DaqError::Format(format!("row {row}: bad timestamp {time_field:?}: {e}")))?;

    let mut values = [0.0; CHANNEL_COUNT];
    for (slot, field) in values.iter_mut().zip(record.iter().skip(1)) {
        *slot = field
            .parse::<f64>()
            .map_err(|e| DaqError::Format(format!("row {row}: bad value {field:?}: {e}")))?;
    }
    Ok((time, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const HEADER: &str =
        "Time,CH1 (V),CH2 (C) 200uA Thermistor,CH3 (V),CH4 (V),CH5 (m/s^2),CH6 (m/s^2),CH7 (m/s^2),CH8 (C)";

    #[test]
    fn test_load_rebases_timestamps() {
        let file = write_file(&format!(
            "{HEADER}\n\
             2024-05-01_12-30-45.000,0.1,21.5,0.3,0.4,9.81,0,-9.81,22\n\
             2024-05-01_12-30-45.250,0.2,21.6,0.3,0.4,9.81,0,-9.81,22\n\
             2024-05-01_12-30-46.000,0.3,21.7,0.3,0.4,9.81,0,-9.81,22\n"
        ));

        let session = load(file.path()).unwrap();
        assert_eq!(session.snapshot.timestamps, vec![0.0, 0.25, 1.0]);
        assert_eq!(session.snapshot.channels[0], vec![0.1, 0.2, 0.3]);
        assert_eq!(session.snapshot.channels[7], vec![22.0, 22.0, 22.0]);
        assert_eq!(session.headers.len(), 8);
        assert_eq!(session.headers[1], "CH2 (C) 200uA Thermistor");
    }

    #[test]
    fn test_sequences_stay_synchronized() {
        let file = write_file(&format!(
            "{HEADER}\n2024-05-01_12-30-45.000,1,2,3,4,5,6,7,8\n"
        ));
        let session = load(file.path()).unwrap();
        for series in &session.snapshot.channels {
            assert_eq!(series.len(), session.snapshot.timestamps.len());
        }
    }

    #[test]
    fn test_missing_header_is_format_error() {
        let file = write_file("");
        assert!(matches!(
            load(file.path()).unwrap_err(),
            DaqError::Format(_)
        ));

        let file = write_file("Time,CH1 (V)\n");
        assert!(matches!(
            load(file.path()).unwrap_err(),
            DaqError::Format(_)
        ));
    }

    #[test]
    fn test_no_data_rows_is_format_error() {
        let file = write_file(&format!("{HEADER}\n"));
        assert!(matches!(
            load(file.path()).unwrap_err(),
            DaqError::Format(_)
        ));
    }

    #[test]
    fn test_bad_first_row_is_format_error() {
        let file = write_file(&format!(
            "{HEADER}\nnot-a-time,1,2,3,4,5,6,7,8\n"
        ));
        assert!(matches!(
            load(file.path()).unwrap_err(),
            DaqError::Format(_)
        ));

        let file = write_file(&format!(
            "{HEADER}\n2024-05-01_12-30-45.000,1,2,x,4,5,6,7,8\n"
        ));
        assert!(matches!(
            load(file.path()).unwrap_err(),
            DaqError::Format(_)
        ));
    }

    #[test]
    fn test_round_trip_with_recorder() {
        use crate::session::write_session_csv;
        use crate::store::RecordedSample;
        use chrono::{Local, TimeZone};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.csv");
        let base = Local.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

        let samples: Vec<RecordedSample> = (0..20)
            .map(|i| RecordedSample {
                wall_clock: base + chrono::Duration::milliseconds(i * 250),
                values: std::array::from_fn(|ch| (i as f64) * 0.5 + ch as f64),
            })
            .collect();
        let headers: Vec<String> = (1..=8).map(|n| format!("CH{n} (V)")).collect();

        write_session_csv(&path, &headers, &samples).unwrap();
        let session = load(&path).unwrap();

        assert_eq!(session.snapshot.len(), 20);
        assert_eq!(session.snapshot.timestamps[0], 0.0);
        for pair in session.snapshot.timestamps.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        // Timestamps survive at millisecond precision
        for (i, t) in session.snapshot.timestamps.iter().enumerate() {
            assert!((t - i as f64 * 0.25).abs() <= 1e-3);
        }
        // Values survive exactly
        for (i, sample) in samples.iter().enumerate() {
            for (ch, series) in session.snapshot.channels.iter().enumerate() {
                assert_eq!(series[i], sample.values[ch]);
            }
        }
        assert_eq!(session.headers, headers);
    }
}
