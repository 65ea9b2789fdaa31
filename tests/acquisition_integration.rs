//! Integration tests for the acquisition core
//!
//! These tests validate the complete data path:
//! - Concurrent append/pull over the shared-state lock
//! - Recording a session to CSV and replaying it
//! - The full link → dispatch → store → record → replay flow
//!   (with the `mock-link` feature)

use std::thread;

use daqlink::session::{load, write_session_csv};
use daqlink::state::new_shared;
use daqlink::store::RecordedSample;
use daqlink::types::CHANNEL_COUNT;

#[test]
fn test_concurrent_append_and_pull() {
    let shared = new_shared();
    let appender_handle = {
        let shared = shared.clone();
        thread::spawn(move || {
            for i in 0..10_000u32 {
                let mut guard = shared.lock().unwrap();
                guard.store.append_raw([i as f64; CHANNEL_COUNT]);
            }
        })
    };
    let puller_handle = {
        let shared = shared.clone();
        thread::spawn(move || {
            for _ in 0..10_000u32 {
                let snapshot = shared.lock().unwrap().store.pull();
                // Every snapshot must be length-consistent across all
                // nine sequences
                for series in &snapshot.channels {
                    assert_eq!(series.len(), snapshot.timestamps.len());
                }
            }
        })
    };

    appender_handle.join().expect("appender panicked");
    puller_handle.join().expect("puller panicked");

    let snapshot = shared.lock().unwrap().store.pull();
    assert_eq!(snapshot.len(), 1000);
    assert_eq!(snapshot.channels[0].last(), Some(&9999.0));
}

#[test]
fn test_record_replay_round_trip() {
    use chrono::{Local, TimeZone};

    let dir = tempfile::tempdir().unwrap();
    let base = Local.with_ymd_and_hms(2024, 6, 10, 14, 0, 0).unwrap();

    let samples: Vec<RecordedSample> = (0..50)
        .map(|i| RecordedSample {
            wall_clock: base + chrono::Duration::milliseconds(i * 200),
            values: std::array::from_fn(|ch| (i as f64).mul_add(0.01, ch as f64)),
        })
        .collect();
    let headers: Vec<String> = (1..=CHANNEL_COUNT).map(|n| format!("CH{n} (V)")).collect();

    let path = dir.path().join(daqlink::session::session_file_name(&samples[0]));
    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "2024-06-10_14-00-00.csv"
    );
    write_session_csv(&path, &headers, &samples).unwrap();

    let session = load(&path).unwrap();
    assert_eq!(session.snapshot.len(), samples.len());
    assert_eq!(session.snapshot.timestamps[0], 0.0);
    for pair in session.snapshot.timestamps.windows(2) {
        assert!(pair[1] > pair[0], "timestamps must increase");
    }
    for (i, sample) in samples.iter().enumerate() {
        let written_t = i as f64 * 0.2;
        assert!((session.snapshot.timestamps[i] - written_t).abs() <= 1e-3);
        for ch in 0..CHANNEL_COUNT {
            assert!((session.snapshot.channels[ch][i] - sample.values[ch]).abs() <= 1e-3);
        }
    }
}

#[cfg(feature = "mock-link")]
mod with_mock_link {
    use super::*;
    use daqlink::link::{condition_channel, mock::MockTransport, LinkDriver};
    use daqlink::protocol::Command;
    use daqlink::session::RecordingSession;
    use daqlink::types::{Channel, ChannelMode, CurrentSource, SensorKind};
    use std::time::{Duration, Instant};

    fn wait_for(mut pred: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if pred() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_full_acquisition_flow() {
        let dir = tempfile::tempdir().unwrap();
        let shared = new_shared();
        let (tx, _conditions) = condition_channel();

        // Channel 2 reads a thermistor; everything else stays raw
        shared
            .lock()
            .unwrap()
            .store
            .set_channel_mode(
                Channel::new(2).unwrap(),
                ChannelMode::ResistiveTemperature {
                    sensor: SensorKind::Thermistor,
                    current: CurrentSource::I200uA,
                },
            )
            .unwrap();

        let mock = MockTransport::new();
        let mut link = LinkDriver::new(shared.clone(), tx);
        link.open(Box::new(mock.clone())).unwrap();
        link.send(Command::StartStream).unwrap();

        let mut session = RecordingSession::new(shared.clone(), dir.path());
        assert!(session.start(&link));

        for i in 0..5 {
            mock.push_line(&format!("D:0.1,0.1,0.3,0.4,9.81,0,-9.81,{}", 20 + i));
            assert!(wait_for(|| shared.lock().unwrap().store.len() == i + 1));
            // The consumer pull is what feeds the recording buffer
            shared.lock().unwrap().store.pull();
        }

        let path = session.stop(&link).unwrap().expect("file written");
        link.close();

        let replayed = load(&path).unwrap();
        assert_eq!(replayed.snapshot.len(), 5);
        assert_eq!(replayed.headers[1], "CH2 (C) 200uA Thermistor");
        assert_eq!(replayed.headers[4], "CH5 (m/s^2)");

        // Channel 2 was converted before storage; channel 1 stayed raw
        let expected =
            daqlink::convert::convert(0.1, CurrentSource::I200uA, SensorKind::Thermistor).unwrap();
        assert!((replayed.snapshot.channels[1][0] - expected).abs() < 1e-3);
        assert!((replayed.snapshot.channels[0][0] - 0.1).abs() < 1e-9);
        assert_eq!(replayed.snapshot.channels[7][4], 24.0);

        assert!(mock.written().contains("START CONT#"));
        assert!(mock.written().contains("REC ON#"));
        assert!(mock.written().contains("REC OFF#"));
    }
}
