//! Recording session controller and CSV serialization

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{DaqError, Result};
use crate::link::LinkDriver;
use crate::protocol::Command;
use crate::state::SharedHandle;
use crate::store::RecordedSample;

use super::{FILE_NAME_FORMAT, ROW_TIME_FORMAT};

/// Start/stop controller over the store's capture flag
///
/// While a session is active, commands that would change the device
/// configuration mid-recording (channel-mode switches, voltage-range
/// changes, port refresh) must not be issued. That is a policy contract
/// the surrounding control layer honors by checking
/// [`RecordingSession::config_locked`]; nothing here enforces it.
pub struct RecordingSession {
    shared: SharedHandle,
    output_dir: PathBuf,
    active: bool,
}

impl RecordingSession {
    /// Create an inactive session writing files into `output_dir`
    pub fn new(shared: SharedHandle, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            shared,
            output_dir: output_dir.into(),
            active: false,
        }
    }

    /// Whether a recording is in progress
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether device-configuration commands are locked out
    pub fn config_locked(&self) -> bool {
        self.active
    }

    /// Start capturing; no-op unless the link is open
    ///
    /// Returns whether the session actually started. The device is told
    /// with `REC ON`; a failed notify is reported through the link's
    /// condition queue but does not stop the capture.
    pub fn start(&mut self, link: &LinkDriver) -> bool {
        if self.active {
            return true;
        }
        if !link.is_open() {
            tracing::warn!("recording not started: link is not open");
            return false;
        }
        self.shared.lock().unwrap().store.start_capture();
        self.active = true;
        if let Err(e) = link.send(Command::RecordOn) {
            tracing::warn!("failed to notify device of recording start: {e}");
        }
        tracing::info!("recording started");
        true
    }

    /// Stop capturing and persist the buffer
    ///
    /// The capture flag is dropped and the buffer drained regardless of
    /// the outcome; a failed file write surfaces as
    /// [`DaqError::Persistence`] after that cleanup. Returns the written
    /// path, or `None` when the session was idle or nothing was captured.
    pub fn stop(&mut self, link: &LinkDriver) -> Result<Option<PathBuf>> {
        if !self.active {
            return Ok(None);
        }
        self.active = false;

        if link.is_open() {
            if let Err(e) = link.send(Command::RecordOff) {
                tracing::warn!("failed to notify device of recording stop: {e}");
            }
        }

        // Drain under the lock, write outside it
        let (samples, headers) = {
            let mut guard = self.shared.lock().unwrap();
            (guard.store.stop_capture(), guard.store.headers())
        };
        if samples.is_empty() {
            tracing::info!("recording stopped with no captured samples");
            return Ok(None);
        }

        let path = self.output_dir.join(session_file_name(&samples[0]));
        write_session_csv(&path, &headers, &samples)?;
        tracing::info!("recording saved to {}", path.display());
        Ok(Some(path))
    }
}

/// Derive the file name from the first captured sample
pub fn session_file_name(first: &RecordedSample) -> String {
    format!("{}.csv", first.wall_clock.format(FILE_NAME_FORMAT))
}

/// Write one recorded session in the documented CSV format
pub fn write_session_csv(
    path: &Path,
    headers: &[String],
    samples: &[RecordedSample],
) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| DaqError::Persistence(format!("create {}: {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    let mut header_row = Vec::with_capacity(headers.len() + 1);
    header_row.push("Time".to_string());
    header_row.extend_from_slice(headers);
    writer
        .write_record(&header_row)
        .map_err(|e| DaqError::Persistence(e.to_string()))?;

    for sample in samples {
        let mut row = Vec::with_capacity(sample.values.len() + 1);
        row.push(sample.wall_clock.format(ROW_TIME_FORMAT).to_string());
        row.extend(sample.values.iter().map(|v| v.to_string()));
        writer
            .write_record(&row)
            .map_err(|e| DaqError::Persistence(e.to_string()))?;
    }

    writer
        .flush()
        .map_err(|e| DaqError::Persistence(e.to_string()))
}
