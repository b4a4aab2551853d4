// File:    rotation.rs
// Author:  apezoo
// Date:    2026-10-18
//
// Description: Background worker that periodically generates a password and appends it to the rotation log.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

//! The rotation worker and its append-only log.
//!
//! Each log line has the shape `<ISO-8601 UTC timestamp>Z <password>`. Lines
//! are only ever appended; the worker opens, writes, syncs and closes the file
//! once per cycle and never holds it across the interval sleep.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::password::{self, PasswordPolicy};
use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Longest the worker sleeps before checking for cancellation.
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_secs(1);

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// One line of the rotation log. The password is wiped when the entry is
/// dropped; the copy already on disk is not.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct RotationLogEntry {
    /// When the password was generated.
    #[zeroize(skip)]
    pub timestamp: DateTime<Utc>,
    /// The generated password.
    pub password: String,
}

impl RotationLogEntry {
    /// Stamps `password` with the current UTC time.
    #[must_use]
    pub fn now(password: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            password: password.into(),
        }
    }

    /// The timestamp as written to the log, e.g. `2024-03-09T17:04:05.000000Z`.
    #[must_use]
    pub fn timestamp_string(&self) -> String {
        format!("{}Z", self.timestamp.format(TIMESTAMP_FORMAT))
    }

    /// Renders the entry as a newline-terminated log line.
    #[must_use]
    pub fn to_line(&self) -> String {
        format!("{} {}\n", self.timestamp_string(), self.password)
    }

    /// Parses a single log line, with or without its trailing newline.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (stamp, password) = line.split_once(' ')?;
        let stamp = stamp.strip_suffix('Z')?;
        if password.is_empty() {
            return None;
        }
        // Older writers omitted the fractional part when it was zero.
        let naive = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S"))
            .ok()?;
        Some(Self {
            timestamp: naive.and_utc(),
            password: password.to_owned(),
        })
    }
}

/// Appends `entry` to the log at `path`, creating the file if needed, and
/// syncs it to disk before returning.
///
/// # Errors
///
/// Returns [`Error::LogWrite`] if the file cannot be opened, written or synced.
pub fn append_entry(path: &Path, entry: &RotationLogEntry) -> Result<()> {
    let log_write = |source| Error::LogWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut file = open_for_append(path).map_err(log_write)?;
    let mut line = entry.to_line();
    let written = file.write_all(line.as_bytes());
    line.zeroize();
    written.map_err(log_write)?;
    file.sync_data().map_err(log_write)?;
    Ok(())
}

#[cfg(unix)]
fn open_for_append(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_for_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Reads every well-formed entry from the log at `path`. A missing log reads
/// as empty; malformed lines are skipped.
///
/// # Errors
///
/// Returns [`Error::LogRead`] if the file exists but cannot be read.
pub fn read_entries(path: &Path) -> Result<Vec<RotationLogEntry>> {
    let log_read = |source| Error::LogRead {
        path: path.to_path_buf(),
        source,
    };

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(log_read(e)),
    };

    let mut entries = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(log_read)?;
        if line.trim().is_empty() {
            continue;
        }
        match RotationLogEntry::parse_line(&line) {
            Some(entry) => entries.push(entry),
            None => warn!(
                "Skipping malformed line {} in rotation log '{}'",
                index + 1,
                path.display()
            ),
        }
    }
    Ok(entries)
}

/// Converts an interval in hours to a sleep duration no shorter than `floor`.
/// Zero, negative and non-finite inputs all yield `floor`.
#[must_use]
pub fn rotation_interval(hours: f64, floor: Duration) -> Duration {
    let seconds = hours * 3600.0;
    if !seconds.is_finite() || seconds <= floor.as_secs_f64() {
        return floor;
    }
    Duration::try_from_secs_f64(seconds).unwrap_or(floor)
}

/// Progress counters shared between the worker thread and its owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationStatus {
    /// Cycles that appended an entry.
    pub cycles: u64,
    /// Cycles that failed to generate or log a password.
    pub failures: u64,
    /// Message of the most recent failure, kept until the next success.
    pub last_error: Option<String>,
}

struct ActiveRun {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl ActiveRun {
    fn signal(&self) {
        // The loop may already have exited; a closed channel is fine.
        let _ = self.stop_tx.send(());
    }
}

/// Owns at most one background rotation loop.
pub struct RotationWorker {
    log_path: PathBuf,
    min_interval: Duration,
    active: Mutex<Option<ActiveRun>>,
    stopping: Mutex<Option<JoinHandle<()>>>,
    status: Arc<Mutex<RotationStatus>>,
}

impl RotationWorker {
    /// Creates a stopped worker writing to `config.rotation_log_path`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            log_path: config.rotation_log_path.clone(),
            min_interval: config.min_rotation_interval,
            active: Mutex::new(None),
            stopping: Mutex::new(None),
            status: Arc::new(Mutex::new(RotationStatus::default())),
        }
    }

    /// The log this worker appends to.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Starts rotating every `interval_hours` (never faster than the configured
    /// floor). Does nothing if a loop is already running. If a previous loop
    /// was stopped but is still finishing its cycle, waits for it first so the
    /// log never has two writers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPolicy`] for an unusable policy and
    /// [`Error::Spawn`] if the thread cannot be created. In both cases no loop
    /// is started.
    pub fn start(&self, interval_hours: f64, policy: PasswordPolicy) -> Result<()> {
        policy.validate()?;

        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|run| !run.handle.is_finished()) {
            debug!("Rotation already running; ignoring start request");
            return Ok(());
        }
        if let Some(previous) = self.stopping.lock().take() {
            join_loop(previous);
        }

        let interval = rotation_interval(interval_hours, self.min_interval);
        let (stop_tx, stop_rx) = mpsc::channel();
        let rotation = RotationLoop {
            log_path: self.log_path.clone(),
            interval,
            policy,
            status: Arc::clone(&self.status),
        };
        let handle = thread::Builder::new()
            .name("ludos-rotation".to_owned())
            .spawn(move || rotation.run(&stop_rx))
            .map_err(Error::Spawn)?;

        info!(
            "Rotation started: every {}s into '{}'",
            interval.as_secs_f64(),
            self.log_path.display()
        );
        *active = Some(ActiveRun { stop_tx, handle });
        Ok(())
    }

    /// Signals the running loop to stop and returns without waiting for it.
    /// The loop exits within [`CANCEL_POLL_INTERVAL`] of the signal, or after
    /// finishing the cycle in progress. Does nothing if the worker is stopped.
    pub fn stop(&self) {
        let mut active = self.active.lock();
        if let Some(run) = active.take() {
            run.signal();
            *self.stopping.lock() = Some(run.handle);
            info!("Rotation stop requested");
        }
    }

    /// Signals the running loop to stop and waits for its thread to exit.
    pub fn shutdown(&self) {
        let mut active = self.active.lock();
        if let Some(previous) = self.stopping.lock().take() {
            join_loop(previous);
        }
        if let Some(run) = active.take() {
            run.signal();
            join_loop(run.handle);
            info!("Rotation stopped");
        }
    }

    /// Whether a rotation loop is currently alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|run| !run.handle.is_finished())
    }

    /// A snapshot of the worker's progress counters.
    #[must_use]
    pub fn status(&self) -> RotationStatus {
        self.status.lock().clone()
    }
}

fn join_loop(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        warn!("Rotation thread panicked");
    }
}

impl Drop for RotationWorker {
    fn drop(&mut self) {
        if let Some(run) = self.active.get_mut().take() {
            run.signal();
        }
    }
}

struct RotationLoop {
    log_path: PathBuf,
    interval: Duration,
    policy: PasswordPolicy,
    status: Arc<Mutex<RotationStatus>>,
}

impl RotationLoop {
    fn run(self, stop_rx: &Receiver<()>) {
        loop {
            match self.rotate_once() {
                Ok(()) => {
                    let mut status = self.status.lock();
                    status.cycles += 1;
                    status.last_error = None;
                    debug!("Rotation cycle {} written", status.cycles);
                }
                Err(e) => {
                    warn!("Rotation cycle failed, retrying next interval: {e}");
                    let mut status = self.status.lock();
                    status.failures += 1;
                    status.last_error = Some(e.to_string());
                }
            }

            if wait_for_stop(stop_rx, self.interval) {
                debug!("Rotation loop observed cancellation");
                return;
            }
        }
    }

    fn rotate_once(&self) -> Result<()> {
        let password = password::generate(&self.policy)?;
        let entry = RotationLogEntry::now(password.as_str());
        append_entry(&self.log_path, &entry)
    }
}

/// Sleeps for `interval`, waking at least every [`CANCEL_POLL_INTERVAL`].
/// Returns true as soon as a stop is signalled or the sender is gone.
fn wait_for_stop(stop_rx: &Receiver<()>, interval: Duration) -> bool {
    // An interval past the clock's range never elapses; only a stop ends it.
    let deadline = Instant::now().checked_add(interval);
    loop {
        let slice = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return false;
                }
                remaining.min(CANCEL_POLL_INTERVAL)
            }
            None => CANCEL_POLL_INTERVAL,
        };
        match stop_rx.recv_timeout(slice) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return true,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn log_line_round_trips() {
        let entry = RotationLogEntry {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 9, 17, 4, 5).unwrap(),
            password: "aB3$xyz".to_owned(),
        };
        let line = entry.to_line();
        assert_eq!(line, "2024-03-09T17:04:05.000000Z aB3$xyz\n");
        assert_eq!(RotationLogEntry::parse_line(&line), Some(entry));
    }

    #[test]
    fn parse_accepts_whole_second_timestamps() {
        let entry = RotationLogEntry::parse_line("2024-03-09T17:04:05Z hunter2").unwrap();
        assert_eq!(entry.timestamp, Utc.with_ymd_and_hms(2024, 3, 9, 17, 4, 5).unwrap());
        assert_eq!(entry.password, "hunter2");
    }

    #[test]
    fn parse_rejects_malformed_lines() {
        assert!(RotationLogEntry::parse_line("").is_none());
        assert!(RotationLogEntry::parse_line("no-timestamp").is_none());
        assert!(RotationLogEntry::parse_line("2024-03-09T17:04:05 missing-zulu").is_none());
        assert!(RotationLogEntry::parse_line("2024-03-09T17:04:05Z ").is_none());
    }

    #[test]
    fn interval_is_clamped_to_the_floor() {
        let floor = Duration::from_secs(360);
        assert_eq!(rotation_interval(0.0, floor), floor);
        assert_eq!(rotation_interval(-3.0, floor), floor);
        assert_eq!(rotation_interval(f64::NAN, floor), floor);
        assert_eq!(rotation_interval(f64::INFINITY, floor), floor);
        assert_eq!(rotation_interval(0.05, floor), floor);
        assert_eq!(rotation_interval(2.0, floor), Duration::from_secs(7200));
    }

    #[test]
    fn wait_returns_early_on_signal_and_on_disconnect() {
        let (tx, rx) = mpsc::channel();
        tx.send(()).unwrap();
        assert!(wait_for_stop(&rx, Duration::from_secs(30)));

        drop(tx);
        let started = Instant::now();
        assert!(wait_for_stop(&rx, Duration::from_secs(30)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn wait_survives_intervals_beyond_the_clock() {
        let (tx, rx) = mpsc::channel();
        let waiter = thread::spawn(move || wait_for_stop(&rx, Duration::MAX));
        thread::sleep(Duration::from_millis(1200));
        assert!(!waiter.is_finished());
        tx.send(()).unwrap();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn zeroize_wipes_the_password() {
        let mut entry = RotationLogEntry::now("s3cret-Value");
        entry.zeroize();
        assert!(entry.password.is_empty());
    }

    #[test]
    fn wait_times_out_without_signal() {
        let (_tx, rx) = mpsc::channel::<()>();
        assert!(!wait_for_stop(&rx, Duration::from_millis(20)));
    }
}
