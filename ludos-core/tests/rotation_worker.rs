#![allow(missing_docs)]
use ludos_core::rotation::{self, RotationWorker};
use ludos_core::{Config, Error, PasswordPolicy};
use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn line_count(path: &Path) -> usize {
    fs::read_to_string(path).map_or(0, |log| log.lines().count())
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

#[test]
fn test_first_entry_is_written_immediately() {
    // 1. Setup
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = Config::in_dir(temp_dir.path());
    let worker = RotationWorker::new(&config);
    let policy = PasswordPolicy {
        length: 12,
        include_upper: true,
        include_lower: true,
        include_digits: true,
        include_symbols: false,
    };

    // 2. Start with the default 0.1 hour floor; the first cycle runs right away
    worker.start(0.1, policy).expect("Failed to start rotation");
    assert!(wait_until(Duration::from_secs(5), || line_count(&config.rotation_log_path) == 1));
    worker.shutdown();

    // 3. The entry is well formed
    let entries = rotation::read_entries(&config.rotation_log_path).expect("Failed to read log");
    assert_eq!(entries.len(), 1);
    let password = &entries[0].password;
    assert_eq!(password.len(), 12);
    assert!(password.chars().any(|c| c.is_ascii_uppercase()));
    assert!(password.chars().any(|c| c.is_ascii_lowercase()));
    assert!(password.chars().any(|c| c.is_ascii_digit()));
    assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));

    let raw = fs::read_to_string(&config.rotation_log_path).expect("Failed to read log");
    let (stamp, rest) = raw.split_once(' ').expect("Missing separator");
    assert!(stamp.ends_with('Z'), "{stamp}");
    assert_eq!(rest, format!("{password}\n"));
}

#[test]
fn test_second_start_does_not_spawn_a_second_loop() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = Config::in_dir(temp_dir.path()).with_min_rotation_interval(Duration::from_secs(30));
    let worker = RotationWorker::new(&config);

    worker.start(0.0, PasswordPolicy::default()).expect("Failed to start rotation");
    worker.start(0.0, PasswordPolicy::default()).expect("Second start should be a no-op");
    assert!(worker.is_running());

    assert!(wait_until(Duration::from_secs(5), || line_count(&config.rotation_log_path) >= 1));
    thread::sleep(Duration::from_millis(300));
    assert_eq!(line_count(&config.rotation_log_path), 1);
    assert_eq!(worker.status().cycles, 1);

    worker.shutdown();
    assert!(!worker.is_running());
}

#[test]
fn test_stop_halts_appends_within_grace_period() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = Config::in_dir(temp_dir.path()).with_min_rotation_interval(Duration::from_millis(100));
    let worker = RotationWorker::new(&config);

    worker.start(0.0, PasswordPolicy::default()).expect("Failed to start rotation");
    assert!(wait_until(Duration::from_secs(5), || line_count(&config.rotation_log_path) >= 3));

    worker.stop();
    assert!(!worker.is_running());

    // Allow a cycle that was already in flight to land, then expect silence.
    thread::sleep(Duration::from_millis(500));
    let after_stop = line_count(&config.rotation_log_path);
    thread::sleep(Duration::from_secs(2));
    assert_eq!(line_count(&config.rotation_log_path), after_stop);
}

#[test]
fn test_shutdown_interrupts_a_long_sleep() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = Config::in_dir(temp_dir.path());
    let worker = RotationWorker::new(&config);

    worker.start(24.0, PasswordPolicy::default()).expect("Failed to start rotation");
    assert!(wait_until(Duration::from_secs(5), || line_count(&config.rotation_log_path) == 1));

    let started = Instant::now();
    worker.shutdown();
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_restart_after_stop_runs_a_fresh_loop() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = Config::in_dir(temp_dir.path()).with_min_rotation_interval(Duration::from_secs(30));
    let worker = RotationWorker::new(&config);

    worker.start(0.0, PasswordPolicy::default()).expect("Failed to start rotation");
    assert!(wait_until(Duration::from_secs(5), || line_count(&config.rotation_log_path) == 1));
    worker.stop();

    // The earlier stop signal must not cancel the new run.
    worker.start(0.0, PasswordPolicy::default()).expect("Failed to restart rotation");
    assert!(wait_until(Duration::from_secs(5), || line_count(&config.rotation_log_path) == 2));
    thread::sleep(Duration::from_millis(200));
    assert!(worker.is_running());
    worker.shutdown();
}

#[test]
fn test_write_failures_are_retried_without_killing_the_loop() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let mut config = Config::in_dir(temp_dir.path()).with_min_rotation_interval(Duration::from_millis(50));
    config.rotation_log_path = temp_dir.path().join("missing-dir").join("rotation.txt");
    let worker = RotationWorker::new(&config);

    worker.start(0.0, PasswordPolicy::default()).expect("Failed to start rotation");
    assert!(wait_until(Duration::from_secs(5), || worker.status().failures >= 2));
    assert!(worker.is_running());
    let status = worker.status();
    assert_eq!(status.cycles, 0);
    assert!(status.last_error.is_some_and(|e| e.contains("rotation log")));

    // Once the directory appears the next tick succeeds.
    fs::create_dir(temp_dir.path().join("missing-dir")).expect("Failed to create log dir");
    assert!(wait_until(Duration::from_secs(5), || worker.status().cycles >= 1));
    assert!(worker.status().last_error.is_none());
    worker.shutdown();
}

#[test]
fn test_invalid_policy_does_not_start() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = Config::in_dir(temp_dir.path());
    let worker = RotationWorker::new(&config);

    let err = worker.start(1.0, PasswordPolicy::new(0)).expect_err("Zero length must be rejected");
    assert!(matches!(err, Error::InvalidPolicy(_)));
    assert!(!worker.is_running());
    thread::sleep(Duration::from_millis(100));
    assert!(!config.rotation_log_path.exists());
}

#[test]
fn test_dropping_the_worker_stops_the_loop() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = Config::in_dir(temp_dir.path()).with_min_rotation_interval(Duration::from_millis(100));
    {
        let worker = RotationWorker::new(&config);
        worker.start(0.0, PasswordPolicy::default()).expect("Failed to start rotation");
        assert!(wait_until(Duration::from_secs(5), || line_count(&config.rotation_log_path) >= 1));
    }
    thread::sleep(Duration::from_millis(500));
    let after_drop = line_count(&config.rotation_log_path);
    thread::sleep(Duration::from_millis(1500));
    assert_eq!(line_count(&config.rotation_log_path), after_drop);
}

#[test]
fn test_read_entries_skips_malformed_lines() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("rotation.txt");
    fs::write(
        &path,
        "2024-05-01T10:00:00.123456Z first\ngarbage\n\n2024-05-01T12:00:00Z second\n",
    )
    .expect("Failed to write log");

    let entries = rotation::read_entries(&path).expect("Failed to read log");
    let passwords: Vec<&str> = entries.iter().map(|e| e.password.as_str()).collect();
    assert_eq!(passwords, ["first", "second"]);
    assert!(rotation::read_entries(&temp_dir.path().join("absent.txt")).expect("Missing log reads as empty").is_empty());
}

#[test]
fn test_huge_interval_keeps_the_loop_alive() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = Config::in_dir(temp_dir.path());
    let worker = RotationWorker::new(&config);

    // Far larger than the monotonic clock can represent as a deadline.
    worker.start(4.0e15, PasswordPolicy::default()).expect("Failed to start rotation");
    assert!(wait_until(Duration::from_secs(5), || line_count(&config.rotation_log_path) == 1));
    thread::sleep(Duration::from_millis(1500));
    assert!(worker.is_running());
    assert_eq!(worker.status().failures, 0);

    let started = Instant::now();
    worker.shutdown();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!worker.is_running());
}

#[test]
fn test_rapid_stop_start_never_interleaves_writers() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let config = Config::in_dir(temp_dir.path()).with_min_rotation_interval(Duration::from_secs(30));
    let worker = RotationWorker::new(&config);

    for round in 1..=10 {
        worker.start(0.0, PasswordPolicy::default()).expect("Failed to start rotation");
        assert!(wait_until(Duration::from_secs(5), || line_count(&config.rotation_log_path) == round));
        worker.stop();
    }
    worker.shutdown();

    let entries = rotation::read_entries(&config.rotation_log_path).expect("Failed to read log");
    assert_eq!(entries.len(), 10);
    assert!(entries.iter().all(|e| e.password.len() == 24));
    assert!(entries.windows(2).all(|pair| pair[0].timestamp <= pair[1].timestamp));
}
