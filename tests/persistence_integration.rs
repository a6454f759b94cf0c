//! Integration tests for settings and session persistence
//!
//! Verifies that calibration, adjustments and the best streak survive a
//! restart, and that corrupt files fall back to defaults.

use std::fs;

use ljudmonitor::core::{
    compute_calibration, Monitor, MonitorConfig, SessionStore, SettingsStore, SETTINGS_FILE,
};
use ljudmonitor::types::{Phase, PhaseAdjustments};
use ljudmonitor::MAX_STORED_SESSIONS;
use pretty_assertions::assert_eq;

#[test]
fn test_monitor_restores_persisted_settings() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = SettingsStore::in_dir(dir.path()).unwrap();
        let record = compute_calibration(&[0.001; 30], "2026-10-16").unwrap();
        store.save_calibration(record).unwrap();
        store
            .save_adjustments(PhaseAdjustments { quiet: 0, lecture: 0, discussion: -5 })
            .unwrap();
        store.save_best_streak(120_000).unwrap();
    }

    let store = SettingsStore::in_dir(dir.path()).unwrap();
    let mut monitor = Monitor::new(MonitorConfig::default(), store.get());
    assert!((monitor.offset() - 0.0009).abs() < 1e-12);
    assert_eq!(monitor.best_streak_ms(), 120_000);

    monitor.set_phase(Phase::Discussion, 0);
    assert!((monitor.effective_threshold() - 50.0).abs() < 1e-9);
}

#[test]
fn test_corrupt_settings_do_not_block_startup() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(SETTINGS_FILE), "[1, 2").unwrap();

    let store = SettingsStore::in_dir(dir.path()).unwrap();
    let monitor = Monitor::new(MonitorConfig::default(), store.get());
    assert!(monitor.calibration().is_none());
    assert_eq!(monitor.effective_threshold(), 65.0);

    // Next write replaces the corrupt file
    store.save_best_streak(1000).unwrap();
    let reopened = SettingsStore::in_dir(dir.path()).unwrap();
    assert_eq!(reopened.get().best_streak_ms, 1000);
}

#[test]
fn test_sessions_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = SessionStore::in_dir(dir.path()).unwrap();
        for i in 0..(MAX_STORED_SESSIONS + 3) {
            let mut monitor = Monitor::default();
            let start = 1_700_000_000_000 + i as u64 * 100_000;
            monitor.start_recording(start).unwrap();
            for t in 0..6u64 {
                monitor.tick(start + t * 500, Ok(0.01));
            }
            let summary = monitor.stop_recording(start + 3000).unwrap().summary.unwrap();
            store.save(summary).unwrap();
        }
        store.add_reflection("Good focus").unwrap();
    }

    let store = SessionStore::in_dir(dir.path()).unwrap();
    let sessions = store.list();
    assert_eq!(sessions.len(), MAX_STORED_SESSIONS);
    assert_eq!(sessions[0].reflection.as_deref(), Some("Good focus"));
    assert!(sessions[0].date > sessions[1].date);
}
