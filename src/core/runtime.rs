//! Async runtime around the engine
//!
//! One ticker task per recording samples the level source on a fixed
//! interval and also wakes for the pending grace deadline. The engine sits
//! behind a single async mutex, so ticks, grace expiries and user commands
//! are applied one at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::core::acquisition::LevelSource;
use crate::core::calibration::{compute_calibration, today};
use crate::core::config::MonitorConfig;
use crate::core::monitor::{Monitor, StopOutcome};
use crate::core::store::{SessionStore, SettingsStore};
use crate::types::{
    BaseThresholds, CalibrationRecord, HistorySample, MonitorEvent, Phase, PhaseAdjustments,
    ReasonCode, SessionSummary, StreakStatus, TickOutput,
};

const UPDATE_CHANNEL_CAPACITY: usize = 100;

/// Wall clock in unix milliseconds
pub fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Pushed to subscribers after every tick and command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveUpdate {
    pub output: Option<TickOutput>,
    pub events: Vec<MonitorEvent>,
}

/// Full monitor state for status displays
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    pub recording: bool,
    pub calibrating: bool,
    pub phase: Phase,
    pub effective_threshold: f64,
    pub manual_threshold: f64,
    pub base_thresholds: BaseThresholds,
    pub adjustments: PhaseAdjustments,
    pub streak: StreakStatus,
    pub best_streak_ms: u64,
    pub samples: u64,
    pub calibration: Option<CalibrationRecord>,
    pub output: Option<TickOutput>,
}

struct Ticker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Clears the calibration flag however the run ends
struct CalibrationGuard(Arc<AtomicBool>);

impl Drop for CalibrationGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Cloneable handle shared by the CLI and the HTTP layer
#[derive(Clone)]
pub struct MonitorHandle {
    engine: Arc<Mutex<Monitor>>,
    source: Arc<Mutex<Box<dyn LevelSource>>>,
    settings: Arc<SettingsStore>,
    sessions: Arc<SessionStore>,
    ticker: Arc<Mutex<Option<Ticker>>>,
    calibrating: Arc<AtomicBool>,
    updates: broadcast::Sender<LiveUpdate>,
}

impl MonitorHandle {
    pub fn new(
        config: MonitorConfig,
        source: Box<dyn LevelSource>,
        settings: Arc<SettingsStore>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        let monitor = Monitor::new(config, settings.get());
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            engine: Arc::new(Mutex::new(monitor)),
            source: Arc::new(Mutex::new(source)),
            settings,
            sessions,
            ticker: Arc::new(Mutex::new(None)),
            calibrating: Arc::new(AtomicBool::new(false)),
            updates,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveUpdate> {
        self.updates.subscribe()
    }

    // =========================================================================
    // Recording
    // =========================================================================

    pub async fn start(&self) -> Result<(), ReasonCode> {
        let events = {
            let mut engine = self.engine.lock().await;
            engine.start_recording(now_ms())?
        };
        self.publish(events).await;
        self.spawn_ticker().await;
        Ok(())
    }

    /// Stop recording, persist the best streak and save the summary if any
    pub async fn stop(&self) -> Result<StopOutcome, ReasonCode> {
        self.cancel_ticker().await;
        let outcome = {
            let mut engine = self.engine.lock().await;
            engine.stop_recording(now_ms())?
        };

        if let Err(e) = self.settings.save_best_streak(outcome.best_streak_ms) {
            error!("{}: {:#}", ReasonCode::M304_STORAGE_ERROR, e);
        }
        if let Some(summary) = &outcome.summary {
            if let Err(e) = self.sessions.save(summary.clone()) {
                error!("{}: {:#}", ReasonCode::M304_STORAGE_ERROR, e);
            }
        }
        self.publish(Vec::new()).await;
        Ok(outcome)
    }

    pub async fn is_recording(&self) -> bool {
        self.engine.lock().await.is_recording()
    }

    async fn spawn_ticker(&self) {
        let mut guard = self.ticker.lock().await;
        if let Some(old) = guard.take() {
            old.cancel.cancel();
            old.handle.abort();
        }

        let cancel = CancellationToken::new();
        let interval = Duration::from_millis(self.engine.lock().await.config().sample_interval_ms.max(1));
        let handle = tokio::spawn(ticker_loop(
            self.engine.clone(),
            self.source.clone(),
            self.updates.clone(),
            interval,
            cancel.clone(),
        ));
        *guard = Some(Ticker { cancel, handle });
    }

    async fn cancel_ticker(&self) {
        if let Some(ticker) = self.ticker.lock().await.take() {
            ticker.cancel.cancel();
            ticker.handle.abort();
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    pub async fn set_phase(&self, phase: Phase) -> f64 {
        let (event, threshold) = {
            let mut engine = self.engine.lock().await;
            let event = engine.set_phase(phase, now_ms());
            (event, engine.effective_threshold())
        };
        self.publish(vec![event]).await;
        threshold
    }

    pub async fn set_threshold(&self, value: f64) -> Result<f64, ReasonCode> {
        let threshold = self.engine.lock().await.set_manual_threshold(value)?;
        self.publish(Vec::new()).await;
        Ok(threshold)
    }

    /// Change a per-phase offset and persist the whole adjustment set
    pub async fn set_adjustment(&self, phase: Phase, offset: i32) -> Result<PhaseAdjustments, ReasonCode> {
        let adjustments = self.engine.lock().await.set_adjustment(phase, offset)?;
        self.settings.save_adjustments(adjustments).map_err(|e| {
            error!("{}: {:#}", ReasonCode::M304_STORAGE_ERROR, e);
            ReasonCode::M304_STORAGE_ERROR
        })?;
        self.publish(Vec::new()).await;
        Ok(adjustments)
    }

    pub async fn set_chime_enabled(&self, enabled: bool) {
        self.engine.lock().await.set_chime_enabled(enabled);
    }

    /// Sample the quiet room, then install and persist the result.
    ///
    /// Needs an active recording. If that recording stops mid-run, whatever
    /// was collected so far is used and the stats of any newer recording are
    /// left alone; nothing collected cancels calibration. Failed acquisitions
    /// are skipped rather than averaged in as silence.
    pub async fn calibrate(&self) -> Result<CalibrationRecord, ReasonCode> {
        let (count, spacing, epoch) = {
            let engine = self.engine.lock().await;
            if !engine.is_recording() {
                return Err(ReasonCode::M103_NOT_RECORDING);
            }
            let config = engine.config();
            (config.calibration_samples, config.calibration_spacing_ms, engine.recording_epoch())
        };
        if self.calibrating.swap(true, Ordering::SeqCst) {
            return Err(ReasonCode::M402_CALIBRATION_IN_PROGRESS);
        }
        let _guard = CalibrationGuard(self.calibrating.clone());
        info!("calibrating: {} samples every {} ms", count, spacing);

        let mut samples = Vec::with_capacity(count);
        let mut ticker = time::interval(Duration::from_millis(spacing.max(1)));
        for _ in 0..count {
            ticker.tick().await;
            if self.engine.lock().await.recording_epoch() != epoch {
                warn!("recording stopped after {} calibration samples", samples.len());
                break;
            }
            match self.source.lock().await.raw_energy() {
                Ok(raw) => samples.push(raw),
                Err(reason) => debug!("calibration sample skipped: {}", reason),
            }
        }

        let record = compute_calibration(&samples, today())?;
        let events = {
            let mut engine = self.engine.lock().await;
            if engine.recording_epoch() == epoch {
                engine.apply_calibration(record.clone(), now_ms())?
            } else {
                engine.install_calibration(record.clone())?;
                Vec::new()
            }
        };
        if let Err(e) = self.settings.save_calibration(record.clone()) {
            error!("{}: {:#}", ReasonCode::M304_STORAGE_ERROR, e);
        }
        self.publish(events).await;
        Ok(record)
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibrating.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Read side
    // =========================================================================

    pub async fn snapshot(&self) -> Option<TickOutput> {
        self.engine.lock().await.snapshot(now_ms())
    }

    pub async fn history(&self) -> Vec<HistorySample> {
        self.engine.lock().await.history()
    }

    pub async fn status(&self) -> MonitorStatus {
        let engine = self.engine.lock().await;
        let thresholds = engine.thresholds();
        MonitorStatus {
            recording: engine.is_recording(),
            calibrating: self.is_calibrating(),
            phase: thresholds.phase(),
            effective_threshold: thresholds.effective(),
            manual_threshold: thresholds.manual(),
            base_thresholds: *thresholds.base(),
            adjustments: *thresholds.adjustments(),
            streak: engine.streak_status(),
            best_streak_ms: engine.best_streak_ms(),
            samples: engine.sample_count(),
            calibration: engine.calibration().cloned(),
            output: engine.snapshot(now_ms()),
        }
    }

    pub fn sessions(&self) -> Vec<SessionSummary> {
        self.sessions.list()
    }

    pub fn add_reflection(&self, text: &str) -> Result<bool, ReasonCode> {
        self.sessions.add_reflection(text).map_err(|e| {
            error!("{}: {:#}", ReasonCode::M304_STORAGE_ERROR, e);
            ReasonCode::M304_STORAGE_ERROR
        })
    }

    async fn publish(&self, events: Vec<MonitorEvent>) {
        let output = self.engine.lock().await.snapshot(now_ms());
        // No subscribers is fine
        let _ = self.updates.send(LiveUpdate { output, events });
    }
}

async fn ticker_loop(
    engine: Arc<Mutex<Monitor>>,
    source: Arc<Mutex<Box<dyn LevelSource>>>,
    updates: broadcast::Sender<LiveUpdate>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let grace_delay = engine
            .lock()
            .await
            .pending_grace()
            .map(|t| Duration::from_millis(t.due_ms.saturating_sub(now_ms())));

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("ticker cancelled");
                break;
            }
            _ = ticker.tick() => {
                let raw = source.lock().await.raw_energy();
                let report = engine.lock().await.step(now_ms(), raw);
                match report {
                    Some(report) => {
                        let _ = updates.send(LiveUpdate {
                            output: Some(report.output),
                            events: report.events,
                        });
                    }
                    None => break,
                }
            }
            _ = time::sleep(grace_delay.unwrap_or_default()), if grace_delay.is_some() => {
                let raw = source.lock().await.raw_energy();
                let mut guard = engine.lock().await;
                let now = now_ms();
                let event = match guard.pending_grace() {
                    Some(timer) => guard.fire_grace(timer, now, raw),
                    None => None,
                };
                if let Some(event) = event {
                    let _ = updates.send(LiveUpdate {
                        output: guard.snapshot(now),
                        events: vec![event],
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::acquisition::PushSource;
    use tempfile::TempDir;

    fn handle(config: MonitorConfig, source: PushSource) -> (MonitorHandle, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let settings = Arc::new(SettingsStore::in_dir(dir.path()).unwrap());
        let sessions = Arc::new(SessionStore::in_dir(dir.path()).unwrap());
        (MonitorHandle::new(config, Box::new(source), settings, sessions), dir)
    }

    fn fast_config() -> MonitorConfig {
        MonitorConfig {
            sample_interval_ms: 10,
            grace_ms: 200,
            calibration_samples: 5,
            calibration_spacing_ms: 5,
            ..MonitorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_ticker_samples_while_recording() {
        let source = PushSource::new();
        source.push(0.001);
        let (monitor, _dir) = handle(fast_config(), source);
        let mut rx = monitor.subscribe();

        monitor.start().await.unwrap();
        assert_eq!(monitor.start().await, Err(ReasonCode::M102_ALREADY_RECORDING));

        // First update carries the StreakStarted event
        let first = rx.recv().await.unwrap();
        assert!(first
            .events
            .iter()
            .any(|e| matches!(e, MonitorEvent::StreakStarted { .. })));

        time::sleep(Duration::from_millis(120)).await;
        let out = monitor.snapshot().await.unwrap();
        assert!((out.level - 20.0).abs() < 1e-6);
        assert!(monitor.status().await.samples >= 3);

        monitor.stop().await.unwrap();
        assert_eq!(monitor.stop().await, Err(ReasonCode::M103_NOT_RECORDING));
        assert!(monitor.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn test_stop_saves_session_and_best() {
        let source = PushSource::new();
        source.push(0.001);
        let (monitor, dir) = handle(fast_config(), source);
        monitor.start().await.unwrap();
        time::sleep(Duration::from_millis(150)).await;
        let outcome = monitor.stop().await.unwrap();

        assert!(outcome.summary.is_some());
        assert_eq!(monitor.sessions().len(), 1);
        assert!(outcome.best_streak_ms >= 100);
        let settings = SettingsStore::in_dir(dir.path()).unwrap();
        assert_eq!(settings.get().best_streak_ms, outcome.best_streak_ms);
    }

    #[tokio::test]
    async fn test_sustained_noise_breaks_streak() {
        let source = PushSource::new();
        source.push(1.0);
        let (monitor, _dir) = handle(fast_config(), source);
        let mut rx = monitor.subscribe();
        monitor.start().await.unwrap();

        let broke = time::timeout(Duration::from_secs(2), async {
            loop {
                let update = rx.recv().await.unwrap();
                if update
                    .events
                    .iter()
                    .any(|e| matches!(e, MonitorEvent::StreakBroken { .. }))
                {
                    return true;
                }
            }
        })
        .await
        .unwrap_or(false);
        assert!(broke);
        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_calibration_requires_recording() {
        let (monitor, _dir) = handle(fast_config(), PushSource::new());
        assert_eq!(monitor.calibrate().await, Err(ReasonCode::M103_NOT_RECORDING));
    }

    #[tokio::test]
    async fn test_calibration_applies_and_persists() {
        let source = PushSource::new();
        source.push(0.001);
        let (monitor, dir) = handle(fast_config(), source);
        monitor.start().await.unwrap();

        let record = monitor.calibrate().await.unwrap();
        assert!((record.offset - 0.0009).abs() < 1e-12);
        assert!(!monitor.is_calibrating());

        let status = monitor.status().await;
        assert_eq!(status.calibration, Some(record.clone()));
        assert!((status.base_thresholds.quiet - 30.0).abs() < 1e-9);

        let settings = SettingsStore::in_dir(dir.path()).unwrap();
        assert_eq!(settings.calibration(), Some(record));
        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_calibration_without_input_is_cancelled() {
        let (monitor, _dir) = handle(fast_config(), PushSource::new());
        monitor.start().await.unwrap();
        assert_eq!(monitor.calibrate().await, Err(ReasonCode::M401_CALIBRATION_CANCELLED));
        monitor.stop().await.unwrap();
    }

    fn slow_calibration_config() -> MonitorConfig {
        MonitorConfig {
            calibration_samples: 50,
            calibration_spacing_ms: 10,
            ..fast_config()
        }
    }

    #[tokio::test]
    async fn test_stop_mid_calibration_keeps_partial_samples() {
        let source = PushSource::new();
        source.push(0.001);
        let (monitor, dir) = handle(slow_calibration_config(), source);
        monitor.start().await.unwrap();

        let calibration = tokio::spawn({
            let monitor = monitor.clone();
            async move { monitor.calibrate().await }
        });
        time::sleep(Duration::from_millis(60)).await;
        monitor.stop().await.unwrap();

        let record = time::timeout(Duration::from_millis(200), calibration)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!((record.offset - 0.0009).abs() < 1e-12);
        assert!(!monitor.is_calibrating());
        let settings = SettingsStore::in_dir(dir.path()).unwrap();
        assert_eq!(settings.calibration(), Some(record));
    }

    #[tokio::test]
    async fn test_second_calibration_rejected_while_running() {
        let source = PushSource::new();
        source.push(0.001);
        let (monitor, _dir) = handle(slow_calibration_config(), source);
        monitor.start().await.unwrap();

        let first = tokio::spawn({
            let monitor = monitor.clone();
            async move { monitor.calibrate().await }
        });
        time::sleep(Duration::from_millis(30)).await;
        assert!(monitor.is_calibrating());
        assert_eq!(monitor.calibrate().await, Err(ReasonCode::M402_CALIBRATION_IN_PROGRESS));

        assert!(first.await.unwrap().is_ok());
        assert!(!monitor.is_calibrating());
        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_calibration_from_old_recording_leaves_new_one_alone() {
        let source = PushSource::new();
        source.push(0.001);
        let (monitor, _dir) = handle(slow_calibration_config(), source);
        monitor.start().await.unwrap();

        let calibration = tokio::spawn({
            let monitor = monitor.clone();
            async move { monitor.calibrate().await }
        });
        time::sleep(Duration::from_millis(60)).await;
        monitor.stop().await.unwrap();
        monitor.start().await.unwrap();
        time::sleep(Duration::from_millis(150)).await;

        let record = calibration.await.unwrap().unwrap();
        let status = monitor.status().await;
        assert!(status.recording);
        assert!(status.samples >= 5);
        assert!(!monitor.history().await.is_empty());
        assert_eq!(status.calibration, Some(record));
        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_adjustment_persisted() {
        let (monitor, dir) = handle(fast_config(), PushSource::new());
        monitor.set_phase(Phase::Discussion).await;
        let adj = monitor.set_adjustment(Phase::Discussion, -5).await.unwrap();
        assert_eq!(adj.discussion, -5);
        assert_eq!(monitor.status().await.effective_threshold, 60.0);

        let settings = SettingsStore::in_dir(dir.path()).unwrap();
        assert_eq!(settings.get().adjustments.discussion, -5);
    }
}
