use std::sync::Arc;

use chrono::Utc;
use rand::{rngs::StdRng, SeedableRng};
use tokio::{
    sync::{mpsc, watch, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    capture::{CaptureDevice, CaptureSink},
    classifier::ClassifierHandle,
    error::ChallengeError,
    settings::ChallengeSettings,
    utils::env_flag,
};

use super::{
    session::{Command, SessionParts, SessionRunner},
    strategy_for, ChallengeKind, ChallengeResult, ChallengeSession, ChallengeSnapshot,
    ChallengeStatus,
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

struct RunningSession {
    commands: mpsc::Sender<Command>,
    cancel: CancellationToken,
    snapshots: watch::Receiver<ChallengeSnapshot>,
    task: Option<JoinHandle<ChallengeResult>>,
}

struct ControllerInner {
    sink: Option<Box<dyn CaptureSink>>,
    running: Option<RunningSession>,
    idle_snapshot: ChallengeSnapshot,
}

/// Drives a single challenge session: acquires the camera, spawns the
/// session task and hands back its result. Clones share the same session.
#[derive(Clone)]
pub struct ChallengeController {
    kind: ChallengeKind,
    settings: ChallengeSettings,
    classifier: ClassifierHandle,
    device: Arc<dyn CaptureDevice>,
    heartbeat_every_ticks: u32,
    inner: Arc<Mutex<ControllerInner>>,
}

impl ChallengeController {
    pub fn new(
        kind: ChallengeKind,
        settings: ChallengeSettings,
        classifier: ClassifierHandle,
        device: Arc<dyn CaptureDevice>,
        sink: Box<dyn CaptureSink>,
    ) -> Self {
        // Heartbeat every tick in debug mode, otherwise every 10 seconds.
        let heartbeat_every_ticks = if env_flag("VIBECHECK_DEBUG") { 1 } else { 10 };

        let idle = ChallengeSession::new(
            String::new(),
            kind,
            strategy_for(kind, &settings).required_count(),
            settings.max_duration_secs,
        );

        Self {
            kind,
            settings,
            classifier,
            device,
            heartbeat_every_ticks,
            inner: Arc::new(Mutex::new(ControllerInner {
                sink: Some(sink),
                running: None,
                idle_snapshot: idle.snapshot(),
            })),
        }
    }

    pub fn kind(&self) -> ChallengeKind {
        self.kind
    }

    /// Validates the settings, acquires the camera and begins the countdown.
    /// On either failure nothing is spawned and the controller stays idle, so
    /// `start` can be retried.
    pub async fn start(&self) -> Result<ChallengeSnapshot, ChallengeError> {
        let mut inner = self.inner.lock().await;
        if inner.running.is_some() {
            return Err(ChallengeError::AlreadyStarted);
        }

        if let Err(err) = self.settings.validate() {
            log_error!("Refusing to start {}: {:#}", self.kind, err);
            return Err(ChallengeError::InvalidSettings(format!("{err:#}")));
        }
        let sink = inner.sink.take().ok_or(ChallengeError::AlreadyStarted)?;

        let source = match self.device.acquire(self.settings.facing_mode) {
            Ok(source) => source,
            Err(err) => {
                inner.sink = Some(sink);
                log_error!("Failed to access camera for {}: {}", self.kind, err);
                return Err(ChallengeError::Acquisition(err));
            }
        };

        let strategy = strategy_for(self.kind, &self.settings);
        let mut session = ChallengeSession::new(
            Uuid::new_v4().to_string(),
            self.kind,
            strategy.required_count(),
            self.settings.max_duration_secs,
        );
        session.begin_countdown(self.settings.countdown_secs, Utc::now());
        let snapshot = session.snapshot();

        let rng = match self.settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let (command_tx, command_rx) = mpsc::channel(8);
        let (snapshot_tx, snapshot_rx) = watch::channel(snapshot.clone());
        let cancel = CancellationToken::new();

        log_info!(
            "Starting {} session {} on {}",
            self.kind,
            session.session_id,
            source.id()
        );

        let runner = SessionRunner::new(SessionParts {
            session,
            settings: self.settings.clone(),
            strategy,
            classifier: self.classifier.clone(),
            source,
            sink,
            rng,
            heartbeat_every_ticks: self.heartbeat_every_ticks,
            commands: command_rx,
            cancel: cancel.clone(),
            snapshots: snapshot_tx,
        });
        let task = tokio::spawn(runner.run());

        inner.running = Some(RunningSession {
            commands: command_tx,
            cancel,
            snapshots: snapshot_rx,
            task: Some(task),
        });

        Ok(snapshot)
    }

    /// Abandons the session. Ignored once it is won or over.
    pub async fn forfeit(&self) -> Result<(), ChallengeError> {
        let inner = self.inner.lock().await;
        let running = inner.running.as_ref().ok_or(ChallengeError::NotStarted)?;
        // A closed channel means the session already finished.
        let _ = running.commands.send(Command::Forfeit).await;
        Ok(())
    }

    /// Ends the session now and waits for its teardown. Safe to call any
    /// number of times, before start or after the session ended.
    pub async fn stop(&self) -> ChallengeSnapshot {
        let mut snapshots = {
            let inner = self.inner.lock().await;
            let Some(running) = inner.running.as_ref() else {
                return inner.idle_snapshot.clone();
            };
            running.cancel.cancel();
            running.snapshots.clone()
        };

        // Errors only if the task died without publishing a final snapshot.
        let _ = snapshots.wait_for(ChallengeSnapshot::is_finished).await;
        let snapshot = snapshots.borrow().clone();
        snapshot
    }

    pub async fn snapshot(&self) -> ChallengeSnapshot {
        let inner = self.inner.lock().await;
        match inner.running.as_ref() {
            Some(running) => running.snapshots.borrow().clone(),
            None => inner.idle_snapshot.clone(),
        }
    }

    pub async fn status(&self) -> ChallengeStatus {
        self.snapshot().await.status()
    }

    /// Receiver that sees every snapshot the session publishes.
    pub async fn subscribe(&self) -> Result<watch::Receiver<ChallengeSnapshot>, ChallengeError> {
        let inner = self.inner.lock().await;
        inner
            .running
            .as_ref()
            .map(|running| running.snapshots.clone())
            .ok_or(ChallengeError::NotStarted)
    }

    /// Waits for the session to end and returns its result. The result is
    /// handed out once.
    pub async fn finish(&self) -> Result<ChallengeResult, ChallengeError> {
        let task = {
            let mut inner = self.inner.lock().await;
            let running = inner.running.as_mut().ok_or(ChallengeError::NotStarted)?;
            running.task.take().ok_or(ChallengeError::ResultTaken)?
        };

        task.await.map_err(|err| {
            log_error!("Session task for {} failed: {}", self.kind, err);
            ChallengeError::Runtime(err.to_string())
        })
    }
}
