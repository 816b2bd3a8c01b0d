use chrono::Utc;
use rand::rngs::StdRng;
use tokio::{
    sync::{mpsc, watch},
    time::{Duration, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::{
    capture::{CaptureSink, MediaBlob, MediaSource, RecordingHandle, WEBM_MIME},
    classifier::ClassifierHandle,
    emotion::{MatchEvaluator, TargetSelector},
    settings::ChallengeSettings,
};

use super::{
    strategy::{Artifact, CaptureStrategy, FrameContext},
    ChallengeResult, ChallengeSession, ChallengeSnapshot, ChallengeStatus, EndReason, TimerKind,
    Timers,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Forfeit,
}

enum Step {
    Stop,
    Forfeit,
    Timer(TimerKind),
}

/// Collaborators and channels a session task is built from.
pub(crate) struct SessionParts {
    pub session: ChallengeSession,
    pub settings: ChallengeSettings,
    pub strategy: Box<dyn CaptureStrategy>,
    pub classifier: ClassifierHandle,
    pub source: Box<dyn MediaSource>,
    pub sink: Box<dyn CaptureSink>,
    pub rng: StdRng,
    pub heartbeat_every_ticks: u32,
    pub commands: mpsc::Receiver<Command>,
    pub cancel: CancellationToken,
    pub snapshots: watch::Sender<ChallengeSnapshot>,
}

/// Owns one session from countdown to result. Every timer, command and
/// classifier call is handled on this task, one at a time.
pub(crate) struct SessionRunner {
    session: ChallengeSession,
    settings: ChallengeSettings,
    strategy: Box<dyn CaptureStrategy>,
    selector: TargetSelector,
    evaluator: MatchEvaluator,
    classifier: ClassifierHandle,
    source: Box<dyn MediaSource>,
    sink: Box<dyn CaptureSink>,
    recording: Option<RecordingHandle>,
    timers: Timers,
    rng: StdRng,
    heartbeat_every_ticks: u32,
    clock_ticks: u32,
    commands: mpsc::Receiver<Command>,
    cancel: CancellationToken,
    snapshots: watch::Sender<ChallengeSnapshot>,
    torn_down: bool,
}

impl SessionRunner {
    pub(crate) fn new(parts: SessionParts) -> Self {
        Self {
            evaluator: MatchEvaluator::new(parts.settings.match_threshold),
            selector: TargetSelector::default(),
            session: parts.session,
            settings: parts.settings,
            strategy: parts.strategy,
            classifier: parts.classifier,
            source: parts.source,
            sink: parts.sink,
            recording: None,
            timers: Timers::new(),
            rng: parts.rng,
            heartbeat_every_ticks: parts.heartbeat_every_ticks.max(1),
            clock_ticks: 0,
            commands: parts.commands,
            cancel: parts.cancel,
            snapshots: parts.snapshots,
            torn_down: false,
        }
    }

    pub(crate) async fn run(mut self) -> ChallengeResult {
        log_info!(
            "Session {} ({}) counting down from {}",
            self.session.session_id,
            self.session.kind,
            self.session.countdown
        );
        self.timers.every(TimerKind::Countdown, Duration::from_secs(1));
        self.publish();

        loop {
            let step = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Step::Stop,
                command = self.commands.recv() => match command {
                    Some(Command::Forfeit) => Step::Forfeit,
                    None => Step::Stop,
                },
                token = self.timers.fired() => Step::Timer(token.kind()),
            };

            if let Some(result) = self.handle(step) {
                return result;
            }
            self.publish();
        }
    }

    fn handle(&mut self, step: Step) -> Option<ChallengeResult> {
        match step {
            Step::Stop => {
                log_info!("Session {} stopped by caller", self.session.session_id);
                self.session.expire(EndReason::Stopped, Utc::now());
                Some(self.finalize())
            }
            Step::Forfeit => {
                if self.session.expire(EndReason::Forfeited, Utc::now()) {
                    log_info!("Session {} forfeited", self.session.session_id);
                    Some(self.finalize())
                } else {
                    None
                }
            }
            Step::Timer(TimerKind::Countdown) => self.on_countdown(),
            Step::Timer(TimerKind::GameClock) => self.on_clock(),
            Step::Timer(TimerKind::Poll) => {
                self.on_poll();
                None
            }
            Step::Timer(TimerKind::Cooldown) => {
                log_debug!("Ready for next emotion match");
                self.session.cooldown_active = false;
                None
            }
            Step::Timer(TimerKind::Celebration) => Some(self.finalize()),
        }
    }

    fn on_countdown(&mut self) -> Option<ChallengeResult> {
        let remaining = self.session.tick_countdown();
        if remaining > 0 {
            log_debug!("Countdown: {}", remaining);
            return None;
        }

        self.timers.cancel_kind(TimerKind::Countdown);

        let prompt = self.strategy.begin(&self.selector, &mut self.rng);
        self.session.activate(prompt);

        match self.sink.start(self.source.as_ref()) {
            Ok(handle) => self.recording = Some(handle),
            Err(err) => {
                log_error!(
                    "Session {} could not start recording: {}",
                    self.session.session_id,
                    err
                );
                self.session.expire(EndReason::CaptureFailed, Utc::now());
                return Some(self.finalize());
            }
        }

        self.timers.every(TimerKind::GameClock, Duration::from_secs(1));
        self.timers.every(TimerKind::Poll, self.settings.poll_interval());

        log_info!(
            "Session {} active: {} matches needed in {}s, first prompt {}",
            self.session.session_id,
            self.session.required_count,
            self.session.remaining_secs,
            prompt.primary
        );
        None
    }

    fn on_clock(&mut self) -> Option<ChallengeResult> {
        let remaining = self.session.tick_clock();
        self.clock_ticks = self.clock_ticks.wrapping_add(1);

        if self.clock_ticks % self.heartbeat_every_ticks == 0 {
            log_info!(
                "Session {} heartbeat: {}s left, {}/{} matched",
                self.session.session_id,
                remaining,
                self.session.matched_count,
                self.session.required_count
            );
        }

        if remaining > 0 {
            return None;
        }

        log_info!("Session {} ran out of time", self.session.session_id);
        self.session.expire(EndReason::TimedOut, Utc::now());
        Some(self.finalize())
    }

    fn on_poll(&mut self) {
        if self.session.status != ChallengeStatus::Active {
            return;
        }
        let Some(prompt) = self.session.prompt else {
            return;
        };

        let Some(frame) = self.source.grab_frame() else {
            self.session.observe(false, None);
            return;
        };

        let started = Instant::now();
        let outcome = self.classifier.detect(&frame);
        let elapsed = started.elapsed();

        let detection = match outcome {
            Ok(detection) if elapsed <= self.settings.classifier_budget() => detection,
            Ok(_) => {
                log_warn!(
                    "Classifier {} took {}ms on frame {}, counting as a miss",
                    self.classifier.name(),
                    elapsed.as_millis(),
                    frame.frame_number
                );
                None
            }
            Err(err) => {
                log_warn!(
                    "Classifier {} failed on frame {}: {}",
                    self.classifier.name(),
                    frame.frame_number,
                    err
                );
                None
            }
        };

        let dominant = detection
            .as_ref()
            .and_then(|detection| detection.expressions.dominant())
            .map(|(label, _)| label);
        self.session.observe(detection.is_some(), dominant);

        let ctx = FrameContext {
            frame: &frame,
            detection: detection.as_ref(),
            prompt,
            cooldown_active: self.timers.is_scheduled(TimerKind::Cooldown),
            now: Utc::now(),
        };

        let Some(event) = self.strategy.on_frame(ctx, &self.evaluator) else {
            return;
        };

        let next = if self.session.matched_count + 1 < self.session.required_count {
            Some(self.strategy.next_prompt(&self.selector, &prompt, &mut self.rng))
        } else {
            None
        };

        let completed = self.session.record_match(&event, next);
        log_info!(
            "Matched {} ({:.2}), {}/{}",
            event.label,
            event.score,
            self.session.matched_count,
            self.session.required_count
        );

        if completed {
            self.session.win();
            self.timers.cancel_kind(TimerKind::GameClock);
            self.timers.cancel_kind(TimerKind::Poll);
            self.timers.cancel_kind(TimerKind::Cooldown);
            self.timers
                .once(TimerKind::Celebration, self.settings.celebration_delay());
            log_info!("Session {} won", self.session.session_id);
        } else {
            self.timers.cancel_kind(TimerKind::Cooldown);
            self.timers.once(TimerKind::Cooldown, self.settings.cooldown());
            self.session.cooldown_active = true;
        }
    }

    /// Cancels every timer, stops the recorder and frees the camera. Runs
    /// once; later calls return an empty recording.
    fn teardown(&mut self) -> MediaBlob {
        if self.torn_down {
            return MediaBlob::empty(WEBM_MIME);
        }
        self.torn_down = true;

        let cancelled = self.timers.cancel_all();
        log_debug!("Cancelled {} timers", cancelled);

        let recording = match self.recording.take() {
            Some(handle) => self.sink.stop(handle).unwrap_or_else(|err| {
                log_error!("Failed to finalize recording {}: {}", handle, err);
                MediaBlob::empty(WEBM_MIME)
            }),
            None => MediaBlob::empty(WEBM_MIME),
        };

        self.source.release();
        recording
    }

    fn finalize(&mut self) -> ChallengeResult {
        let recording = self.teardown();
        self.session.close(Utc::now());

        let artifact = self.strategy.finalize(recording).unwrap_or_else(|err| {
            log_error!(
                "Session {} artifact could not be built: {}",
                self.session.session_id,
                err
            );
            Artifact {
                media: MediaBlob::empty(WEBM_MIME),
                face_check: None,
            }
        });

        let passed = self.session.status == ChallengeStatus::Won;
        let end_reason = self.session.end_reason.unwrap_or(if passed {
            EndReason::Completed
        } else {
            EndReason::Stopped
        });

        self.publish();

        log_info!(
            "Session {} finished: passed={}, matched {}/{}, reason {:?}, media {} bytes",
            self.session.session_id,
            passed,
            self.session.matched_count,
            self.session.required_count,
            end_reason,
            artifact.media.len()
        );

        ChallengeResult {
            session_id: self.session.session_id.clone(),
            kind: self.session.kind,
            recorded_media: artifact.media,
            matched_count: self.session.matched_count,
            matched_history: self.session.matched_history.clone(),
            passed,
            end_reason,
            best_score: self.session.best_score,
            face_check: artifact.face_check,
            started_at: self.session.started_at,
            ended_at: self.session.ended_at,
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.session.snapshot());
    }
}

impl Drop for SessionRunner {
    fn drop(&mut self) {
        if !self.torn_down {
            log_warn!(
                "Session {} dropped before finishing, releasing capture",
                self.session.session_id
            );
            self.teardown();
        }
    }
}
