use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::emotion::{Emotion, MatchEvent};

use super::ChallengeKind;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ChallengeStatus {
    #[default]
    Idle,
    Countdown,
    Active,
    Won,
    Expired,
}

impl ChallengeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChallengeStatus::Won | ChallengeStatus::Expired)
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    Completed,
    TimedOut,
    Forfeited,
    Stopped,
    CaptureFailed,
}

/// Emotion(s) currently requested from the player.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub primary: Emotion,
    pub secondary: Option<Emotion>,
}

impl Prompt {
    pub fn single(primary: Emotion) -> Self {
        Self {
            primary,
            secondary: None,
        }
    }

    pub fn dual(primary: Emotion, secondary: Emotion) -> Self {
        Self {
            primary,
            secondary: Some(secondary),
        }
    }

    pub fn targets(&self) -> Vec<Emotion> {
        std::iter::once(self.primary).chain(self.secondary).collect()
    }

    pub fn text(&self) -> String {
        match self.secondary {
            None => format!("Show {} {}", self.primary.display_name(), self.primary.emoji()),
            Some(secondary) => format!(
                "Show both {} and {} {}{}",
                self.primary.display_name(),
                secondary.display_name(),
                self.primary.emoji(),
                secondary.emoji()
            ),
        }
    }
}

/// One play-through. Mutated only by the session task that owns it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeSession {
    pub session_id: String,
    pub kind: ChallengeKind,
    pub status: ChallengeStatus,
    pub countdown: u32,
    pub prompt: Option<Prompt>,
    pub matched_count: u32,
    pub required_count: u32,
    pub remaining_secs: u32,
    pub max_duration_secs: u32,
    pub matched_history: Vec<Emotion>,
    pub cooldown_active: bool,
    pub best_score: f32,
    pub face_detected: bool,
    pub dominant_emotion: Option<Emotion>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub end_reason: Option<EndReason>,
}

impl ChallengeSession {
    pub fn new(session_id: String, kind: ChallengeKind, required_count: u32, max_duration_secs: u32) -> Self {
        Self {
            session_id,
            kind,
            status: ChallengeStatus::Idle,
            countdown: 0,
            prompt: None,
            matched_count: 0,
            required_count,
            remaining_secs: max_duration_secs,
            max_duration_secs,
            matched_history: Vec::new(),
            cooldown_active: false,
            best_score: 0.0,
            face_detected: false,
            dominant_emotion: None,
            started_at: None,
            ended_at: None,
            end_reason: None,
        }
    }

    pub fn target(&self) -> Option<Emotion> {
        self.prompt.map(|prompt| prompt.primary)
    }

    pub fn begin_countdown(&mut self, seconds: u32, now: DateTime<Utc>) -> bool {
        if self.status != ChallengeStatus::Idle {
            return false;
        }
        self.status = ChallengeStatus::Countdown;
        self.countdown = seconds;
        self.started_at = Some(now);
        true
    }

    /// Returns the seconds left on the countdown.
    pub fn tick_countdown(&mut self) -> u32 {
        if self.status == ChallengeStatus::Countdown {
            self.countdown = self.countdown.saturating_sub(1);
        }
        self.countdown
    }

    pub fn activate(&mut self, prompt: Prompt) -> bool {
        if self.status != ChallengeStatus::Countdown {
            return false;
        }
        self.status = ChallengeStatus::Active;
        self.countdown = 0;
        self.prompt = Some(prompt);
        self.matched_count = 0;
        self.matched_history.clear();
        self.remaining_secs = self.max_duration_secs;
        self.cooldown_active = false;
        true
    }

    /// Returns the seconds left on the game clock.
    pub fn tick_clock(&mut self) -> u32 {
        if self.status == ChallengeStatus::Active {
            self.remaining_secs = self.remaining_secs.saturating_sub(1);
        }
        self.remaining_secs
    }

    pub fn observe(&mut self, face_detected: bool, dominant: Option<Emotion>) {
        self.face_detected = face_detected;
        self.dominant_emotion = dominant;
    }

    /// Counts a match and moves to `next` (if any). Returns `true` once the
    /// required count is reached.
    pub fn record_match(&mut self, event: &MatchEvent, next: Option<Prompt>) -> bool {
        if self.status != ChallengeStatus::Active || self.matched_count >= self.required_count {
            return false;
        }

        self.matched_count += 1;
        self.matched_history.push(event.label);
        self.best_score = self.best_score.max(event.score);
        if let Some(next) = next {
            self.prompt = Some(next);
        }

        self.matched_count == self.required_count
    }

    pub fn win(&mut self) -> bool {
        if self.status != ChallengeStatus::Active || self.matched_count != self.required_count {
            return false;
        }
        self.status = ChallengeStatus::Won;
        self.cooldown_active = false;
        true
    }

    pub fn expire(&mut self, reason: EndReason, now: DateTime<Utc>) -> bool {
        if !matches!(self.status, ChallengeStatus::Countdown | ChallengeStatus::Active) {
            return false;
        }
        self.status = ChallengeStatus::Expired;
        self.cooldown_active = false;
        self.end_reason = Some(reason);
        self.ended_at = Some(now);
        true
    }

    /// Stamps the end of a won session once its artifact is final.
    pub fn close(&mut self, now: DateTime<Utc>) {
        if self.status == ChallengeStatus::Won && self.ended_at.is_none() {
            self.end_reason = Some(EndReason::Completed);
            self.ended_at = Some(now);
        }
    }

    pub fn snapshot(&self) -> ChallengeSnapshot {
        ChallengeSnapshot {
            prompt_text: self.prompt.map(|prompt| prompt.text()),
            session: self.clone(),
        }
    }
}

/// Read-only view published after every session event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeSnapshot {
    pub session: ChallengeSession,
    pub prompt_text: Option<String>,
}

impl ChallengeSnapshot {
    pub fn status(&self) -> ChallengeStatus {
        self.session.status
    }

    /// Terminal and torn down; a won session is not finished until its
    /// celebration delay has run.
    pub fn is_finished(&self) -> bool {
        self.session.status.is_terminal() && self.session.ended_at.is_some()
    }
}
