use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

use crate::{capture::FacingMode, emotion::MATCH_THRESHOLD};

/// Tunables for a challenge session. Missing fields in a settings file fall
/// back to these defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChallengeSettings {
    pub match_threshold: f32,
    pub poll_interval_ms: u64,
    pub cooldown_ms: u64,
    pub countdown_secs: u32,
    pub max_duration_secs: u32,
    pub required_count: u32,
    pub celebration_delay_ms: u64,
    /// Classifier calls slower than this are treated as a miss.
    pub classifier_budget_ms: u64,
    pub facing_mode: FacingMode,
    /// Fixed seed for target selection; random when unset.
    pub rng_seed: Option<u64>,
}

impl Default for ChallengeSettings {
    fn default() -> Self {
        Self {
            match_threshold: MATCH_THRESHOLD,
            poll_interval_ms: 200,
            cooldown_ms: 1200,
            countdown_secs: 3,
            max_duration_secs: 30,
            required_count: 10,
            celebration_delay_ms: 2000,
            classifier_budget_ms: 1000,
            facing_mode: FacingMode::User,
            rng_seed: None,
        }
    }
}

impl ChallengeSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.match_threshold > 0.0 && self.match_threshold < 1.0) {
            bail!("matchThreshold must be between 0 and 1, got {}", self.match_threshold);
        }
        if self.poll_interval_ms == 0 {
            bail!("pollIntervalMs must be greater than zero");
        }
        if self.countdown_secs == 0 {
            bail!("countdownSecs must be greater than zero");
        }
        if self.max_duration_secs == 0 {
            bail!("maxDurationSecs must be greater than zero");
        }
        if self.required_count == 0 {
            bail!("requiredCount must be greater than zero");
        }
        if self.classifier_budget_ms == 0 {
            bail!("classifierBudgetMs must be greater than zero");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn celebration_delay(&self) -> Duration {
        Duration::from_millis(self.celebration_delay_ms)
    }

    pub fn classifier_budget(&self) -> Duration {
        Duration::from_millis(self.classifier_budget_ms)
    }
}

/// Settings persisted as pretty JSON next to the application data.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<ChallengeSettings>,
}

impl SettingsStore {
    /// Loads `path` if it exists. A file that fails to parse falls back to
    /// defaults; a file that parses but is out of range is an error.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!(
                    "Ignoring unreadable settings in {}: {}",
                    path.display(),
                    err
                );
                ChallengeSettings::default()
            })
        } else {
            ChallengeSettings::default()
        };

        data.validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn challenge(&self) -> ChallengeSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update_challenge(&self, settings: ChallengeSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    fn persist(&self, data: &ChallengeSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
