pub mod capture;
pub mod challenge;
pub mod classifier;
pub mod emotion;
pub mod error;
pub mod settings;
pub mod utils;
pub mod verification;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use log::{info, warn};

use capture::{CaptureDevice, CaptureSink, ChunkRecorder, SyntheticCamera};
use challenge::{catalog, issue_token, ChallengeController, ChallengeInfo, ChallengeKind};
use classifier::{ClassifierHandle, MirrorClassifier};
use settings::SettingsStore;

const SETTINGS_ENV: &str = "VIBECHECK_SETTINGS";

/// Shared collaborators every challenge is built from.
pub struct VerificationApp {
    settings: SettingsStore,
    classifier: ClassifierHandle,
    device: Arc<dyn CaptureDevice>,
}

impl VerificationApp {
    pub fn new(
        settings: SettingsStore,
        classifier: ClassifierHandle,
        device: Arc<dyn CaptureDevice>,
    ) -> Self {
        Self {
            settings,
            classifier,
            device,
        }
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn catalog(&self) -> Vec<ChallengeInfo> {
        catalog(&self.settings.challenge())
    }

    /// Fresh controller for one session of `kind`, using the current
    /// settings.
    pub fn controller(&self, kind: ChallengeKind, sink: Box<dyn CaptureSink>) -> ChallengeController {
        ChallengeController::new(
            kind,
            self.settings.challenge(),
            self.classifier.clone(),
            Arc::clone(&self.device),
            sink,
        )
    }
}

fn settings_path() -> PathBuf {
    std::env::var_os(SETTINGS_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("vibecheck-settings.json"))
}

/// Plays one challenge against the synthetic camera and prints the result.
/// The challenge kind is taken from the first argument (`1`..`3` or its id).
pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("vibecheck starting up...");

    let kind = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<ChallengeKind>().map_err(anyhow::Error::msg)?,
        None => ChallengeKind::MoodAttack,
    };

    let settings = SettingsStore::new(settings_path())?;

    let recorder = ChunkRecorder::new();
    let camera = SyntheticCamera::new(320, 240).with_feed(recorder.feed());
    let app = VerificationApp::new(
        settings,
        ClassifierHandle::new("mirror", MirrorClassifier::new(0.85)),
        Arc::new(camera),
    );

    let info = kind.info(&app.settings().challenge());
    info!("{}: {} (reward {})", info.title, info.description, info.reward);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let result = runtime.block_on(async {
        let controller = app.controller(kind, Box::new(recorder));
        if let Err(err) = controller.start().await {
            warn!("{}", err.user_message());
            return Err(anyhow::Error::new(err));
        }
        controller.finish().await.map_err(anyhow::Error::new)
    })?;

    let summary = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
    println!("{summary}");

    match issue_token(&result, &mut rand::thread_rng()) {
        Some(token) => println!("Verification token: {token}"),
        None => println!("Challenge failed, no token issued"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn controllers_follow_stored_settings() {
        let path = std::env::temp_dir().join(format!("vibecheck-app-{}.json", uuid::Uuid::new_v4()));
        let store = SettingsStore::new(path.clone()).unwrap();
        let mut settings = store.challenge();
        settings.max_duration_secs = 12;
        store.update_challenge(settings).unwrap();

        let app = VerificationApp::new(
            store,
            ClassifierHandle::new("mirror", MirrorClassifier::new(0.9)),
            Arc::new(SyntheticCamera::new(8, 8)),
        );
        let entries = app.catalog();
        assert_eq!(entries.len(), 3);
        assert!(entries[2].description.contains("in 12 second"));

        let controller = app.controller(ChallengeKind::MoodAttack, Box::new(ChunkRecorder::new()));
        assert_eq!(controller.kind(), ChallengeKind::MoodAttack);
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.session.max_duration_secs, 12);
        assert_eq!(snapshot.session.required_count, 10);

        std::fs::remove_file(path).ok();
    }
}
