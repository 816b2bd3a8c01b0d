use chrono::{DateTime, Utc};
use rand::RngCore;

use crate::{
    capture::{MediaBlob, PNG_MIME},
    classifier::{FaceDetection, Frame},
    emotion::{MatchEvaluator, MatchEvent, TargetSelector},
    error::ChallengeError,
    settings::ChallengeSettings,
    verification::{verify_face, FaceVerification},
};

use super::{ChallengeKind, Prompt};

/// Everything a strategy sees for one polled frame.
pub struct FrameContext<'a> {
    pub frame: &'a Frame,
    /// `None` when the classifier found no face, failed, or ran over budget.
    pub detection: Option<&'a FaceDetection>,
    pub prompt: Prompt,
    pub cooldown_active: bool,
    pub now: DateTime<Utc>,
}

/// What a finished session hands over besides its statistics.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub media: MediaBlob,
    pub face_check: Option<FaceVerification>,
}

/// Per-kind behaviour plugged into the controller: how prompts are drawn,
/// what counts as a match and what the final artifact is.
pub trait CaptureStrategy: Send {
    fn kind(&self) -> ChallengeKind;

    fn required_count(&self) -> u32;

    /// Draws the first prompt when the session goes active.
    fn begin(&mut self, selector: &TargetSelector, rng: &mut dyn RngCore) -> Prompt;

    fn on_frame(&mut self, ctx: FrameContext<'_>, evaluator: &MatchEvaluator) -> Option<MatchEvent>;

    /// Prompt following a match on `previous`; never repeats its primary.
    fn next_prompt(
        &mut self,
        selector: &TargetSelector,
        previous: &Prompt,
        rng: &mut dyn RngCore,
    ) -> Prompt;

    /// Builds the artifact from the finished recording.
    fn finalize(&mut self, recording: MediaBlob) -> Result<Artifact, ChallengeError>;
}

pub fn strategy_for(kind: ChallengeKind, settings: &ChallengeSettings) -> Box<dyn CaptureStrategy> {
    match kind {
        ChallengeKind::VibeCheck => Box::new(VibeCheckStrategy::default()),
        ChallengeKind::MoodMashup => Box::new(MoodMashupStrategy::default()),
        ChallengeKind::MoodAttack => Box::new(MoodAttackStrategy::new(settings.required_count)),
    }
}

#[derive(Debug, Clone)]
struct Still {
    frame: Frame,
    detection: FaceDetection,
    prompt: Prompt,
}

fn still_artifact(still: Option<&Still>, recording: MediaBlob) -> Result<Artifact, ChallengeError> {
    let Some(still) = still else {
        return Ok(Artifact {
            media: recording,
            face_check: None,
        });
    };

    let png = still
        .frame
        .encode_png()
        .map_err(|err| ChallengeError::Artifact(format!("{err:#}")))?;

    let face_check = verify_face(
        Some(&still.detection),
        still.frame.width,
        still.frame.height,
        &still.prompt.targets(),
    );

    Ok(Artifact {
        media: MediaBlob::new(PNG_MIME, png),
        face_check: Some(face_check),
    })
}

/// One requested emotion, one selfie.
#[derive(Debug, Default)]
pub struct VibeCheckStrategy {
    still: Option<Still>,
}

impl CaptureStrategy for VibeCheckStrategy {
    fn kind(&self) -> ChallengeKind {
        ChallengeKind::VibeCheck
    }

    fn required_count(&self) -> u32 {
        1
    }

    fn begin(&mut self, selector: &TargetSelector, rng: &mut dyn RngCore) -> Prompt {
        self.still = None;
        Prompt::single(selector.next_target(None, rng))
    }

    fn on_frame(&mut self, ctx: FrameContext<'_>, evaluator: &MatchEvaluator) -> Option<MatchEvent> {
        let detection = ctx.detection?;
        if !evaluator.evaluate(&detection.expressions, ctx.prompt.primary, ctx.cooldown_active) {
            return None;
        }

        self.still = Some(Still {
            frame: ctx.frame.clone(),
            detection: detection.clone(),
            prompt: ctx.prompt,
        });

        Some(MatchEvent {
            label: ctx.prompt.primary,
            score: detection.expressions.score(ctx.prompt.primary),
            timestamp: ctx.now,
        })
    }

    fn next_prompt(
        &mut self,
        selector: &TargetSelector,
        previous: &Prompt,
        rng: &mut dyn RngCore,
    ) -> Prompt {
        Prompt::single(selector.next_target(Some(previous.primary), rng))
    }

    fn finalize(&mut self, recording: MediaBlob) -> Result<Artifact, ChallengeError> {
        still_artifact(self.still.as_ref(), recording)
    }
}

/// Two emotions that must both show in the same selfie.
#[derive(Debug, Default)]
pub struct MoodMashupStrategy {
    still: Option<Still>,
}

impl CaptureStrategy for MoodMashupStrategy {
    fn kind(&self) -> ChallengeKind {
        ChallengeKind::MoodMashup
    }

    fn required_count(&self) -> u32 {
        1
    }

    fn begin(&mut self, selector: &TargetSelector, rng: &mut dyn RngCore) -> Prompt {
        self.still = None;
        let (primary, secondary) = selector.next_pair(None, rng);
        Prompt::dual(primary, secondary)
    }

    fn on_frame(&mut self, ctx: FrameContext<'_>, evaluator: &MatchEvaluator) -> Option<MatchEvent> {
        let detection = ctx.detection?;
        let targets = ctx.prompt.targets();
        if !evaluator.evaluate_all(&detection.expressions, &targets, ctx.cooldown_active) {
            return None;
        }

        let weakest = targets
            .iter()
            .map(|label| detection.expressions.score(*label))
            .fold(f32::INFINITY, f32::min);

        self.still = Some(Still {
            frame: ctx.frame.clone(),
            detection: detection.clone(),
            prompt: ctx.prompt,
        });

        Some(MatchEvent {
            label: ctx.prompt.primary,
            score: weakest,
            timestamp: ctx.now,
        })
    }

    fn next_prompt(
        &mut self,
        selector: &TargetSelector,
        previous: &Prompt,
        rng: &mut dyn RngCore,
    ) -> Prompt {
        let (primary, secondary) = selector.next_pair(Some(previous.primary), rng);
        Prompt::dual(primary, secondary)
    }

    fn finalize(&mut self, recording: MediaBlob) -> Result<Artifact, ChallengeError> {
        still_artifact(self.still.as_ref(), recording)
    }
}

/// Streak game: match `required_count` prompts before the clock runs out.
#[derive(Debug)]
pub struct MoodAttackStrategy {
    required_count: u32,
}

impl MoodAttackStrategy {
    pub fn new(required_count: u32) -> Self {
        Self {
            required_count: required_count.max(1),
        }
    }
}

impl CaptureStrategy for MoodAttackStrategy {
    fn kind(&self) -> ChallengeKind {
        ChallengeKind::MoodAttack
    }

    fn required_count(&self) -> u32 {
        self.required_count
    }

    fn begin(&mut self, selector: &TargetSelector, rng: &mut dyn RngCore) -> Prompt {
        Prompt::single(selector.next_target(None, rng))
    }

    fn on_frame(&mut self, ctx: FrameContext<'_>, evaluator: &MatchEvaluator) -> Option<MatchEvent> {
        let detection = ctx.detection?;
        let target = ctx.prompt.primary;
        evaluator
            .evaluate(&detection.expressions, target, ctx.cooldown_active)
            .then(|| MatchEvent {
                label: target,
                score: detection.expressions.score(target),
                timestamp: ctx.now,
            })
    }

    fn next_prompt(
        &mut self,
        selector: &TargetSelector,
        previous: &Prompt,
        rng: &mut dyn RngCore,
    ) -> Prompt {
        Prompt::single(selector.next_target(Some(previous.primary), rng))
    }

    fn finalize(&mut self, recording: MediaBlob) -> Result<Artifact, ChallengeError> {
        Ok(Artifact {
            media: recording,
            face_check: None,
        })
    }
}
