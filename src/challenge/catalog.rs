use std::{fmt, str::FromStr};

use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

use crate::settings::ChallengeSettings;

use super::ChallengeResult;

pub const TOKEN_PREFIX: &str = "vhp_";
const TOKEN_LEN: usize = 9;

/// The challenges a player can pick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ChallengeKind {
    /// Match one random emotion in a selfie.
    VibeCheck,
    /// Match two emotions at once in one selfie.
    MoodMashup,
    /// Match a streak of emotions against the clock, on video.
    MoodAttack,
}

impl ChallengeKind {
    pub const ALL: [ChallengeKind; 3] = [
        ChallengeKind::VibeCheck,
        ChallengeKind::MoodMashup,
        ChallengeKind::MoodAttack,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ChallengeKind::VibeCheck => "vibe-check",
            ChallengeKind::MoodMashup => "mood-mashup",
            ChallengeKind::MoodAttack => "mood-attack",
        }
    }

    /// Catalogue entry; the streak description quotes the configured goal.
    pub fn info(&self, settings: &ChallengeSettings) -> ChallengeInfo {
        match self {
            ChallengeKind::VibeCheck => ChallengeInfo {
                kind: *self,
                title: "Vibe check",
                description: "Simply match the random vibe with a selfie".to_string(),
                reward: 1,
            },
            ChallengeKind::MoodMashup => ChallengeInfo {
                kind: *self,
                title: "Mood mashup",
                description: "Match two moods at once in one selfie".to_string(),
                reward: 5,
            },
            ChallengeKind::MoodAttack => ChallengeInfo {
                kind: *self,
                title: "Mood attack",
                description: format!(
                    "Match at least {} moods in {} second time period",
                    settings.required_count, settings.max_duration_secs
                ),
                reward: 25,
            },
        }
    }
}

impl fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ChallengeKind {
    type Err = String;

    /// Accepts the kebab-case id or the legacy numeric id ("1".."3").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" | "vibe-check" => Ok(ChallengeKind::VibeCheck),
            "2" | "mood-mashup" => Ok(ChallengeKind::MoodMashup),
            "3" | "mood-attack" => Ok(ChallengeKind::MoodAttack),
            other => Err(format!("unknown challenge: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeInfo {
    pub kind: ChallengeKind,
    pub title: &'static str,
    pub description: String,
    pub reward: u32,
}

pub fn catalog(settings: &ChallengeSettings) -> Vec<ChallengeInfo> {
    ChallengeKind::ALL
        .iter()
        .map(|kind| kind.info(settings))
        .collect()
}

/// Verification token for a passed challenge; `None` for a failed one.
pub fn issue_token<R: Rng + ?Sized>(result: &ChallengeResult, rng: &mut R) -> Option<String> {
    if !result.passed {
        return None;
    }

    let suffix: String = (0..TOKEN_LEN)
        .map(|_| rng.sample(Alphanumeric) as char)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    Some(format!("{TOKEN_PREFIX}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_and_named_ids() {
        assert_eq!("1".parse(), Ok(ChallengeKind::VibeCheck));
        assert_eq!("mood-mashup".parse(), Ok(ChallengeKind::MoodMashup));
        assert_eq!(" 3 ".parse(), Ok(ChallengeKind::MoodAttack));
        assert!("4".parse::<ChallengeKind>().is_err());
    }

    #[test]
    fn catalog_lists_every_kind_once() {
        let entries = catalog(&ChallengeSettings::default());
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].reward, 25);
        assert_eq!(
            entries[2].description,
            "Match at least 10 moods in 30 second time period"
        );
        for kind in ChallengeKind::ALL {
            assert_eq!(kind.id().parse::<ChallengeKind>(), Ok(kind));
        }
    }

    #[test]
    fn streak_description_follows_settings() {
        let settings = ChallengeSettings {
            required_count: 5,
            max_duration_secs: 20,
            ..ChallengeSettings::default()
        };
        let info = ChallengeKind::MoodAttack.info(&settings);
        assert_eq!(info.description, "Match at least 5 moods in 20 second time period");
        assert_eq!(
            ChallengeKind::VibeCheck.info(&settings).description,
            "Simply match the random vibe with a selfie"
        );
    }

    #[test]
    fn serializes_kebab_case() {
        let json = serde_json::to_string(&ChallengeKind::MoodAttack).unwrap();
        assert_eq!(json, "\"mood-attack\"");
    }
}
