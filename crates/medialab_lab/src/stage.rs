//! The four production stages and their grading scales.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest score a single rubric criterion can receive.
pub const MAX_CRITERION_SCORE: u8 = 4;

/// A stage of the film project, in production order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Idea, characters and story.
    Development,
    /// Storyboard, roles and props.
    PreProduction,
    /// Filming.
    Production,
    /// Editing, titles and reflection.
    PostProduction,
}

impl Stage {
    /// Every stage, in order.
    pub const ALL: [Stage; 4] = [
        Stage::Development,
        Stage::PreProduction,
        Stage::Production,
        Stage::PostProduction,
    ];

    /// Stable key used in records and settings.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::PreProduction => "preproduction",
            Self::Production => "production",
            Self::PostProduction => "postproduction",
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Development => "Development",
            Self::PreProduction => "Pre-Production",
            Self::Production => "Production",
            Self::PostProduction => "Post-Production",
        }
    }

    /// Short prefix used for resource names (`dev`, `pre`, `pro`, `post`).
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Development => "dev",
            Self::PreProduction => "pre",
            Self::Production => "pro",
            Self::PostProduction => "post",
        }
    }

    /// The three rubric criteria teachers score for this stage.
    #[must_use]
    pub const fn rubric(self) -> [&'static str; 3] {
        match self {
            Self::Development => ["Idea clarity", "Character", "Story structure"],
            Self::PreProduction => ["Storyboard detail", "Shot plan", "Roles & resources"],
            Self::Production => ["Camera/sound use", "Teamwork", "Safety"],
            Self::PostProduction => ["Editing", "Audio/titles", "Reflection"],
        }
    }

    /// Guided checklist items as `(id, label)`.
    #[must_use]
    pub const fn checklist(self) -> [(&'static str, &'static str); 3] {
        match self {
            Self::Development => [
                ("idea", "I explained my idea"),
                ("characters", "I listed people or roles"),
                ("story", "I wrote the beginning, middle, end"),
            ],
            Self::PreProduction => [
                ("storyboard", "I sketched or described 3 scenes"),
                ("roles", "We picked our team jobs"),
                ("props", "I listed props/equipment"),
            ],
            Self::Production => [
                ("tripod", "Tripod and camera were safe"),
                ("sound", "We checked sound"),
                ("scenes", "We filmed our scenes"),
            ],
            Self::PostProduction => [
                ("order", "Clips are in the right order"),
                ("titles", "I added titles or captions"),
                ("reflect", "I wrote or recorded my reflection"),
            ],
        }
    }

    /// One-line help shown next to the checklist.
    #[must_use]
    pub const fn tip(self) -> &'static str {
        match self {
            Self::Development => "Say your idea in one sentence. Who is in your story? What happens first, next, last? You can record your voice.",
            Self::PreProduction => "Draw or describe at least 3 scenes. Pick team jobs. List props and places.",
            Self::Production => "Safety first. Check tripod. Do a sound test. Film one short scene at a time.",
            Self::PostProduction => "Put clips in order. Add a title. Add credits. Listen for clear sound.",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string names no stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stage: {0}")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    /// Accepts the key (`preproduction`) or the prefix (`pre`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|stage| stage.key() == wanted || stage.prefix() == wanted)
            .ok_or_else(|| UnknownStage(s.to_owned()))
    }
}

/// Per-stage badge earned from the rubric total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Badge {
    /// Total of at least 4.
    Bronze,
    /// Total of at least 7.
    Silver,
    /// Total of at least 10.
    Gold,
}

impl Badge {
    /// Returns the badge for a stage total, if any.
    #[must_use]
    pub const fn for_score(score: u32) -> Option<Self> {
        match score {
            10.. => Some(Self::Gold),
            7..=9 => Some(Self::Silver),
            4..=6 => Some(Self::Bronze),
            _ => None,
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Certificate award over the whole project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Award {
    /// Completed with a total below 16.
    Participant,
    /// Total of at least 16.
    Bronze,
    /// Total of at least 28.
    Silver,
    /// Total of at least 40.
    Gold,
}

impl Award {
    /// Returns the award for a project total.
    #[must_use]
    pub const fn for_total(total: u32) -> Self {
        match total {
            40.. => Self::Gold,
            28..=39 => Self::Silver,
            16..=27 => Self::Bronze,
            _ => Self::Participant,
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Participant => "Participant",
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
        }
    }
}

impl fmt::Display for Award {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn badge_thresholds() {
        assert_eq!(Badge::for_score(0), None);
        assert_eq!(Badge::for_score(3), None);
        assert_eq!(Badge::for_score(4), Some(Badge::Bronze));
        assert_eq!(Badge::for_score(6), Some(Badge::Bronze));
        assert_eq!(Badge::for_score(7), Some(Badge::Silver));
        assert_eq!(Badge::for_score(9), Some(Badge::Silver));
        assert_eq!(Badge::for_score(10), Some(Badge::Gold));
        assert_eq!(Badge::for_score(12), Some(Badge::Gold));
    }

    #[test]
    fn award_thresholds() {
        assert_eq!(Award::for_total(0), Award::Participant);
        assert_eq!(Award::for_total(15), Award::Participant);
        assert_eq!(Award::for_total(16), Award::Bronze);
        assert_eq!(Award::for_total(28), Award::Silver);
        assert_eq!(Award::for_total(39), Award::Silver);
        assert_eq!(Award::for_total(40), Award::Gold);
    }

    #[test]
    fn parse_by_key_or_prefix() {
        assert_eq!("preproduction".parse::<Stage>().unwrap(), Stage::PreProduction);
        assert_eq!("POST".parse::<Stage>().unwrap(), Stage::PostProduction);
        assert_eq!(" dev ".parse::<Stage>().unwrap(), Stage::Development);
        assert!("casting".parse::<Stage>().is_err());
    }

    #[test]
    fn keys_are_serde_names() {
        for stage in Stage::ALL {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage.key()));
        }
    }
}
