//! Lens facing and mirroring.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which physical camera is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LensFacing {
    /// User-facing camera.
    Front,
    /// World-facing camera.
    #[default]
    Back,
}

impl LensFacing {
    /// Returns the opposite lens.
    pub fn flipped(self) -> Self {
        match self {
            LensFacing::Front => LensFacing::Back,
            LensFacing::Back => LensFacing::Front,
        }
    }
}

impl fmt::Display for LensFacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LensFacing::Front => f.write_str("front"),
            LensFacing::Back => f.write_str("back"),
        }
    }
}

/// Error returned when parsing an unknown lens name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown lens facing '{0}' (expected 'front' or 'back')")]
pub struct ParseFacingError(String);

impl FromStr for LensFacing {
    type Err = ParseFacingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "front" => Ok(LensFacing::Front),
            "back" => Ok(LensFacing::Back),
            _ => Err(ParseFacingError(s.to_string())),
        }
    }
}

/// Horizontal mirroring applied to recorded video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorMode {
    /// Never mirror.
    Off,
    /// Always mirror.
    On,
    /// Mirror only while the front lens is bound.
    #[default]
    OnFrontOnly,
}

impl MirrorMode {
    /// Returns true if frames from `facing` should be mirrored.
    pub fn applies_to(self, facing: LensFacing) -> bool {
        match self {
            MirrorMode::Off => false,
            MirrorMode::On => true,
            MirrorMode::OnFrontOnly => facing == LensFacing::Front,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_toggles() {
        assert_eq!(LensFacing::Back.flipped(), LensFacing::Front);
        assert_eq!(LensFacing::Front.flipped().flipped(), LensFacing::Front);
    }

    #[test]
    fn test_parse_facing() {
        assert_eq!("Front".parse::<LensFacing>().unwrap(), LensFacing::Front);
        assert_eq!(" back ".parse::<LensFacing>().unwrap(), LensFacing::Back);
        assert!("side".parse::<LensFacing>().is_err());
    }

    #[test]
    fn test_mirror_front_only() {
        assert!(MirrorMode::OnFrontOnly.applies_to(LensFacing::Front));
        assert!(!MirrorMode::OnFrontOnly.applies_to(LensFacing::Back));
        assert!(!MirrorMode::Off.applies_to(LensFacing::Front));
    }
}
