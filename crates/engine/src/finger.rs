//! Canonical fprintd finger names.
//!
//! The daemon identifies templates by the string names below; anything else
//! is rejected before it reaches the bus. `any` is a selector understood by
//! `VerifyStart`, never a stored finger, so it is kept out of the enum and
//! modeled as `None` by [`parse_selector`].

use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Finger {
    LeftThumb,
    LeftIndexFinger,
    LeftMiddleFinger,
    LeftRingFinger,
    LeftLittleFinger,
    RightThumb,
    RightIndexFinger,
    RightMiddleFinger,
    RightRingFinger,
    RightLittleFinger,
}

impl Finger {
    pub const ALL: [Finger; 10] = [
        Finger::LeftThumb,
        Finger::LeftIndexFinger,
        Finger::LeftMiddleFinger,
        Finger::LeftRingFinger,
        Finger::LeftLittleFinger,
        Finger::RightThumb,
        Finger::RightIndexFinger,
        Finger::RightMiddleFinger,
        Finger::RightRingFinger,
        Finger::RightLittleFinger,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LeftThumb => "left-thumb",
            Self::LeftIndexFinger => "left-index-finger",
            Self::LeftMiddleFinger => "left-middle-finger",
            Self::LeftRingFinger => "left-ring-finger",
            Self::LeftLittleFinger => "left-little-finger",
            Self::RightThumb => "right-thumb",
            Self::RightIndexFinger => "right-index-finger",
            Self::RightMiddleFinger => "right-middle-finger",
            Self::RightRingFinger => "right-ring-finger",
            Self::RightLittleFinger => "right-little-finger",
        }
    }
}

impl std::fmt::Display for Finger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Finger {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "left-thumb" => Ok(Self::LeftThumb),
            "left-index-finger" => Ok(Self::LeftIndexFinger),
            "left-middle-finger" => Ok(Self::LeftMiddleFinger),
            "left-ring-finger" => Ok(Self::LeftRingFinger),
            "left-little-finger" => Ok(Self::LeftLittleFinger),
            "right-thumb" => Ok(Self::RightThumb),
            "right-index-finger" => Ok(Self::RightIndexFinger),
            "right-middle-finger" => Ok(Self::RightMiddleFinger),
            "right-ring-finger" => Ok(Self::RightRingFinger),
            "right-little-finger" => Ok(Self::RightLittleFinger),
            other => Err(EngineError::InvalidInput(format!(
                "unknown finger name: {other}"
            ))),
        }
    }
}

/// Parses an optional finger selector from request input.
///
/// `None` and `"any"` both mean "match against every enrolled finger".
pub fn parse_selector(raw: Option<&str>) -> Result<Option<Finger>, EngineError> {
    match raw {
        None => Ok(None),
        Some("any") => Ok(None),
        Some(name) => Finger::try_from(name).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_canonical_names() {
        for finger in Finger::ALL {
            assert_eq!(Finger::try_from(finger.as_str()).unwrap(), finger);
        }
    }

    #[test]
    fn rejects_unknown_names() {
        assert!(Finger::try_from("right-index").is_err());
        assert!(Finger::try_from("").is_err());
    }

    #[test]
    fn any_is_a_selector_not_a_finger() {
        assert!(Finger::try_from("any").is_err());
        assert_eq!(parse_selector(Some("any")).unwrap(), None);
        assert_eq!(parse_selector(None).unwrap(), None);
        assert_eq!(
            parse_selector(Some("left-thumb")).unwrap(),
            Some(Finger::LeftThumb)
        );
    }
}
