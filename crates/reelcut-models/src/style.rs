//! Reel output modes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// How each topic segment is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReelMode {
    /// Keep the cut segment in its source aspect ratio
    #[default]
    Horizontal,
    /// Reframe the cut segment into a stabilized portrait reel
    Vertical,
}

impl ReelMode {
    pub const ALL: &'static [ReelMode] = &[ReelMode::Horizontal, ReelMode::Vertical];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReelMode::Horizontal => "horizontal",
            ReelMode::Vertical => "vertical",
        }
    }

    /// Whether the stabilized reframe path runs.
    pub fn is_vertical(&self) -> bool {
        matches!(self, ReelMode::Vertical)
    }
}

impl From<bool> for ReelMode {
    fn from(vertical: bool) -> Self {
        if vertical {
            ReelMode::Vertical
        } else {
            ReelMode::Horizontal
        }
    }
}

impl fmt::Display for ReelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReelMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "horizontal" | "landscape" => Ok(ReelMode::Horizontal),
            "vertical" | "portrait" => Ok(ReelMode::Vertical),
            _ => Err(ModelError::UnknownMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("Vertical".parse::<ReelMode>().unwrap(), ReelMode::Vertical);
        assert_eq!("landscape".parse::<ReelMode>().unwrap(), ReelMode::Horizontal);
        assert!("diagonal".parse::<ReelMode>().is_err());

        for mode in ReelMode::ALL {
            assert_eq!(mode.to_string().parse::<ReelMode>().unwrap(), *mode);
        }
    }

    #[test]
    fn test_from_flag() {
        assert!(ReelMode::from(true).is_vertical());
        assert!(!ReelMode::from(false).is_vertical());
    }
}
