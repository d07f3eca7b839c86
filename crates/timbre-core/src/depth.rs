use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// How much analysis to run on a track.
///
/// Each level includes everything the previous one does:
/// lightweight covers loudness and energy statistics, standard adds rhythm
/// and tonal descriptors, comprehensive adds spectral and semantic ones.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisDepth {
    Lightweight,
    #[default]
    Standard,
    Comprehensive,
}

impl AnalysisDepth {
    pub const ALL: [Self; 3] = [Self::Lightweight, Self::Standard, Self::Comprehensive];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lightweight => "lightweight",
            Self::Standard => "standard",
            Self::Comprehensive => "comprehensive",
        }
    }
}

impl fmt::Display for AnalysisDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisDepth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lightweight" => Ok(Self::Lightweight),
            "standard" => Ok(Self::Standard),
            "comprehensive" => Ok(Self::Comprehensive),
            other => Err(Error::InvalidData(format!(
                "unknown analysis depth '{other}' (expected lightweight, standard or comprehensive)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_from_str() {
        assert_eq!("lightweight".parse::<AnalysisDepth>().unwrap(), AnalysisDepth::Lightweight);
        assert_eq!("Standard".parse::<AnalysisDepth>().unwrap(), AnalysisDepth::Standard);
        assert_eq!(
            " COMPREHENSIVE ".parse::<AnalysisDepth>().unwrap(),
            AnalysisDepth::Comprehensive
        );
        assert!("deep".parse::<AnalysisDepth>().is_err());
    }

    #[test]
    fn test_depth_display_parses_back() {
        for depth in AnalysisDepth::ALL {
            assert_eq!(depth.to_string().parse::<AnalysisDepth>().unwrap(), depth);
        }
    }

    #[test]
    fn test_depth_ordering() {
        assert!(AnalysisDepth::Lightweight < AnalysisDepth::Standard);
        assert!(AnalysisDepth::Standard < AnalysisDepth::Comprehensive);
        assert_eq!(AnalysisDepth::default(), AnalysisDepth::Standard);
    }

    #[test]
    fn test_depth_serde_lowercase() {
        let json = serde_json::to_string(&AnalysisDepth::Comprehensive).unwrap();
        assert_eq!(json, "\"comprehensive\"");
    }
}
