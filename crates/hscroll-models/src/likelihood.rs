//! The SafeSearch likelihood scale.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Ordered likelihood levels reported by the image-safety classifier.
///
/// The derived ordering is the policy ordering: a category is flagged when
/// its likelihood is at or above the configured threshold. `Unknown`
/// compares below every real level and therefore never crosses a threshold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Likelihood {
    Unknown,
    VeryUnlikely,
    Unlikely,
    Possible,
    Likely,
    VeryLikely,
}

impl Likelihood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Likelihood::Unknown => "UNKNOWN",
            Likelihood::VeryUnlikely => "VERY_UNLIKELY",
            Likelihood::Unlikely => "UNLIKELY",
            Likelihood::Possible => "POSSIBLE",
            Likelihood::Likely => "LIKELY",
            Likelihood::VeryLikely => "VERY_LIKELY",
        }
    }
}

impl fmt::Display for Likelihood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Likelihood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UNKNOWN" => Ok(Likelihood::Unknown),
            "VERY_UNLIKELY" => Ok(Likelihood::VeryUnlikely),
            "UNLIKELY" => Ok(Likelihood::Unlikely),
            "POSSIBLE" => Ok(Likelihood::Possible),
            "LIKELY" => Ok(Likelihood::Likely),
            "VERY_LIKELY" => Ok(Likelihood::VeryLikely),
            other => Err(format!("unrecognized likelihood level: {other}")),
        }
    }
}

impl Default for Likelihood {
    fn default() -> Self {
        Likelihood::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_is_ordered() {
        assert!(Likelihood::VeryUnlikely < Likelihood::Unlikely);
        assert!(Likelihood::Unlikely < Likelihood::Possible);
        assert!(Likelihood::Possible < Likelihood::Likely);
        assert!(Likelihood::Likely < Likelihood::VeryLikely);
        assert!(Likelihood::Unknown < Likelihood::VeryUnlikely);
    }

    #[test]
    fn unknown_never_crosses_a_threshold() {
        assert!(Likelihood::Unknown < Likelihood::VeryUnlikely);
        assert!(!(Likelihood::Unknown >= Likelihood::Possible));
    }

    #[test]
    fn parses_wire_form() {
        assert_eq!(
            "VERY_LIKELY".parse::<Likelihood>().unwrap(),
            Likelihood::VeryLikely
        );
        assert_eq!(
            "possible".parse::<Likelihood>().unwrap(),
            Likelihood::Possible
        );
        assert!("SOMEWHAT_LIKELY".parse::<Likelihood>().is_err());
    }

    #[test]
    fn serde_uses_wire_form() {
        let json = serde_json::to_string(&Likelihood::VeryUnlikely).unwrap();
        assert_eq!(json, "\"VERY_UNLIKELY\"");
        let back: Likelihood = serde_json::from_str("\"LIKELY\"").unwrap();
        assert_eq!(back, Likelihood::Likely);
    }
}
