//! Detection method identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A named table detection strategy.
///
/// The registry is keyed by this value. Call sites that only iterate the
/// registry keep working when new variants are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DetectionMethod {
    /// Structure inferred by an external layout model.
    AiDriven,
    /// Deterministic alignment clustering over text block positions.
    ///
    /// Never depends on an external model, so it terminates every fallback chain.
    RuleBased,
    /// Merge of AI-driven and rule-based output.
    Hybrid,
}

impl DetectionMethod {
    /// Stable lowercase name used in logs, JSON, and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::AiDriven => "ai_driven",
            DetectionMethod::RuleBased => "rule_based",
            DetectionMethod::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectionMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ai" | "ai_driven" | "ai-driven" | "model" => Ok(DetectionMethod::AiDriven),
            "rule" | "rule_based" | "rule-based" | "rules" => Ok(DetectionMethod::RuleBased),
            "hybrid" => Ok(DetectionMethod::Hybrid),
            other => Err(Error::Config(format!("unknown detection method '{}'", other))),
        }
    }
}
