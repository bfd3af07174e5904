//! Problem modes.

use crate::error::{AtlasError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What kind of problem the engineer brought.
///
/// Shapes prompt emphasis in every stage. Independent of tier and cost mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemMode {
    /// Sudden deviation: SPC alarm, yield crash, tool excursion.
    Excursion,
    /// Chronic loss to be engineered away.
    Improvement,
    /// Flow blockers: downtime, queue time, dispatch.
    Operations,
}

impl ProblemMode {
    pub const ALL: [ProblemMode; 3] = [
        ProblemMode::Excursion,
        ProblemMode::Improvement,
        ProblemMode::Operations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemMode::Excursion => "excursion",
            ProblemMode::Improvement => "improvement",
            ProblemMode::Operations => "operations",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProblemMode::Excursion => "Excursion",
            ProblemMode::Improvement => "Yield Improvement",
            ProblemMode::Operations => "Operations Troubleshooting",
        }
    }
}

impl fmt::Display for ProblemMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProblemMode {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "excursion" | "1" => Ok(ProblemMode::Excursion),
            "improvement" | "2" => Ok(ProblemMode::Improvement),
            "operations" | "ops" | "3" => Ok(ProblemMode::Operations),
            _ => Err(AtlasError::invalid_parameter(
                "problem mode",
                s,
                "excursion, improvement, operations",
            )),
        }
    }
}
