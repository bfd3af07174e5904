//! 8D phase labels.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// One of the Eight Disciplines, D0 through D8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EightDPhase {
    D0,
    D1,
    D2,
    D3,
    D4,
    D5,
    D6,
    D7,
    D8,
}

impl EightDPhase {
    pub const ALL: [EightDPhase; 9] = [
        EightDPhase::D0,
        EightDPhase::D1,
        EightDPhase::D2,
        EightDPhase::D3,
        EightDPhase::D4,
        EightDPhase::D5,
        EightDPhase::D6,
        EightDPhase::D7,
        EightDPhase::D8,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            EightDPhase::D0 => "Preparation",
            EightDPhase::D1 => "Team",
            EightDPhase::D2 => "Problem Definition",
            EightDPhase::D3 => "Interim Containment",
            EightDPhase::D4 => "Root Cause Analysis",
            EightDPhase::D5 => "Permanent Corrective Actions",
            EightDPhase::D6 => "Validation",
            EightDPhase::D7 => "Prevention",
            EightDPhase::D8 => "Lessons Learned",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            EightDPhase::D0 => &["preparation", "trigger", "alert", "initiated"],
            EightDPhase::D1 => &["team", "owner", "responsible", "lead"],
            EightDPhase::D2 => &["problem definition", "symptom", "scope", "timeline"],
            EightDPhase::D3 => &["containment", "hold", "interim", "temporary"],
            EightDPhase::D4 => &["root cause", "why", "analysis", "hypothesis"],
            EightDPhase::D5 => &["permanent", "corrective action", "solution", "fix"],
            EightDPhase::D6 => &["validation", "verification", "confirm", "test"],
            EightDPhase::D7 => &["prevention", "systemic", "process change", "sop"],
            EightDPhase::D8 => &["lessons learned", "documentation", "share"],
        }
    }
}

impl fmt::Display for EightDPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", *self as u8)
    }
}

impl FromStr for EightDPhase {
    type Err = String;

    /// Accepts "D4", "d4", "D4: Root Cause", "D4_root_cause_analysis".
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some('D' | 'd'), Some(digit @ '0'..='8'), next)
                if next.map_or(true, |c| !c.is_ascii_digit()) =>
            {
                let index = digit as usize - '0' as usize;
                Ok(EightDPhase::ALL[index])
            }
            _ => Err(format!("not an 8D phase: '{}'", s)),
        }
    }
}

/// Phases whose keywords appear in `text` (case-insensitive).
pub fn extract_phases(text: &str) -> BTreeSet<EightDPhase> {
    let lower = text.to_lowercase();
    EightDPhase::ALL
        .iter()
        .filter(|phase| phase.keywords().iter().any(|kw| lower.contains(kw)))
        .copied()
        .collect()
}
