///! Imagery survey candidates and acquisition results

use galah_common::SkyPosition;
use serde::{Deserialize, Serialize};

/// Dynamic ranking exception for one survey
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RankOverride {
    /// Rank the survey last for declinations strictly below the threshold
    DemoteSouthOf(f64),
}

impl RankOverride {
    pub fn applies_at(&self, position: SkyPosition) -> bool {
        match self {
            RankOverride::DemoteSouthOf(dec) => position.dec_deg < *dec,
        }
    }
}

/// Known defect in a survey's published coverage map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CoverageCaveat {
    /// The map claims coverage below the threshold, but the images there are blank
    ExcludeSouthOf(f64),
}

impl CoverageCaveat {
    pub fn excludes(&self, position: SkyPosition) -> bool {
        match self {
            CoverageCaveat::ExcludeSouthOf(dec) => position.dec_deg < *dec,
        }
    }
}

/// One imagery provider in the preference list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyCandidate {
    /// Short label, e.g. "DSS2"
    pub label: String,
    /// HiPS identifier, e.g. "CDS/P/DSS2/color"
    pub locator: String,
    /// Position in the preference list, 0 = most preferred
    pub rank: usize,
    pub rank_override: Option<RankOverride>,
    pub coverage_caveat: Option<CoverageCaveat>,
}

impl SurveyCandidate {
    pub fn new(label: impl Into<String>, locator: impl Into<String>, rank: usize) -> Self {
        Self {
            label: label.into(),
            locator: locator.into(),
            rank,
            rank_override: None,
            coverage_caveat: None,
        }
    }

    pub fn with_rank_override(mut self, rank_override: RankOverride) -> Self {
        self.rank_override = Some(rank_override);
        self
    }

    pub fn with_coverage_caveat(mut self, caveat: CoverageCaveat) -> Self {
        self.coverage_caveat = Some(caveat);
        self
    }

    pub fn is_demoted_at(&self, position: SkyPosition) -> bool {
        self.rank_override.is_some_and(|o| o.applies_at(position))
    }
}

impl std::fmt::Display for SurveyCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.label, self.locator)
    }
}

/// A sky image downloaded from one survey
#[derive(Debug, Clone, PartialEq)]
pub struct AcquiredImage {
    pub survey: SurveyCandidate,
    pub bytes: Vec<u8>,
}
