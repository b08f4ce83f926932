//! Timeline event names

use serde::{Deserialize, Serialize};

/// A named fact about the case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimelineEvent {
    /// The incident itself (anchor)
    Incident,
    FirstResponderArrived,
    /// Police tape set up around the scene
    Cordoned,
    /// Tactical operations center called
    CalledTOC,
    InvestigatorArrived,
    InvestigatorFilledUp,
    SketchFilledUp,
    EvidenceMarked,
    PhotographsTaken,
    FingerprintLifted,
    EvidenceCollected,
    EvidenceSealed,
    CustodyFilledUp,
}

impl TimelineEvent {
    /// Every event, in narrative order
    pub const ALL: [TimelineEvent; 13] = [
        Self::Incident,
        Self::FirstResponderArrived,
        Self::Cordoned,
        Self::CalledTOC,
        Self::InvestigatorArrived,
        Self::InvestigatorFilledUp,
        Self::SketchFilledUp,
        Self::EvidenceMarked,
        Self::PhotographsTaken,
        Self::FingerprintLifted,
        Self::EvidenceCollected,
        Self::EvidenceSealed,
        Self::CustodyFilledUp,
    ];

    /// Label shown on forms and reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Incident => "Incident",
            Self::FirstResponderArrived => "First responder arrived",
            Self::Cordoned => "Scene cordoned",
            Self::CalledTOC => "Called TOC",
            Self::InvestigatorArrived => "Investigator arrived",
            Self::InvestigatorFilledUp => "Investigator form completed",
            Self::SketchFilledUp => "Sketch completed",
            Self::EvidenceMarked => "Evidence marked",
            Self::PhotographsTaken => "Photographs taken",
            Self::FingerprintLifted => "Fingerprint lifted",
            Self::EvidenceCollected => "Evidence collected",
            Self::EvidenceSealed => "Evidence sealed",
            Self::CustodyFilledUp => "Chain of custody completed",
        }
    }
}

impl std::fmt::Display for TimelineEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
