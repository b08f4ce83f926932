//! Player personas

use serde::{Deserialize, Serialize};

/// A persona the player can embody at the scene
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    FirstResponder,
    InvestigatorOnCase,
    SocoTeamLead,
    Photographer,
    Sketcher,
    Searcher,
    Measurer,
    FingerprintSpecialist,
    Collector,
    EvidenceCustodian,
    /// No persona embodied yet
    None,
}

impl Default for Role {
    fn default() -> Self {
        Self::None
    }
}

impl Role {
    /// Playable roles in menu order
    pub const fn selectable() -> [Role; 10] {
        [
            Self::FirstResponder,
            Self::InvestigatorOnCase,
            Self::SocoTeamLead,
            Self::Photographer,
            Self::Sketcher,
            Self::Searcher,
            Self::Measurer,
            Self::FingerprintSpecialist,
            Self::Collector,
            Self::EvidenceCustodian,
        ]
    }

    /// Human readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::FirstResponder => "First Responder",
            Self::InvestigatorOnCase => "Investigator-On-Case",
            Self::SocoTeamLead => "SOCO Team Lead",
            Self::Photographer => "Photographer",
            Self::Sketcher => "Sketcher",
            Self::Searcher => "Searcher",
            Self::Measurer => "Measurer",
            Self::FingerprintSpecialist => "Fingerprint Specialist",
            Self::Collector => "Collector",
            Self::EvidenceCustodian => "Evidence Custodian",
            Self::None => "None",
        }
    }

    /// Stable key used in config files and unlock lists
    pub fn key(&self) -> &'static str {
        match self {
            Self::FirstResponder => "first_responder",
            Self::InvestigatorOnCase => "investigator_on_case",
            Self::SocoTeamLead => "soco_team_lead",
            Self::Photographer => "photographer",
            Self::Sketcher => "sketcher",
            Self::Searcher => "searcher",
            Self::Measurer => "measurer",
            Self::FingerprintSpecialist => "fingerprint_specialist",
            Self::Collector => "collector",
            Self::EvidenceCustodian => "evidence_custodian",
            Self::None => "none",
        }
    }

    /// Check if this is a playable role
    pub fn is_playable(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase().replace(|c: char| c == '-' || c == ' ', "_");
        Self::selectable()
            .into_iter()
            .chain(std::iter::once(Self::None))
            .find(|role| role.key() == needle)
            .ok_or_else(|| format!("Unknown role: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectable_excludes_none() {
        let roles = Role::selectable();
        assert_eq!(roles.len(), 10);
        assert!(roles.iter().all(Role::is_playable));
    }

    #[test]
    fn test_parse_role() {
        assert_eq!("photographer".parse::<Role>(), Ok(Role::Photographer));
        assert_eq!("Evidence Custodian".parse::<Role>(), Ok(Role::EvidenceCustodian));
        assert_eq!("soco-team-lead".parse::<Role>(), Ok(Role::SocoTeamLead));
        assert!("janitor".parse::<Role>().is_err());
    }
}
