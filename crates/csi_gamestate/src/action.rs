//! Action gating over the flag bag

use crate::flags::{FlagKey, GameFlags};
use serde::{Deserialize, Serialize};

/// Write/handling actions whose legality depends on scene flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameAction {
    /// Write arrival time on the notepad
    WriteArrival,
    /// Write the pulse reading on the notepad
    WritePulse,
    /// Write the next field of a form
    WriteForm,
    /// Sign the seal of an evidence pack
    SignEvidencePack,
    /// Handle physical evidence (tweezers, swab)
    CollectEvidence,
}

impl GameAction {
    /// Check whether the flags permit this action
    pub fn permitted(&self, flags: &GameFlags) -> bool {
        use FlagKey::*;
        match self {
            Self::WriteArrival => {
                flags.get_bool(CanWriteNotepad)
                    && flags.get_bool(HasCheckedTime)
                    && !flags.get_bool(HasWrittenArrival)
            }
            Self::WritePulse => {
                flags.get_bool(CanWriteNotepad)
                    && flags.get_bool(HasCheckedPulse)
                    && !flags.get_bool(HasWrittenPulse)
            }
            Self::WriteForm => flags.get_bool(CanWriteForm),
            Self::SignEvidencePack => flags.get_bool(CanWriteEvidencePackSeal),
            Self::CollectEvidence => flags.get_bool(HasGlovesOn),
        }
    }
}

impl GameFlags {
    /// Check whether an action is currently legal
    pub fn can_perform(&self, action: GameAction) -> bool {
        action.permitted(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_pulse_gating() {
        let mut flags = GameFlags::new();
        assert!(!flags.can_perform(GameAction::WritePulse));

        flags.set_bool(FlagKey::CanWriteNotepad, true);
        assert!(!flags.can_perform(GameAction::WritePulse));

        flags.set_bool(FlagKey::HasCheckedPulse, true);
        assert!(flags.can_perform(GameAction::WritePulse));

        flags.set_bool(FlagKey::HasWrittenPulse, true);
        assert!(!flags.can_perform(GameAction::WritePulse));
    }

    #[test]
    fn test_arrival_independent_of_pulse() {
        let mut flags = GameFlags::new();
        flags.set_bool(FlagKey::CanWriteNotepad, true);
        flags.set_bool(FlagKey::HasCheckedTime, true);

        assert!(flags.can_perform(GameAction::WriteArrival));
        assert!(!flags.can_perform(GameAction::WritePulse));
    }

    #[test]
    fn test_gloves_gate_collection() {
        let mut flags = GameFlags::new();
        assert!(!flags.can_perform(GameAction::CollectEvidence));
        flags.set_bool(FlagKey::HasGlovesOn, true);
        assert!(flags.can_perform(GameAction::CollectEvidence));
    }
}
