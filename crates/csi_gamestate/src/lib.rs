//! CSI GameState - Scene Flags and Save State
//!
//! This crate provides the per-scene flag bag that gates write actions,
//! plus save/load of whole-session snapshots.
//!
//! # Features
//!
//! - Typed boolean/int flags with per-field change notification
//! - Action gating derived from flag combinations
//! - Snapshot/restore of the flag bag
//! - Save/load system with versioning (JSON or binary)
//!
//! # Example
//!
//! ```ignore
//! use csi_gamestate::prelude::*;
//!
//! let mut flags = GameFlags::new();
//! flags.set_bool(FlagKey::CanWriteNotepad, true);
//! flags.set_bool(FlagKey::HasCheckedPulse, true);
//! assert!(flags.can_perform(GameAction::WritePulse));
//! ```

pub mod action;
pub mod flags;
pub mod save;

pub mod prelude {
    pub use crate::action::GameAction;
    pub use crate::flags::{FlagChange, FlagKey, FlagSnapshot, FlagValue, GameFlags, ObserverId};
    pub use crate::save::{SaveData, SaveError, SaveFormat, SaveHeader, SaveManager, SaveSlot};
}

pub use prelude::*;
