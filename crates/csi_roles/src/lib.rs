//! CSI Roles - Persona Switching
//!
//! The player embodies one role at a time. Switching roles hands the held
//! items over from the old avatar to the new one.
//!
//! # Features
//!
//! - Avatar catalog with lazily instantiated, persistent avatars
//! - Tick-driven transition (suspend, swap, reposition, settle, resume)
//! - At most one transition in flight
//! - Rate-limited role menu that pauses the game while open
//! - Rig seam for the external XR rig
//!
//! # Example
//!
//! ```ignore
//! use csi_roles::prelude::*;
//!
//! let mut roles = RoleManager::new(RoleConfig::default(), AvatarCatalog::standard());
//! roles.request_role_change(Role::FirstResponder)?;
//!
//! loop {
//!     let mut host = RoleHost::new(&mut hands, &mut items, &mut rig);
//!     roles.tick(dt, &mut host);
//!     for event in roles.drain_events() {
//!         // ...
//!     }
//! }
//! ```

pub mod avatar;
pub mod manager;
pub mod menu;

pub mod prelude {
    pub use crate::avatar::{Avatar, AvatarCatalog, AvatarPrefab};
    pub use crate::manager::{
        RigDriver, RoleChangeError, RoleConfig, RoleEvent, RoleHost, RoleManager, RoleSnapshot,
        SimulatedRig, TransitionPhase,
    };
    pub use crate::menu::RoleMenu;
}

pub use prelude::*;
