//! # csi_core - Shared primitives
//!
//! Small vocabulary types every coordinator crate agrees on:
//! - **Roles** the player can embody
//! - **Hands** (the two interaction slots)
//! - **Ids** for items, scene objects and avatars
//! - **Poses** in world space
//! - **Case clock** with the evening rollover rule

pub mod clock;
pub mod hand;
pub mod id;
pub mod pose;
pub mod role;

pub use clock::*;
pub use hand::*;
pub use id::*;
pub use pose::*;
pub use role::*;
pub use glam::{Quat, Vec2, Vec3};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clock::{evening_rollover, CaseClock, DEFAULT_EVENING_HOUR};
    pub use crate::hand::Hand;
    pub use crate::id::{AvatarId, IdGenerator, ItemId, SceneObjectId};
    pub use crate::pose::Pose;
    pub use crate::role::Role;
    pub use glam::{Quat, Vec2, Vec3};
}
