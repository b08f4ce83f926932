//! CSI Inventory - Items, Hands and Scene Objects
//!
//! This crate provides the investigator's kit and what can be done with it.
//!
//! # Features
//!
//! - Closed set of item types with per-type state resolved at spawn
//! - Item registry with pause and contact tracking
//! - Two hand slots with the one-hand-per-item invariant
//! - Static scene objects (fingerprints, evidence, victim)
//!
//! # Example
//!
//! ```ignore
//! use csi_inventory::prelude::*;
//!
//! let mut items = ItemRegistry::new();
//! let pen = items.spawn(ItemType::Pen, Pose::default());
//!
//! let mut hands = HandSlots::new();
//! hands.insert(Hand::Right, HeldItem::new(pen, ItemType::Pen));
//! ```

pub mod hands;
pub mod item;
pub mod registry;
pub mod scene;

pub mod prelude {
    pub use crate::hands::{HandSlots, HeldItem, SelectionOracle, StaticSelection};
    pub use crate::item::{
        FormField, FormKind, FormState, ItemState, ItemType, LiftedPrint, PackState, Photo,
        PowderType, TapeRollState, TapeSegment, TapeStage,
    };
    pub use crate::registry::{ContactTarget, Item, ItemRegistry};
    pub use crate::scene::{SceneObject, SceneObjectKind, SceneObjects};
}

pub use prelude::*;
