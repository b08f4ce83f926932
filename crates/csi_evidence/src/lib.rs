//! CSI Evidence - Evidence Marker Registry
//!
//! Numbered markers placed where evidence was found. Each marker kind has a
//! fixed-capacity slot array; display numbers are shared across kinds and
//! only ever grow.
//!
//! # Features
//!
//! - Lowest-free-slot allocation per kind
//! - Minimum separation between any two markers
//! - Stale-reference checked removal
//! - Nearest-marker lookup
//! - Placed/Removed event queue

pub mod manager;
pub mod marker;

pub mod prelude {
    pub use crate::manager::{EvidenceConfig, EvidenceEvent, EvidenceManager, EvidenceSnapshot, PlaceError};
    pub use crate::marker::{EvidenceMarker, MarkerKind, MarkerRef};
}

pub use prelude::*;
