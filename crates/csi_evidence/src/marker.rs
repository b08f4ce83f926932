//! Evidence marker records

use chrono::NaiveDateTime;
use csi_core::Role;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Marker kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MarkerKind {
    /// Numbered tent for physical items
    Item,
    /// Marker for the body
    Body,
}

impl MarkerKind {
    pub const ALL: [MarkerKind; 2] = [Self::Item, Self::Body];

    /// Index into per-kind tables
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::Item => 0,
            Self::Body => 1,
        }
    }
}

/// Stable reference to a placed marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerRef {
    pub kind: MarkerKind,
    pub slot: usize,
    /// Display number, unique for the session
    pub number: u32,
}

/// A placed marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceMarker {
    pub kind: MarkerKind,
    pub slot: usize,
    pub number: u32,
    pub case_id: Option<String>,
    pub position: Vec3,
    pub rotation: Quat,
    pub placed_at: NaiveDateTime,
    pub placed_by: Role,
}

impl EvidenceMarker {
    /// Reference to this marker
    pub fn reference(&self) -> MarkerRef {
        MarkerRef {
            kind: self.kind,
            slot: self.slot,
            number: self.number,
        }
    }

    /// Label painted on the tent ("3", or "B1" for body markers)
    pub fn label(&self) -> String {
        match self.kind {
            MarkerKind::Item => self.number.to_string(),
            MarkerKind::Body => format!("B{}", self.number),
        }
    }
}
