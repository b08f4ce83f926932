//! Evidence marker slot registry

use crate::marker::{EvidenceMarker, MarkerKind, MarkerRef};
use chrono::NaiveDateTime;
use csi_core::Role;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceConfig {
    /// Slots per marker kind
    pub max_evidence_markers: usize,
    /// Minimum distance between any two markers (meters)
    pub min_distance_between_markers: f32,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            max_evidence_markers: 50,
            min_distance_between_markers: 0.1,
        }
    }
}

/// Placement/removal failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaceError {
    /// Every slot of the kind is taken
    #[error("No free {0:?} marker slot")]
    NoFreeSlot(MarkerKind),
    /// Another marker is within the minimum distance
    #[error("Too close to marker {nearest} ({distance:.3}m)")]
    TooClose { nearest: u32, distance: f32 },
    /// The reference no longer names the marker in its slot
    #[error("Stale marker reference {0:?}")]
    Stale(MarkerRef),
}

/// Registry notifications
#[derive(Debug, Clone, PartialEq)]
pub enum EvidenceEvent {
    Placed(MarkerRef),
    Removed(MarkerRef),
}

/// Serializable copy of the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSnapshot {
    pub markers: Vec<EvidenceMarker>,
    pub next_number: u32,
}

/// Evidence marker registry
#[derive(Debug)]
pub struct EvidenceManager {
    config: EvidenceConfig,
    /// Slot arrays, indexed by `MarkerKind::index`
    slots: [Vec<Option<EvidenceMarker>>; 2],
    next_number: u32,
    pending: Vec<EvidenceEvent>,
}

impl EvidenceManager {
    /// Create an empty registry
    pub fn new(config: EvidenceConfig) -> Self {
        let capacity = config.max_evidence_markers;
        Self {
            config,
            slots: [vec![None; capacity], vec![None; capacity]],
            next_number: 1,
            pending: Vec::new(),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &EvidenceConfig {
        &self.config
    }

    /// Place a marker, claiming the lowest free slot of its kind
    pub fn place_marker(
        &mut self,
        kind: MarkerKind,
        position: Vec3,
        rotation: Quat,
        placed_by: Role,
        case_id: Option<String>,
        placed_at: NaiveDateTime,
    ) -> Result<MarkerRef, PlaceError> {
        let slot = self.slots[kind.index()]
            .iter()
            .position(Option::is_none)
            .ok_or(PlaceError::NoFreeSlot(kind))?;

        let min = self.config.min_distance_between_markers;
        if let Some(nearest) = self
            .iter()
            .map(|m| (m.number, m.position.distance(position)))
            .filter(|(_, d)| *d < min)
            .min_by(|a, b| a.1.total_cmp(&b.1))
        {
            return Err(PlaceError::TooClose {
                nearest: nearest.0,
                distance: nearest.1,
            });
        }

        let marker = EvidenceMarker {
            kind,
            slot,
            number: self.next_number,
            case_id,
            position,
            rotation,
            placed_at,
            placed_by,
        };
        self.next_number += 1;

        let reference = marker.reference();
        log::info!("Placed {:?} marker {} in slot {}", kind, marker.label(), slot);
        self.slots[kind.index()][slot] = Some(marker);
        self.pending.push(EvidenceEvent::Placed(reference));
        Ok(reference)
    }

    /// Remove a marker if the reference still names it
    pub fn remove_marker(&mut self, reference: MarkerRef) -> Result<EvidenceMarker, PlaceError> {
        let entry = self.slots[reference.kind.index()]
            .get_mut(reference.slot)
            .ok_or(PlaceError::Stale(reference))?;

        if entry.as_ref().map(|m| m.number) != Some(reference.number) {
            log::warn!("Ignoring removal of stale marker {:?}", reference);
            return Err(PlaceError::Stale(reference));
        }

        let marker = entry.take().ok_or(PlaceError::Stale(reference))?;
        log::info!("Removed {:?} marker {}", reference.kind, marker.label());
        self.pending.push(EvidenceEvent::Removed(reference));
        Ok(marker)
    }

    /// Nearest live marker (either kind) within `max_distance`
    pub fn find_closest(&self, position: Vec3, max_distance: f32) -> Option<MarkerRef> {
        self.iter()
            .map(|m| (m.reference(), m.position.distance(position)))
            .filter(|(_, d)| *d <= max_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(r, _)| r)
    }

    /// Look up a marker by reference
    pub fn get(&self, reference: MarkerRef) -> Option<&EvidenceMarker> {
        self.slots[reference.kind.index()]
            .get(reference.slot)
            .and_then(Option::as_ref)
            .filter(|m| m.number == reference.number)
    }

    /// Live markers of one kind, in slot order
    pub fn markers(&self, kind: MarkerKind) -> impl Iterator<Item = &EvidenceMarker> {
        self.slots[kind.index()].iter().flatten()
    }

    /// All live markers
    pub fn iter(&self) -> impl Iterator<Item = &EvidenceMarker> {
        self.slots.iter().flat_map(|slots| slots.iter().flatten())
    }

    /// Live marker count of one kind
    pub fn count(&self, kind: MarkerKind) -> usize {
        self.markers(kind).count()
    }

    /// Live marker count, both kinds
    pub fn total(&self) -> usize {
        self.iter().count()
    }

    /// Number the next marker will receive
    pub fn next_number(&self) -> u32 {
        self.next_number
    }

    /// Drain placement/removal notifications
    pub fn drain_events(&mut self) -> Vec<EvidenceEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Remove every marker. Numbering keeps growing.
    pub fn clear(&mut self) {
        for slots in &mut self.slots {
            for slot in slots.iter_mut() {
                if let Some(marker) = slot.take() {
                    self.pending.push(EvidenceEvent::Removed(marker.reference()));
                }
            }
        }
    }

    /// Copy out for saving
    pub fn snapshot(&self) -> EvidenceSnapshot {
        EvidenceSnapshot {
            markers: self.iter().cloned().collect(),
            next_number: self.next_number,
        }
    }

    /// Restore from a snapshot. Markers beyond the configured capacity are dropped.
    pub fn restore(&mut self, snapshot: &EvidenceSnapshot) {
        let capacity = self.config.max_evidence_markers;
        self.slots = [vec![None; capacity], vec![None; capacity]];

        let mut highest = 0;
        for marker in &snapshot.markers {
            highest = highest.max(marker.number);
            match self.slots[marker.kind.index()].get_mut(marker.slot) {
                Some(slot) => *slot = Some(marker.clone()),
                None => log::warn!(
                    "Dropping marker {} restored outside capacity (slot {})",
                    marker.number,
                    marker.slot
                ),
            }
        }
        self.next_number = snapshot.next_number.max(highest + 1);
    }
}

impl Default for EvidenceManager {
    fn default() -> Self {
        Self::new(EvidenceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 14)
            .and_then(|d| d.and_hms_opt(19, 30, 0))
            .unwrap()
    }

    fn place(manager: &mut EvidenceManager, kind: MarkerKind, x: f32) -> Result<MarkerRef, PlaceError> {
        manager.place_marker(kind, Vec3::new(x, 0.0, 0.0), Quat::IDENTITY, Role::Searcher, None, now())
    }

    #[test]
    fn test_lowest_free_slot() {
        let mut manager = EvidenceManager::default();
        let a = place(&mut manager, MarkerKind::Item, 0.0).unwrap();
        let b = place(&mut manager, MarkerKind::Item, 1.0).unwrap();
        assert_eq!((a.slot, b.slot), (0, 1));

        manager.remove_marker(a).unwrap();
        let c = place(&mut manager, MarkerKind::Item, 2.0).unwrap();
        assert_eq!(c.slot, 0);
        assert_eq!(c.number, 3);
    }

    #[test]
    fn test_capacity_per_kind() {
        let mut manager = EvidenceManager::new(EvidenceConfig {
            max_evidence_markers: 3,
            min_distance_between_markers: 0.1,
        });

        for i in 0..3 {
            place(&mut manager, MarkerKind::Item, i as f32).unwrap();
        }
        assert_eq!(place(&mut manager, MarkerKind::Item, 10.0), Err(PlaceError::NoFreeSlot(MarkerKind::Item)));
        assert_eq!(place(&mut manager, MarkerKind::Item, 11.0), Err(PlaceError::NoFreeSlot(MarkerKind::Item)));

        // Other kind has its own slots
        assert!(place(&mut manager, MarkerKind::Body, 20.0).is_ok());

        let first = manager.markers(MarkerKind::Item).next().unwrap().reference();
        manager.remove_marker(first).unwrap();
        assert!(place(&mut manager, MarkerKind::Item, 12.0).is_ok());
        assert_eq!(manager.count(MarkerKind::Item), 3);
    }

    #[test]
    fn test_min_distance_across_kinds() {
        let mut manager = EvidenceManager::default();
        place(&mut manager, MarkerKind::Item, 0.0).unwrap();

        let result = place(&mut manager, MarkerKind::Item, 0.05);
        assert!(matches!(result, Err(PlaceError::TooClose { nearest: 1, .. })));
        let result = place(&mut manager, MarkerKind::Body, 0.05);
        assert!(matches!(result, Err(PlaceError::TooClose { .. })));
        assert_eq!(manager.total(), 1);
    }

    #[test]
    fn test_numbers_strictly_increase() {
        let mut manager = EvidenceManager::default();
        let mut last = 0;
        for (i, kind) in [MarkerKind::Item, MarkerKind::Body, MarkerKind::Item, MarkerKind::Body]
            .into_iter()
            .enumerate()
        {
            let r = place(&mut manager, kind, i as f32).unwrap();
            assert!(r.number > last);
            last = r.number;
            if i == 1 {
                manager.remove_marker(r).unwrap();
            }
        }
        // Slot reuse never reuses a number
        let r = place(&mut manager, MarkerKind::Body, 9.0).unwrap();
        assert!(r.number > last);
    }

    #[test]
    fn test_stale_removal() {
        let mut manager = EvidenceManager::default();
        let first = place(&mut manager, MarkerKind::Item, 0.0).unwrap();
        manager.remove_marker(first).unwrap();
        let second = place(&mut manager, MarkerKind::Item, 1.0).unwrap();
        assert_eq!(first.slot, second.slot);

        assert_eq!(manager.remove_marker(first), Err(PlaceError::Stale(first)));
        assert!(manager.get(second).is_some());

        let events = manager.drain_events();
        assert_eq!(
            events,
            vec![
                EvidenceEvent::Placed(first),
                EvidenceEvent::Removed(first),
                EvidenceEvent::Placed(second)
            ]
        );
    }

    #[test]
    fn test_find_closest() {
        let mut manager = EvidenceManager::default();
        place(&mut manager, MarkerKind::Item, 0.0).unwrap();
        let body = place(&mut manager, MarkerKind::Body, 1.0).unwrap();

        assert_eq!(manager.find_closest(Vec3::new(0.8, 0.0, 0.0), 0.5), Some(body));
        assert_eq!(manager.find_closest(Vec3::new(5.0, 0.0, 0.0), 0.5), None);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut manager = EvidenceManager::default();
        place(&mut manager, MarkerKind::Item, 0.0).unwrap();
        place(&mut manager, MarkerKind::Body, 1.0).unwrap();
        let bytes = bincode::serialize(&manager.snapshot()).unwrap();

        let mut restored = EvidenceManager::default();
        restored.restore(&bincode::deserialize(&bytes).unwrap());
        assert_eq!(restored.total(), 2);
        assert_eq!(restored.next_number(), 3);
    }
}
