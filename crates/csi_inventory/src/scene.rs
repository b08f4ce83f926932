//! Static scene objects
//!
//! Fingerprints on surfaces, physical evidence and the victim. These never
//! move; items interact with them by contact.

use crate::item::PowderType;
use csi_core::{IdGenerator, SceneObjectId, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a scene object is, with its investigation progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneObjectKind {
    /// Latent print. Dusting reveals it with the brush's powder.
    Fingerprint {
        surface: String,
        revealed: Option<PowderType>,
        lifted: bool,
    },
    /// Physical evidence that can be collected or swabbed
    Evidence {
        label: String,
        collected: bool,
        sampled: bool,
    },
    Victim,
}

impl SceneObjectKind {
    /// Latent fingerprint on a surface
    pub fn fingerprint(surface: impl Into<String>) -> Self {
        Self::Fingerprint {
            surface: surface.into(),
            revealed: None,
            lifted: false,
        }
    }

    /// Uncollected evidence
    pub fn evidence(label: impl Into<String>) -> Self {
        Self::Evidence {
            label: label.into(),
            collected: false,
            sampled: false,
        }
    }
}

/// A static object in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: SceneObjectId,
    pub kind: SceneObjectKind,
    pub position: Vec3,
    /// Contact radius
    pub radius: f32,
}

impl SceneObject {
    /// Check if a point is within contact radius
    pub fn in_range(&self, point: Vec3) -> bool {
        self.position.distance_squared(point) <= self.radius * self.radius
    }
}

/// All static objects in the scene
#[derive(Debug, Default)]
pub struct SceneObjects {
    objects: BTreeMap<SceneObjectId, SceneObject>,
    ids: IdGenerator,
}

impl SceneObjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object
    pub fn add(&mut self, kind: SceneObjectKind, position: Vec3, radius: f32) -> SceneObjectId {
        let id = SceneObjectId(self.ids.next_raw());
        self.objects.insert(
            id,
            SceneObject {
                id,
                kind,
                position,
                radius,
            },
        );
        id
    }

    /// Insert a saved object
    pub fn insert(&mut self, object: SceneObject) {
        self.ids.reserve_past(object.id.raw());
        self.objects.insert(object.id, object);
    }

    pub fn get(&self, id: SceneObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: SceneObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Closest object whose contact radius covers `point`
    pub fn nearest(&self, point: Vec3) -> Option<&SceneObject> {
        self.objects
            .values()
            .filter(|object| object.in_range(point))
            .min_by(|a, b| {
                a.position
                    .distance_squared(point)
                    .total_cmp(&b.position.distance_squared(point))
            })
    }

    /// Copy out every object
    pub fn snapshot(&self) -> Vec<SceneObject> {
        self.objects.values().cloned().collect()
    }

    /// Replace contents with saved objects
    pub fn restore(&mut self, objects: Vec<SceneObject>) {
        self.objects.clear();
        for object in objects {
            self.insert(object);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_range() {
        let mut scene = SceneObjects::new();
        let print = scene.add(SceneObjectKind::fingerprint("door handle"), Vec3::ZERO, 0.05);
        let object = scene.get(print).unwrap();

        assert!(object.in_range(Vec3::new(0.03, 0.0, 0.0)));
        assert!(!object.in_range(Vec3::new(0.2, 0.0, 0.0)));
    }

    #[test]
    fn test_nearest() {
        let mut scene = SceneObjects::new();
        scene.add(SceneObjectKind::Victim, Vec3::new(1.0, 0.0, 0.0), 1.0);
        let knife = scene.add(SceneObjectKind::evidence("knife"), Vec3::new(0.2, 0.0, 0.0), 0.5);

        assert_eq!(scene.nearest(Vec3::new(0.3, 0.0, 0.0)).map(|o| o.id), Some(knife));
        assert!(scene.nearest(Vec3::new(10.0, 0.0, 0.0)).is_none());
    }
}
