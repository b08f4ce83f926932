//! Role avatars

use csi_core::{AvatarId, Hand, Pose, Role};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pre-authored avatar bundle for a role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarPrefab {
    pub role: Role,
    /// Asset name of the bundle
    pub name: String,
    /// Left hand attach point, relative to the avatar
    #[serde(default = "default_left_hand")]
    pub left_hand: Vec3,
    /// Right hand attach point, relative to the avatar
    #[serde(default = "default_right_hand")]
    pub right_hand: Vec3,
    /// First-activation pose, overriding the catalog spawn pose
    #[serde(default)]
    pub spawn: Option<Pose>,
}

fn default_left_hand() -> Vec3 {
    Vec3::new(-0.25, 1.1, 0.3)
}

fn default_right_hand() -> Vec3 {
    Vec3::new(0.25, 1.1, 0.3)
}

impl AvatarPrefab {
    /// Create a prefab with default hand attach points
    pub fn new(role: Role, name: impl Into<String>) -> Self {
        Self {
            role,
            name: name.into(),
            left_hand: default_left_hand(),
            right_hand: default_right_hand(),
            spawn: None,
        }
    }

    /// Set the first-activation pose
    pub fn with_spawn(mut self, spawn: Pose) -> Self {
        self.spawn = Some(spawn);
        self
    }
}

/// Lookup table from role to prefab
#[derive(Debug, Clone)]
pub struct AvatarCatalog {
    prefabs: BTreeMap<Role, AvatarPrefab>,
    spawn_pose: Pose,
}

impl AvatarCatalog {
    /// Empty catalog
    pub fn new(spawn_pose: Pose) -> Self {
        Self {
            prefabs: BTreeMap::new(),
            spawn_pose,
        }
    }

    /// A prefab for every playable role
    pub fn standard() -> Self {
        Self::standard_at(Pose::IDENTITY)
    }

    /// A prefab for every playable role, spawning at `spawn_pose`
    pub fn standard_at(spawn_pose: Pose) -> Self {
        let mut catalog = Self::new(spawn_pose);
        for role in Role::selectable() {
            catalog.register(AvatarPrefab::new(role, format!("avatar_{}", role.key())));
        }
        catalog
    }

    /// Build from a prefab list
    pub fn from_prefabs(spawn_pose: Pose, prefabs: impl IntoIterator<Item = AvatarPrefab>) -> Self {
        let mut catalog = Self::new(spawn_pose);
        for prefab in prefabs {
            catalog.register(prefab);
        }
        catalog
    }

    /// Add or replace a prefab
    pub fn register(&mut self, prefab: AvatarPrefab) {
        if !prefab.role.is_playable() {
            log::warn!("Ignoring avatar prefab '{}' for non-playable role", prefab.name);
            return;
        }
        self.prefabs.insert(prefab.role, prefab);
    }

    /// Remove a prefab
    pub fn unregister(&mut self, role: Role) -> Option<AvatarPrefab> {
        self.prefabs.remove(&role)
    }

    pub fn prefab(&self, role: Role) -> Option<&AvatarPrefab> {
        self.prefabs.get(&role)
    }

    /// Roles with a prefab, in menu order
    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.prefabs.keys().copied()
    }

    /// Pose a role's avatar gets on first activation
    pub fn spawn_pose(&self, role: Role) -> Pose {
        self.prefabs
            .get(&role)
            .and_then(|p| p.spawn)
            .unwrap_or(self.spawn_pose)
    }
}

impl Default for AvatarCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// An instantiated avatar. Once created it lives for the whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avatar {
    pub id: AvatarId,
    pub role: Role,
    pub prefab: String,
    /// Last pose (kept while inactive)
    pub pose: Pose,
    pub active: bool,
    pub input_enabled: bool,
    left_hand: Vec3,
    right_hand: Vec3,
}

impl Avatar {
    /// Instantiate a prefab at a pose, inactive
    pub fn instantiate(id: AvatarId, prefab: &AvatarPrefab, pose: Pose) -> Self {
        Self {
            id,
            role: prefab.role,
            prefab: prefab.name.clone(),
            pose,
            active: false,
            input_enabled: false,
            left_hand: prefab.left_hand,
            right_hand: prefab.right_hand,
        }
    }

    /// World pose of a hand attach point
    pub fn hand_pose(&self, hand: Hand) -> Pose {
        let local = match hand {
            Hand::Left => self.left_hand,
            Hand::Right => self.right_hand,
        };
        Pose::new(self.pose.transform_point(local), self.pose.rotation)
    }

    /// Turn the avatar's components on or off
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        self.input_enabled = active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog() {
        let catalog = AvatarCatalog::standard();
        assert_eq!(catalog.roles().count(), 10);
        assert!(catalog.prefab(Role::None).is_none());
        assert_eq!(
            catalog.prefab(Role::Photographer).map(|p| p.name.as_str()),
            Some("avatar_photographer")
        );
    }

    #[test]
    fn test_spawn_override() {
        let spawn = Pose::from_position(Vec3::new(4.0, 0.0, 0.0));
        let catalog = AvatarCatalog::from_prefabs(
            Pose::IDENTITY,
            [
                AvatarPrefab::new(Role::Sketcher, "sketcher").with_spawn(spawn),
                AvatarPrefab::new(Role::Searcher, "searcher"),
            ],
        );
        assert_eq!(catalog.spawn_pose(Role::Sketcher), spawn);
        assert_eq!(catalog.spawn_pose(Role::Searcher), Pose::IDENTITY);
    }

    #[test]
    fn test_hand_pose_follows_avatar() {
        let prefab = AvatarPrefab::new(Role::Collector, "collector");
        let avatar = Avatar::instantiate(
            AvatarId(1),
            &prefab,
            Pose::from_position(Vec3::new(10.0, 0.0, 0.0)),
        );
        let left = avatar.hand_pose(Hand::Left);
        assert!((left.position - Vec3::new(9.75, 1.1, 0.3)).length() < 1e-5);
    }
}
