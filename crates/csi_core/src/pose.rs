//! World-space poses

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Pose (position + orientation)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Create a new pose
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Pose at a position with no rotation
    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Same pose with its height clamped to `y`
    pub fn at_height(self, y: f32) -> Self {
        Self::new(Vec3::new(self.position.x, y, self.position.z), self.rotation)
    }

    /// Transform a point from local space into world space
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// Distance between two pose origins
    pub fn distance(&self, other: &Pose) -> f32 {
        self.position.distance(other.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_height() {
        let pose = Pose::from_position(Vec3::new(1.0, 5.0, 2.0)).at_height(0.0);
        assert_eq!(pose.position, Vec3::new(1.0, 0.0, 2.0));
    }

    #[test]
    fn test_transform_point() {
        let pose = Pose::new(
            Vec3::new(1.0, 0.0, 0.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        );
        let world = pose.transform_point(Vec3::new(0.0, 0.0, 1.0));
        assert!((world - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
    }
}
