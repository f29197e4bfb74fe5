use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Infinite plane `{ x : normal · x = offset }`. The solid half-space lies behind the normal.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct ShapePlane {
    pub normal: Vec3,
    pub offset: f32,
}

impl ShapePlane {
    pub fn new(normal: Vec3, offset: f32) -> Self {
        let len = normal.length();
        debug_assert!(len > f32::EPSILON, "plane normal must be non-zero");
        if len > f32::EPSILON {
            Self {
                normal: normal / len,
                offset: offset / len,
            }
        } else {
            Self {
                normal: Vec3::Y,
                offset,
            }
        }
    }

    /// Signed distance of `point` from the plane, positive on the normal side.
    pub fn distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.offset
    }

    /// The plane moved into a parent frame.
    pub fn transformed(&self, position: Vec3, orientation: Quat) -> ShapePlane {
        let normal = orientation * self.normal;
        ShapePlane {
            normal,
            offset: self.offset + normal.dot(position),
        }
    }
}
