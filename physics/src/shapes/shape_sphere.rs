use super::ShapeTrait;
use crate::bounds::Bounds;
use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct ShapeSphere {
    pub radius: f32,
}

impl ShapeTrait for ShapeSphere {
    fn inertia_tensor(&self, mass: f32) -> Mat3 {
        let i = 2.0 * mass * self.radius * self.radius / 5.0;
        Mat3::from_diagonal(Vec3::splat(i))
    }

    fn local_bounds(&self) -> Bounds {
        Bounds::from_half_extents(Vec3::ZERO, Vec3::splat(self.radius))
    }

    fn bounds(&self, pos: Vec3, _: Quat) -> Bounds {
        Bounds {
            mins: Vec3::splat(-self.radius) + pos,
            maxs: Vec3::splat(self.radius) + pos,
        }
    }

    fn support(&self, dir: Vec3) -> Vec3 {
        dir.normalize_or_zero() * self.radius
    }
}
