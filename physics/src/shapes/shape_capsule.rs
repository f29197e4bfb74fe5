use super::{ShapeTrait, SurfaceProjection};
use crate::bounds::Bounds;
use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Capsule along local Y. `height` is the length of the inner segment, excluding the caps.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct ShapeCapsule {
    pub radius: f32,
    pub height: f32,
}

impl ShapeCapsule {
    pub(crate) fn half_height(&self) -> f32 {
        self.height * 0.5
    }

    /// End points of the inner segment in the local frame.
    pub(crate) fn segment(&self) -> (Vec3, Vec3) {
        let h = self.half_height();
        (Vec3::new(0.0, -h, 0.0), Vec3::new(0.0, h, 0.0))
    }

    pub(crate) fn project_point(&self, p: Vec3) -> SurfaceProjection {
        let h = self.half_height();
        let core = Vec3::new(0.0, p.y.clamp(-h, h), 0.0);
        let delta = p - core;
        let len = delta.length();
        let normal = if len > f32::EPSILON {
            delta / len
        } else {
            Vec3::X
        };
        SurfaceProjection {
            point: core + normal * self.radius,
            normal,
            distance: len - self.radius,
        }
    }
}

impl ShapeTrait for ShapeCapsule {
    fn inertia_tensor(&self, mass: f32) -> Mat3 {
        let r = self.radius;
        let h = self.height;
        let cylinder_volume = PI * r * r * h;
        let sphere_volume = 4.0 / 3.0 * PI * r * r * r;
        let total = cylinder_volume + sphere_volume;
        if total <= 0.0 {
            return Mat3::ZERO;
        }
        let mc = mass * cylinder_volume / total;
        let ms = mass * sphere_volume / total;

        let iy = mc * r * r * 0.5 + ms * r * r * 0.4;
        // each hemisphere sits 3r/8 from its flat face
        let cap_offset = h * 0.5 + 3.0 * r / 8.0;
        let ixz = mc * (3.0 * r * r + h * h) / 12.0
            + ms * (0.4 * r * r - (3.0 * r / 8.0).powi(2) + cap_offset * cap_offset);
        Mat3::from_diagonal(Vec3::new(ixz, iy, ixz))
    }

    fn local_bounds(&self) -> Bounds {
        let half_extents = Vec3::new(self.radius, self.half_height() + self.radius, self.radius);
        Bounds::from_half_extents(Vec3::ZERO, half_extents)
    }

    fn support(&self, dir: Vec3) -> Vec3 {
        let h = self.half_height();
        let end = Vec3::new(0.0, if dir.y < 0.0 { -h } else { h }, 0.0);
        end + dir.normalize_or_zero() * self.radius
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_project_point() {
        let capsule = ShapeCapsule {
            radius: 0.5,
            height: 2.0,
        };
        let side = capsule.project_point(Vec3::new(2.0, 0.5, 0.0));
        assert!((side.distance - 1.5).abs() < 1e-6);
        assert_eq!(side.normal, Vec3::X);

        let cap = capsule.project_point(Vec3::new(0.0, 1.25, 0.0));
        assert!((cap.distance + 0.25).abs() < 1e-6);
        assert_eq!(cap.normal, Vec3::Y);
    }

    #[test]
    fn test_degenerate_capsule_matches_sphere() {
        let capsule = ShapeCapsule {
            radius: 1.0,
            height: 0.0,
        };
        let i = capsule.inertia_tensor(5.0);
        assert!((i.x_axis.x - 2.0).abs() < 1e-5);
        assert!((i.y_axis.y - 2.0).abs() < 1e-5);
    }
}
