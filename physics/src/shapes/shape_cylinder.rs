use super::{ShapeTrait, SurfaceProjection};
use crate::bounds::Bounds;
use glam::{Mat3, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Solid cylinder along local Y, centred on the origin.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct ShapeCylinder {
    pub radius: f32,
    pub height: f32,
}

impl ShapeCylinder {
    pub(crate) fn project_point(&self, p: Vec3) -> SurfaceProjection {
        let h = self.height * 0.5;
        let radial = Vec2::new(p.x, p.z);
        let radial_len = radial.length();
        let radial_dir = if radial_len > f32::EPSILON {
            radial / radial_len
        } else {
            Vec2::X
        };

        let inside_radially = radial_len <= self.radius;
        let inside_axially = p.y.abs() <= h;
        if inside_radially && inside_axially {
            let side_gap = self.radius - radial_len;
            let cap_gap = h - p.y.abs();
            return if side_gap < cap_gap {
                let normal = Vec3::new(radial_dir.x, 0.0, radial_dir.y);
                SurfaceProjection {
                    point: Vec3::new(0.0, p.y, 0.0) + normal * self.radius,
                    normal,
                    distance: -side_gap,
                }
            } else {
                let sign = if p.y < 0.0 { -1.0 } else { 1.0 };
                SurfaceProjection {
                    point: Vec3::new(p.x, sign * h, p.z),
                    normal: Vec3::new(0.0, sign, 0.0),
                    distance: -cap_gap,
                }
            };
        }

        let clamped_radial = radial_dir * radial_len.min(self.radius);
        let closest = Vec3::new(clamped_radial.x, p.y.clamp(-h, h), clamped_radial.y);
        SurfaceProjection::outside(p, closest, Vec3::Y)
    }
}

impl ShapeTrait for ShapeCylinder {
    fn inertia_tensor(&self, mass: f32) -> Mat3 {
        let rr = self.radius * self.radius;
        let ixz = mass * (3.0 * rr + self.height * self.height) / 12.0;
        let iy = mass * rr * 0.5;
        Mat3::from_diagonal(Vec3::new(ixz, iy, ixz))
    }

    fn local_bounds(&self) -> Bounds {
        let half_extents = Vec3::new(self.radius, self.height * 0.5, self.radius);
        Bounds::from_half_extents(Vec3::ZERO, half_extents)
    }

    fn support(&self, dir: Vec3) -> Vec3 {
        let h = self.height * 0.5;
        let radial = Vec2::new(dir.x, dir.z).normalize_or_zero() * self.radius;
        Vec3::new(radial.x, if dir.y < 0.0 { -h } else { h }, radial.y)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_project_point() {
        let cylinder = ShapeCylinder {
            radius: 1.0,
            height: 2.0,
        };
        let below = cylinder.project_point(Vec3::new(0.5, -3.0, 0.0));
        assert!(below.point.abs_diff_eq(Vec3::new(0.5, -1.0, 0.0), 1e-6));
        assert_eq!(below.normal, -Vec3::Y);
        assert!((below.distance - 2.0).abs() < 1e-6);

        let inside = cylinder.project_point(Vec3::new(0.0, 0.9, 0.0));
        assert_eq!(inside.normal, Vec3::Y);
        assert!((inside.distance + 0.1).abs() < 1e-6);
    }
}
