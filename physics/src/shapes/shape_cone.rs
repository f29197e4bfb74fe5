use super::{ShapeTrait, SurfaceProjection};
use crate::bounds::Bounds;
use glam::{Mat3, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Solid cone along local Y. The local origin is the centre of mass, so the base sits at
/// `-height / 4` and the apex at `3 * height / 4`.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct ShapeCone {
    pub radius: f32,
    pub height: f32,
}

impl ShapeCone {
    pub(crate) fn base_y(&self) -> f32 {
        -0.25 * self.height
    }

    pub(crate) fn apex_y(&self) -> f32 {
        0.75 * self.height
    }

    pub(crate) fn project_point(&self, p: Vec3) -> SurfaceProjection {
        // work in the (radial, axial) half plane, then lift back to 3D
        let radial = Vec2::new(p.x, p.z);
        let radial_len = radial.length();
        let radial_dir = if radial_len > f32::EPSILON {
            radial / radial_len
        } else {
            Vec2::X
        };
        let q = Vec2::new(radial_len, p.y);

        let base = Vec2::new(0.0, self.base_y());
        let rim = Vec2::new(self.radius, self.base_y());
        let apex = Vec2::new(0.0, self.apex_y());

        let closest_on = |a: Vec2, b: Vec2| {
            let ab = b - a;
            let t = ((q - a).dot(ab) / ab.length_squared().max(f32::EPSILON)).clamp(0.0, 1.0);
            a + ab * t
        };
        let on_base = closest_on(base, rim);
        let on_side = closest_on(rim, apex);

        let side_dir = apex - rim;
        let side_normal = Vec2::new(side_dir.y, -side_dir.x).normalize_or_zero();
        let inside = p.y >= self.base_y() && (q - rim).dot(side_normal) <= 0.0;

        let base_closer = (q - on_base).length_squared() <= (q - on_side).length_squared();
        let (closest, normal_2d) = if base_closer {
            (on_base, Vec2::new(0.0, -1.0))
        } else {
            (on_side, side_normal)
        };
        let lift = |v: Vec2| Vec3::new(radial_dir.x * v.x, v.y, radial_dir.y * v.x);
        let point = lift(closest);
        let gap = (q - closest).length();

        if inside {
            SurfaceProjection {
                point,
                normal: lift(normal_2d).normalize_or_zero(),
                distance: -gap,
            }
        } else {
            SurfaceProjection::outside(p, point, lift(normal_2d).normalize_or_zero())
        }
    }
}

impl ShapeTrait for ShapeCone {
    fn inertia_tensor(&self, mass: f32) -> Mat3 {
        let rr = self.radius * self.radius;
        let hh = self.height * self.height;
        let ixz = mass * (3.0 / 80.0 * hh + 3.0 / 20.0 * rr);
        let iy = mass * 0.3 * rr;
        Mat3::from_diagonal(Vec3::new(ixz, iy, ixz))
    }

    fn local_bounds(&self) -> Bounds {
        Bounds {
            mins: Vec3::new(-self.radius, self.base_y(), -self.radius),
            maxs: Vec3::new(self.radius, self.apex_y(), self.radius),
        }
    }

    fn support(&self, dir: Vec3) -> Vec3 {
        let apex = Vec3::new(0.0, self.apex_y(), 0.0);
        let radial = Vec2::new(dir.x, dir.z).normalize_or_zero() * self.radius;
        let rim = Vec3::new(radial.x, self.base_y(), radial.y);
        if apex.dot(dir) >= rim.dot(dir) {
            apex
        } else {
            rim
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cone() -> ShapeCone {
        ShapeCone {
            radius: 1.0,
            height: 4.0,
        }
    }

    #[test]
    fn test_support() {
        assert_eq!(cone().support(Vec3::Y), Vec3::new(0.0, 3.0, 0.0));
        assert!(cone()
            .support(Vec3::new(1.0, -1.0, 0.0))
            .abs_diff_eq(Vec3::new(1.0, -1.0, 0.0), 1e-6));
    }

    #[test]
    fn test_project_point() {
        let below = cone().project_point(Vec3::new(0.0, -2.0, 0.0));
        assert!((below.distance - 1.0).abs() < 1e-6);
        assert!(below.normal.abs_diff_eq(-Vec3::Y, 1e-6));

        let inside = cone().project_point(Vec3::new(0.0, -0.9, 0.0));
        assert!(inside.distance < 0.0);
        assert!((inside.distance + 0.1).abs() < 1e-5);

        let above = cone().project_point(Vec3::new(0.0, 4.0, 0.0));
        assert!(above.point.abs_diff_eq(Vec3::new(0.0, 3.0, 0.0), 1e-5));
        assert!((above.distance - 1.0).abs() < 1e-5);
    }
}
