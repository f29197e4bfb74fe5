use super::{ShapeTrait, SurfaceProjection};
use crate::bounds::Bounds;
use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

/// Box centred on its local origin.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct ShapeBox {
    pub half_extents: Vec3,
}

impl ShapeBox {
    /// Closest point on the box surface to `p`, all in the box's local frame.
    pub(crate) fn project_point(&self, p: Vec3) -> SurfaceProjection {
        let h = self.half_extents;
        let clamped = p.clamp(-h, h);
        if clamped != p {
            return SurfaceProjection::outside(p, clamped, Vec3::Y);
        }

        // inside: push out through the nearest face
        let gaps = h - p.abs();
        let (axis, gap) = if gaps.x <= gaps.y && gaps.x <= gaps.z {
            (0, gaps.x)
        } else if gaps.y <= gaps.z {
            (1, gaps.y)
        } else {
            (2, gaps.z)
        };
        let sign = if p[axis] < 0.0 { -1.0 } else { 1.0 };
        let mut normal = Vec3::ZERO;
        normal[axis] = sign;
        let mut point = p;
        point[axis] = sign * h[axis];
        SurfaceProjection {
            point,
            normal,
            distance: -gap,
        }
    }
}

impl ShapeTrait for ShapeBox {
    fn inertia_tensor(&self, mass: f32) -> Mat3 {
        let d = self.half_extents * 2.0;
        let dd = d * d;
        let diagonal = Vec3::new(dd.y + dd.z, dd.x + dd.z, dd.x + dd.y) * (mass / 12.0);
        Mat3::from_diagonal(diagonal)
    }

    fn local_bounds(&self) -> Bounds {
        Bounds::from_half_extents(Vec3::ZERO, self.half_extents)
    }

    fn support(&self, dir: Vec3) -> Vec3 {
        let h = self.half_extents;
        Vec3::new(
            if dir.x < 0.0 { -h.x } else { h.x },
            if dir.y < 0.0 { -h.y } else { h.y },
            if dir.z < 0.0 { -h.z } else { h.z },
        )
    }
}
