use glam::{Mat3, Mat4, Quat, Vec3};

pub trait Mat4Ext {
    fn minor(&self, i: usize, j: usize) -> Mat3;
    fn cofactor(&self, i: usize, j: usize) -> f32;
}

impl Mat4Ext for Mat4 {
    fn minor(&self, i: usize, j: usize) -> Mat3 {
        let mut minor = Mat3::ZERO;
        let mut yy = 0;
        for y in 0..4 {
            if y == j {
                continue;
            }

            let mut xx = 0;
            for x in 0..4 {
                if x == i {
                    continue;
                }

                minor.col_mut(xx)[yy] = self.col(x)[y];
                xx += 1;
            }

            yy += 1;
        }
        minor
    }

    fn cofactor(&self, i: usize, j: usize) -> f32 {
        let minor = self.minor(i, j);
        i32::pow(-1, (i + 1 + j + 1) as u32) as f32 * minor.determinant()
    }
}

pub trait Mat3Ext {
    /// The matrix `M` such that `M * w == v.cross(w)`.
    fn skew_symmetric(v: Vec3) -> Mat3;
}

impl Mat3Ext for Mat3 {
    fn skew_symmetric(v: Vec3) -> Mat3 {
        Mat3::from_cols(
            Vec3::new(0.0, v.z, -v.y),
            Vec3::new(-v.z, 0.0, v.x),
            Vec3::new(v.y, -v.x, 0.0),
        )
    }
}

pub trait QuatExt {
    /// Integrates a rotation vector into the quaternion: `q + 0.5 * (v * scale, 0) * q`.
    /// The result is not normalized.
    fn add_scaled_vector(self, v: Vec3, scale: f32) -> Quat;
}

impl QuatExt for Quat {
    fn add_scaled_vector(self, v: Vec3, scale: f32) -> Quat {
        let w = v * scale;
        // hamilton product (w, 0) * self, spelled out since the left side is not a unit rotation
        let dq = Quat::from_xyzw(
            w.x * self.w + w.y * self.z - w.z * self.y,
            w.y * self.w + w.z * self.x - w.x * self.z,
            w.z * self.w + w.x * self.y - w.y * self.x,
            -w.x * self.x - w.y * self.y - w.z * self.z,
        );
        Quat::from_xyzw(
            self.x + dq.x * 0.5,
            self.y + dq.y * 0.5,
            self.z + dq.z * 0.5,
            self.w + dq.w * 0.5,
        )
    }
}

pub trait Vec3Ext {
    /// Orthonormal basis with `self` as the x axis. The tangents are built from the world axis
    /// least parallel to `self` so the cross products never degenerate.
    fn contact_basis(self) -> Mat3;
}

impl Vec3Ext for Vec3 {
    fn contact_basis(self) -> Mat3 {
        let abs = self.abs();
        let reference = if abs.x <= abs.y && abs.x <= abs.z {
            Vec3::X
        } else if abs.y <= abs.z {
            Vec3::Y
        } else {
            Vec3::Z
        };
        let tangent_y = self.cross(reference).normalize();
        let tangent_z = self.cross(tangent_y);
        Mat3::from_cols(self, tangent_y, tangent_z)
    }
}
