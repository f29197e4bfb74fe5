//! Separating axis test between two oriented boxes.

use super::{emit, ContactBuffer};
use crate::{collider::Collider, shapes::Shape};
use glam::Vec3;

/// Cross product axes with a squared length below this come from near-parallel edges.
const PARALLEL_EPSILON: f32 = 0.001;
/// An edge axis is only used when it beats the best face axis by this factor.
const EDGE_BIAS: f32 = 0.95;

struct OrientedBox {
    centre: Vec3,
    axes: [Vec3; 3],
    half: Vec3,
}

impl OrientedBox {
    fn from_collider(collider: &Collider) -> Option<Self> {
        let Shape::Box(cube) = collider.shape() else {
            return None;
        };
        let axes = collider.world_axes();
        Some(Self {
            centre: collider.world_position(),
            axes: [axes.x_axis, axes.y_axis, axes.z_axis],
            half: cube.half_extents,
        })
    }

    /// Half the length of the box projected onto `axis`.
    fn project(&self, axis: Vec3) -> f32 {
        (0..3)
            .map(|i| self.half[i] * self.axes[i].dot(axis).abs())
            .sum()
    }

    /// Corners of the face whose outward normal is `axes[k] * sign`, in winding order.
    fn face(&self, k: usize, sign: f32) -> [Vec3; 4] {
        let (u, v) = ((k + 1) % 3, (k + 2) % 3);
        let centre = self.centre + self.axes[k] * (sign * self.half[k]);
        let du = self.axes[u] * self.half[u];
        let dv = self.axes[v] * self.half[v];
        [
            centre + du + dv,
            centre - du + dv,
            centre - du - dv,
            centre + du - dv,
        ]
    }

    /// Corner farthest along `dir`.
    fn support(&self, dir: Vec3) -> Vec3 {
        (0..3).fold(self.centre, |point, i| {
            let sign = if self.axes[i].dot(dir) < 0.0 { -1.0 } else { 1.0 };
            point + self.axes[i] * (sign * self.half[i])
        })
    }

    fn to_world(&self, local: Vec3) -> Vec3 {
        self.centre + self.axes[0] * local.x + self.axes[1] * local.y + self.axes[2] * local.z
    }
}

fn overlap_on_axis(a: &OrientedBox, b: &OrientedBox, axis: Vec3, to_centre: Vec3) -> f32 {
    a.project(axis) + b.project(axis) - to_centre.dot(axis).abs()
}

/// Keeps the part of `polygon` where `distance` is not positive.
fn clip(polygon: &[Vec3], distance: impl Fn(Vec3) -> f32) -> Vec<Vec3> {
    let mut clipped = Vec::with_capacity(polygon.len() + 4);
    for (i, &current) in polygon.iter().enumerate() {
        let next = polygon[(i + 1) % polygon.len()];
        let (dc, dn) = (distance(current), distance(next));
        if dc <= 0.0 {
            clipped.push(current);
        }
        if (dc < 0.0 && dn > 0.0) || (dc > 0.0 && dn < 0.0) {
            clipped.push(current + (next - current) * (dc / (dc - dn)));
        }
    }
    clipped
}

/// Clips the incident face of `incident` against reference face `k` of `reference`. Returns
/// the outward reference normal and, if any clipped point lies below the reference face, the
/// averaged point and depth.
fn face_contact(
    reference: &OrientedBox,
    incident: &OrientedBox,
    k: usize,
) -> (Vec3, Option<(Vec3, f32)>) {
    let mut normal = reference.axes[k];
    if normal.dot(incident.centre - reference.centre) < 0.0 {
        normal = -normal;
    }
    let reference_centre = reference.centre + normal * reference.half[k];

    // the incident face is the one most anti-parallel to the reference normal
    let j = (0..3)
        .max_by(|&x, &y| {
            let dx = incident.axes[x].dot(normal).abs();
            let dy = incident.axes[y].dot(normal).abs();
            dx.total_cmp(&dy)
        })
        .unwrap_or(0);
    let sign = if incident.axes[j].dot(normal) > 0.0 {
        -1.0
    } else {
        1.0
    };

    let mut polygon = incident.face(j, sign).to_vec();
    for i in [(k + 1) % 3, (k + 2) % 3] {
        let side = reference.axes[i];
        let extent = reference.half[i];
        for side in [side, -side] {
            polygon = clip(&polygon, |p| side.dot(p - reference_centre) - extent);
        }
    }

    let mut point_sum = Vec3::ZERO;
    let mut depth_sum = 0.0;
    let mut kept = 0;
    for p in polygon {
        let depth = normal.dot(reference_centre - p);
        if depth >= 0.0 {
            point_sum += p;
            depth_sum += depth;
            kept += 1;
        }
    }
    if kept == 0 {
        return (normal, None);
    }
    let kept = kept as f32;
    (normal, Some((point_sum / kept, depth_sum / kept)))
}

/// Midpoint of the closest points between two edges, or one of the given edge points when the
/// edges are parallel or the closest points fall off the edges.
fn edge_contact_point(
    point_a: Vec3,
    dir_a: Vec3,
    half_a: f32,
    point_b: Vec3,
    dir_b: Vec3,
    half_b: f32,
    use_a: bool,
) -> Vec3 {
    let fallback = if use_a { point_a } else { point_b };

    let sm_a = dir_a.length_squared();
    let sm_b = dir_b.length_squared();
    let dp_ab = dir_b.dot(dir_a);

    let to_st = point_a - point_b;
    let dp_sta_a = dir_a.dot(to_st);
    let dp_sta_b = dir_b.dot(to_st);

    let denom = sm_a * sm_b - dp_ab * dp_ab;
    if denom.abs() < 0.0001 {
        return fallback;
    }

    let mua = (dp_ab * dp_sta_b - sm_b * dp_sta_a) / denom;
    let mub = (sm_a * dp_sta_b - dp_ab * dp_sta_a) / denom;
    if mua.abs() > half_a || mub.abs() > half_b {
        return fallback;
    }

    let closest_a = point_a + dir_a * mua;
    let closest_b = point_b + dir_b * mub;
    (closest_a + closest_b) * 0.5
}

pub(super) fn box_box(a: &Collider, b: &Collider, out: &mut ContactBuffer) -> usize {
    let (Some(box_a), Some(box_b)) = (OrientedBox::from_collider(a), OrientedBox::from_collider(b))
    else {
        return 0;
    };
    let to_centre = box_b.centre - box_a.centre;

    // face axes: 0..3 belong to a, 3..6 to b
    let mut best_face = (0, f32::MAX);
    for index in 0..6 {
        let axis = if index < 3 {
            box_a.axes[index]
        } else {
            box_b.axes[index - 3]
        };
        let overlap = overlap_on_axis(&box_a, &box_b, axis, to_centre);
        if overlap < 0.0 {
            return 0;
        }
        if overlap < best_face.1 {
            best_face = (index, overlap);
        }
    }

    let mut best_edge: Option<(usize, usize, Vec3, f32)> = None;
    for i in 0..3 {
        for j in 0..3 {
            let axis = box_a.axes[i].cross(box_b.axes[j]);
            if axis.length_squared() < PARALLEL_EPSILON {
                continue;
            }
            let axis = axis.normalize();
            let overlap = overlap_on_axis(&box_a, &box_b, axis, to_centre);
            if overlap < 0.0 {
                return 0;
            }
            let threshold = best_edge.map_or(best_face.1 * EDGE_BIAS, |(_, _, _, o)| o);
            if overlap < threshold {
                best_edge = Some((i, j, axis, overlap));
            }
        }
    }

    if let Some((i, j, axis, overlap)) = best_edge {
        let axis = if axis.dot(box_a.centre - box_b.centre) < 0.0 {
            -axis
        } else {
            axis
        };

        // the edge of a nearest b, and the edge of b nearest a
        let mut local_a = box_a.half;
        let mut local_b = box_b.half;
        for k in 0..3 {
            if k == i {
                local_a[k] = 0.0;
            } else if box_a.axes[k].dot(axis) > 0.0 {
                local_a[k] = -local_a[k];
            }
            if k == j {
                local_b[k] = 0.0;
            } else if box_b.axes[k].dot(axis) < 0.0 {
                local_b[k] = -local_b[k];
            }
        }

        let point = edge_contact_point(
            box_a.to_world(local_a),
            box_a.axes[i],
            box_a.half[i],
            box_b.to_world(local_b),
            box_b.axes[j],
            box_b.half[j],
            best_face.0 > 2,
        );
        return emit(a, b, out, point, axis, overlap);
    }

    let (face_index, overlap) = best_face;
    if face_index < 3 {
        let (reference_normal, clipped) = face_contact(&box_a, &box_b, face_index);
        let normal = -reference_normal;
        let (point, depth) =
            clipped.unwrap_or_else(|| (box_b.support(normal), overlap));
        emit(a, b, out, point, normal, depth)
    } else {
        let (normal, clipped) = face_contact(&box_b, &box_a, face_index - 3);
        let (point, depth) =
            clipped.unwrap_or_else(|| (box_a.support(-normal), overlap));
        emit(a, b, out, point, normal, depth)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use glam::Quat;
    use std::f32::consts::{FRAC_PI_4, SQRT_2};

    fn placed(position: Vec3, orientation: Quat) -> Collider {
        let mut collider = Collider::new(Shape::make_box(Vec3::ONE));
        collider.recompute_geometry(position, orientation);
        collider
    }

    #[test]
    fn test_separated() {
        let a = placed(Vec3::ZERO, Quat::IDENTITY);
        let b = placed(Vec3::new(2.01, 0.0, 0.0), Quat::IDENTITY);
        let mut out = ContactBuffer::new(4);
        assert_eq!(box_box(&a, &b, &mut out), 0);

        // the diamond reaches sqrt(2) along x
        let c = placed(Vec3::new(2.5, 0.0, 0.0), Quat::from_rotation_z(FRAC_PI_4));
        assert_eq!(box_box(&a, &c, &mut out), 0);
    }

    #[test]
    fn test_face_contact_is_clipped_and_averaged() {
        let a = placed(Vec3::ZERO, Quat::IDENTITY);
        let b = placed(Vec3::new(0.5, 1.9, 0.0), Quat::IDENTITY);
        let mut out = ContactBuffer::new(4);
        assert_eq!(box_box(&a, &b, &mut out), 1);
        let contact = &out.contacts()[0];
        assert!(contact.normal.abs_diff_eq(-Vec3::Y, 1e-6));
        assert!((contact.penetration - 0.1).abs() < 1e-5);
        // the overlap region spans x in [-0.5, 1]
        assert!(contact
            .point
            .abs_diff_eq(Vec3::new(0.25, 0.9, 0.0), 1e-5));
    }

    #[test]
    fn test_reference_face_on_second_box() {
        // tilting a makes b's face axis the shallowest
        let a = placed(Vec3::ZERO, Quat::from_rotation_x(0.1));
        let b = placed(Vec3::new(0.0, 1.9, 0.0), Quat::IDENTITY);
        let mut out = ContactBuffer::new(4);
        assert_eq!(box_box(&a, &b, &mut out), 1);
        let contact = &out.contacts()[0];
        assert!(contact.normal.abs_diff_eq(-Vec3::Y, 1e-5));
        assert!(contact.penetration > 0.05 && contact.penetration < 0.2);
        // the averaged point lies on a's top face, inside b
        assert!(contact.point.y > 0.9);
    }

    #[test]
    fn test_edge_edge() {
        let a = placed(Vec3::ZERO, Quat::from_rotation_z(FRAC_PI_4));
        let b = placed(
            Vec3::new(0.0, 2.0 * SQRT_2 - 0.1, 0.0),
            Quat::from_rotation_x(FRAC_PI_4),
        );
        let mut out = ContactBuffer::new(4);
        assert_eq!(box_box(&a, &b, &mut out), 1);
        let contact = &out.contacts()[0];
        assert!(contact.normal.abs_diff_eq(-Vec3::Y, 1e-5));
        assert!((contact.penetration - 0.1).abs() < 1e-4);
        assert!(contact
            .point
            .abs_diff_eq(Vec3::new(0.0, SQRT_2 - 0.05, 0.0), 1e-4));
    }
}
