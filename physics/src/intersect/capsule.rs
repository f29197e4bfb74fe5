use super::{emit, sphere::sphere_against, ContactBuffer};
use crate::{collider::Collider, shapes::Shape};
use glam::Vec3;

const EPSILON: f32 = 1e-6;

fn segment_of(collider: &Collider) -> Option<(Vec3, Vec3, f32)> {
    let Shape::Capsule(capsule) = collider.shape() else {
        return None;
    };
    let (start, end) = capsule.segment();
    Some((
        collider.to_world(start),
        collider.to_world(end),
        capsule.radius,
    ))
}

fn closest_on_segment(p: Vec3, q: Vec3, point: Vec3) -> Vec3 {
    let d = q - p;
    let len_sq = d.length_squared();
    if len_sq <= EPSILON {
        return p;
    }
    let t = ((point - p).dot(d) / len_sq).clamp(0.0, 1.0);
    p + d * t
}

/// Closest points between segments `p1 q1` and `p2 q2`.
pub(super) fn closest_points_segments(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    let (s, t) = if a <= EPSILON && e <= EPSILON {
        (0.0, 0.0)
    } else if a <= EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e <= EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            // parallel segments pick an arbitrary s
            let s = if denom > EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let t = (b * s + f) / e;
            if t < 0.0 {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else if t > 1.0 {
                (((b - c) / a).clamp(0.0, 1.0), 1.0)
            } else {
                (s, t)
            }
        }
    };
    (p1 + d1 * s, p2 + d2 * t)
}

pub(super) fn capsule_capsule(a: &Collider, b: &Collider, out: &mut ContactBuffer) -> usize {
    let (Some((p1, q1, radius_a)), Some((p2, q2, radius_b))) = (segment_of(a), segment_of(b))
    else {
        return 0;
    };
    let (on_a, on_b) = closest_points_segments(p1, q1, p2, q2);
    let midline = on_a - on_b;
    let radius_sum = radius_a + radius_b;
    let distance_sq = midline.length_squared();
    if distance_sq >= radius_sum * radius_sum {
        return 0;
    }

    let distance = distance_sq.sqrt();
    let normal = if distance > EPSILON {
        midline / distance
    } else {
        // axes intersect: push apart along a's first radial axis
        a.world_axes().x_axis
    };
    let penetration = radius_sum - distance;
    let point = on_b + normal * (radius_b - penetration * 0.5);
    emit(a, b, out, point, normal, penetration)
}

/// Box first, capsule second. The capsule is replaced by the sphere on its segment closest to
/// the box.
pub(super) fn box_capsule(a: &Collider, b: &Collider, out: &mut ContactBuffer) -> usize {
    let (Shape::Box(cube), Some((p, q, radius))) = (a.shape(), segment_of(b)) else {
        return 0;
    };

    // alternate between the closest point on the box and on the segment
    let h = cube.half_extents;
    let mut on_segment = (p + q) * 0.5;
    for _ in 0..4 {
        let on_box = a.to_world(a.to_local(on_segment).clamp(-h, h));
        let next = closest_on_segment(p, q, on_box);
        if next.abs_diff_eq(on_segment, EPSILON) {
            break;
        }
        on_segment = next;
    }

    match sphere_against(on_segment, radius, a) {
        Some((point, normal, penetration)) => emit(a, b, out, point, -normal, penetration),
        None => 0,
    }
}
