//! Boolean GJK overlap query between two bounded convex colliders.

use crate::{collider::Collider, math::glam_ext::Mat4Ext};
use glam::{Mat4, Vec2, Vec3, Vec4};

const MAX_ITERATIONS: usize = 64;

fn signed_volume_1d(s1: Vec3, s2: Vec3) -> Vec2 {
    let ab = s2 - s1; // ray from a to b
    let ap = Vec3::ZERO - s1; // ray from a to origin
    let p0 = s1 + ab * ab.dot(ap) / ab.length_squared(); // projection of the origin onto the line

    // choose the axis with the greatest difference
    let mut idx = 0;
    let mut mu_max = 0.0;
    for i in 0..3 {
        let mu = s2[i] - s1[i];
        if mu * mu > mu_max * mu_max {
            mu_max = mu;
            idx = i;
        }
    }

    let a = s1[idx];
    let b = s2[idx];
    let p = p0[idx];

    let c1 = p - a;
    let c2 = b - p;

    if (p > a && p < b) || (p > b && p < a) {
        Vec2::new(c2 / mu_max, c1 / mu_max)
    } else if (a <= b && p <= a) || (a >= b && p >= a) {
        // origin projects beyond a
        Vec2::X
    } else {
        Vec2::Y
    }
}

fn same_sign(a: f32, b: f32) -> bool {
    (a > 0.0 && b > 0.0) || (a < 0.0 && b < 0.0)
}

fn signed_volume_2d(s1: Vec3, s2: Vec3, s3: Vec3) -> Vec3 {
    let normal = (s2 - s1).cross(s3 - s1);
    let p0 = normal * s1.dot(normal) / normal.length_squared();

    // find the axis with the greatest projected area
    let mut idx = 0;
    let mut area_max = 0.0;
    for i in 0..3 {
        let j = (i + 1) % 3;
        let k = (i + 2) % 3;

        let a = Vec2::new(s1[j], s1[k]);
        let b = Vec2::new(s2[j], s2[k]);
        let c = Vec2::new(s3[j], s3[k]);
        let ab = b - a;
        let ac = c - a;
        let area = ab.x * ac.y - ab.y * ac.x;
        if area * area > area_max * area_max {
            idx = i;
            area_max = area;
        }
    }

    let x = (idx + 1) % 3;
    let y = (idx + 2) % 3;
    let s = [
        Vec2::new(s1[x], s1[y]),
        Vec2::new(s2[x], s2[y]),
        Vec2::new(s3[x], s3[y]),
    ];
    let p = Vec2::new(p0[x], p0[y]);

    // sub-areas of the triangles formed by the projected origin and each edge
    let mut areas = Vec3::ZERO;
    for i in 0..3 {
        let j = (i + 1) % 3;
        let k = (i + 2) % 3;
        let ab = s[j] - p;
        let ac = s[k] - p;
        areas[i] = ab.x * ac.y - ab.y * ac.x;
    }

    if (0..3).all(|i| same_sign(area_max, areas[i])) {
        return areas / area_max;
    }

    // origin is outside the triangle, take the closest edge
    let edge_pts = [s1, s2, s3];
    let mut dist = f32::MAX;
    let mut lambdas = Vec3::X;
    for i in 0..3 {
        let k = (i + 1) % 3;
        let l = (i + 2) % 3;

        let lambda_edge = signed_volume_1d(edge_pts[k], edge_pts[l]);
        let pt = edge_pts[k] * lambda_edge[0] + edge_pts[l] * lambda_edge[1];
        if pt.length_squared() < dist {
            dist = pt.length_squared();
            lambdas = Vec3::ZERO;
            lambdas[k] = lambda_edge[0];
            lambdas[l] = lambda_edge[1];
        }
    }
    lambdas
}

fn signed_volume_3d(s1: Vec3, s2: Vec3, s3: Vec3, s4: Vec3) -> Vec4 {
    let m = Mat4::from_cols(
        Vec4::new(s1.x, s2.x, s3.x, s4.x),
        Vec4::new(s1.y, s2.y, s3.y, s4.y),
        Vec4::new(s1.z, s2.z, s3.z, s4.z),
        Vec4::ONE,
    );

    let c4 = Vec4::new(
        m.cofactor(3, 0),
        m.cofactor(3, 1),
        m.cofactor(3, 2),
        m.cofactor(3, 3),
    );

    let det_m = c4[0] + c4[1] + c4[2] + c4[3];

    if (0..4).all(|i| same_sign(det_m, c4[i])) {
        return c4 * det_m.recip();
    }

    // origin is outside the tetrahedron, take the closest face
    let face_pts = [s1, s2, s3, s4];
    let mut lambdas = Vec4::ZERO;
    let mut dist = f32::MAX;
    for i in 0..4 {
        let j = (i + 1) % 4;
        let k = (i + 2) % 4;

        let lambdas_face = signed_volume_2d(face_pts[i], face_pts[j], face_pts[k]);
        let pt = face_pts[i] * lambdas_face[0]
            + face_pts[j] * lambdas_face[1]
            + face_pts[k] * lambdas_face[2];
        if pt.length_squared() < dist {
            dist = pt.length_squared();
            lambdas = Vec4::ZERO;
            lambdas[i] = lambdas_face[0];
            lambdas[j] = lambdas_face[1];
            lambdas[k] = lambdas_face[2];
        }
    }
    lambdas
}

/// Barycentric weights of the simplex point closest to the origin.
fn simplex_lambdas(pts: &[Vec3]) -> Vec4 {
    match *pts {
        [_] => Vec4::X,
        [a, b] => signed_volume_1d(a, b).extend(0.0).extend(0.0),
        [a, b, c] => signed_volume_2d(a, b, c).extend(0.0),
        [a, b, c, d] => signed_volume_3d(a, b, c, d),
        _ => unreachable!("gjk simplex holds one to four points"),
    }
}

/// Drops simplex points with zero weight, keeping the rest in order. Returns the new count.
fn sort_valids(simplex: &mut [Vec3; 4], lambdas: Vec4) -> usize {
    let mut valids = [Vec3::ZERO; 4];
    let mut count = 0;
    for i in 0..4 {
        if lambdas[i] != 0.0 {
            valids[count] = simplex[i];
            count += 1;
        }
    }
    *simplex = valids;
    count
}

/// True if two bounded convex colliders overlap. Planes have no support function and never
/// report an overlap here.
pub fn gjk_intersects(a: &Collider, b: &Collider) -> bool {
    if a.shape().is_plane() || b.shape().is_plane() {
        return false;
    }
    const EPSILON_SQ: f32 = 0.0001 * 0.0001;
    let support = |dir: Vec3| a.world_support(dir) - b.world_support(-dir);

    let mut simplex = [Vec3::ZERO; 4];
    simplex[0] = support(Vec3::ONE.normalize());
    let mut count = 1;
    let mut closest_dist_sq = f32::MAX;
    let mut dir = -simplex[0];

    for _ in 0..MAX_ITERATIONS {
        if dir.length_squared() < EPSILON_SQ {
            return true;
        }
        let pt = support(dir.normalize());

        // can't expand the simplex any further
        if simplex[..count]
            .iter()
            .any(|p| p.abs_diff_eq(pt, 1e-6))
        {
            return false;
        }
        // the new point didn't pass the origin, so the origin is outside the difference
        if dir.dot(pt) < 0.0 {
            return false;
        }

        simplex[count] = pt;
        count += 1;

        let lambdas = simplex_lambdas(&simplex[..count]);
        let mut closest = Vec3::ZERO;
        for i in 0..count {
            closest += simplex[i] * lambdas[i];
        }
        let dist_sq = closest.length_squared();
        if dist_sq < EPSILON_SQ {
            return true;
        }
        if dist_sq >= closest_dist_sq {
            return false;
        }
        closest_dist_sq = dist_sq;

        count = sort_valids(&mut simplex, lambdas);
        if count == 4 {
            return true;
        }
        dir = -closest;
    }
    false
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shapes::Shape;
    use glam::Quat;

    #[test]
    fn test_signed_volume_projection() {
        let org_pts = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z];

        let test_pts = |offset: Vec3, expected_lambdas: Vec4, expected_v: Vec3| {
            let pts = org_pts.map(|p| p + offset);
            let lambdas = signed_volume_3d(pts[0], pts[1], pts[2], pts[3]);
            let v: Vec3 = (0..4).map(|i| pts[i] * lambdas[i]).sum();
            assert!(expected_lambdas.abs_diff_eq(lambdas, 1e-3));
            assert!(expected_v.abs_diff_eq(v, 1e-3));
        };

        test_pts(Vec3::ONE, Vec4::X, Vec3::ONE);
        test_pts(Vec3::splat(-0.25), Vec4::splat(0.25), Vec3::ZERO);
        test_pts(
            Vec3::splat(-1.0),
            Vec4::new(0.0, 0.333, 0.333, 0.333),
            Vec3::splat(-0.667),
        );
        test_pts(
            Vec3::new(1.0, 1.0, -0.5),
            Vec4::new(0.5, 0.0, 0.0, 0.5),
            Vec3::new(1.0, 1.0, 0.0),
        );
    }

    fn placed(shape: Shape, position: Vec3, orientation: Quat) -> Collider {
        let mut collider = Collider::new(shape);
        collider.recompute_geometry(position, orientation);
        collider
    }

    #[test]
    fn test_spheres() {
        let a = placed(Shape::make_sphere(1.0), Vec3::ZERO, Quat::IDENTITY);
        let near = placed(Shape::make_sphere(1.0), Vec3::new(1.9, 0.0, 0.0), Quat::IDENTITY);
        let far = placed(Shape::make_sphere(1.0), Vec3::new(2.1, 0.0, 0.0), Quat::IDENTITY);
        assert!(gjk_intersects(&a, &near));
        assert!(!gjk_intersects(&a, &far));
    }

    #[test]
    fn test_rotated_boxes() {
        let a = placed(Shape::make_box(Vec3::ONE), Vec3::ZERO, Quat::IDENTITY);
        let rotation = Quat::from_rotation_z(std::f32::consts::FRAC_PI_4);
        // a diamond reaches sqrt(2) along x
        let touching = placed(Shape::make_box(Vec3::ONE), Vec3::new(2.3, 0.0, 0.0), rotation);
        let apart = placed(Shape::make_box(Vec3::ONE), Vec3::new(2.5, 0.0, 0.0), rotation);
        assert!(gjk_intersects(&a, &touching));
        assert!(!gjk_intersects(&a, &apart));
    }

    #[test]
    fn test_planes_are_not_queried() {
        let plane = Collider::new(Shape::make_plane(Vec3::Y, 0.0));
        let sphere = placed(Shape::make_sphere(1.0), Vec3::ZERO, Quat::IDENTITY);
        assert!(!gjk_intersects(&plane, &sphere));
    }
}
