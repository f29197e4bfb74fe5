use glam::{Mat3, Vec3};

/// Hull face as indices into the point set, wound counter clockwise seen from outside.
pub(crate) type Tri = [u32; 3];

fn distance_from_line(a: Vec3, b: Vec3, pt: Vec3) -> f32 {
    let ab = (b - a).normalize_or_zero();
    let ray = pt - a;
    (ray - ab * ray.dot(ab)).length()
}

fn distance_from_triangle(pts: &[Vec3], tri: &Tri, pt: Vec3) -> f32 {
    let [a, b, c] = tri.map(|i| pts[i as usize]);
    let normal = (b - a).cross(c - a).normalize_or_zero();
    (pt - a).dot(normal)
}

fn furthest_by(pts: &[Vec3], score: impl Fn(Vec3) -> f32) -> (usize, f32) {
    pts.iter()
        .enumerate()
        .map(|(i, &p)| (i, score(p)))
        .fold((0, f32::NEG_INFINITY), |best, cur| {
            if cur.1 > best.1 {
                cur
            } else {
                best
            }
        })
}

/// Seed tetrahedron, or `None` when the points are coplanar.
fn build_tetrahedron(pts: &[Vec3], tolerance: f32) -> Option<Vec<Tri>> {
    let (i0, _) = furthest_by(pts, |p| p.x);
    let (i1, d1) = furthest_by(pts, |p| p.distance(pts[i0]));
    let (i2, d2) = furthest_by(pts, |p| distance_from_line(pts[i0], pts[i1], p));
    if d1 <= tolerance || d2 <= tolerance {
        return None;
    }
    let base = [i0 as u32, i1 as u32, i2 as u32];
    let (i3, d3) = furthest_by(pts, |p| distance_from_triangle(pts, &base, p).abs());
    if d3 <= tolerance {
        return None;
    }

    let (mut p0, mut p1) = (i0 as u32, i1 as u32);
    let (p2, p3) = (i2 as u32, i3 as u32);
    // keep the fourth point behind the base so every face winds outward
    if distance_from_triangle(pts, &base, pts[i3]) > 0.0 {
        std::mem::swap(&mut p0, &mut p1);
    }
    Some(vec![[p0, p1, p2], [p0, p2, p3], [p2, p1, p3], [p1, p0, p3]])
}

fn add_point(pts: &[Vec3], tris: &mut Vec<Tri>, index: u32, tolerance: f32) {
    let pt = pts[index as usize];
    let (facing, kept): (Vec<Tri>, Vec<Tri>) = tris
        .iter()
        .partition(|tri| distance_from_triangle(pts, tri, pt) > tolerance);

    // the horizon is every facing edge not shared with another facing triangle
    let edges = |tri: &Tri| [[tri[0], tri[1]], [tri[1], tri[2]], [tri[2], tri[0]]];
    let horizon = facing
        .iter()
        .flat_map(edges)
        .filter(|&[a, b]| {
            !facing
                .iter()
                .flat_map(edges)
                .any(|[c, d]| c == b && d == a)
        })
        .collect::<Vec<_>>();

    *tris = kept;
    tris.extend(horizon.into_iter().map(|[a, b]| [a, b, index]));
}

/// Triangulates the convex hull of `pts`. Returns no triangles for coplanar input.
pub(crate) fn build_convex_hull(pts: &[Vec3]) -> Vec<Tri> {
    if pts.len() < 4 {
        return Vec::new();
    }
    let scale = pts.iter().fold(0.0f32, |m, p| m.max(p.abs().max_element()));
    let tolerance = scale.max(1.0) * 1e-5;
    let Some(mut tris) = build_tetrahedron(pts, tolerance) else {
        return Vec::new();
    };

    // grow the hull by the most distant outside point until nothing lies outside
    loop {
        let (index, dist) = furthest_by(pts, |p| {
            tris.iter()
                .map(|tri| distance_from_triangle(pts, tri, p))
                .fold(f32::NEG_INFINITY, f32::max)
        });
        if dist <= tolerance {
            break;
        }
        add_point(pts, &mut tris, index as u32, tolerance);
    }
    tris
}

fn outer(a: Vec3, b: Vec3) -> Mat3 {
    Mat3::from_cols(a * b.x, a * b.y, a * b.z)
}

/// Volume, centre of mass and unit density inertia tensor (about the centre of mass) of a closed
/// hull, summed over tetrahedra fanned from an interior point.
pub(crate) fn mass_properties(pts: &[Vec3], tris: &[Tri]) -> Option<(f32, Vec3, Mat3)> {
    let mut referenced = tris.iter().flatten().copied().collect::<Vec<_>>();
    referenced.sort_unstable();
    referenced.dedup();
    if referenced.is_empty() {
        return None;
    }
    let apex = referenced.iter().map(|&i| pts[i as usize]).sum::<Vec3>() / referenced.len() as f32;

    let mut volume = 0.0;
    let mut moment = Vec3::ZERO;
    let mut covariance = Mat3::ZERO;
    for tri in tris {
        let [a, b, c] = tri.map(|i| pts[i as usize] - apex);
        let det = a.dot(b.cross(c));
        let sum = a + b + c;
        volume += det / 6.0;
        moment += sum * (det / 24.0);
        covariance += (outer(a, a) + outer(b, b) + outer(c, c) + outer(sum, sum)) * (det / 120.0);
    }
    if volume <= f32::EPSILON {
        return None;
    }

    let offset = moment / volume;
    let covariance = covariance - outer(offset, offset) * volume;
    let trace = covariance.x_axis.x + covariance.y_axis.y + covariance.z_axis.z;
    let inertia = Mat3::from_diagonal(Vec3::splat(trace)) - covariance;
    Some((volume, apex + offset, inertia))
}

#[cfg(test)]
mod test {
    use super::*;

    fn cube() -> Vec<Vec3> {
        let mut pts = Vec::new();
        for x in [-1.0, 1.0] {
            for y in [-1.0, 1.0] {
                for z in [-1.0, 1.0] {
                    pts.push(Vec3::new(x, y, z));
                }
            }
        }
        pts
    }

    #[test]
    fn test_cube_hull() {
        let mut pts = cube();
        // interior and face points never become hull vertices
        pts.push(Vec3::ZERO);
        pts.push(Vec3::new(1.0, 0.0, 0.0));
        let tris = build_convex_hull(&pts);
        assert_eq!(tris.len(), 12);
        for tri in &tris {
            assert!(tri.iter().all(|&i| i < 8));
            for p in &pts {
                assert!(distance_from_triangle(&pts, tri, *p) <= 1e-5);
            }
        }

        let (volume, centre, inertia) = mass_properties(&pts, &tris).unwrap();
        assert!((volume - 8.0).abs() < 1e-4);
        assert!(centre.abs_diff_eq(Vec3::ZERO, 1e-5));
        // box of side 2: I = V * (4 + 4) / 12 on each axis
        let expected = Mat3::from_diagonal(Vec3::splat(8.0 * 8.0 / 12.0));
        assert!(inertia.abs_diff_eq(expected, 1e-3), "{inertia}");
    }

    #[test]
    fn test_coplanar_points_have_no_hull() {
        let pts = [Vec3::ZERO, Vec3::X, Vec3::Z, Vec3::new(1.0, 0.0, 1.0)];
        assert!(build_convex_hull(&pts).is_empty());
        assert!(mass_properties(&pts, &[]).is_none());
    }
}
