use super::{emit, ContactBuffer};
use crate::{
    collider::Collider,
    shapes::{Shape, ShapePlane},
};
use glam::Vec3;

fn plane_of(collider: &Collider) -> ShapePlane {
    match collider.world_plane() {
        Some(plane) => plane,
        None => unreachable!("expected a plane collider"),
    }
}

/// Emits a contact for every point of `solid` lying behind the plane.
fn points_below(
    solid: &Collider,
    plane_collider: &Collider,
    points: impl IntoIterator<Item = Vec3>,
    out: &mut ContactBuffer,
) -> usize {
    let plane = plane_of(plane_collider);
    let mut count = 0;
    for point in points {
        let distance = plane.distance(point);
        if distance < 0.0 {
            count += emit(solid, plane_collider, out, point, plane.normal, -distance);
        }
    }
    count
}

pub(super) fn sphere_plane(a: &Collider, b: &Collider, out: &mut ContactBuffer) -> usize {
    let Shape::Sphere(sphere) = a.shape() else {
        return 0;
    };
    let plane = plane_of(b);
    let centre = a.world_position();
    let distance = plane.distance(centre);
    if distance >= sphere.radius {
        return 0;
    }
    let point = centre - plane.normal * distance;
    emit(a, b, out, point, plane.normal, sphere.radius - distance)
}

pub(super) fn box_plane(a: &Collider, b: &Collider, out: &mut ContactBuffer) -> usize {
    let Shape::Box(cube) = a.shape() else {
        return 0;
    };
    let axes = a.world_axes();
    let centre = a.world_position();
    let h = cube.half_extents;
    let corners = (0..8).map(move |i| {
        let sign = |bit: usize| if i & bit == 0 { -1.0 } else { 1.0 };
        centre
            + axes.x_axis * (h.x * sign(1))
            + axes.y_axis * (h.y * sign(2))
            + axes.z_axis * (h.z * sign(4))
    });
    points_below(a, b, corners, out)
}

pub(super) fn capsule_plane(a: &Collider, b: &Collider, out: &mut ContactBuffer) -> usize {
    let Shape::Capsule(capsule) = a.shape() else {
        return 0;
    };
    let plane = plane_of(b);
    let (start, end) = capsule.segment();
    let deepest = [a.to_world(start), a.to_world(end)]
        .map(|centre| centre - plane.normal * capsule.radius);
    points_below(a, b, deepest, out)
}

/// Points on a circular rim of `radius` about `centre` (perpendicular to `axis`) farthest
/// along `dir`, or the centre when the rim is parallel to the plane.
fn rim_point(centre: Vec3, axis: Vec3, radius: f32, dir: Vec3) -> Vec3 {
    let radial = (dir - axis * dir.dot(axis)).normalize_or_zero();
    centre + radial * radius
}

pub(super) fn cylinder_plane(a: &Collider, b: &Collider, out: &mut ContactBuffer) -> usize {
    let Shape::Cylinder(cylinder) = a.shape() else {
        return 0;
    };
    let plane = plane_of(b);
    let axis = a.world_axes().y_axis;
    let h = cylinder.height * 0.5;
    let caps = [h, -h].map(|offset| {
        rim_point(
            a.world_position() + axis * offset,
            axis,
            cylinder.radius,
            -plane.normal,
        )
    });
    points_below(a, b, caps, out)
}

pub(super) fn cone_plane(a: &Collider, b: &Collider, out: &mut ContactBuffer) -> usize {
    let Shape::Cone(cone) = a.shape() else {
        return 0;
    };
    let plane = plane_of(b);
    let axis = a.world_axes().y_axis;
    let apex = a.world_position() + axis * cone.apex_y();
    let rim = rim_point(
        a.world_position() + axis * cone.base_y(),
        axis,
        cone.radius,
        -plane.normal,
    );
    points_below(a, b, [apex, rim], out)
}

/// Plane first, mesh second: the normal points from the mesh towards the plane.
pub(super) fn plane_mesh(a: &Collider, b: &Collider, out: &mut ContactBuffer) -> usize {
    let Shape::Mesh(mesh) = b.shape() else {
        return 0;
    };
    let plane = plane_of(a);
    let mut count = 0;
    for &vertex in mesh.vertices() {
        let point = b.to_world(vertex);
        let distance = plane.distance(point);
        if distance < 0.0 {
            count += emit(a, b, out, point, -plane.normal, -distance);
        }
    }
    count
}

#[cfg(test)]
mod test {
    use super::*;
    use glam::Quat;
    use std::f32::consts::FRAC_PI_2;

    fn placed(shape: Shape, position: Vec3, orientation: Quat) -> Collider {
        let mut collider = Collider::new(shape);
        collider.recompute_geometry(position, orientation);
        collider
    }

    fn floor() -> Collider {
        Collider::new(Shape::make_plane(Vec3::Y, -1.0))
    }

    #[test]
    fn test_box_resting_on_plane() {
        let mut out = ContactBuffer::new(16);
        let resting = placed(
            Shape::make_box(Vec3::ONE),
            Vec3::new(0.0, 0.999, 0.0),
            Quat::IDENTITY,
        );
        assert_eq!(box_plane(&resting, &floor(), &mut out), 0);

        let sunk = placed(
            Shape::make_box(Vec3::ONE),
            Vec3::new(0.0, -0.001, 0.0),
            Quat::IDENTITY,
        );
        assert_eq!(box_plane(&sunk, &floor(), &mut out), 4);
        for contact in out.contacts() {
            assert_eq!(contact.normal, Vec3::Y);
            assert!((contact.penetration - 0.001).abs() < 1e-6);
        }
    }

    #[test]
    fn test_cylinder_on_its_side() {
        let cylinder = placed(
            Shape::make_cylinder(0.5, 2.0),
            Vec3::new(0.0, -0.6, 0.0),
            Quat::from_rotation_z(FRAC_PI_2),
        );
        let mut out = ContactBuffer::new(16);
        assert_eq!(cylinder_plane(&cylinder, &floor(), &mut out), 2);
        for contact in out.contacts() {
            assert!((contact.point.y + 1.1).abs() < 1e-5);
            assert!((contact.penetration - 0.1).abs() < 1e-5);
        }
    }

    #[test]
    fn test_upright_cone_touches_with_base_centre() {
        let cone = placed(
            Shape::make_cone(1.0, 4.0),
            Vec3::new(0.0, -0.05, 0.0),
            Quat::IDENTITY,
        );
        let mut out = ContactBuffer::new(16);
        assert_eq!(cone_plane(&cone, &floor(), &mut out), 1);
        let contact = &out.contacts()[0];
        assert!(contact.point.abs_diff_eq(Vec3::new(0.0, -1.05, 0.0), 1e-5));
    }

    #[test]
    fn test_plane_mesh_normal_points_at_plane() {
        use crate::shapes::ShapeMesh;
        use std::sync::Arc;
        let mesh = placed(
            Shape::make_mesh(Arc::new(ShapeMesh::new(&[
                Vec3::new(0.0, -1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
            ]))),
            Vec3::new(0.0, -0.5, 0.0),
            Quat::IDENTITY,
        );
        let mut out = ContactBuffer::new(16);
        assert_eq!(plane_mesh(&floor(), &mesh, &mut out), 1);
        assert_eq!(out.contacts()[0].normal, -Vec3::Y);
        assert!((out.contacts()[0].penetration - 0.5).abs() < 1e-6);
    }
}
