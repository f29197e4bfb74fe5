use super::{emit, ContactBuffer};
use crate::{
    collider::Collider,
    shapes::{Shape, SurfaceProjection},
};
use glam::Vec3;

fn radius(collider: &Collider) -> f32 {
    match collider.shape() {
        Shape::Sphere(sphere) => sphere.radius,
        _ => unreachable!("expected a sphere collider"),
    }
}

pub(super) fn sphere_sphere(a: &Collider, b: &Collider, out: &mut ContactBuffer) -> usize {
    let (radius_a, radius_b) = (radius(a), radius(b));
    let midline = a.world_position() - b.world_position();
    let radius_sum = radius_a + radius_b;
    let distance_sq = midline.length_squared();
    if distance_sq >= radius_sum * radius_sum {
        return 0;
    }

    let distance = distance_sq.sqrt();
    let normal = if distance > f32::EPSILON {
        midline / distance
    } else {
        Vec3::Y
    };
    let penetration = radius_sum - distance;
    let point = b.world_position() + normal * (radius_b - penetration * 0.5);
    emit(a, b, out, point, normal, penetration)
}

/// Closest surface feature of a solid collider to a world point.
pub(super) fn project_onto(solid: &Collider, world_point: Vec3) -> Option<SurfaceProjection> {
    let local = solid.to_local(world_point);
    let projection = match solid.shape() {
        Shape::Box(shape) => shape.project_point(local),
        Shape::Capsule(shape) => shape.project_point(local),
        Shape::Cylinder(shape) => shape.project_point(local),
        Shape::Cone(shape) => shape.project_point(local),
        _ => return None,
    };
    Some(SurfaceProjection {
        point: solid.to_world(projection.point),
        normal: solid.world_orientation() * projection.normal,
        distance: projection.distance,
    })
}

/// A sphere of `radius` at `centre` against a solid. Returns the contact point, the normal
/// pointing from the solid towards the sphere, and the penetration.
pub(super) fn sphere_against(
    centre: Vec3,
    radius: f32,
    solid: &Collider,
) -> Option<(Vec3, Vec3, f32)> {
    let projection = project_onto(solid, centre)?;
    if projection.distance >= radius {
        return None;
    }
    Some((
        projection.point,
        projection.normal,
        radius - projection.distance,
    ))
}

/// Sphere against a box, capsule, cylinder or cone.
pub(super) fn sphere_solid(a: &Collider, b: &Collider, out: &mut ContactBuffer) -> usize {
    match sphere_against(a.world_position(), radius(a), b) {
        Some((point, normal, penetration)) => emit(a, b, out, point, normal, penetration),
        None => 0,
    }
}
