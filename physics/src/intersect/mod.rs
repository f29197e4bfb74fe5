//! Narrow phase: exact shape-pair tests producing contacts.

mod box_box;
mod capsule;
mod plane;
mod sphere;

use crate::{
    collider::Collider,
    contact::Contact,
    material::Material,
    shapes::{Shape, ShapeKind},
};
use glam::Vec3;

/// Contacts gathered during one step, bounded by a fixed capacity.
#[derive(Debug)]
pub struct ContactBuffer {
    contacts: Vec<Contact>,
    limit: usize,
    truncated: bool,
}

impl ContactBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            contacts: Vec::new(),
            limit,
            truncated: false,
        }
    }

    /// Stores `contact` unless the buffer is full, in which case the buffer is marked truncated.
    pub fn push(&mut self, contact: Contact) -> bool {
        if self.is_full() {
            self.truncated = true;
            return false;
        }
        self.contacts.push(contact);
        true
    }

    pub fn is_full(&self) -> bool {
        self.contacts.len() >= self.limit
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn clear(&mut self) {
        self.contacts.clear();
        self.truncated = false;
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Contact> + '_ {
        self.contacts.drain(..)
    }
}

/// Records a contact between `a` and `b`. `normal` must point from `b` towards `a`.
fn emit(
    a: &Collider,
    b: &Collider,
    out: &mut ContactBuffer,
    point: Vec3,
    normal: Vec3,
    penetration: f32,
) -> usize {
    let material = Material::combine(&a.material, &b.material);
    let contact = Contact::new(a.body(), b.body(), point, normal, penetration, material);
    usize::from(out.push(contact))
}

/// Whether a pair of shape kinds has a contact test. Every other pair produces no contacts.
pub fn supports_pair(a: ShapeKind, b: ShapeKind) -> bool {
    use ShapeKind::*;
    let (a, b) = if a <= b { (a, b) } else { (b, a) };
    matches!(
        (a, b),
        (Sphere, Sphere | Box | Capsule | Cylinder | Cone | Plane)
            | (Box, Box | Capsule | Plane)
            | (Capsule, Capsule | Plane)
            | (Cylinder, Plane)
            | (Cone, Plane)
            | (Plane, Mesh)
    )
}

/// Tests two colliders and appends any contacts to `out`, returning how many were written.
///
/// The pair is reordered so the lower [`ShapeKind`] comes first; that collider becomes body A
/// of the generated contacts.
pub fn collide(a: &Collider, b: &Collider, out: &mut ContactBuffer) -> usize {
    let (a, b) = if a.kind() <= b.kind() { (a, b) } else { (b, a) };
    match (a.shape(), b.shape()) {
        (Shape::Sphere(_), Shape::Sphere(_)) => sphere::sphere_sphere(a, b, out),
        (Shape::Sphere(_), Shape::Box(_))
        | (Shape::Sphere(_), Shape::Capsule(_))
        | (Shape::Sphere(_), Shape::Cylinder(_))
        | (Shape::Sphere(_), Shape::Cone(_)) => sphere::sphere_solid(a, b, out),
        (Shape::Sphere(_), Shape::Plane(_)) => plane::sphere_plane(a, b, out),
        (Shape::Box(_), Shape::Box(_)) => box_box::box_box(a, b, out),
        (Shape::Box(_), Shape::Capsule(_)) => capsule::box_capsule(a, b, out),
        (Shape::Box(_), Shape::Plane(_)) => plane::box_plane(a, b, out),
        (Shape::Capsule(_), Shape::Capsule(_)) => capsule::capsule_capsule(a, b, out),
        (Shape::Capsule(_), Shape::Plane(_)) => plane::capsule_plane(a, b, out),
        (Shape::Cylinder(_), Shape::Plane(_)) => plane::cylinder_plane(a, b, out),
        (Shape::Cone(_), Shape::Plane(_)) => plane::cone_plane(a, b, out),
        (Shape::Plane(_), Shape::Mesh(_)) => plane::plane_mesh(a, b, out),
        _ => 0,
    }
}

/// Deepest contact produced by testing `a` against `b`, without keeping it. Used to check that
/// resolved pairs have separated.
pub fn deepest_penetration(a: &Collider, b: &Collider) -> Option<f32> {
    let mut out = ContactBuffer::new(16);
    collide(a, b, &mut out);
    out.contacts()
        .iter()
        .map(|contact| contact.penetration)
        .reduce(f32::max)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shapes::ShapeMesh;
    use glam::Quat;
    use std::sync::Arc;

    fn make(kind: ShapeKind) -> Shape {
        match kind {
            ShapeKind::Sphere => Shape::make_sphere(0.5),
            ShapeKind::Box => Shape::make_box(Vec3::splat(0.5)),
            ShapeKind::Capsule => Shape::make_capsule(0.5, 1.0),
            ShapeKind::Cylinder => Shape::make_cylinder(0.5, 1.0),
            ShapeKind::Cone => Shape::make_cone(0.5, 1.0),
            ShapeKind::Plane => Shape::make_plane(Vec3::Y, 0.1),
            ShapeKind::Mesh => Shape::make_mesh(Arc::new(ShapeMesh::new(&[
                Vec3::new(-0.5, -0.5, -0.5),
                Vec3::new(0.5, -0.5, -0.5),
                Vec3::new(0.0, -0.5, 0.5),
                Vec3::new(0.0, 0.5, 0.0),
            ]))),
        }
    }

    fn placed(shape: Shape, position: Vec3) -> Collider {
        let mut collider = Collider::new(shape);
        collider.recompute_geometry(position, Quat::IDENTITY);
        collider
    }

    /// Every kind pair, both orders, deeply overlapping at the origin. Pairs without a test
    /// must report nothing; pairs with one must find the overlap.
    #[test]
    fn test_pair_table_is_complete() {
        let mut unsupported = 0;
        for (i, &ka) in ShapeKind::ALL.iter().enumerate() {
            for &kb in &ShapeKind::ALL[i..] {
                for (first, second) in [(ka, kb), (kb, ka)] {
                    let a = placed(make(first), Vec3::ZERO);
                    let b = placed(make(second), Vec3::new(0.0, 0.05, 0.0));
                    let mut out = ContactBuffer::new(64);
                    let count = collide(&a, &b, &mut out);
                    assert_eq!(count, out.len());
                    if supports_pair(first, second) {
                        assert!(count > 0, "{first:?} vs {second:?} found no contact");
                        for contact in out.contacts() {
                            assert!(contact.normal.is_normalized());
                            assert!(contact.penetration > 0.0);
                        }
                    } else {
                        assert_eq!(count, 0, "{first:?} vs {second:?} is not implemented");
                    }
                }
                if !supports_pair(ka, kb) {
                    unsupported += 1;
                }
            }
        }
        assert_eq!(unsupported, 14);
    }

    #[test]
    fn test_lower_kind_becomes_body_a() {
        use crate::body::BodyHandle;
        let mut sphere = placed(Shape::make_sphere(0.5), Vec3::new(0.0, 0.8, 0.0));
        sphere.body = Some(BodyHandle(3));
        let mut cube = placed(Shape::make_box(Vec3::splat(0.5)), Vec3::ZERO);
        cube.body = Some(BodyHandle(7));

        let mut out = ContactBuffer::new(4);
        collide(&cube, &sphere, &mut out);
        let contact = &out.contacts()[0];
        assert_eq!(contact.bodies, [Some(BodyHandle(3)), Some(BodyHandle(7))]);
        assert!(contact.normal.abs_diff_eq(Vec3::Y, 1e-6));
        assert!((contact.penetration - 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_capacity_truncates() {
        let cube = placed(Shape::make_box(Vec3::splat(0.5)), Vec3::ZERO);
        let floor = placed(Shape::make_plane(Vec3::Y, 0.0), Vec3::ZERO);
        let mut out = ContactBuffer::new(2);
        assert_eq!(collide(&cube, &floor, &mut out), 2);
        assert!(out.truncated());
        assert_eq!(out.len(), 2);
        assert_eq!(collide(&cube, &floor, &mut out), 0);
    }
}
