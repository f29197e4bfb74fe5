mod convex_hull;
mod shape_box;
mod shape_capsule;
mod shape_cone;
mod shape_cylinder;
mod shape_mesh;
mod shape_plane;
mod shape_sphere;

use crate::bounds::Bounds;
use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::{ops::Deref, sync::Arc};

pub use shape_box::ShapeBox;
pub use shape_capsule::ShapeCapsule;
pub use shape_cone::ShapeCone;
pub use shape_cylinder::ShapeCylinder;
pub use shape_mesh::ShapeMesh;
pub use shape_plane::ShapePlane;
pub use shape_sphere::ShapeSphere;

/// Geometry shared by every bounded shape, expressed in the shape's local frame. Primitives are
/// centred on the local origin.
trait ShapeTrait {
    fn centre_of_mass(&self) -> Vec3 {
        Vec3::ZERO
    }
    /// Inertia about `centre_of_mass`.
    fn inertia_tensor(&self, mass: f32) -> Mat3;
    fn local_bounds(&self) -> Bounds;
    fn support(&self, dir: Vec3) -> Vec3;

    fn bounds(&self, position: Vec3, orientation: Quat) -> Bounds {
        self.local_bounds().transformed(position, orientation)
    }
}

/// Closest surface feature of a solid shape to a query point, in the shape's local frame.
#[derive(Copy, Clone, Debug)]
pub(crate) struct SurfaceProjection {
    /// Closest point on the surface.
    pub point: Vec3,
    /// Outward surface normal at `point`.
    pub normal: Vec3,
    /// Signed distance from the surface to the query point, negative inside the solid.
    pub distance: f32,
}

impl SurfaceProjection {
    /// Projection of a point lying outside the solid onto `surface_point`.
    fn outside(query: Vec3, surface_point: Vec3, fallback_normal: Vec3) -> Self {
        let delta = query - surface_point;
        let distance = delta.length();
        let normal = if distance > f32::EPSILON {
            delta / distance
        } else {
            fallback_normal
        };
        Self {
            point: surface_point,
            normal,
            distance,
        }
    }
}

/// Shape kinds in dispatch order. The narrow phase always tests the lower kind first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Sphere = 0,
    Box = 1,
    Capsule = 2,
    Cylinder = 3,
    Cone = 4,
    Plane = 5,
    Mesh = 6,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 7] = [
        ShapeKind::Sphere,
        ShapeKind::Box,
        ShapeKind::Capsule,
        ShapeKind::Cylinder,
        ShapeKind::Cone,
        ShapeKind::Plane,
        ShapeKind::Mesh,
    ];
}

#[derive(Clone, Debug)]
pub enum Shape {
    Sphere(ShapeSphere),
    Box(ShapeBox),
    Capsule(ShapeCapsule),
    Cylinder(ShapeCylinder),
    Cone(ShapeCone),
    Plane(ShapePlane),
    Mesh(Arc<ShapeMesh>),
}

impl Default for Shape {
    fn default() -> Shape {
        Shape::Sphere(ShapeSphere { radius: 1.0 })
    }
}

impl Shape {
    pub fn make_sphere(radius: f32) -> Self {
        Shape::Sphere(ShapeSphere { radius })
    }

    pub fn make_box(half_extents: Vec3) -> Self {
        Shape::Box(ShapeBox { half_extents })
    }

    pub fn make_capsule(radius: f32, height: f32) -> Self {
        Shape::Capsule(ShapeCapsule { radius, height })
    }

    pub fn make_cylinder(radius: f32, height: f32) -> Self {
        Shape::Cylinder(ShapeCylinder { radius, height })
    }

    pub fn make_cone(radius: f32, height: f32) -> Self {
        Shape::Cone(ShapeCone { radius, height })
    }

    pub fn make_plane(normal: Vec3, offset: f32) -> Self {
        Shape::Plane(ShapePlane::new(normal, offset))
    }

    pub fn make_mesh(data: Arc<ShapeMesh>) -> Self {
        Shape::Mesh(data)
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Sphere(_) => ShapeKind::Sphere,
            Shape::Box(_) => ShapeKind::Box,
            Shape::Capsule(_) => ShapeKind::Capsule,
            Shape::Cylinder(_) => ShapeKind::Cylinder,
            Shape::Cone(_) => ShapeKind::Cone,
            Shape::Plane(_) => ShapeKind::Plane,
            Shape::Mesh(_) => ShapeKind::Mesh,
        }
    }

    pub fn is_plane(&self) -> bool {
        matches!(self, Shape::Plane(_))
    }

    fn shape_trait(&self) -> Option<&dyn ShapeTrait> {
        match self {
            Shape::Sphere(data) => Some(data),
            Shape::Box(data) => Some(data),
            Shape::Capsule(data) => Some(data),
            Shape::Cylinder(data) => Some(data),
            Shape::Cone(data) => Some(data),
            Shape::Plane(_) => None,
            Shape::Mesh(data) => Some(data.deref()),
        }
    }

    /// Centre of mass in the shape's local frame.
    pub fn centre_of_mass(&self) -> Vec3 {
        self.shape_trait()
            .map_or(Vec3::ZERO, |shape| shape.centre_of_mass())
    }

    /// Inertia tensor about the shape's centre of mass. Planes are immovable and report zero.
    pub fn inertia_tensor(&self, mass: f32) -> Mat3 {
        self.shape_trait()
            .map_or(Mat3::ZERO, |shape| shape.inertia_tensor(mass))
    }

    /// Bounds in the shape's local frame. Planes are unbounded.
    pub fn local_bounds(&self) -> Option<Bounds> {
        self.shape_trait().map(|shape| shape.local_bounds())
    }

    pub fn bounds(&self, position: Vec3, orientation: Quat) -> Option<Bounds> {
        self.shape_trait()
            .map(|shape| shape.bounds(position, orientation))
    }

    /// Farthest point of the untransformed shape along `dir`, which must be expressed in the
    /// shape's local (rotated, untranslated) frame.
    ///
    /// # Panics
    ///
    /// Planes have no support point; asking for one is a programming error.
    pub fn support_point(&self, dir: Vec3) -> Vec3 {
        match self.shape_trait() {
            Some(shape) => shape.support(dir),
            None => panic!("support_point called on a plane shape"),
        }
    }
}
