use crate::{
    body::BodyHandle,
    bounds::Bounds,
    material::Material,
    shapes::{Shape, ShapeKind, ShapePlane},
};
use glam::{Mat3, Quat, Vec3};

/// A shape placed on a body (or in the world) with its material, mass and collision filter.
#[derive(Clone, Debug)]
pub struct Collider {
    shape: Shape,
    offset_position: Vec3,
    offset_orientation: Quat,
    pub material: Material,
    mass: f32,
    /// Bits describing what this collider is.
    pub collision_type: u32,
    /// Bits of `collision_type` this collider accepts contacts from.
    pub collision_mask: u32,
    pub enabled: bool,
    pub(crate) body: Option<BodyHandle>,

    world_position: Vec3,
    world_orientation: Quat,
    world_axes: Mat3,
    bounds: Option<Bounds>,
    world_plane: Option<ShapePlane>,
}

impl Collider {
    pub fn new(shape: Shape) -> Self {
        let world_plane = match &shape {
            Shape::Plane(plane) => Some(*plane),
            _ => None,
        };
        let mut collider = Self {
            shape,
            offset_position: Vec3::ZERO,
            offset_orientation: Quat::IDENTITY,
            material: Material::default(),
            mass: 1.0,
            collision_type: 1,
            collision_mask: u32::MAX,
            enabled: true,
            body: None,
            world_position: Vec3::ZERO,
            world_orientation: Quat::IDENTITY,
            world_axes: Mat3::IDENTITY,
            bounds: None,
            world_plane,
        };
        collider.recompute_geometry(Vec3::ZERO, Quat::IDENTITY);
        collider
    }

    /// Places the collider relative to its parent. For planes this fixes the plane for good.
    pub fn with_offset(mut self, position: Vec3, orientation: Quat) -> Self {
        self.offset_position = position;
        self.offset_orientation = orientation.normalize();
        if let Shape::Plane(plane) = &self.shape {
            self.world_plane = Some(plane.transformed(position, self.offset_orientation));
        }
        self.recompute_geometry(Vec3::ZERO, Quat::IDENTITY);
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_filter(mut self, collision_type: u32, collision_mask: u32) -> Self {
        self.collision_type = collision_type;
        self.collision_mask = collision_mask;
        self
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn inverse_mass(&self) -> f32 {
        if self.mass > 0.0 {
            self.mass.recip()
        } else {
            0.0
        }
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    pub fn offset(&self) -> (Vec3, Quat) {
        (self.offset_position, self.offset_orientation)
    }

    pub fn world_position(&self) -> Vec3 {
        self.world_position
    }

    pub fn world_orientation(&self) -> Quat {
        self.world_orientation
    }

    /// Columns are the collider's local axes in world space.
    pub fn world_axes(&self) -> Mat3 {
        self.world_axes
    }

    /// World space bounds, `None` for planes.
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// The world space plane of a plane collider.
    pub fn world_plane(&self) -> Option<ShapePlane> {
        self.world_plane
    }

    /// Derives world transform, axes and bounds from the parent transform. Planes never move.
    pub fn recompute_geometry(&mut self, parent_position: Vec3, parent_orientation: Quat) {
        if self.shape.is_plane() {
            return;
        }
        self.world_orientation = (parent_orientation * self.offset_orientation).normalize();
        self.world_position = parent_position + parent_orientation * self.offset_position;
        self.world_axes = Mat3::from_quat(self.world_orientation);
        self.bounds = self
            .shape
            .bounds(self.world_position, self.world_orientation);
    }

    /// Farthest world space point along the world space direction `dir`.
    pub fn world_support(&self, dir: Vec3) -> Vec3 {
        let local_dir = self.world_orientation.conjugate() * dir;
        self.world_position + self.world_orientation * self.shape.support_point(local_dir)
    }

    /// World point expressed in the collider's local frame.
    pub fn to_local(&self, point: Vec3) -> Vec3 {
        self.world_orientation.conjugate() * (point - self.world_position)
    }

    pub fn to_world(&self, point: Vec3) -> Vec3 {
        self.world_position + self.world_orientation * point
    }

    pub fn can_collide_with(&self, other: &Collider) -> bool {
        self.enabled
            && other.enabled
            && self.collision_mask & other.collision_type != 0
            && other.collision_mask & self.collision_type != 0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_recompute_geometry_follows_parent() {
        let mut collider = Collider::new(Shape::make_box(Vec3::new(2.0, 0.5, 0.5)))
            .with_offset(Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY);
        collider.recompute_geometry(Vec3::new(0.0, 3.0, 0.0), Quat::from_rotation_z(FRAC_PI_2));

        assert!(collider
            .world_position()
            .abs_diff_eq(Vec3::new(0.0, 4.0, 0.0), 1e-5));
        let bounds = collider.bounds().unwrap();
        assert!(bounds.mins.abs_diff_eq(Vec3::new(-0.5, 2.0, -0.5), 1e-5));
        assert!(bounds.maxs.abs_diff_eq(Vec3::new(0.5, 6.0, 0.5), 1e-5));

        let top = collider.world_support(Vec3::Y);
        assert!((top.y - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_plane_geometry_is_fixed() {
        let mut plane = Collider::new(Shape::make_plane(Vec3::Y, 0.0))
            .with_offset(Vec3::new(0.0, -1.0, 0.0), Quat::IDENTITY);
        plane.recompute_geometry(Vec3::new(0.0, 10.0, 0.0), Quat::IDENTITY);
        assert!(plane.bounds().is_none());
        assert_eq!(plane.world_plane().unwrap().offset, -1.0);
    }

    #[test]
    fn test_filtering() {
        let a = Collider::new(Shape::make_sphere(1.0)).with_filter(0b01, 0b10);
        let b = Collider::new(Shape::make_sphere(1.0)).with_filter(0b10, 0b01);
        let c = Collider::new(Shape::make_sphere(1.0)).with_filter(0b10, 0b10);
        assert!(a.can_collide_with(&b));
        assert!(!a.can_collide_with(&c));

        let mut disabled = b.clone();
        disabled.enabled = false;
        assert!(!a.can_collide_with(&disabled));
    }
}
