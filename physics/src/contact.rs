use crate::{
    body::{BodyArena, BodyHandle, PhysicsMutableBody, RigidBody},
    material::CombinedMaterial,
    math::glam_ext::{Mat3Ext, Vec3Ext},
};
use glam::{Mat3, Vec3};

/// Velocity correction for one body of a contact.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct VelocityChange {
    pub linear: Vec3,
    pub angular: Vec3,
}

/// Position correction for one body of a contact. `angular` is a rotation vector.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PositionChange {
    pub linear: Vec3,
    pub angular: Vec3,
}

/// A single contact point between two bodies, or between a body and static geometry.
///
/// The normal points from body B towards body A. A missing body is immovable world geometry;
/// after [`Contact::calculate_internals`] only body B may be missing.
#[derive(Clone, Debug)]
pub struct Contact {
    pub bodies: [Option<BodyHandle>; 2],
    pub point: Vec3,
    pub normal: Vec3,
    /// Positive when overlapping.
    pub penetration: f32,
    pub material: CombinedMaterial,

    // Solver scratch state. Rebuilt by `calculate_internals` every step and kept current by
    // the resolver as neighbouring contacts are resolved.
    pub(crate) contact_to_world: Mat3,
    pub(crate) contact_velocity: Vec3,
    pub(crate) desired_delta_velocity: f32,
    pub(crate) relative_position: [Vec3; 2],
}

impl Contact {
    pub fn new(
        a: Option<BodyHandle>,
        b: Option<BodyHandle>,
        point: Vec3,
        normal: Vec3,
        penetration: f32,
        material: CombinedMaterial,
    ) -> Self {
        Self {
            bodies: [a, b],
            point,
            normal,
            penetration,
            material,
            contact_to_world: Mat3::IDENTITY,
            contact_velocity: Vec3::ZERO,
            desired_delta_velocity: 0.0,
            relative_position: [Vec3::ZERO; 2],
        }
    }

    pub fn desired_delta_velocity(&self) -> f32 {
        self.desired_delta_velocity
    }

    /// Relative velocity at the contact point in contact space; x is along the normal.
    pub fn contact_velocity(&self) -> Vec3 {
        self.contact_velocity
    }

    pub fn involves(&self, handle: BodyHandle) -> bool {
        self.bodies.contains(&Some(handle))
    }

    fn body<'a>(&self, bodies: &'a BodyArena, index: usize) -> Option<&'a RigidBody> {
        self.bodies[index].and_then(|handle| bodies.get(handle))
    }

    fn swap_bodies(&mut self) {
        self.bodies.swap(0, 1);
        self.normal = -self.normal;
    }

    /// Rebuilds the contact basis, lever arms, relative velocity and desired velocity change.
    pub fn calculate_internals(
        &mut self,
        bodies: &BodyArena,
        dt: f32,
        restitution_velocity_limit: f32,
    ) {
        if self.body(bodies, 0).is_none() {
            self.swap_bodies();
        }
        debug_assert!(self.normal.is_normalized(), "contact normal must be unit length");

        self.contact_to_world = self.normal.contact_basis();

        self.contact_velocity = Vec3::ZERO;
        for index in 0..2 {
            if let Some(body) = self.body(bodies, index) {
                self.relative_position[index] = self.point - body.centre_of_mass_world();
                let velocity = self.local_velocity(body, index, dt);
                if index == 0 {
                    self.contact_velocity += velocity;
                } else {
                    self.contact_velocity -= velocity;
                }
            } else {
                self.relative_position[index] = Vec3::ZERO;
            }
        }

        self.calculate_desired_delta_velocity(bodies, dt, restitution_velocity_limit);
    }

    /// Velocity of the contact point on one body, in contact space.
    fn local_velocity(&self, body: &RigidBody, index: usize, dt: f32) -> Vec3 {
        let velocity = body
            .angular_velocity()
            .cross(self.relative_position[index])
            + body.linear_velocity();
        let world_to_contact = self.contact_to_world.transpose();
        let mut contact_velocity = world_to_contact * velocity;

        // planar part of this step's acceleration, so friction can cancel it
        let mut acc_velocity = world_to_contact * (body.acceleration() * dt);
        acc_velocity.x = 0.0;
        contact_velocity += acc_velocity;
        contact_velocity
    }

    /// Separating velocity change needed at the contact, positive when closing. Restitution is
    /// ignored for slow contacts so resting bodies settle.
    pub fn calculate_desired_delta_velocity(
        &mut self,
        bodies: &BodyArena,
        dt: f32,
        restitution_velocity_limit: f32,
    ) {
        let mut velocity_from_acc = 0.0;
        if let Some(body) = self.body(bodies, 0).filter(|body| body.is_awake()) {
            velocity_from_acc += (body.acceleration() * dt).dot(self.normal);
        }
        if let Some(body) = self.body(bodies, 1).filter(|body| body.is_awake()) {
            velocity_from_acc -= (body.acceleration() * dt).dot(self.normal);
        }

        let restitution = if self.contact_velocity.x.abs() < restitution_velocity_limit {
            0.0
        } else {
            self.material.restitution
        };

        self.desired_delta_velocity =
            -self.contact_velocity.x - restitution * (self.contact_velocity.x - velocity_from_acc);
    }

    /// Wakes the sleeping body of a contact whose other body is awake. Contacts with static
    /// geometry never wake anything.
    pub fn match_awake_state(&self, bodies: &mut BodyArena) {
        let (Some(a), Some(b)) = (self.bodies[0], self.bodies[1]) else {
            return;
        };
        let awake_a = bodies.get(a).map_or(false, |body| body.is_awake());
        let awake_b = bodies.get(b).map_or(false, |body| body.is_awake());
        if awake_a ^ awake_b {
            let sleeper = if awake_a { b } else { a };
            if let Some(body) = bodies.get_mut(sleeper) {
                body.wake();
            }
        }
    }

    /// True when at least one body can be moved by resolving this contact.
    pub fn is_active(&self, bodies: &BodyArena) -> bool {
        (0..2).any(|index| {
            self.body(bodies, index)
                .map_or(false, |body| body.is_awake() && !body.has_infinite_mass())
        })
    }

    fn inverse_mass(&self, bodies: &BodyArena, index: usize) -> f32 {
        self.body(bodies, index).map_or(0.0, |body| body.inverse_mass())
    }

    fn inverse_inertia(&self, bodies: &BodyArena, index: usize) -> Mat3 {
        self.body(bodies, index)
            .map_or(Mat3::ZERO, |body| body.inverse_inertia_world())
    }

    /// Impulse in contact space for a contact without friction.
    fn frictionless_impulse(&self, bodies: &BodyArena) -> Vec3 {
        let mut delta_velocity = 0.0;
        for index in 0..2 {
            if self.bodies[index].is_none() {
                continue;
            }
            let r = self.relative_position[index];
            let delta_velocity_world =
                (self.inverse_inertia(bodies, index) * r.cross(self.normal)).cross(r);
            delta_velocity +=
                delta_velocity_world.dot(self.normal) + self.inverse_mass(bodies, index);
        }
        if delta_velocity <= f32::EPSILON {
            return Vec3::ZERO;
        }
        Vec3::new(self.desired_delta_velocity / delta_velocity, 0.0, 0.0)
    }

    /// Impulse in contact space for a contact with friction, clamped to the friction cone.
    fn friction_impulse(&self, bodies: &BodyArena) -> Vec3 {
        let mut inverse_mass = 0.0;
        let mut delta_velocity_world = Mat3::ZERO;
        for index in 0..2 {
            if self.bodies[index].is_none() {
                continue;
            }
            let impulse_to_torque = Mat3::skew_symmetric(self.relative_position[index]);
            delta_velocity_world -=
                impulse_to_torque * self.inverse_inertia(bodies, index) * impulse_to_torque;
            inverse_mass += self.inverse_mass(bodies, index);
        }

        let mut delta_velocity =
            self.contact_to_world.transpose() * delta_velocity_world * self.contact_to_world;
        delta_velocity.x_axis.x += inverse_mass;
        delta_velocity.y_axis.y += inverse_mass;
        delta_velocity.z_axis.z += inverse_mass;

        if delta_velocity.determinant().abs() <= f32::EPSILON {
            return Vec3::ZERO;
        }
        let impulse_matrix = delta_velocity.inverse();

        let velocity_kill = Vec3::new(
            self.desired_delta_velocity,
            -self.contact_velocity.y,
            -self.contact_velocity.z,
        );
        let mut impulse = impulse_matrix * velocity_kill;

        let planar = (impulse.y * impulse.y + impulse.z * impulse.z).sqrt();
        if planar > impulse.x * self.material.static_friction {
            // sliding: re-solve with the tangential impulse on the dynamic friction boundary
            let friction = self.material.dynamic_friction;
            impulse.y /= planar;
            impulse.z /= planar;
            let normal_response = delta_velocity.x_axis.x
                + delta_velocity.y_axis.x * friction * impulse.y
                + delta_velocity.z_axis.x * friction * impulse.z;
            if normal_response.abs() <= f32::EPSILON {
                return Vec3::ZERO;
            }
            impulse.x = self.desired_delta_velocity / normal_response;
            impulse.y *= friction * impulse.x;
            impulse.z *= friction * impulse.x;
        }
        impulse
    }

    /// Velocity changes that remove the desired delta velocity, one per body. Body B receives
    /// the opposite impulse.
    pub fn resolve_impulse(&self, bodies: &BodyArena) -> [VelocityChange; 2] {
        let impulse_contact = if self.material.static_friction == 0.0
            && self.material.dynamic_friction == 0.0
        {
            self.frictionless_impulse(bodies)
        } else {
            self.friction_impulse(bodies)
        };
        let impulse = self.contact_to_world * impulse_contact;

        let mut changes = [VelocityChange::default(); 2];
        for (index, change) in changes.iter_mut().enumerate() {
            if self.bodies[index].is_none() {
                continue;
            }
            let signed = if index == 0 { impulse } else { -impulse };
            let torque = self.relative_position[index].cross(signed);
            change.linear = signed * self.inverse_mass(bodies, index);
            change.angular = self.inverse_inertia(bodies, index) * torque;
        }
        changes
    }

    /// Moves the bodies apart along the normal in proportion to their linear and angular
    /// inertia. Rotation is capped at `angular_limit` times the lever arm and the excess is
    /// made up linearly.
    pub fn resolve_interpenetration(
        &self,
        bodies: &BodyArena,
        angular_limit: f32,
    ) -> [PositionChange; 2] {
        let mut angular_inertia = [0.0; 2];
        let mut linear_inertia = [0.0; 2];
        let mut total_inertia = 0.0;
        for index in 0..2 {
            if self.bodies[index].is_none() {
                continue;
            }
            let r = self.relative_position[index];
            let angular_inertia_world =
                (self.inverse_inertia(bodies, index) * r.cross(self.normal)).cross(r);
            angular_inertia[index] = angular_inertia_world.dot(self.normal);
            linear_inertia[index] = self.inverse_mass(bodies, index);
            total_inertia += linear_inertia[index] + angular_inertia[index];
        }

        let mut changes = [PositionChange::default(); 2];
        if total_inertia <= f32::EPSILON {
            return changes;
        }

        for (index, change) in changes.iter_mut().enumerate() {
            if self.bodies[index].is_none() {
                continue;
            }
            let sign = if index == 0 { 1.0 } else { -1.0 };
            let mut angular_move =
                sign * self.penetration * (angular_inertia[index] / total_inertia);
            let mut linear_move = sign * self.penetration * (linear_inertia[index] / total_inertia);

            let r = self.relative_position[index];
            let projection = r - self.normal * r.dot(self.normal);
            let max_magnitude = angular_limit * projection.length();
            if angular_move.abs() > max_magnitude {
                let total_move = angular_move + linear_move;
                angular_move = max_magnitude.copysign(angular_move);
                linear_move = total_move - angular_move;
            }

            if angular_move != 0.0 && angular_inertia[index] > 0.0 {
                let target_angular_direction = r.cross(self.normal);
                change.angular = self.inverse_inertia(bodies, index)
                    * target_angular_direction
                    * (angular_move / angular_inertia[index]);
            }
            change.linear = self.normal * linear_move;
        }
        changes
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{collider::Collider, material::Material, shapes::Shape};

    fn sphere_body(position: Vec3, velocity: Vec3) -> RigidBody {
        RigidBody::new(position)
            .with_collider(Collider::new(Shape::make_sphere(0.5)).with_mass(1.0))
            .with_linear_velocity(velocity)
            .with_gravity(false)
    }

    fn apply(bodies: &mut BodyArena, contact: &Contact, changes: [VelocityChange; 2]) {
        for (handle, change) in contact.bodies.iter().zip(changes) {
            if let Some(body) = handle.and_then(|handle| bodies.get_mut(handle)) {
                body.force_add_velocity(change.linear, change.angular);
            }
        }
    }

    fn head_on(restitution: f32) -> (BodyArena, Contact) {
        let mut bodies = BodyArena::new();
        let a = bodies.add(sphere_body(Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0)));
        let b = bodies.add(sphere_body(Vec3::new(0.9, 0.0, 0.0), Vec3::new(-0.5, 0.0, 0.0)));
        let contact = Contact::new(
            Some(a),
            Some(b),
            Vec3::new(0.45, 0.0, 0.0),
            -Vec3::X,
            0.1,
            Material::frictionless(restitution).into(),
        );
        (bodies, contact)
    }

    #[test]
    fn test_elastic_head_on() {
        let (mut bodies, mut contact) = head_on(1.0);
        contact.calculate_internals(&bodies, 1.0 / 60.0, 0.25);
        assert!((contact.desired_delta_velocity() - 2.0).abs() < 1e-5);

        let changes = contact.resolve_impulse(&bodies);
        apply(&mut bodies, &contact, changes);

        let [a, b] = contact.bodies.map(|handle| bodies.get(handle.unwrap()).unwrap());
        assert!(a
            .linear_velocity()
            .abs_diff_eq(Vec3::new(-0.5, 0.0, 0.0), 1e-5));
        assert!(b
            .linear_velocity()
            .abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-5));
        assert_eq!(a.angular_velocity(), Vec3::ZERO);
    }

    #[test]
    fn test_inelastic_conserves_momentum() {
        let (mut bodies, mut contact) = head_on(0.0);
        contact.calculate_internals(&bodies, 1.0 / 60.0, 0.25);
        let changes = contact.resolve_impulse(&bodies);
        apply(&mut bodies, &contact, changes);

        let momentum: Vec3 = bodies.iter().map(|body| body.linear_velocity()).sum();
        assert!(momentum.abs_diff_eq(Vec3::ZERO, 1e-5));
        for body in bodies.iter() {
            assert!(body.linear_velocity().abs_diff_eq(Vec3::ZERO, 1e-5));
        }
    }

    #[test]
    fn test_missing_body_a_is_swapped() {
        let mut bodies = BodyArena::new();
        let b = bodies.add(sphere_body(Vec3::ZERO, Vec3::new(0.0, -1.0, 0.0)));
        let mut contact = Contact::new(
            None,
            Some(b),
            Vec3::new(0.0, -0.5, 0.0),
            -Vec3::Y,
            0.01,
            Material::frictionless(0.0).into(),
        );
        contact.calculate_internals(&bodies, 1.0 / 60.0, 0.25);
        assert_eq!(contact.bodies, [Some(b), None]);
        assert_eq!(contact.normal, Vec3::Y);
        assert!((contact.desired_delta_velocity() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_static_friction_stops_sliding() {
        let mut bodies = BodyArena::new();
        let a = bodies.add(sphere_body(Vec3::ZERO, Vec3::new(0.2, -1.0, 0.0)));
        let mut contact = Contact::new(
            Some(a),
            None,
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::Y,
            0.01,
            CombinedMaterial {
                restitution: 0.0,
                static_friction: 10.0,
                dynamic_friction: 10.0,
            },
        );
        contact.calculate_internals(&bodies, 1.0 / 60.0, 0.25);
        let changes = contact.resolve_impulse(&bodies);
        apply(&mut bodies, &contact, changes);

        // the contact point itself comes to rest
        let body = bodies.get(a).unwrap();
        let r = contact.point - body.centre_of_mass_world();
        let point_velocity = body.linear_velocity() + body.angular_velocity().cross(r);
        assert!(point_velocity.abs_diff_eq(Vec3::ZERO, 1e-4));
    }

    #[test]
    fn test_dynamic_friction_slows_sliding() {
        let mut bodies = BodyArena::new();
        let a = bodies.add(sphere_body(Vec3::ZERO, Vec3::new(5.0, -1.0, 0.0)));
        let mut contact = Contact::new(
            Some(a),
            None,
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::Y,
            0.01,
            CombinedMaterial {
                restitution: 0.0,
                static_friction: 0.1,
                dynamic_friction: 0.1,
            },
        );
        contact.calculate_internals(&bodies, 1.0 / 60.0, 0.25);
        let changes = contact.resolve_impulse(&bodies);
        apply(&mut bodies, &contact, changes);

        // normal impulse m * 1, so friction removes 0.1 of the sliding speed
        let body = bodies.get(a).unwrap();
        assert!(body
            .linear_velocity()
            .abs_diff_eq(Vec3::new(4.9, 0.0, 0.0), 1e-4));

        let r = contact.point - body.centre_of_mass_world();
        let point_velocity = body.linear_velocity() + body.angular_velocity().cross(r);
        assert!(point_velocity.y.abs() < 1e-4);
        assert!(point_velocity.x > 0.0 && point_velocity.x < 5.0);
        assert!(point_velocity.z.abs() < 1e-4);
    }

    #[test]
    fn test_interpenetration_split_by_mass() {
        let (bodies, mut contact) = head_on(0.0);
        contact.calculate_internals(&bodies, 1.0 / 60.0, 0.25);
        let [a, b] = contact.resolve_interpenetration(&bodies, 0.2);
        assert!(a.linear.abs_diff_eq(Vec3::new(-0.05, 0.0, 0.0), 1e-6));
        assert!(b.linear.abs_diff_eq(Vec3::new(0.05, 0.0, 0.0), 1e-6));
        assert_eq!(a.angular, Vec3::ZERO);
    }

    #[test]
    fn test_static_geometry_never_wakes() {
        let mut bodies = BodyArena::new();
        let a = bodies.add(sphere_body(Vec3::ZERO, Vec3::ZERO));
        bodies.get_mut(a).unwrap().set_awake(false);
        let contact = Contact::new(
            Some(a),
            None,
            Vec3::ZERO,
            Vec3::Y,
            0.1,
            Material::default().into(),
        );
        contact.match_awake_state(&mut bodies);
        assert!(!bodies.get(a).unwrap().is_awake());
        assert!(!contact.is_active(&bodies));
    }
}
