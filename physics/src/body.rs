use crate::{
    bounds::Bounds, collider::Collider, config::SleepConfig, error::PhysicsError,
    math::glam_ext::QuatExt,
};
use glam::{Mat3, Quat, Vec3};
use tracing::trace;

/// Index of a body in the world. Handles are never reused, so they double as body ids.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyHandle(pub u32);

impl Default for BodyHandle {
    // default to invalid value
    fn default() -> Self {
        Self(u32::MAX)
    }
}

/// Body storage. Removed bodies leave a tombstone so handles stay stable.
#[derive(Debug, Default)]
pub struct BodyArena {
    bodies: Vec<Option<RigidBody>>,
}

impl BodyArena {
    pub fn new() -> Self {
        BodyArena { bodies: Vec::new() }
    }

    pub fn add(&mut self, mut body: RigidBody) -> BodyHandle {
        let handle = BodyHandle(self.bodies.len() as u32);
        body.handle = handle;
        for collider in &mut body.colliders {
            collider.body = Some(handle);
        }
        self.bodies.push(Some(body));
        handle
    }

    pub fn remove(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        self.bodies.get_mut(handle.0 as usize)?.take()
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle.0 as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle.0 as usize)?.as_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RigidBody> {
        self.bodies.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RigidBody> {
        self.bodies.iter_mut().flatten()
    }

    pub fn handles(&self) -> impl Iterator<Item = BodyHandle> + '_ {
        self.iter().map(|body| body.handle)
    }

    /// Number of live bodies.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Correction applied to a body by the contact resolver, bypassing the validated setters.
pub(crate) trait PhysicsMutableBody {
    fn force_translate(&mut self, delta: Vec3);
    fn force_rotate(&mut self, delta: Vec3);
    fn force_add_velocity(&mut self, linear: Vec3, angular: Vec3);
    fn wake(&mut self);
}

#[derive(Clone, Debug)]
pub struct RigidBody {
    handle: BodyHandle,
    position: Vec3,
    orientation: Quat,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    /// Fraction of linear velocity kept after one second.
    linear_damping: f32,
    /// Fraction of angular velocity kept after one second.
    angular_damping: f32,
    inverse_mass: f32,
    is_static: bool,
    /// Centre of mass relative to `position`, in the body frame.
    centre_of_mass: Vec3,
    inverse_inertia_local: Mat3,
    inverse_inertia_world: Mat3,
    force_accum: Vec3,
    torque_accum: Vec3,
    acceleration: Vec3,
    gravity_enabled: bool,

    awake: bool,
    can_sleep: bool,
    motion: f32,
    motion_epsilon: f32,
    still_frames: u32,

    colliders: Vec<Collider>,
    aabb: Option<Bounds>,
    bounding_radius: f32,
    pub(crate) cells: Vec<u32>,
}

impl RigidBody {
    /// A dynamic body. Its mass is the sum of its colliders' masses.
    pub fn new(position: Vec3) -> Self {
        let mut body = Self {
            handle: BodyHandle::default(),
            position,
            orientation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            linear_damping: 0.95,
            angular_damping: 0.8,
            inverse_mass: 0.0,
            is_static: false,
            centre_of_mass: Vec3::ZERO,
            inverse_inertia_local: Mat3::ZERO,
            inverse_inertia_world: Mat3::ZERO,
            force_accum: Vec3::ZERO,
            torque_accum: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            gravity_enabled: true,
            awake: true,
            can_sleep: true,
            motion: 0.0,
            motion_epsilon: SleepConfig::default().motion_epsilon,
            still_frames: 0,
            colliders: Vec::new(),
            aabb: None,
            bounding_radius: 0.0,
            cells: Vec::new(),
        };
        body.recompute_mass_properties();
        body.calculate_derived_data();
        body
    }

    /// An immovable body. It never integrates and starts asleep.
    pub fn new_static(position: Vec3) -> Self {
        let mut body = Self::new(position);
        body.is_static = true;
        body.awake = false;
        body.gravity_enabled = false;
        body
    }

    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation.normalize();
        self.calculate_derived_data();
        self
    }

    pub fn with_linear_velocity(mut self, velocity: Vec3) -> Self {
        if !self.is_static {
            self.linear_velocity = velocity;
        }
        self
    }

    pub fn with_angular_velocity(mut self, velocity: Vec3) -> Self {
        if !self.is_static {
            self.angular_velocity = velocity;
        }
        self
    }

    pub fn with_gravity(mut self, enabled: bool) -> Self {
        self.gravity_enabled = enabled && !self.is_static;
        self
    }

    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    /// Attaches a collider. Offsets are relative to the body origin.
    pub fn with_collider(mut self, collider: Collider) -> Self {
        self.attach(collider);
        self
    }

    pub(crate) fn attach(&mut self, mut collider: Collider) {
        collider.body = Some(self.handle);
        self.colliders.push(collider);
        self.recompute_mass_properties();
        self.calculate_derived_data();
    }

    pub fn handle(&self) -> BodyHandle {
        self.handle
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    pub fn acceleration(&self) -> Vec3 {
        self.acceleration
    }

    pub fn inverse_mass(&self) -> f32 {
        self.inverse_mass
    }

    pub fn has_infinite_mass(&self) -> bool {
        self.inverse_mass == 0.0
    }

    pub fn inverse_inertia_world(&self) -> Mat3 {
        self.inverse_inertia_world
    }

    pub fn is_awake(&self) -> bool {
        self.awake
    }

    pub fn can_sleep(&self) -> bool {
        self.can_sleep
    }

    pub fn gravity_enabled(&self) -> bool {
        self.gravity_enabled
    }

    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    pub fn aabb(&self) -> Option<Bounds> {
        self.aabb
    }

    pub fn bounding_radius(&self) -> f32 {
        self.bounding_radius
    }

    pub fn motion(&self) -> f32 {
        self.motion
    }

    pub fn centre_of_mass(&self) -> Vec3 {
        self.centre_of_mass
    }

    pub fn centre_of_mass_world(&self) -> Vec3 {
        self.local_to_world(self.centre_of_mass)
    }

    pub fn local_to_world(&self, point: Vec3) -> Vec3 {
        self.position + self.orientation * point
    }

    pub fn world_to_local(&self, point: Vec3) -> Vec3 {
        self.orientation.conjugate() * (point - self.position)
    }

    /// Sums collider masses, then their inertia tensors about the combined centre of mass.
    fn recompute_mass_properties(&mut self) {
        let mut radius: f32 = 0.0;
        let mut parts = Vec::with_capacity(self.colliders.len());
        for collider in &self.colliders {
            let (offset, rotation) = collider.offset();
            if let Some(local) = collider.shape().local_bounds() {
                radius = radius.max(offset.length() + local.width().length() * 0.5);
            }
            if collider.shape().is_plane() {
                continue;
            }
            let centre = offset + rotation * collider.shape().centre_of_mass();
            parts.push((collider.mass(), centre, rotation, collider.shape()));
        }

        let mass: f32 = parts.iter().map(|(m, ..)| m).sum();
        let centre_of_mass = if mass > 0.0 {
            parts.iter().map(|(m, c, ..)| *c * *m).sum::<Vec3>() / mass
        } else {
            Vec3::ZERO
        };

        let mut inertia = Mat3::ZERO;
        for &(m, centre, rotation, shape) in &parts {
            let rotation = Mat3::from_quat(rotation);
            let tensor = rotation * shape.inertia_tensor(m) * rotation.transpose();

            // parallel axis theorem
            let r = centre - centre_of_mass;
            let r2 = r.length_squared();
            let pat_tensor = Mat3::from_cols(
                Vec3::new(r2 - r.x * r.x, -r.x * r.y, -r.x * r.z),
                Vec3::new(-r.y * r.x, r2 - r.y * r.y, -r.y * r.z),
                Vec3::new(-r.z * r.x, -r.z * r.y, r2 - r.z * r.z),
            ) * m;

            inertia += tensor + pat_tensor;
        }
        self.centre_of_mass = centre_of_mass;
        self.bounding_radius = radius;

        if self.is_static || mass <= 0.0 {
            self.inverse_mass = 0.0;
            self.inverse_inertia_local = Mat3::ZERO;
            self.linear_velocity = Vec3::ZERO;
            self.angular_velocity = Vec3::ZERO;
            self.awake = false;
            return;
        }
        if self.inverse_mass == 0.0 {
            self.awake = true;
        }
        self.inverse_mass = mass.recip();
        self.inverse_inertia_local = if inertia.determinant().abs() > f32::EPSILON {
            inertia.inverse()
        } else {
            Mat3::ZERO
        };
    }

    /// Rebuilds everything that depends on the pose: world inverse inertia, collider geometry
    /// and the body's bounds.
    pub(crate) fn calculate_derived_data(&mut self) {
        let rotation = Mat3::from_quat(self.orientation);
        self.inverse_inertia_world =
            rotation * self.inverse_inertia_local * rotation.transpose();

        let mut aabb: Option<Bounds> = None;
        for collider in &mut self.colliders {
            collider.recompute_geometry(self.position, self.orientation);
            if !collider.enabled {
                continue;
            }
            if let Some(bounds) = collider.bounds() {
                aabb.get_or_insert_with(Bounds::new)
                    .expand_by_bounds(&bounds);
            }
        }
        self.aabb = aabb;
    }

    /// Adopts the world's gravity as the previous step's acceleration and its sleep threshold.
    pub(crate) fn prepare_for_world(&mut self, gravity: Vec3, sleep: &SleepConfig) {
        self.acceleration = if self.gravity_enabled && !self.has_infinite_mass() {
            gravity
        } else {
            Vec3::ZERO
        };
        self.motion_epsilon = sleep.motion_epsilon;
        if self.awake {
            self.motion = sleep.motion_epsilon * 2.0;
        }
    }

    /// Integrates one fixed step. Does nothing for sleeping or infinite mass bodies.
    pub fn update(&mut self, dt: f32, gravity: Vec3, sleep: &SleepConfig) {
        if !self.awake || self.has_infinite_mass() {
            return;
        }

        let previous_acceleration = self.acceleration;
        let mut acceleration = self.force_accum * self.inverse_mass;
        if self.gravity_enabled {
            acceleration += gravity;
        }
        let angular_acceleration = self.inverse_inertia_world * self.torque_accum;

        // velocity verlet
        self.position +=
            self.linear_velocity * dt + previous_acceleration * (0.5 * dt * dt);
        self.linear_velocity += (previous_acceleration + acceleration) * (0.5 * dt);
        self.acceleration = acceleration;
        self.angular_velocity += angular_acceleration * dt;

        self.linear_velocity *= self.linear_damping.powf(dt);
        self.angular_velocity *= self.angular_damping.powf(dt);

        // spin about the centre of mass, carrying the origin around it
        let centre = self.centre_of_mass_world();
        self.orientation = self
            .orientation
            .add_scaled_vector(self.angular_velocity, dt)
            .normalize();
        self.position = centre - self.orientation * self.centre_of_mass;

        self.calculate_derived_data();
        self.clear_accumulators();

        if self.can_sleep {
            self.update_sleep(dt, sleep);
        }
    }

    fn update_sleep(&mut self, dt: f32, sleep: &SleepConfig) {
        let current =
            self.linear_velocity.length_squared() + self.angular_velocity.length_squared();
        let bias = sleep.motion_bias.powf(dt);
        self.motion = bias * self.motion + (1.0 - bias) * current;
        self.motion = self.motion.min(10.0 * sleep.motion_epsilon);

        let still = self.motion < sleep.motion_epsilon
            && self.linear_velocity.length() * dt < sleep.linear_epsilon
            && self.angular_velocity.length() * dt < sleep.angular_epsilon;
        if !still {
            self.still_frames = 0;
            return;
        }

        self.still_frames += 1;
        if self.still_frames >= sleep.frames_before_sleep {
            trace!(body = self.handle.0, motion = self.motion, "body asleep");
            self.set_awake(false);
        }
    }

    fn clear_accumulators(&mut self) {
        self.force_accum = Vec3::ZERO;
        self.torque_accum = Vec3::ZERO;
    }

    /// Puts the body to sleep (zeroing its velocities) or wakes it. Infinite mass bodies are
    /// never awake.
    pub fn set_awake(&mut self, awake: bool) {
        if self.has_infinite_mass() {
            return;
        }
        if awake {
            if !self.awake {
                trace!(body = self.handle.0, "body awake");
            }
            self.awake = true;
            self.still_frames = 0;
            // keep it from falling straight back asleep
            self.motion = self.motion_epsilon * 2.0;
        } else {
            self.awake = false;
            self.still_frames = 0;
            self.linear_velocity = Vec3::ZERO;
            self.angular_velocity = Vec3::ZERO;
            self.clear_accumulators();
        }
    }

    pub fn set_can_sleep(&mut self, can_sleep: bool) {
        self.can_sleep = can_sleep;
        if !can_sleep && !self.awake {
            self.set_awake(true);
        }
    }

    pub fn set_gravity_enabled(&mut self, enabled: bool) {
        if !self.has_infinite_mass() {
            self.gravity_enabled = enabled;
        }
    }

    pub fn set_position(&mut self, position: Vec3) -> Result<(), PhysicsError> {
        if !position.is_finite() {
            return Err(PhysicsError::NonFinite("position"));
        }
        self.position = position;
        self.calculate_derived_data();
        self.wake();
        Ok(())
    }

    pub fn set_orientation(&mut self, orientation: Quat) -> Result<(), PhysicsError> {
        if !orientation.is_finite() || orientation.length_squared() <= f32::EPSILON {
            return Err(PhysicsError::NonFinite("orientation"));
        }
        self.orientation = orientation.normalize();
        self.calculate_derived_data();
        self.wake();
        Ok(())
    }

    pub fn set_linear_velocity(&mut self, velocity: Vec3) -> Result<(), PhysicsError> {
        if !velocity.is_finite() {
            return Err(PhysicsError::NonFinite("linear velocity"));
        }
        if !self.has_infinite_mass() {
            self.linear_velocity = velocity;
            self.wake();
        }
        Ok(())
    }

    pub fn set_angular_velocity(&mut self, velocity: Vec3) -> Result<(), PhysicsError> {
        if !velocity.is_finite() {
            return Err(PhysicsError::NonFinite("angular velocity"));
        }
        if !self.has_infinite_mass() {
            self.angular_velocity = velocity;
            self.wake();
        }
        Ok(())
    }

    /// Damping is the fraction of velocity kept after one second, in `[0, 1]`.
    pub fn set_damping(&mut self, linear: f32, angular: f32) -> Result<(), PhysicsError> {
        for value in [linear, angular] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PhysicsError::InvalidDamping(value));
            }
        }
        self.linear_damping = linear;
        self.angular_damping = angular;
        Ok(())
    }

    pub fn add_force(&mut self, force: Vec3) -> Result<(), PhysicsError> {
        if !force.is_finite() {
            return Err(PhysicsError::NonFinite("force"));
        }
        if !self.has_infinite_mass() {
            self.force_accum += force;
            self.wake();
        }
        Ok(())
    }

    /// Force applied at a world space point, producing torque about the centre of mass.
    pub fn add_force_at_point(&mut self, force: Vec3, point: Vec3) -> Result<(), PhysicsError> {
        if !force.is_finite() || !point.is_finite() {
            return Err(PhysicsError::NonFinite("force"));
        }
        if !self.has_infinite_mass() {
            self.force_accum += force;
            self.torque_accum += (point - self.centre_of_mass_world()).cross(force);
            self.wake();
        }
        Ok(())
    }

    pub fn add_torque(&mut self, torque: Vec3) -> Result<(), PhysicsError> {
        if !torque.is_finite() {
            return Err(PhysicsError::NonFinite("torque"));
        }
        if !self.has_infinite_mass() {
            self.torque_accum += torque;
            self.wake();
        }
        Ok(())
    }

    /// Applies a world space impulse at a world space point.
    pub fn apply_impulse(&mut self, impulse: Vec3, point: Vec3) -> Result<(), PhysicsError> {
        if !impulse.is_finite() || !point.is_finite() {
            return Err(PhysicsError::NonFinite("impulse"));
        }
        if self.has_infinite_mass() {
            return Ok(());
        }

        // dv = J / m, dw = I^-1 * (r x J)
        let r = point - self.centre_of_mass_world();
        self.linear_velocity += impulse * self.inverse_mass;
        self.angular_velocity += self.inverse_inertia_world * r.cross(impulse);
        self.wake();
        Ok(())
    }
}

impl PhysicsMutableBody for RigidBody {
    fn force_translate(&mut self, delta: Vec3) {
        if self.has_infinite_mass() {
            return;
        }
        self.position += delta;
        self.calculate_derived_data();
    }

    fn force_rotate(&mut self, delta: Vec3) {
        if self.has_infinite_mass() {
            return;
        }
        let centre = self.centre_of_mass_world();
        self.orientation = self.orientation.add_scaled_vector(delta, 1.0).normalize();
        self.position = centre - self.orientation * self.centre_of_mass;
        self.calculate_derived_data();
    }

    fn force_add_velocity(&mut self, linear: Vec3, angular: Vec3) {
        if self.has_infinite_mass() {
            return;
        }
        self.linear_velocity += linear;
        self.angular_velocity += angular;
    }

    fn wake(&mut self) {
        if !self.awake {
            self.set_awake(true);
        }
    }
}
