use crate::{
    batch::ContactBatches,
    body::{BodyArena, BodyHandle, RigidBody},
    broadphase::SpatialHash,
    collider::Collider,
    config::WorldConfig,
    error::PhysicsError,
    gjk::gjk_intersects,
    intersect::{collide, ContactBuffer},
    resolver::ContactResolver,
    time_accumulator::TimeAccumulator,
};
use glam::{Quat, Vec3};
use tracing::{debug, warn};

/// Counters for the most recent fixed step.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StepStats {
    pub candidate_pairs: usize,
    pub contacts: usize,
    pub batches: usize,
    /// Contact generation hit `max_contacts` and stopped early.
    pub truncated: bool,
    pub position_iterations: u32,
    pub velocity_iterations: u32,
}

/// Owns every body and runs the step pipeline: integrate, rehash, broad phase, narrow phase,
/// batch, resolve.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    bodies: BodyArena,
    static_shapes: Vec<Collider>,
    hash: SpatialHash,
    contacts: ContactBuffer,
    batches: ContactBatches,
    accumulator: TimeAccumulator,
    last_step_stats: StepStats,
    step_count: u64,
}

fn check_mass(collider: &Collider) -> Result<(), PhysicsError> {
    let mass = collider.mass();
    if mass.is_finite() && mass >= 0.0 {
        Ok(())
    } else {
        Err(PhysicsError::InvalidMass(mass))
    }
}

/// Whether a non-plane collider reaches below a plane collider.
fn plane_overlap(plane: &Collider, other: &Collider) -> bool {
    match plane.world_plane() {
        Some(plane) if !other.shape().is_plane() => {
            plane.distance(other.world_support(-plane.normal)) < 0.0
        }
        _ => false,
    }
}

fn collide_bodies(a: &RigidBody, b: &RigidBody, out: &mut ContactBuffer) {
    for collider_a in a.colliders() {
        for collider_b in b.colliders() {
            if collider_a.shape().is_plane() || collider_b.shape().is_plane() {
                continue;
            }
            if !collider_a.can_collide_with(collider_b) {
                continue;
            }
            match (collider_a.bounds(), collider_b.bounds()) {
                (Some(bounds_a), Some(bounds_b)) if bounds_a.intersects(&bounds_b) => {
                    collide(collider_a, collider_b, out);
                }
                _ => {}
            }
        }
    }
}

/// Tests `shape` against every collider of `body` that it could touch.
fn collide_with_body(shape: &Collider, body: &RigidBody, out: &mut ContactBuffer) {
    for collider in body.colliders() {
        if !shape.can_collide_with(collider) {
            continue;
        }
        let bounded = match (shape.bounds(), collider.bounds()) {
            (Some(a), Some(b)) => a.intersects(&b),
            _ => true,
        };
        if bounded {
            collide(shape, collider, out);
        }
    }
}

impl World {
    pub fn new(config: WorldConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        Ok(Self {
            hash: SpatialHash::new(&config.broadphase),
            contacts: ContactBuffer::new(config.max_contacts),
            batches: ContactBatches::new(),
            accumulator: TimeAccumulator::new(config.fixed_timestep, config.max_substeps),
            bodies: BodyArena::new(),
            static_shapes: Vec::new(),
            last_step_stats: StepStats::default(),
            step_count: 0,
            config,
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn add_body(&mut self, mut body: RigidBody) -> Result<BodyHandle, PhysicsError> {
        for collider in body.colliders() {
            check_mass(collider)?;
        }
        body.prepare_for_world(self.config.gravity, &self.config.sleep);
        body.calculate_derived_data();
        let handle = self.bodies.add(body);
        self.rehash_body(handle);
        Ok(handle)
    }

    pub fn add_shape_to_body(
        &mut self,
        handle: BodyHandle,
        collider: Collider,
    ) -> Result<(), PhysicsError> {
        check_mass(&collider)?;
        let body = self
            .bodies
            .get_mut(handle)
            .ok_or(PhysicsError::UnknownBody(handle))?;
        body.attach(collider);
        body.prepare_for_world(self.config.gravity, &self.config.sleep);
        self.rehash_body(handle);
        Ok(())
    }

    /// Adds immovable geometry that belongs to no body. The collider's offset is its world
    /// transform.
    pub fn add_static_shape(&mut self, mut collider: Collider) {
        collider.recompute_geometry(Vec3::ZERO, Quat::IDENTITY);
        self.static_shapes.push(collider);
    }

    pub fn static_shapes(&self) -> &[Collider] {
        &self.static_shapes
    }

    /// Removes a body from the spatial hash and any live contact batch. Its handle is never
    /// issued again.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<RigidBody, PhysicsError> {
        let body = self
            .bodies
            .remove(handle)
            .ok_or(PhysicsError::UnknownBody(handle))?;
        self.hash.remove(handle, &body.cells);
        self.batches.remove_body(handle);
        Ok(body)
    }

    pub fn body(&self, handle: BodyHandle) -> Result<&RigidBody, PhysicsError> {
        self.bodies
            .get(handle)
            .ok_or(PhysicsError::UnknownBody(handle))
    }

    /// Changes made through the returned body take effect from the next step.
    pub fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut RigidBody, PhysicsError> {
        self.bodies
            .get_mut(handle)
            .ok_or(PhysicsError::UnknownBody(handle))
    }

    pub fn bodies(&self) -> impl Iterator<Item = &RigidBody> {
        self.bodies.iter()
    }

    /// Contact batches built by the most recent step.
    pub fn batches(&self) -> &ContactBatches {
        &self.batches
    }

    pub fn last_step_stats(&self) -> StepStats {
        self.last_step_stats
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Whether any pair of colliders of the two bodies currently overlaps.
    pub fn bodies_overlap(&self, a: BodyHandle, b: BodyHandle) -> Result<bool, PhysicsError> {
        let body_a = self.body(a)?;
        let body_b = self.body(b)?;
        let overlap = body_a.colliders().iter().any(|collider_a| {
            body_b.colliders().iter().any(|collider_b| {
                match (collider_a.shape().is_plane(), collider_b.shape().is_plane()) {
                    (false, false) => gjk_intersects(collider_a, collider_b),
                    (true, false) => plane_overlap(collider_a, collider_b),
                    (false, true) => plane_overlap(collider_b, collider_a),
                    (true, true) => false,
                }
            })
        });
        Ok(overlap)
    }

    /// Advances by a wall clock delta in whole fixed steps, carrying the remainder. Returns the
    /// number of steps taken.
    pub fn physics_update(&mut self, dt: f32) -> u32 {
        let steps = self.accumulator.update_secs(dt);
        for _ in 0..steps {
            self.step();
        }
        steps
    }

    /// Runs exactly one fixed step.
    pub fn step(&mut self) -> StepStats {
        let dt = self.config.fixed_timestep;
        self.step_count += 1;

        for body in self.bodies.iter_mut() {
            body.update(dt, self.config.gravity, &self.config.sleep);
        }
        let handles = self.bodies.handles().collect::<Vec<_>>();
        for handle in handles {
            self.rehash_body(handle);
        }

        let pairs = self.hash.candidate_pairs(&self.bodies);
        self.contacts.clear();
        self.batches.clear();
        for pair in &pairs {
            if self.contacts.is_full() {
                break;
            }
            if let (Some(a), Some(b)) = (self.bodies.get(pair.a), self.bodies.get(pair.b)) {
                collide_bodies(a, b, &mut self.contacts);
            }
        }
        self.collide_unbounded();

        let mut stats = StepStats {
            candidate_pairs: pairs.len(),
            contacts: self.contacts.len(),
            truncated: self.contacts.truncated(),
            ..Default::default()
        };
        if stats.truncated {
            warn!(
                limit = self.config.max_contacts,
                step = self.step_count,
                "contact limit reached, remaining pairs skipped"
            );
        }

        for contact in self.contacts.drain() {
            self.batches.insert(contact);
        }
        stats.batches = self.batches.len();

        let resolver = ContactResolver::new(&self.config.resolver, stats.contacts);
        for batch in self.batches.iter_mut() {
            match resolver.resolve(batch.contacts_mut(), &mut self.bodies, dt) {
                Ok(resolved) => {
                    stats.position_iterations += resolved.position_iterations;
                    stats.velocity_iterations += resolved.velocity_iterations;
                }
                Err(error) => {
                    warn!(%error, step = self.step_count, "contact resolution skipped");
                    break;
                }
            }
        }

        debug!(
            step = self.step_count,
            bodies = self.bodies.len(),
            pairs = stats.candidate_pairs,
            contacts = stats.contacts,
            batches = stats.batches,
            position_iterations = stats.position_iterations,
            velocity_iterations = stats.velocity_iterations,
            "physics step"
        );
        self.last_step_stats = stats;
        stats
    }

    /// Keeps the spatial hash in step with the body's current bounds.
    fn rehash_body(&mut self, handle: BodyHandle) {
        let Some(body) = self.bodies.get_mut(handle) else {
            return;
        };
        let aabb = body.aabb();
        body.cells = self.hash.rehash(handle, &body.cells, aabb.as_ref());
    }

    /// Planes and static geometry have no place in the spatial hash, so they are tested against
    /// every awake body directly.
    fn collide_unbounded(&mut self) {
        for body in self.bodies.iter().filter(|body| body.is_awake()) {
            for shape in &self.static_shapes {
                collide_with_body(shape, body, &mut self.contacts);
            }
        }

        for owner in self.bodies.iter() {
            for plane in owner.colliders().iter().filter(|c| c.shape().is_plane()) {
                for body in self.bodies.iter() {
                    if body.handle() != owner.handle() && body.is_awake() {
                        collide_with_body(plane, body, &mut self.contacts);
                    }
                }
            }
        }
    }
}
