use crate::{
    body::{BodyArena, PhysicsMutableBody},
    config::ResolverConfig,
    contact::Contact,
    error::PhysicsError,
};

/// Iterations each pass of one [`ContactResolver::resolve`] call actually used.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub position_iterations: u32,
    pub velocity_iterations: u32,
}

/// Sequential impulse solver. Each pass repeatedly fixes the worst contact and propagates the
/// resulting body changes to the cached state of every contact sharing a body with it.
#[derive(Clone, Debug, PartialEq)]
pub struct ContactResolver {
    pub position_iterations: u32,
    pub velocity_iterations: u32,
    pub position_epsilon: f32,
    pub velocity_epsilon: f32,
    pub angular_limit: f32,
    pub restitution_velocity_limit: f32,
}

impl ContactResolver {
    /// Resolver for a step that generated `contact_count` contacts. Zero iteration counts in
    /// the config scale to three times the contact count.
    pub fn new(config: &ResolverConfig, contact_count: usize) -> Self {
        let auto = u32::try_from(contact_count.saturating_mul(3)).unwrap_or(u32::MAX);
        let iterations = |configured: u32| if configured == 0 { auto } else { configured };
        Self {
            position_iterations: iterations(config.position_iterations),
            velocity_iterations: iterations(config.velocity_iterations),
            position_epsilon: config.position_epsilon,
            velocity_epsilon: config.velocity_epsilon,
            angular_limit: config.angular_limit,
            restitution_velocity_limit: config.restitution_velocity_limit,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.position_iterations > 0
            && self.velocity_iterations > 0
            && self.position_epsilon > 0.0
            && self.velocity_epsilon > 0.0
    }

    fn validate(&self) -> Result<(), PhysicsError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(PhysicsError::InvalidResolver {
                position_iterations: self.position_iterations,
                velocity_iterations: self.velocity_iterations,
                position_epsilon: self.position_epsilon,
                velocity_epsilon: self.velocity_epsilon,
            })
        }
    }

    /// Resolves interpenetration, then velocity, for one batch of contacts. An invalid
    /// resolver leaves everything untouched.
    pub fn resolve(
        &self,
        contacts: &mut [Contact],
        bodies: &mut BodyArena,
        dt: f32,
    ) -> Result<ResolveStats, PhysicsError> {
        self.validate()?;
        if contacts.is_empty() {
            return Ok(ResolveStats::default());
        }

        self.prepare_contacts(contacts, bodies, dt);
        let position_iterations = self.adjust_positions(contacts, bodies);
        let velocity_iterations = self.adjust_velocities(contacts, bodies, dt);
        Ok(ResolveStats {
            position_iterations,
            velocity_iterations,
        })
    }

    fn prepare_contacts(&self, contacts: &mut [Contact], bodies: &mut BodyArena, dt: f32) {
        for contact in contacts.iter() {
            contact.match_awake_state(bodies);
        }
        for contact in contacts.iter_mut() {
            contact.calculate_internals(bodies, dt, self.restitution_velocity_limit);
        }
    }

    /// Index of the active contact with the largest `key` above `epsilon`.
    fn worst(
        contacts: &[Contact],
        bodies: &BodyArena,
        epsilon: f32,
        key: impl Fn(&Contact) -> f32,
    ) -> Option<usize> {
        let mut worst = None;
        let mut max = epsilon;
        for (index, contact) in contacts.iter().enumerate() {
            let value = key(contact);
            if value > max && contact.is_active(bodies) {
                max = value;
                worst = Some(index);
            }
        }
        worst
    }

    fn adjust_positions(&self, contacts: &mut [Contact], bodies: &mut BodyArena) -> u32 {
        let mut iterations_used = 0;
        while iterations_used < self.position_iterations {
            let Some(index) =
                Self::worst(contacts, bodies, self.position_epsilon, |c| c.penetration)
            else {
                break;
            };

            contacts[index].match_awake_state(bodies);
            let changes = contacts[index].resolve_interpenetration(bodies, self.angular_limit);
            let resolved = contacts[index].bodies;
            for (handle, change) in resolved.iter().zip(&changes) {
                if let Some(body) = handle.and_then(|handle| bodies.get_mut(handle)) {
                    body.force_translate(change.linear);
                    body.force_rotate(change.angular);
                }
            }

            for contact in contacts.iter_mut() {
                for b in 0..2 {
                    let Some(handle) = contact.bodies[b] else {
                        continue;
                    };
                    for d in 0..2 {
                        if resolved[d] != Some(handle) {
                            continue;
                        }
                        let delta = changes[d].linear
                            + changes[d].angular.cross(contact.relative_position[b]);
                        let sign = if b == 1 { 1.0 } else { -1.0 };
                        contact.penetration += delta.dot(contact.normal) * sign;
                    }
                }
            }
            iterations_used += 1;
        }
        iterations_used
    }

    fn adjust_velocities(&self, contacts: &mut [Contact], bodies: &mut BodyArena, dt: f32) -> u32 {
        let mut iterations_used = 0;
        while iterations_used < self.velocity_iterations {
            let Some(index) = Self::worst(contacts, bodies, self.velocity_epsilon, |c| {
                c.desired_delta_velocity()
            }) else {
                break;
            };

            contacts[index].match_awake_state(bodies);
            let changes = contacts[index].resolve_impulse(bodies);
            let resolved = contacts[index].bodies;
            for (handle, change) in resolved.iter().zip(&changes) {
                if let Some(body) = handle.and_then(|handle| bodies.get_mut(handle)) {
                    body.force_add_velocity(change.linear, change.angular);
                }
            }

            for contact in contacts.iter_mut() {
                let mut touched = false;
                for b in 0..2 {
                    let Some(handle) = contact.bodies[b] else {
                        continue;
                    };
                    for d in 0..2 {
                        if resolved[d] != Some(handle) {
                            continue;
                        }
                        let delta = changes[d].linear
                            + changes[d].angular.cross(contact.relative_position[b]);
                        let sign = if b == 1 { -1.0 } else { 1.0 };
                        contact.contact_velocity +=
                            contact.contact_to_world.transpose() * delta * sign;
                        touched = true;
                    }
                }
                if touched {
                    contact.calculate_desired_delta_velocity(
                        bodies,
                        dt,
                        self.restitution_velocity_limit,
                    );
                }
            }
            iterations_used += 1;
        }
        iterations_used
    }
}
