//! Rigid body simulation: spatial hash broad phase, shape pair contact generation and a
//! sequential impulse contact resolver, advanced in fixed steps by [`World`].

pub mod batch;
pub mod body;
pub mod bounds;
mod broadphase;
pub mod collider;
pub mod config;
pub mod contact;
pub mod error;
pub mod gjk;
pub mod intersect;
pub mod material;
mod math;
pub mod resolver;
pub mod shapes;
pub mod time_accumulator;
pub mod world;

pub use body::{BodyHandle, RigidBody};
pub use broadphase::CollisionPair;
pub use collider::Collider;
pub use config::WorldConfig;
pub use error::PhysicsError;
pub use material::{CombineRule, Material};
pub use shapes::Shape;
pub use world::{StepStats, World};
