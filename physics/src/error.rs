use crate::body::BodyHandle;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("unknown body {0:?}")]
    UnknownBody(BodyHandle),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error(
        "invalid resolver: position_iterations={position_iterations} \
         velocity_iterations={velocity_iterations} position_epsilon={position_epsilon} \
         velocity_epsilon={velocity_epsilon}"
    )]
    InvalidResolver {
        position_iterations: u32,
        velocity_iterations: u32,
        position_epsilon: f32,
        velocity_epsilon: f32,
    },
    #[error("invalid mass {0}")]
    InvalidMass(f32),
    #[error("invalid damping {0}")]
    InvalidDamping(f32),
    #[error("non-finite {0}")]
    NonFinite(&'static str),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
