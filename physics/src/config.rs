use crate::error::PhysicsError;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadphaseConfig {
    /// Edge length of a spatial hash cell.
    pub cell_size: f32,
    pub bucket_count: u32,
    /// Offset added to coordinates so cell indices are never negative.
    pub world_extent: f32,
}

impl Default for BroadphaseConfig {
    fn default() -> Self {
        Self {
            cell_size: 2.0,
            bucket_count: 1024,
            world_extent: 1000.0,
        }
    }
}

/// Iteration budgets and convergence thresholds for the two resolver passes. An iteration count
/// of zero means three times the number of contacts generated in the step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub position_iterations: u32,
    pub velocity_iterations: u32,
    pub position_epsilon: f32,
    pub velocity_epsilon: f32,
    /// Largest rotation, as a fraction of the lever arm, a single penetration fix may apply.
    pub angular_limit: f32,
    /// Closing speeds below this are resolved without restitution.
    pub restitution_velocity_limit: f32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            position_iterations: 0,
            velocity_iterations: 0,
            position_epsilon: 0.01,
            velocity_epsilon: 0.01,
            angular_limit: 0.2,
            restitution_velocity_limit: 0.25,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepConfig {
    pub motion_epsilon: f32,
    /// Largest linear displacement per step that still counts as resting.
    pub linear_epsilon: f32,
    /// Largest angular displacement per step that still counts as resting.
    pub angular_epsilon: f32,
    pub frames_before_sleep: u32,
    /// Weight given to the previous motion estimate after one second.
    pub motion_bias: f32,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            motion_epsilon: 0.3,
            linear_epsilon: 0.01,
            angular_epsilon: 0.01,
            frames_before_sleep: 30,
            motion_bias: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub fixed_timestep: f32,
    pub max_substeps: u32,
    pub gravity: Vec3,
    /// Contacts generated beyond this in one step are dropped.
    pub max_contacts: usize,
    pub broadphase: BroadphaseConfig,
    pub resolver: ResolverConfig,
    pub sleep: SleepConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 4,
            gravity: Vec3::new(0.0, -10.0, 0.0),
            max_contacts: 2048,
            broadphase: BroadphaseConfig::default(),
            resolver: ResolverConfig::default(),
            sleep: SleepConfig::default(),
        }
    }
}

fn positive(name: &str, value: f32) -> Result<(), PhysicsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PhysicsError::InvalidConfig(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

fn non_negative(name: &str, value: f32) -> Result<(), PhysicsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PhysicsError::InvalidConfig(format!(
            "{name} must not be negative, got {value}"
        )))
    }
}

impl WorldConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PhysicsError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: WorldConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, PhysicsError> {
        let config: WorldConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every setting except the resolver iteration budgets and epsilons, which are
    /// re-checked each time contacts are resolved.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        positive("fixed_timestep", self.fixed_timestep)?;
        if self.max_substeps == 0 {
            return Err(PhysicsError::InvalidConfig(
                "max_substeps must be at least 1".to_string(),
            ));
        }
        if !self.gravity.is_finite() {
            return Err(PhysicsError::InvalidConfig(
                "gravity must be finite".to_string(),
            ));
        }

        positive("broadphase.cell_size", self.broadphase.cell_size)?;
        positive("broadphase.world_extent", self.broadphase.world_extent)?;
        if self.broadphase.bucket_count == 0 {
            return Err(PhysicsError::InvalidConfig(
                "broadphase.bucket_count must be at least 1".to_string(),
            ));
        }

        positive("resolver.angular_limit", self.resolver.angular_limit)?;
        non_negative(
            "resolver.restitution_velocity_limit",
            self.resolver.restitution_velocity_limit,
        )?;

        non_negative("sleep.motion_epsilon", self.sleep.motion_epsilon)?;
        non_negative("sleep.linear_epsilon", self.sleep.linear_epsilon)?;
        non_negative("sleep.angular_epsilon", self.sleep.angular_epsilon)?;
        if !(self.sleep.motion_bias > 0.0 && self.sleep.motion_bias < 1.0) {
            return Err(PhysicsError::InvalidConfig(format!(
                "sleep.motion_bias must be in (0, 1), got {}",
                self.sleep.motion_bias
            )));
        }
        Ok(())
    }
}
