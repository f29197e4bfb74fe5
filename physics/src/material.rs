use serde::{Deserialize, Serialize};

/// How two material coefficients combine. When two materials disagree the later variant wins.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CombineRule {
    #[default]
    Average,
    GeometricAverage,
    Pythagorean,
    Min,
    Max,
    Multiply,
}

impl CombineRule {
    pub fn apply(self, a: f32, b: f32) -> f32 {
        match self {
            CombineRule::Average => (a + b) * 0.5,
            CombineRule::GeometricAverage => (a * b).max(0.0).sqrt(),
            CombineRule::Pythagorean => ((a * a + b * b) * 0.5).sqrt(),
            CombineRule::Min => a.min(b),
            CombineRule::Max => a.max(b),
            CombineRule::Multiply => a * b,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub restitution: f32,
    pub static_friction: f32,
    pub dynamic_friction: f32,
    pub combine: CombineRule,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            restitution: 0.5,
            static_friction: 0.5,
            dynamic_friction: 0.5,
            combine: CombineRule::Average,
        }
    }
}

/// Coefficients for one contact, after combining both sides' materials.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CombinedMaterial {
    pub restitution: f32,
    pub static_friction: f32,
    pub dynamic_friction: f32,
}

impl Material {
    pub fn frictionless(restitution: f32) -> Self {
        Self {
            restitution,
            static_friction: 0.0,
            dynamic_friction: 0.0,
            combine: CombineRule::Average,
        }
    }

    pub fn combine(a: &Material, b: &Material) -> CombinedMaterial {
        let rule = a.combine.max(b.combine);
        CombinedMaterial {
            restitution: rule.apply(a.restitution, b.restitution),
            static_friction: rule.apply(a.static_friction, b.static_friction),
            dynamic_friction: rule.apply(a.dynamic_friction, b.dynamic_friction),
        }
    }
}

impl From<Material> for CombinedMaterial {
    fn from(material: Material) -> Self {
        Self {
            restitution: material.restitution,
            static_friction: material.static_friction,
            dynamic_friction: material.dynamic_friction,
        }
    }
}
