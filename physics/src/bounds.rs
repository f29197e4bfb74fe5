use glam::{Quat, Vec3};
use std::ops::{Add, AddAssign};

/// Axis aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    pub mins: Vec3,
    pub maxs: Vec3,
}

impl Bounds {
    /// An empty (inverted) box that any point expands.
    pub fn new() -> Bounds {
        Bounds {
            mins: Vec3::splat(f32::MAX),
            maxs: Vec3::splat(-f32::MAX),
        }
    }

    pub fn from_points(pts: &[Vec3]) -> Self {
        pts.iter().fold(Bounds::new(), |acc, pt| acc + *pt)
    }

    pub fn from_half_extents(centre: Vec3, half_extents: Vec3) -> Self {
        Bounds {
            mins: centre - half_extents,
            maxs: centre + half_extents,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.maxs.cmplt(self.mins).any()
    }

    pub fn intersects(&self, rhs: &Self) -> bool {
        !(self.maxs.cmplt(rhs.mins).any() || rhs.maxs.cmplt(self.mins).any())
    }

    pub fn contains_point(&self, pt: Vec3) -> bool {
        pt.cmpge(self.mins).all() && pt.cmple(self.maxs).all()
    }

    pub fn expand_by_point(&mut self, pt: Vec3) {
        self.add_assign(pt);
    }

    pub fn expand_by_bounds(&mut self, rhs: &Self) {
        self.expand_by_point(rhs.mins);
        self.expand_by_point(rhs.maxs);
    }

    pub fn width(&self) -> Vec3 {
        self.maxs - self.mins
    }

    pub fn centre(&self) -> Vec3 {
        (self.mins + self.maxs) * 0.5
    }

    pub fn corners(&self) -> [Vec3; 8] {
        [
            Vec3::new(self.mins.x, self.mins.y, self.mins.z),
            Vec3::new(self.mins.x, self.mins.y, self.maxs.z),
            Vec3::new(self.mins.x, self.maxs.y, self.mins.z),
            Vec3::new(self.maxs.x, self.mins.y, self.mins.z),
            Vec3::new(self.maxs.x, self.maxs.y, self.maxs.z),
            Vec3::new(self.maxs.x, self.maxs.y, self.mins.z),
            Vec3::new(self.maxs.x, self.mins.y, self.maxs.z),
            Vec3::new(self.mins.x, self.maxs.y, self.maxs.z),
        ]
    }

    /// Bounds of this (local space) box after rotating by `orientation` and moving to `position`.
    pub fn transformed(&self, position: Vec3, orientation: Quat) -> Bounds {
        let mut bounds = Bounds::new();
        for pt in &self.corners() {
            bounds.expand_by_point((orientation * *pt) + position);
        }
        bounds
    }
}

impl Default for Bounds {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Add<Vec3> for Bounds {
    type Output = Self;
    fn add(self, pt: Vec3) -> Self::Output {
        Bounds {
            mins: self.mins.min(pt),
            maxs: self.maxs.max(pt),
        }
    }
}

impl AddAssign<Vec3> for Bounds {
    fn add_assign(&mut self, pt: Vec3) {
        self.mins = self.mins.min(pt);
        self.maxs = self.maxs.max(pt);
    }
}
