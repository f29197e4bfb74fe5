use crate::{
    body::{BodyArena, BodyHandle},
    bounds::Bounds,
    config::BroadphaseConfig,
};
use glam::Vec3;

/// Unordered pair of bodies; `a` is always the lower handle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollisionPair {
    pub a: BodyHandle,
    pub b: BodyHandle,
}

impl CollisionPair {
    pub fn new(a: BodyHandle, b: BodyHandle) -> Self {
        if a <= b {
            Self { a, b }
        } else {
            Self { a: b, b: a }
        }
    }
}

/// Uniform grid hashed into a fixed number of buckets. A body is stored in the bucket of every
/// cell its bounds touch.
#[derive(Debug)]
pub struct SpatialHash {
    inv_cell_size: f32,
    world_extent: f32,
    buckets: Vec<Vec<BodyHandle>>,
}

impl SpatialHash {
    pub fn new(config: &BroadphaseConfig) -> Self {
        Self {
            inv_cell_size: config.cell_size.recip(),
            world_extent: config.world_extent,
            buckets: vec![Vec::new(); config.bucket_count.max(1) as usize],
        }
    }

    pub fn bucket_count(&self) -> u32 {
        self.buckets.len() as u32
    }

    fn cell_coord(&self, value: f32) -> u32 {
        // `as` saturates, so anything beyond the world extent lands in the edge cells
        ((value + self.world_extent) * self.inv_cell_size).floor().max(0.0) as u32
    }

    fn cell(&self, point: Vec3) -> [u32; 3] {
        [
            self.cell_coord(point.x),
            self.cell_coord(point.y),
            self.cell_coord(point.z),
        ]
    }

    fn bucket(&self, [x, y, z]: [u32; 3]) -> u32 {
        let hash = x.wrapping_mul(73_856_093)
            ^ y.wrapping_mul(19_349_663)
            ^ z.wrapping_mul(83_492_791);
        hash % self.bucket_count()
    }

    /// Sorted, deduplicated buckets touched by `bounds`.
    pub fn buckets_for(&self, bounds: &Bounds) -> Vec<u32> {
        let min = self.cell(bounds.mins);
        let max = self.cell(bounds.maxs);
        let span = |i: usize| u64::from(max[i] - min[i]) + 1;
        let cell_count = span(0).saturating_mul(span(1)).saturating_mul(span(2));
        if cell_count >= u64::from(self.bucket_count()) {
            return (0..self.bucket_count()).collect();
        }

        let mut buckets = Vec::with_capacity(cell_count as usize);
        for x in min[0]..=max[0] {
            for y in min[1]..=max[1] {
                for z in min[2]..=max[2] {
                    buckets.push(self.bucket([x, y, z]));
                }
            }
        }
        buckets.sort_unstable();
        buckets.dedup();
        buckets
    }

    pub fn insert(&mut self, handle: BodyHandle, buckets: &[u32]) {
        for &bucket in buckets {
            self.buckets[bucket as usize].push(handle);
        }
    }

    pub fn remove(&mut self, handle: BodyHandle, buckets: &[u32]) {
        for &bucket in buckets {
            let entries = &mut self.buckets[bucket as usize];
            if let Some(index) = entries.iter().position(|h| *h == handle) {
                entries.swap_remove(index);
            }
        }
    }

    /// Moves a body from `old` buckets to those of `bounds`, returning the new bucket list.
    /// Bodies without bounds are removed.
    pub fn rehash(&mut self, handle: BodyHandle, old: &[u32], bounds: Option<&Bounds>) -> Vec<u32> {
        let new = bounds.map_or_else(Vec::new, |bounds| self.buckets_for(bounds));
        if new != old {
            self.remove(handle, old);
            self.insert(handle, &new);
        }
        new
    }

    /// Pairs sharing a bucket whose bounds overlap and that have at least one awake body.
    pub fn candidate_pairs(&self, bodies: &BodyArena) -> Vec<CollisionPair> {
        let mut pairs = Vec::new();
        for bucket in &self.buckets {
            for (i, &a) in bucket.iter().enumerate() {
                for &b in &bucket[i + 1..] {
                    if a != b {
                        pairs.push(CollisionPair::new(a, b));
                    }
                }
            }
        }
        pairs.sort_unstable();
        pairs.dedup();

        pairs.retain(|pair| {
            let (Some(a), Some(b)) = (bodies.get(pair.a), bodies.get(pair.b)) else {
                return false;
            };
            if !a.is_awake() && !b.is_awake() {
                return false;
            }
            match (a.aabb(), b.aabb()) {
                (Some(bounds_a), Some(bounds_b)) => bounds_a.intersects(&bounds_b),
                _ => false,
            }
        });
        pairs
    }
}
