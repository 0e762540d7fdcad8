//! Collision shape baked from the explored-surface mesh
//!
//! Baking is far costlier than a geometry refresh, so the builder throttles
//! it; the shape may lag the render mesh by up to one bake interval.

use crate::core::types::Vec3;
use crate::math::Aabb;

use super::seen::SeenMesh;

/// Triangle soup used for collision queries
#[derive(Debug, Default)]
pub struct CollisionShape {
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
    bounds: Option<Aabb>,
    bake_count: u64,
}

impl CollisionShape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the current shape
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.bounds = None;
    }

    /// Bake from the mesh's current geometry
    pub fn assign(&mut self, mesh: &SeenMesh) {
        self.vertices.extend_from_slice(mesh.vertices());
        self.indices.extend_from_slice(mesh.indices());
        self.bounds = Aabb::from_points(self.vertices.iter().copied());
        self.bake_count += 1;
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Number of bakes so far
    pub fn bake_count(&self) -> u64 {
        self.bake_count
    }
}

/// Rate limiter for collision bakes, driven by simulated time
#[derive(Debug)]
pub struct BakeThrottle {
    interval: f64,
    elapsed: f64,
    last_bake: Option<f64>,
    dirty: bool,
}

impl BakeThrottle {
    pub fn new(interval: f32) -> Self {
        Self {
            interval: interval.max(0.0) as f64,
            elapsed: 0.0,
            last_bake: None,
            dirty: false,
        }
    }

    pub fn set_interval(&mut self, interval: f32) {
        self.interval = interval.max(0.0) as f64;
    }

    pub fn advance(&mut self, dt: f32) {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt as f64;
        }
    }

    /// Note that the source geometry changed
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// True (and resets) when dirty and the interval has elapsed since the last bake
    pub fn take_due(&mut self) -> bool {
        let ready = self
            .last_bake
            .is_none_or(|last| self.elapsed - last >= self.interval);
        if self.dirty && ready {
            self.dirty = false;
            self.last_bake = Some(self.elapsed);
            true
        } else {
            false
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_first_bake_is_immediate() {
        let mut throttle = BakeThrottle::new(1.0);
        assert!(!throttle.take_due());
        throttle.mark_dirty();
        assert!(throttle.take_due());
        assert!(!throttle.is_dirty());
    }

    #[test]
    fn test_throttle_waits_for_interval() {
        let mut throttle = BakeThrottle::new(1.0);
        throttle.mark_dirty();
        assert!(throttle.take_due());

        throttle.mark_dirty();
        throttle.advance(0.4);
        assert!(!throttle.take_due());
        throttle.advance(0.6);
        assert!(throttle.take_due());
    }

    #[test]
    fn test_zero_interval_bakes_every_change() {
        let mut throttle = BakeThrottle::new(0.0);
        for _ in 0..3 {
            throttle.mark_dirty();
            assert!(throttle.take_due());
        }
    }
}
