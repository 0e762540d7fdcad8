//! Geometric primitives shared by the sampler and the built-in scene

pub mod aabb;
pub mod ray;

pub use aabb::Aabb;
pub use ray::{Ray, TriangleHit};
