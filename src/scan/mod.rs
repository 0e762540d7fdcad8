//! Scene sampling: points, raycast collaborator, color frame and the sampler

pub mod point;
pub mod scene;
pub mod color_frame;
pub mod sampler;

pub use point::{GpuPoint, PackedColor, Point};
pub use scene::{LodSurface, ObjectId, RayHit, RaycastScene, ScanExclusions, SceneObject, TriangleScene};
pub use color_frame::ColorFrame;
pub use sampler::{GeometrySampler, ScanBatch, ScanTrigger, TriangleRef};
