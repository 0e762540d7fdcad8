//! Point cloud visualization

pub mod view;
pub mod gpu;

pub use view::{PointCloudView, PointParams, PointSurface, SurfaceHandle, SyncOutcome};
pub use gpu::GpuPointSurface;
