//! Point history and the bounded render ring

pub mod ring;
pub mod store;

pub use ring::PointRing;
pub use store::PointStore;
