//! Scancloud - incremental scan, point-cloud streaming and explored-surface engine

pub mod core;
pub mod math;
pub mod scan;
pub mod cloud;
pub mod mesh;
pub mod persist;
pub mod render;
pub mod scanner;

pub use scanner::{FrameInputs, Scanner, TickReport};
