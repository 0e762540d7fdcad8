//! Source meshes and the explored-surface mesh built from scan hits

pub mod source;
pub mod seen;
pub mod collision;

pub use source::{MeshId, SourceMesh};
pub use seen::{AddTriangle, SeenMesh, SeenMeshBuilder};
pub use collision::{BakeThrottle, CollisionShape};
