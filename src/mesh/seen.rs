//! Explored-surface mesh builder
//!
//! Grows a standalone mesh from every distinct source triangle the sampler
//! hits. Triangles never share vertices: positions from different source
//! meshes cannot be assumed to coincide, so each added triangle contributes
//! three fresh vertices and three sequential indices.

use std::collections::{HashMap, HashSet};

use crate::core::types::{Mat4, Vec3};

use super::collision::{BakeThrottle, CollisionShape};
use super::source::{MeshId, SourceMesh};

/// Outcome of [`SeenMeshBuilder::add_triangle`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddTriangle {
    /// New triangle appended
    Added,
    /// Hit carried no triangle index (-1)
    NoTriangle,
    /// Triangle already incorporated
    AlreadySeen,
    /// Index out of range for the source mesh
    Rejected,
}

/// Accumulated explored-surface geometry.
///
/// Invariant: `indices.len() == vertices.len() == 3 * triangle_count()`.
#[derive(Debug, Default)]
pub struct SeenMesh {
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
    /// Per-vertex flat normals; empty while the mesh is hidden
    normals: Vec<Vec3>,
    revision: u64,
}

impl SeenMesh {
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Bumped on every geometry rebuild
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Refresh geometry; normals are (re)computed only when `with_normals`
    fn rebuild(&mut self, with_normals: bool) {
        if with_normals {
            // Only triangles added since the last refresh lack normals
            let done = self.normals.len() / 3;
            for tri in self.vertices[done * 3..].chunks_exact(3) {
                let normal = (tri[1] - tri[0]).cross(tri[2] - tri[0]).normalize_or_zero();
                self.normals.extend_from_slice(&[normal; 3]);
            }
        } else {
            self.normals.clear();
        }
        self.revision += 1;
    }
}

/// Source triangle data read once per distinct mesh
struct CachedMesh {
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
}

impl CachedMesh {
    fn from_source(source: &SourceMesh) -> Self {
        Self {
            vertices: source.vertices().to_vec(),
            indices: source.indices().to_vec(),
        }
    }
}

/// Deduplicates hit triangles and grows the explored-surface mesh plus its collision shape
pub struct SeenMeshBuilder {
    seen: HashSet<(MeshId, u32)>,
    cache: HashMap<MeshId, CachedMesh>,
    mesh: SeenMesh,
    collision: CollisionShape,
    throttle: BakeThrottle,
    visible: bool,
}

impl SeenMeshBuilder {
    pub fn new(collision_interval: f32) -> Self {
        Self {
            seen: HashSet::new(),
            cache: HashMap::new(),
            mesh: SeenMesh::default(),
            collision: CollisionShape::new(),
            throttle: BakeThrottle::new(collision_interval),
            visible: false,
        }
    }

    /// Incorporate one hit triangle of `source`, placed in the world by `transform`
    pub fn add_triangle(&mut self, source: &SourceMesh, triangle_index: i32, transform: &Mat4) -> AddTriangle {
        if triangle_index == -1 {
            return AddTriangle::NoTriangle;
        }
        let Ok(index) = u32::try_from(triangle_index) else {
            log::warn!("Rejected negative triangle index {} on mesh {:?}", triangle_index, source.id());
            return AddTriangle::Rejected;
        };

        let key = (source.id(), index);
        if self.seen.contains(&key) {
            return AddTriangle::AlreadySeen;
        }

        let cached = self
            .cache
            .entry(source.id())
            .or_insert_with(|| CachedMesh::from_source(source));

        let base = index as usize * 3;
        if base + 2 >= cached.indices.len() {
            log::warn!(
                "Rejected triangle {} on mesh {:?}: index array has {} entries",
                index,
                source.id(),
                cached.indices.len()
            );
            return AddTriangle::Rejected;
        }

        let mut corners = [Vec3::ZERO; 3];
        for (corner, &vi) in corners.iter_mut().zip(&cached.indices[base..base + 3]) {
            match cached.vertices.get(vi as usize) {
                Some(v) => *corner = transform.transform_point3(*v),
                None => {
                    log::warn!(
                        "Rejected triangle {} on mesh {:?}: vertex {} out of range",
                        index,
                        source.id(),
                        vi
                    );
                    return AddTriangle::Rejected;
                }
            }
        }

        let first = self.mesh.vertices.len() as u32;
        self.mesh.vertices.extend_from_slice(&corners);
        self.mesh.indices.extend_from_slice(&[first, first + 1, first + 2]);
        self.seen.insert(key);

        self.mesh.rebuild(self.visible);
        self.throttle.mark_dirty();
        self.bake_if_due();

        AddTriangle::Added
    }

    /// Advance the bake throttle and bake any pending change whose interval elapsed
    pub fn tick(&mut self, dt: f32) {
        self.throttle.advance(dt);
        self.bake_if_due();
    }

    fn bake_if_due(&mut self) {
        if self.throttle.take_due() {
            self.collision.clear();
            self.collision.assign(&self.mesh);
            log::debug!(
                "Collision shape baked: {} triangles",
                self.collision.triangle_count()
            );
        }
    }

    /// Show or hide the mesh; forces a geometry refresh so normals exist only while visible
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.mesh.rebuild(visible);
    }

    pub fn toggle_visible(&mut self) {
        self.set_visible(!self.visible);
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_collision_interval(&mut self, interval: f32) {
        self.throttle.set_interval(interval);
    }

    pub fn mesh(&self) -> &SeenMesh {
        &self.mesh
    }

    pub fn collision(&self) -> &CollisionShape {
        &self.collision
    }

    /// Distinct triangles incorporated so far
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn is_seen(&self, mesh: MeshId, triangle_index: u32) -> bool {
        self.seen.contains(&(mesh, triangle_index))
    }

    /// Distinct source meshes read so far
    pub fn cached_mesh_count(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::source::box_mesh;

    #[test]
    fn test_add_and_dedup() {
        let mut builder = SeenMeshBuilder::new(1.0);
        let mesh = box_mesh(MeshId(1), Vec3::ONE);

        assert_eq!(builder.add_triangle(&mesh, 0, &Mat4::IDENTITY), AddTriangle::Added);
        assert_eq!(builder.add_triangle(&mesh, 0, &Mat4::IDENTITY), AddTriangle::AlreadySeen);
        assert_eq!(builder.add_triangle(&mesh, 5, &Mat4::IDENTITY), AddTriangle::Added);

        let seen = builder.mesh();
        assert_eq!(seen.vertices().len(), 6);
        assert_eq!(seen.indices(), &[0, 1, 2, 3, 4, 5]);
        assert_eq!(builder.seen_count(), 2);
        assert!(builder.is_seen(MeshId(1), 5));
    }

    #[test]
    fn test_same_index_different_mesh_is_distinct() {
        let mut builder = SeenMeshBuilder::new(1.0);
        let a = box_mesh(MeshId(1), Vec3::ONE);
        let b = box_mesh(MeshId(2), Vec3::ONE);
        builder.add_triangle(&a, 3, &Mat4::IDENTITY);
        builder.add_triangle(&b, 3, &Mat4::IDENTITY);
        assert_eq!(builder.mesh().triangle_count(), 2);
        assert_eq!(builder.cached_mesh_count(), 2);
    }

    #[test]
    fn test_no_triangle_is_noop() {
        let mut builder = SeenMeshBuilder::new(1.0);
        let mesh = box_mesh(MeshId(1), Vec3::ONE);
        assert_eq!(builder.add_triangle(&mesh, -1, &Mat4::IDENTITY), AddTriangle::NoTriangle);
        assert!(builder.mesh().vertices().is_empty());
        assert!(builder.mesh().indices().is_empty());
        assert_eq!(builder.cached_mesh_count(), 0);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut builder = SeenMeshBuilder::new(1.0);
        let mesh = box_mesh(MeshId(1), Vec3::ONE);
        assert_eq!(builder.add_triangle(&mesh, 12, &Mat4::IDENTITY), AddTriangle::Rejected);
        assert_eq!(builder.add_triangle(&mesh, -7, &Mat4::IDENTITY), AddTriangle::Rejected);
        assert_eq!(builder.mesh().triangle_count(), 0);
        assert_eq!(builder.seen_count(), 0);
    }

    #[test]
    fn test_bad_vertex_reference_rejected() {
        let mut builder = SeenMeshBuilder::new(1.0);
        let mesh = SourceMesh::new(MeshId(4), vec![Vec3::ZERO, Vec3::X], vec![0, 1, 9]);
        assert_eq!(builder.add_triangle(&mesh, 0, &Mat4::IDENTITY), AddTriangle::Rejected);
        assert!(!builder.is_seen(MeshId(4), 0));
    }

    #[test]
    fn test_vertices_are_world_space() {
        let mut builder = SeenMeshBuilder::new(1.0);
        let mesh = SourceMesh::new(MeshId(3), vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2]);
        let transform = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
        builder.add_triangle(&mesh, 0, &transform);
        assert_eq!(
            builder.mesh().vertices(),
            &[Vec3::new(10.0, 0.0, 0.0), Vec3::new(11.0, 0.0, 0.0), Vec3::new(10.0, 1.0, 0.0)]
        );
    }

    #[test]
    fn test_normals_only_while_visible() {
        let mut builder = SeenMeshBuilder::new(1.0);
        let mesh = SourceMesh::new(MeshId(3), vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2]);
        builder.add_triangle(&mesh, 0, &Mat4::IDENTITY);
        assert!(builder.mesh().normals().is_empty());

        let before = builder.mesh().revision();
        builder.toggle_visible();
        assert!(builder.is_visible());
        assert!(builder.mesh().revision() > before);
        assert_eq!(builder.mesh().normals(), &[Vec3::Z; 3]);

        builder.set_visible(false);
        assert!(builder.mesh().normals().is_empty());
    }

    #[test]
    fn test_collision_bake_is_throttled() {
        let mut builder = SeenMeshBuilder::new(1.0);
        let mesh = box_mesh(MeshId(1), Vec3::ONE);

        builder.add_triangle(&mesh, 0, &Mat4::IDENTITY);
        assert_eq!(builder.collision().bake_count(), 1);
        assert_eq!(builder.collision().triangle_count(), 1);

        builder.add_triangle(&mesh, 1, &Mat4::IDENTITY);
        builder.add_triangle(&mesh, 2, &Mat4::IDENTITY);
        assert_eq!(builder.collision().bake_count(), 1);

        builder.tick(0.5);
        assert_eq!(builder.collision().bake_count(), 1);
        builder.tick(0.6);
        assert_eq!(builder.collision().bake_count(), 2);
        assert_eq!(builder.collision().triangle_count(), 3);

        // Nothing new, nothing to bake
        builder.tick(5.0);
        assert_eq!(builder.collision().bake_count(), 2);
    }
}
