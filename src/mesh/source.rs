//! Source meshes referenced by raycast hits

use std::sync::Arc;

use crate::core::types::Vec3;

/// Identity of a source mesh, stable for the life of the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u32);

/// Triangle mesh in local space, as owned by the scene.
#[derive(Debug)]
pub struct SourceMesh {
    id: MeshId,
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
}

impl SourceMesh {
    pub fn new(id: MeshId, vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self { id, vertices, indices }
    }

    /// Convenience for sharing one mesh between scene objects
    pub fn shared(id: MeshId, vertices: Vec<Vec3>, indices: Vec<u32>) -> Arc<Self> {
        Arc::new(Self::new(id, vertices, indices))
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of whole triangles in the index array
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Local-space corners of triangle `index`, if every index resolves
    pub fn triangle(&self, index: usize) -> Option<[Vec3; 3]> {
        let base = index.checked_mul(3)?;
        let tri = self.indices.get(base..base + 3)?;
        Some([
            *self.vertices.get(tri[0] as usize)?,
            *self.vertices.get(tri[1] as usize)?,
            *self.vertices.get(tri[2] as usize)?,
        ])
    }
}

/// Box mesh centered on the origin (12 triangles)
pub fn box_mesh(id: MeshId, half_extent: Vec3) -> Arc<SourceMesh> {
    let h = half_extent;
    let vertices = vec![
        Vec3::new(-h.x, -h.y, -h.z),
        Vec3::new(h.x, -h.y, -h.z),
        Vec3::new(h.x, h.y, -h.z),
        Vec3::new(-h.x, h.y, -h.z),
        Vec3::new(-h.x, -h.y, h.z),
        Vec3::new(h.x, -h.y, h.z),
        Vec3::new(h.x, h.y, h.z),
        Vec3::new(-h.x, h.y, h.z),
    ];
    let indices = vec![
        0, 2, 1, 0, 3, 2, // -z
        4, 5, 6, 4, 6, 7, // +z
        0, 1, 5, 0, 5, 4, // -y
        3, 7, 6, 3, 6, 2, // +y
        0, 4, 7, 0, 7, 3, // -x
        1, 2, 6, 1, 6, 5, // +x
    ];
    SourceMesh::shared(id, vertices, indices)
}

/// Flat grid in the XZ plane centered on the origin, `cells` x `cells` quads
pub fn grid_mesh(id: MeshId, size: f32, cells: u32) -> Arc<SourceMesh> {
    let cells = cells.max(1);
    let step = size / cells as f32;
    let half = size * 0.5;
    let row = cells + 1;

    let mut vertices = Vec::with_capacity((row * row) as usize);
    for z in 0..row {
        for x in 0..row {
            vertices.push(Vec3::new(x as f32 * step - half, 0.0, z as f32 * step - half));
        }
    }

    let mut indices = Vec::with_capacity((cells * cells * 6) as usize);
    for z in 0..cells {
        for x in 0..cells {
            let i = z * row + x;
            indices.extend_from_slice(&[i, i + row, i + 1, i + 1, i + row, i + row + 1]);
        }
    }

    SourceMesh::shared(id, vertices, indices)
}
