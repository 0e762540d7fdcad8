//! Raycast collaborator: scene objects and hit resolution
//!
//! The sampler only sees the [`RaycastScene`] trait. [`TriangleScene`] is a
//! brute-force implementation for headless runs and tests; a physics engine
//! would implement the trait against its own colliders.

use std::collections::HashSet;
use std::sync::Arc;

use crate::core::types::{Mat4, Vec3};
use crate::math::{Aabb, Ray};
use crate::mesh::source::SourceMesh;

/// Identity of a scene object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId(pub u32);

/// One level-of-detail 0 sub-surface of a scene object
#[derive(Clone, Debug)]
pub struct LodSurface {
    pub mesh: Arc<SourceMesh>,
    pub transform: Mat4,
    /// World-space bounds of the transformed mesh
    pub bounds: Aabb,
}

impl LodSurface {
    pub fn new(mesh: Arc<SourceMesh>, transform: Mat4) -> Self {
        let bounds = world_bounds(&mesh, &transform);
        Self { mesh, transform, bounds }
    }
}

/// A hittable object
#[derive(Clone, Debug)]
pub struct SceneObject {
    pub id: ObjectId,
    pub name: String,
    pub tag: Option<String>,
    /// Local-to-world transform of `mesh`
    pub transform: Mat4,
    /// The object's own geometry
    pub mesh: Option<Arc<SourceMesh>>,
    /// LOD-0 sub-surfaces, empty when the object has no LOD group
    pub lod0: Vec<LodSurface>,
}

impl SceneObject {
    pub fn new(id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            tag: None,
            transform: Mat4::IDENTITY,
            mesh: None,
            lod0: Vec::new(),
        }
    }

    pub fn with_mesh(mut self, mesh: Arc<SourceMesh>, transform: Mat4) -> Self {
        self.mesh = Some(mesh);
        self.transform = transform;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_lod_surface(mut self, surface: LodSurface) -> Self {
        self.lod0.push(surface);
        self
    }
}

/// Result of a successful raycast
#[derive(Clone, Copy, Debug)]
pub struct RayHit<'a> {
    pub point: Vec3,
    pub distance: f32,
    pub object: &'a SceneObject,
    /// Triangle within the hit collider, -1 when unknown
    pub triangle_index: i32,
}

/// Physics collaborator consumed by the sampler
pub trait RaycastScene {
    /// Nearest hit along `ray` within `max_distance`
    fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<RayHit<'_>>;
}

/// Objects and tags the sampler must never record
#[derive(Clone, Debug, Default)]
pub struct ScanExclusions {
    objects: HashSet<ObjectId>,
    tags: HashSet<String>,
}

impl ScanExclusions {
    pub fn exclude_object(&mut self, id: ObjectId) {
        self.objects.insert(id);
    }

    pub fn exclude_tag(&mut self, tag: impl Into<String>) {
        self.tags.insert(tag.into());
    }

    pub fn is_excluded(&self, object: &SceneObject) -> bool {
        self.objects.contains(&object.id)
            || object.tag.as_ref().is_some_and(|tag| self.tags.contains(tag))
    }
}

struct Collider {
    bounds: Aabb,
    /// World-space corners, three per triangle
    triangles: Vec<[Vec3; 3]>,
}

struct Entry {
    object: SceneObject,
    colliders: Vec<Collider>,
}

/// Brute-force triangle scene: AABB rejection then per-triangle tests
#[derive(Default)]
pub struct TriangleScene {
    entries: Vec<Entry>,
}

impl TriangleScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object. Its own mesh is the collider; without one, each LOD-0
    /// surface collides separately and reports triangles of that surface.
    pub fn add(&mut self, object: SceneObject) {
        let colliders = match &object.mesh {
            Some(mesh) => vec![Collider::new(mesh, &object.transform)],
            None => object
                .lod0
                .iter()
                .map(|surface| Collider::new(&surface.mesh, &surface.transform))
                .collect(),
        };
        self.entries.push(Entry { object, colliders });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Collider {
    fn new(mesh: &SourceMesh, transform: &Mat4) -> Self {
        let triangles: Vec<[Vec3; 3]> = (0..mesh.triangle_count())
            .map(|i| match mesh.triangle(i) {
                Some(tri) => tri.map(|v| transform.transform_point3(v)),
                // Keep indices aligned with the source mesh; degenerate never hits
                None => [Vec3::ZERO; 3],
            })
            .collect();
        let bounds = Aabb::from_points(triangles.iter().flatten().copied()).unwrap_or_default();
        Self { bounds, triangles }
    }
}

impl RaycastScene for TriangleScene {
    fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<RayHit<'_>> {
        let mut best: Option<RayHit<'_>> = None;

        for entry in &self.entries {
            for collider in &entry.colliders {
                let limit = best.map_or(max_distance, |hit| hit.distance);
                match ray.intersects_aabb(&collider.bounds) {
                    Some((t_near, _)) if t_near <= limit => {}
                    _ => continue,
                }

                for (index, [a, b, c]) in collider.triangles.iter().enumerate() {
                    let limit = best.map_or(max_distance, |hit| hit.distance);
                    if let Some(hit) = ray.intersect_triangle(*a, *b, *c, limit) {
                        best = Some(RayHit {
                            point: ray.at(hit.t),
                            distance: hit.t,
                            object: &entry.object,
                            triangle_index: i32::try_from(index).unwrap_or(-1),
                        });
                    }
                }
            }
        }

        best
    }
}

/// World-space bounds of a transformed mesh
pub fn world_bounds(mesh: &SourceMesh, transform: &Mat4) -> Aabb {
    Aabb::from_points(mesh.vertices().iter().map(|v| transform.transform_point3(*v)))
        .unwrap_or_default()
}
