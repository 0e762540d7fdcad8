//! Geometry sampler: randomized raycasts from the camera into the scene
//!
//! Each scan casts `rays_per_scan` rays through uniformly random viewport
//! coordinates. Misses are skipped without retry, so a scan yields at most
//! that many points. Every hit that is not excluded produces one [`Point`]
//! and, when the hit surface resolves to a mesh, one [`TriangleRef`] for the
//! explored-surface builder.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::camera::{Camera, CameraPose};
use crate::core::config::ScannerConfig;
use crate::core::types::{Mat4, Vec3};
use crate::mesh::source::SourceMesh;

use super::color_frame::ColorFrame;
use super::point::{PackedColor, Point};
use super::scene::{RayHit, RaycastScene, ScanExclusions};

/// A hit triangle forwarded to the mesh builder
#[derive(Clone, Debug)]
pub struct TriangleRef {
    pub mesh: Arc<SourceMesh>,
    /// Index into the mesh's triangle list, -1 when unknown
    pub triangle_index: i32,
    /// Local-to-world transform of `mesh`
    pub transform: Mat4,
    pub point: Vec3,
}

/// Output of one scan
#[derive(Clone, Debug)]
pub struct ScanBatch {
    pub pose: CameraPose,
    pub points: Vec<Point>,
    pub triangles: Vec<TriangleRef>,
    pub misses: u32,
    pub excluded: u32,
}

/// Decides whether the camera moved enough to warrant a new scan
#[derive(Clone, Debug)]
pub struct ScanTrigger {
    last: Option<CameraPose>,
    rotation_threshold: f32,
    translation_threshold: f32,
}

impl ScanTrigger {
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            last: None,
            rotation_threshold: config.rotation_threshold,
            translation_threshold: config.translation_threshold,
        }
    }

    pub fn set_thresholds(&mut self, rotation: f32, translation: f32) {
        self.rotation_threshold = rotation;
        self.translation_threshold = translation;
    }

    /// True when history is empty, the view turned far enough, or the camera moved far enough
    pub fn should_scan(&self, history_empty: bool, pose: &CameraPose) -> bool {
        let Some(last) = &self.last else {
            return true;
        };
        history_empty
            || pose.forward.dot(last.forward) <= self.rotation_threshold
            || (pose.position - last.position).length_squared() >= self.translation_threshold
    }

    /// Remember the pose of the scan that just ran
    pub fn record(&mut self, pose: CameraPose) {
        self.last = Some(pose);
    }

    pub fn last_pose(&self) -> Option<&CameraPose> {
        self.last.as_ref()
    }
}

/// Casts randomized rays and resolves hits into points
pub struct GeometrySampler {
    rng: StdRng,
    rays_per_scan: u32,
    max_distance: f32,
    color_capture: bool,
    exclusions: ScanExclusions,
}

impl GeometrySampler {
    pub fn new(config: &ScannerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            rays_per_scan: config.rays_per_scan,
            max_distance: config.max_distance,
            color_capture: config.color_capture,
            exclusions: ScanExclusions::default(),
        }
    }

    pub fn set_rays_per_scan(&mut self, rays: u32) {
        self.rays_per_scan = rays;
    }

    pub fn set_max_distance(&mut self, distance: f32) {
        self.max_distance = distance;
    }

    pub fn set_color_capture(&mut self, enabled: bool) {
        self.color_capture = enabled;
    }

    pub fn exclusions_mut(&mut self) -> &mut ScanExclusions {
        &mut self.exclusions
    }

    /// Run one scan from `camera`
    pub fn scan(
        &mut self,
        camera: &Camera,
        scene: &dyn RaycastScene,
        color: Option<&ColorFrame>,
    ) -> ScanBatch {
        let mut batch = ScanBatch {
            pose: camera.pose(),
            points: Vec::with_capacity(self.rays_per_scan as usize),
            triangles: Vec::new(),
            misses: 0,
            excluded: 0,
        };

        for _ in 0..self.rays_per_scan {
            let u: f32 = self.rng.random();
            let v: f32 = self.rng.random();
            let ray = camera.viewport_ray(u, v);

            let Some(hit) = scene.raycast(&ray, self.max_distance) else {
                batch.misses += 1;
                continue;
            };

            if self.exclusions.is_excluded(hit.object) {
                batch.excluded += 1;
                continue;
            }

            let color = match (self.color_capture, color) {
                (true, Some(frame)) => frame.sample(u, v),
                _ => PackedColor::BLACK,
            };
            batch.points.push(Point::new(hit.point, color));

            if let Some((mesh, transform)) = resolve_surface(&hit) {
                batch.triangles.push(TriangleRef {
                    mesh,
                    triangle_index: hit.triangle_index,
                    transform,
                    point: hit.point,
                });
            }
        }

        log::debug!(
            "Scan: {} points, {} triangles, {} misses, {} excluded",
            batch.points.len(),
            batch.triangles.len(),
            batch.misses,
            batch.excluded
        );

        batch
    }
}

/// Pick the geometry behind a hit: the LOD-0 sub-surface nearest to the hit
/// point when the object has a LOD group, otherwise the object's own mesh.
fn resolve_surface(hit: &RayHit<'_>) -> Option<(Arc<SourceMesh>, Mat4)> {
    let object = hit.object;

    let nearest = object.lod0.iter().min_by(|a, b| {
        a.bounds
            .distance_squared_to_point(hit.point)
            .total_cmp(&b.bounds.distance_squared_to_point(hit.point))
    });
    if let Some(surface) = nearest {
        return Some((surface.mesh.clone(), surface.transform));
    }

    object.mesh.as_ref().map(|mesh| (mesh.clone(), object.transform))
}
