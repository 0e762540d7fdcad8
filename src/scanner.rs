//! Scanner context and per-frame scheduler
//!
//! [`Scanner`] owns every component, built from one [`ScannerConfig`], and
//! drives them from [`Scanner::tick`] in a fixed order: sampler, point store,
//! persistence, mesh builder, visualization.

use crate::cloud::PointStore;
use crate::core::camera::Camera;
use crate::core::config::{
    COLLISION_INTERVAL_RANGE, FLUSH_INTERVAL_RANGE, MAX_DISTANCE_RANGE, RAYS_RANGE, ROTATION_THRESHOLD_RANGE,
    ScannerConfig, TRANSLATION_THRESHOLD_RANGE, clamp_f32,
};
use crate::core::time::SessionClock;
use crate::mesh::{AddTriangle, SeenMeshBuilder};
use crate::persist::PersistencePipeline;
use crate::render::view::{PointCloudView, PointSurface, SyncOutcome};
use crate::scan::point::Point;
use crate::scan::{ColorFrame, GeometrySampler, RaycastScene, ScanExclusions, ScanTrigger};

/// Collaborator inputs for one frame. Any of them may be missing.
#[derive(Clone, Copy, Default)]
pub struct FrameInputs<'a> {
    pub camera: Option<&'a Camera>,
    pub scene: Option<&'a dyn RaycastScene>,
    pub color: Option<&'a ColorFrame>,
}

/// Summary of one [`Scanner::tick`]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickReport {
    pub scanned: bool,
    pub points: usize,
    pub misses: u32,
    pub triangles_added: usize,
    pub triangles_rejected: usize,
    pub sync: Option<SyncOutcome>,
}

pub struct Scanner {
    config: ScannerConfig,
    clock: SessionClock,
    trigger: ScanTrigger,
    sampler: GeometrySampler,
    store: PointStore,
    persistence: Option<PersistencePipeline>,
    seen: SeenMeshBuilder,
    view: PointCloudView,
    warned_no_camera: bool,
    warned_no_scene: bool,
}

impl Scanner {
    /// Build every component and open a session log under `config.session_root`.
    ///
    /// A session that cannot be opened is logged and the scanner runs without
    /// persistence.
    pub fn new(config: ScannerConfig) -> Self {
        let config = config.clamped();
        let persistence = match PersistencePipeline::open(&config) {
            Ok(pipeline) => Some(pipeline),
            Err(e) => {
                log::error!(
                    "Failed to open session under {}, continuing without logs: {}",
                    config.session_root.display(),
                    e
                );
                None
            }
        };
        Self::with_persistence(config, persistence)
    }

    /// Build with a caller-supplied pipeline, or none to run without logging
    pub fn with_persistence(config: ScannerConfig, persistence: Option<PersistencePipeline>) -> Self {
        let config = config.clamped();
        log::info!(
            "Scanner ready: capacity {}, {} rays per scan, max distance {}",
            config.ring_capacity,
            config.rays_per_scan,
            config.max_distance
        );
        Self {
            clock: SessionClock::new(),
            trigger: ScanTrigger::new(&config),
            sampler: GeometrySampler::new(&config),
            store: PointStore::new(config.ring_capacity),
            persistence,
            seen: SeenMeshBuilder::new(config.collision_interval),
            view: PointCloudView::new(&config),
            warned_no_camera: false,
            warned_no_scene: false,
            config,
        }
    }

    /// Run one frame
    pub fn tick(&mut self, dt: f32, frame: &FrameInputs<'_>) -> TickReport {
        self.clock.tick(dt);
        let time = self.clock.elapsed();
        let mut report = TickReport::default();

        let mut triangles = Vec::new();
        if let Some((camera, scene)) = self.collaborators(frame) {
            let pose = camera.pose();
            if self.trigger.should_scan(self.store.history().is_empty(), &pose) {
                let batch = self.sampler.scan(camera, scene, frame.color);
                self.trigger.record(pose);
                self.store.append_scan(&batch.points);
                if let Some(persistence) = self.persistence.as_mut() {
                    persistence.append_scan(&pose, &batch.points, time);
                }
                report.scanned = true;
                report.points = batch.points.len();
                report.misses = batch.misses;
                triangles = batch.triangles;
            }
        }

        if let Some(persistence) = self.persistence.as_mut() {
            persistence.tick(dt);
        }

        for tri in &triangles {
            match self.seen.add_triangle(&tri.mesh, tri.triangle_index, &tri.transform) {
                AddTriangle::Added => report.triangles_added += 1,
                AddTriangle::Rejected => report.triangles_rejected += 1,
                AddTriangle::NoTriangle | AddTriangle::AlreadySeen => {}
            }
        }
        self.seen.tick(dt);

        report.sync = Some(self.view.sync(self.store.ring_mut()));
        report
    }

    /// Camera and scene, warning once each time one goes missing
    fn collaborators<'a>(&mut self, frame: &FrameInputs<'a>) -> Option<(&'a Camera, &'a dyn RaycastScene)> {
        match frame.camera {
            Some(_) => self.warned_no_camera = false,
            None if !self.warned_no_camera => {
                log::warn!("No camera, scanning paused");
                self.warned_no_camera = true;
            }
            None => {}
        }
        match frame.scene {
            Some(_) => self.warned_no_scene = false,
            None if !self.warned_no_scene => {
                log::warn!("No raycast scene, scanning paused");
                self.warned_no_scene = true;
            }
            None => {}
        }
        Some((frame.camera?, frame.scene?))
    }

    /// Feed points through the ring append path without touching history
    pub fn add_points(&mut self, batch: &[Point]) {
        self.store.add_points(batch);
    }

    pub fn attach_surface(&mut self, surface: Box<dyn PointSurface>) {
        self.view.attach(surface);
    }

    pub fn set_ring_capacity(&mut self, capacity: usize) -> usize {
        self.config.ring_capacity = self.store.set_capacity(capacity);
        self.config.ring_capacity
    }

    pub fn set_particle_size(&mut self, size: f32) -> f32 {
        self.config.particle_size = self.view.set_particle_size(size);
        self.config.particle_size
    }

    pub fn set_brightness(&mut self, brightness: f32) -> f32 {
        self.config.brightness = self.view.set_brightness(brightness);
        self.config.brightness
    }

    pub fn set_rays_per_scan(&mut self, rays: u32) -> u32 {
        let rays = rays.clamp(RAYS_RANGE.0, RAYS_RANGE.1);
        self.sampler.set_rays_per_scan(rays);
        self.config.rays_per_scan = rays;
        rays
    }

    pub fn set_max_distance(&mut self, distance: f32) -> f32 {
        let distance = clamp_f32(distance, MAX_DISTANCE_RANGE, self.config.max_distance);
        self.sampler.set_max_distance(distance);
        self.config.max_distance = distance;
        distance
    }

    /// Set both re-scan thresholds; returns the clamped (rotation, translation)
    pub fn set_thresholds(&mut self, rotation: f32, translation: f32) -> (f32, f32) {
        let rotation = clamp_f32(rotation, ROTATION_THRESHOLD_RANGE, self.config.rotation_threshold);
        let translation = clamp_f32(translation, TRANSLATION_THRESHOLD_RANGE, self.config.translation_threshold);
        self.trigger.set_thresholds(rotation, translation);
        self.config.rotation_threshold = rotation;
        self.config.translation_threshold = translation;
        (rotation, translation)
    }

    pub fn set_flush_interval(&mut self, seconds: f32) -> f32 {
        let seconds = clamp_f32(seconds, FLUSH_INTERVAL_RANGE, self.config.flush_interval);
        if let Some(persistence) = self.persistence.as_mut() {
            persistence.set_flush_interval(seconds);
        }
        self.config.flush_interval = seconds;
        seconds
    }

    pub fn set_collision_interval(&mut self, seconds: f32) -> f32 {
        let seconds = clamp_f32(seconds, COLLISION_INTERVAL_RANGE, self.config.collision_interval);
        self.seen.set_collision_interval(seconds);
        self.config.collision_interval = seconds;
        seconds
    }

    pub fn set_color_capture(&mut self, enabled: bool) {
        self.sampler.set_color_capture(enabled);
        self.config.color_capture = enabled;
    }

    /// Show or hide the point cloud
    pub fn set_cloud_visible(&mut self, visible: bool) {
        self.store.set_display_enabled(visible);
    }

    pub fn toggle_mesh_visible(&mut self) {
        self.seen.toggle_visible();
    }

    pub fn exclusions_mut(&mut self) -> &mut ScanExclusions {
        self.sampler.exclusions_mut()
    }

    /// Final synchronous flush of the session log. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(persistence) = self.persistence.as_mut() {
            persistence.shutdown();
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn store(&self) -> &PointStore {
        &self.store
    }

    pub fn seen(&self) -> &SeenMeshBuilder {
        &self.seen
    }

    pub fn view(&self) -> &PointCloudView {
        &self.view
    }

    pub fn persistence(&self) -> Option<&PersistencePipeline> {
        self.persistence.as_ref()
    }

    pub fn persistence_mut(&mut self) -> Option<&mut PersistencePipeline> {
        self.persistence.as_mut()
    }
}
