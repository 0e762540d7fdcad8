//! Visualization adapter: mirrors the point ring onto a rendering surface

use bytemuck::{Pod, Zeroable};

use crate::cloud::PointRing;
use crate::core::config::{BRIGHTNESS_RANGE, PARTICLE_SIZE_RANGE, ScannerConfig, clamp_f32};
use crate::core::types::Result;
use crate::scan::point::GpuPoint;

/// Identifies one point allocation on a surface
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u32);

/// Scalar parameters for the point renderer (must match shader struct exactly)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PointParams {
    pub particle_count: u32,
    pub buffer_handle: u32,
    pub particle_size: f32,
    pub brightness: f32,
}

/// Something that can draw the point cloud
pub trait PointSurface {
    /// (Re)create storage for `capacity` points, replacing any previous allocation
    fn allocate(&mut self, capacity: usize) -> Result<SurfaceHandle>;
    /// Upload points into the current allocation, starting at slot 0
    fn upload(&mut self, points: &[GpuPoint]) -> Result<()>;
    fn set_params(&mut self, params: &PointParams) -> Result<()>;
}

/// What one [`PointCloudView::sync`] did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No surface attached, or it was disabled after an error
    NoSurface,
    /// Nothing changed since the last sync
    Idle,
    /// Parameters pushed without a point upload
    ParamsOnly,
    /// Points uploaded (after reallocating when `reallocated`)
    Uploaded { count: usize, reallocated: bool },
    /// The surface failed and was disabled
    Failed,
}

pub struct PointCloudView {
    surface: Option<Box<dyn PointSurface>>,
    handle: Option<SurfaceHandle>,
    particle_size: f32,
    brightness: f32,
    params_dirty: bool,
    warned_missing: bool,
}

impl PointCloudView {
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            surface: None,
            handle: None,
            particle_size: clamp_f32(config.particle_size, PARTICLE_SIZE_RANGE, 0.02),
            brightness: clamp_f32(config.brightness, BRIGHTNESS_RANGE, 1.0),
            params_dirty: true,
            warned_missing: false,
        }
    }

    /// Attach a surface; the next sync allocates and uploads everything
    pub fn attach(&mut self, surface: Box<dyn PointSurface>) {
        self.surface = Some(surface);
        self.handle = None;
        self.params_dirty = true;
        self.warned_missing = false;
    }

    pub fn detach(&mut self) -> Option<Box<dyn PointSurface>> {
        self.handle = None;
        self.surface.take()
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    pub fn handle(&self) -> Option<SurfaceHandle> {
        self.handle
    }

    /// Set particle size, clamped to [0.001, 1]; returns the applied value
    pub fn set_particle_size(&mut self, size: f32) -> f32 {
        self.particle_size = clamp_f32(size, PARTICLE_SIZE_RANGE, self.particle_size);
        self.params_dirty = true;
        self.particle_size
    }

    /// Set brightness, clamped to [1, 10]; returns the applied value
    pub fn set_brightness(&mut self, brightness: f32) -> f32 {
        self.brightness = clamp_f32(brightness, BRIGHTNESS_RANGE, self.brightness);
        self.params_dirty = true;
        self.brightness
    }

    pub fn particle_size(&self) -> f32 {
        self.particle_size
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    /// Consume the ring's pending flags and push whatever changed to the surface
    pub fn sync(&mut self, ring: &mut PointRing) -> SyncOutcome {
        let realloc = ring.take_pending_realloc();
        let upload = ring.take_pending_upload();

        if self.surface.is_none() {
            if !self.warned_missing {
                log::warn!("No point surface attached, cloud will not be drawn");
                self.warned_missing = true;
            }
            return SyncOutcome::NoSurface;
        }

        match self.push(ring, realloc, upload) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Point surface failed, disabling visualization: {}", e);
                self.surface = None;
                self.handle = None;
                // Already reported
                self.warned_missing = true;
                SyncOutcome::Failed
            }
        }
    }

    fn push(&mut self, ring: &PointRing, realloc: bool, upload: bool) -> Result<SyncOutcome> {
        let Some(surface) = self.surface.as_mut() else {
            return Ok(SyncOutcome::NoSurface);
        };

        let reallocated = realloc || self.handle.is_none();
        let handle = match self.handle {
            Some(handle) if !reallocated => handle,
            _ => {
                let handle = surface.allocate(ring.capacity())?;
                log::debug!("Point surface allocated for {} points", ring.capacity());
                self.handle = Some(handle);
                handle
            }
        };

        let upload = upload || reallocated;
        if upload {
            surface.upload(&ring.gpu_points())?;
        }

        let push_params = upload || self.params_dirty;
        if push_params {
            surface.set_params(&PointParams {
                particle_count: ring.len() as u32,
                buffer_handle: handle.0,
                particle_size: self.particle_size,
                brightness: self.brightness,
            })?;
            self.params_dirty = false;
        }

        Ok(if upload {
            SyncOutcome::Uploaded { count: ring.len(), reallocated }
        } else if push_params {
            SyncOutcome::ParamsOnly
        } else {
            SyncOutcome::Idle
        })
    }
}

#[cfg(test)]
pub(crate) mod test_surface {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::core::error::Error;

    /// Calls seen by a [`RecordingSurface`]
    #[derive(Default, Debug)]
    pub struct SurfaceLog {
        pub allocations: Vec<usize>,
        pub uploads: Vec<usize>,
        pub params: Vec<PointParams>,
    }

    /// In-memory surface that records every call; can be told to fail allocations
    pub struct RecordingSurface {
        pub log: Rc<RefCell<SurfaceLog>>,
        pub max_capacity: usize,
    }

    impl RecordingSurface {
        pub fn new() -> (Self, Rc<RefCell<SurfaceLog>>) {
            let log = Rc::new(RefCell::new(SurfaceLog::default()));
            (Self { log: Rc::clone(&log), max_capacity: usize::MAX }, log)
        }
    }

    impl PointSurface for RecordingSurface {
        fn allocate(&mut self, capacity: usize) -> Result<SurfaceHandle> {
            if capacity > self.max_capacity {
                return Err(Error::Render(format!("{} points exceeds surface limit", capacity)));
            }
            let mut log = self.log.borrow_mut();
            log.allocations.push(capacity);
            Ok(SurfaceHandle(log.allocations.len() as u32))
        }

        fn upload(&mut self, points: &[GpuPoint]) -> Result<()> {
            self.log.borrow_mut().uploads.push(points.len());
            Ok(())
        }

        fn set_params(&mut self, params: &PointParams) -> Result<()> {
            self.log.borrow_mut().params.push(*params);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_surface::RecordingSurface;
    use super::*;
    use crate::core::types::Vec3;
    use crate::scan::point::{PackedColor, Point};

    fn pts(n: usize) -> Vec<Point> {
        (0..n).map(|i| Point::new(Vec3::splat(i as f32), PackedColor::BLACK)).collect()
    }

    #[test]
    fn test_params_layout() {
        assert_eq!(std::mem::size_of::<PointParams>(), 16);
    }

    #[test]
    fn test_sync_uploads_once_per_change() {
        let mut view = PointCloudView::new(&ScannerConfig::default());
        let (surface, log) = RecordingSurface::new();
        view.attach(Box::new(surface));
        let mut ring = PointRing::new(8);

        assert_eq!(view.sync(&mut ring), SyncOutcome::Uploaded { count: 0, reallocated: true });
        assert_eq!(view.sync(&mut ring), SyncOutcome::Idle);

        ring.append(&pts(3));
        assert_eq!(view.sync(&mut ring), SyncOutcome::Uploaded { count: 3, reallocated: false });

        let log = log.borrow();
        assert_eq!(log.allocations, vec![8]);
        assert_eq!(log.uploads, vec![0, 3]);
        let last = log.params.last().unwrap();
        assert_eq!(last.particle_count, 3);
        assert_eq!(last.buffer_handle, 1);
        assert_eq!(last.particle_size, 0.02);
    }

    #[test]
    fn test_capacity_change_reallocates() {
        let mut view = PointCloudView::new(&ScannerConfig::default());
        let (surface, log) = RecordingSurface::new();
        view.attach(Box::new(surface));
        let history = pts(10);
        let mut ring = PointRing::from_recent(&history, 4);
        view.sync(&mut ring);

        let mut ring = PointRing::from_recent(&history, 6);
        assert_eq!(view.sync(&mut ring), SyncOutcome::Uploaded { count: 6, reallocated: true });
        assert_eq!(log.borrow().allocations, vec![4, 6]);
        assert_eq!(view.handle(), Some(SurfaceHandle(2)));
    }

    #[test]
    fn test_scalar_changes_are_clamped_and_pushed() {
        let mut view = PointCloudView::new(&ScannerConfig::default());
        let (surface, log) = RecordingSurface::new();
        view.attach(Box::new(surface));
        let mut ring = PointRing::new(4);
        view.sync(&mut ring);

        assert_eq!(view.set_particle_size(3.0), 1.0);
        assert_eq!(view.set_brightness(0.5), 1.0);
        assert_eq!(view.set_brightness(12.0), 10.0);
        assert_eq!(view.sync(&mut ring), SyncOutcome::ParamsOnly);
        assert_eq!(view.sync(&mut ring), SyncOutcome::Idle);

        let log = log.borrow();
        assert_eq!(log.uploads.len(), 1);
        let last = log.params.last().unwrap();
        assert_eq!(last.particle_size, 1.0);
        assert_eq!(last.brightness, 10.0);
    }

    #[test]
    fn test_missing_surface_is_skipped() {
        let mut view = PointCloudView::new(&ScannerConfig::default());
        let mut ring = PointRing::new(4);
        ring.append(&pts(2));
        assert_eq!(view.sync(&mut ring), SyncOutcome::NoSurface);
        assert_eq!(view.sync(&mut ring), SyncOutcome::NoSurface);

        // Attaching later still gets the full ring
        let (surface, log) = RecordingSurface::new();
        view.attach(Box::new(surface));
        assert_eq!(view.sync(&mut ring), SyncOutcome::Uploaded { count: 2, reallocated: true });
        assert_eq!(log.borrow().uploads, vec![2]);
    }

    #[test]
    fn test_surface_error_disables_visualization() {
        let mut view = PointCloudView::new(&ScannerConfig::default());
        let (mut surface, log) = RecordingSurface::new();
        surface.max_capacity = 100;
        view.attach(Box::new(surface));

        let mut ring = PointRing::new(1000);
        assert_eq!(view.sync(&mut ring), SyncOutcome::Failed);
        assert!(!view.has_surface());
        ring.append(&pts(5));
        assert_eq!(view.sync(&mut ring), SyncOutcome::NoSurface);
        assert!(log.borrow().allocations.is_empty());
    }
}
