//! Scanner configuration.
//!
//! Every value is clamped into its valid range on set and on load; out-of-range
//! input is never rejected.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;

/// Valid ring-buffer capacities (points).
pub const CAPACITY_RANGE: (usize, usize) = (1, 100_000_000);
/// Valid particle sizes (world units).
pub const PARTICLE_SIZE_RANGE: (f32, f32) = (0.001, 1.0);
/// Valid brightness multipliers.
pub const BRIGHTNESS_RANGE: (f32, f32) = (1.0, 10.0);
/// Valid rays per scan.
pub const RAYS_RANGE: (u32, u32) = (1, 100_000);
/// Valid maximum scan distances.
pub const MAX_DISTANCE_RANGE: (f32, f32) = (0.1, 100_000.0);
/// Valid rotation thresholds (dot product of forward vectors).
pub const ROTATION_THRESHOLD_RANGE: (f32, f32) = (-1.0, 1.0);
/// Valid translation thresholds (squared distance).
pub const TRANSLATION_THRESHOLD_RANGE: (f32, f32) = (0.0, 1_000_000.0);
/// Valid periodic flush intervals (seconds).
pub const FLUSH_INTERVAL_RANGE: (f32, f32) = (0.1, 3600.0);
/// Valid collision re-bake intervals (seconds).
pub const COLLISION_INTERVAL_RANGE: (f32, f32) = (0.0, 60.0);

/// Full scanner configuration, constructed once and handed to each component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Ring buffer capacity in points.
    pub ring_capacity: usize,
    /// Rendered particle size.
    pub particle_size: f32,
    /// Rendered brightness multiplier.
    pub brightness: f32,
    /// Rays cast per scan.
    pub rays_per_scan: u32,
    /// Maximum ray distance.
    pub max_distance: f32,
    /// Re-scan when dot(forward, last_forward) drops to or below this.
    pub rotation_threshold: f32,
    /// Re-scan when the squared position delta reaches this.
    pub translation_threshold: f32,
    /// Seconds between periodic flushes.
    pub flush_interval: f32,
    /// Minimum seconds between collision shape bakes.
    pub collision_interval: f32,
    /// Sample colors from the auxiliary frame; black otherwise.
    pub color_capture: bool,
    /// RNG seed for viewport sampling. None = entropy.
    pub seed: Option<u64>,
    /// Directory holding one subdirectory per session.
    pub session_root: PathBuf,
    /// Scene name embedded in session file names.
    pub scene_name: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            ring_capacity: 1_000_000,
            particle_size: 0.02,
            brightness: 1.0,
            rays_per_scan: 512,
            max_distance: 100.0,
            rotation_threshold: 0.999,
            translation_threshold: 0.01,
            flush_interval: 15.0,
            collision_interval: 1.0,
            color_capture: true,
            seed: None,
            session_root: PathBuf::from("ScanSessions"),
            scene_name: String::from("scene"),
        }
    }
}

impl ScannerConfig {
    /// Return a copy with every value clamped into range.
    pub fn clamped(mut self) -> Self {
        let defaults = Self::default();
        self.ring_capacity = clamp_capacity(self.ring_capacity);
        self.particle_size = clamp_f32(self.particle_size, PARTICLE_SIZE_RANGE, defaults.particle_size);
        self.brightness = clamp_f32(self.brightness, BRIGHTNESS_RANGE, defaults.brightness);
        self.rays_per_scan = self.rays_per_scan.clamp(RAYS_RANGE.0, RAYS_RANGE.1);
        self.max_distance = clamp_f32(self.max_distance, MAX_DISTANCE_RANGE, defaults.max_distance);
        self.rotation_threshold = clamp_f32(
            self.rotation_threshold,
            ROTATION_THRESHOLD_RANGE,
            defaults.rotation_threshold,
        );
        self.translation_threshold = clamp_f32(
            self.translation_threshold,
            TRANSLATION_THRESHOLD_RANGE,
            defaults.translation_threshold,
        );
        self.flush_interval = clamp_f32(self.flush_interval, FLUSH_INTERVAL_RANGE, defaults.flush_interval);
        self.collision_interval = clamp_f32(
            self.collision_interval,
            COLLISION_INTERVAL_RANGE,
            defaults.collision_interval,
        );
        self
    }

    /// Load from a JSON file, clamping every value.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config.clamped())
    }

    /// Save as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Clamp a ring capacity into [`CAPACITY_RANGE`].
pub fn clamp_capacity(capacity: usize) -> usize {
    capacity.clamp(CAPACITY_RANGE.0, CAPACITY_RANGE.1)
}

/// Clamp a float into `range`. NaN falls back to `fallback`.
pub fn clamp_f32(value: f32, range: (f32, f32), fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(range.0, range.1)
    }
}
