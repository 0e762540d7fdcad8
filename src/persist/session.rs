//! Session directory and log file naming

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::types::Result;

/// Fixed identifier between the timestamp and the scene name
pub const SESSION_TAG: &str = "lidar";
pub const POINTS_FILE: &str = "pointcloudstr.txt";
pub const CAMERA_FILE: &str = "camerastr.txt";

const MAX_DIR_ATTEMPTS: u32 = 10_000;

/// Paths of one session's log files
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionPaths {
    pub dir: PathBuf,
    pub points: PathBuf,
    pub camera: PathBuf,
}

impl SessionPaths {
    /// Lay out `<root>/<started>_<scene>/<started>_lidar_<scene>_{pointcloudstr,camerastr}.txt`
    pub fn new(root: &Path, scene_name: &str, started: u64) -> Self {
        let scene = sanitize_scene_name(scene_name);
        let dir = root.join(format!("{}_{}", started, scene));
        let prefix = format!("{}_{}_{}_", started, SESSION_TAG, scene);
        Self {
            points: dir.join(format!("{}{}", prefix, POINTS_FILE)),
            camera: dir.join(format!("{}{}", prefix, CAMERA_FILE)),
            dir,
        }
    }

    /// Paths for a session starting now, creating the directory tree.
    ///
    /// The session directory is always new: when `<started>_<scene>` already
    /// exists, `_1`, `_2`, ... is appended until an unused name is found.
    pub fn create(root: &Path, scene_name: &str) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let base = Self::new(root, scene_name, epoch_seconds());
        let mut attempt = 0u32;
        loop {
            let paths = base.with_attempt(attempt);
            match std::fs::create_dir(&paths.dir) {
                Ok(()) => return Ok(paths),
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < MAX_DIR_ATTEMPTS => {
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Same file names inside `<dir>_<attempt>`; attempt 0 is the plain directory
    fn with_attempt(&self, attempt: u32) -> Self {
        if attempt == 0 {
            return self.clone();
        }
        let mut name = self.dir.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(format!("_{}", attempt));
        let dir = self.dir.with_file_name(name);
        let relocate = |file: &Path| match file.file_name() {
            Some(file_name) => dir.join(file_name),
            None => dir.clone(),
        };
        Self {
            points: relocate(&self.points),
            camera: relocate(&self.camera),
            dir: dir.clone(),
        }
    }
}

fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Keep `[A-Za-z0-9_-]`, replacing everything else with `_`
pub fn sanitize_scene_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        String::from("scene")
    } else {
        cleaned
    }
}
