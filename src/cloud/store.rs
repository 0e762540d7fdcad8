//! Scan history and its render mirror

use crate::core::config::clamp_capacity;
use crate::scan::point::Point;

use super::ring::PointRing;

/// Owns the unbounded scan history and the fixed-capacity render ring
pub struct PointStore {
    /// Every point ever scanned, in scan order
    history: Vec<Point>,
    /// Points of the most recent scan only
    current_scan: Vec<Point>,
    ring: PointRing,
    display_enabled: bool,
}

impl PointStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: Vec::new(),
            current_scan: Vec::new(),
            ring: PointRing::new(capacity),
            display_enabled: true,
        }
    }

    /// Record a scan: replaces the current-scan buffer, extends history and,
    /// while displayed, the ring.
    pub fn append_scan(&mut self, batch: &[Point]) {
        self.current_scan.clear();
        self.current_scan.extend_from_slice(batch);
        self.history.extend_from_slice(batch);
        if self.display_enabled {
            self.ring.append(batch);
        }
    }

    /// Feed points through the ring append path only (history untouched)
    pub fn add_points(&mut self, batch: &[Point]) {
        self.ring.append(batch);
    }

    /// Replace the ring with one of `capacity` (clamped) seeded from history.
    ///
    /// The new ring is fully built before it replaces the old one.
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        let capacity = clamp_capacity(capacity);
        self.ring = PointRing::from_recent(&self.history, capacity);
        log::info!(
            "Ring capacity set to {} ({} points restored from history)",
            capacity,
            self.ring.len()
        );
        capacity
    }

    /// Show or hide the cloud. Re-showing resets the ring and re-feeds the
    /// full history through [`Self::add_points`].
    pub fn set_display_enabled(&mut self, enabled: bool) {
        if enabled == self.display_enabled {
            return;
        }
        self.display_enabled = enabled;
        if enabled {
            let capacity = self.ring.capacity();
            self.ring = PointRing::new(capacity);
            let history = std::mem::take(&mut self.history);
            self.add_points(&history);
            self.history = history;
            log::info!("Point cloud shown, re-fed {} points", self.history.len());
        } else {
            log::info!("Point cloud hidden");
        }
    }

    pub fn display_enabled(&self) -> bool {
        self.display_enabled
    }

    pub fn history(&self) -> &[Point] {
        &self.history
    }

    pub fn current_scan(&self) -> &[Point] {
        &self.current_scan
    }

    pub fn ring(&self) -> &PointRing {
        &self.ring
    }

    pub fn ring_mut(&mut self) -> &mut PointRing {
        &mut self.ring
    }
}
