//! Fixed-capacity circular point buffer mirrored to the renderer
//!
//! Slots are only ever written at the cursor, so until the first wrap the
//! written slots form a prefix of the buffer. Storage therefore grows lazily
//! up to `capacity` and the logical count is simply the number of distinct
//! slots written since the last reset.

use crate::core::config::clamp_capacity;
use crate::scan::point::{GpuPoint, Point};

/// Circular buffer of points with FIFO overwrite once full
pub struct PointRing {
    slots: Vec<Point>,
    capacity: usize,
    /// Next slot to write. May equal `capacity` right after a rebuild that filled it.
    cursor: usize,
    /// Set on every change, consumed once by the visualization adapter
    pending_upload: bool,
    /// Set when the capacity (and so the render allocation) changed
    pending_realloc: bool,
}

impl PointRing {
    /// Create an empty ring, capacity clamped to the valid range
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            capacity: clamp_capacity(capacity),
            cursor: 0,
            pending_upload: true,
            pending_realloc: true,
        }
    }

    /// Build a ring holding the most recent `capacity` points of `history`.
    /// The cursor is left at the copied count.
    pub fn from_recent(history: &[Point], capacity: usize) -> Self {
        let capacity = clamp_capacity(capacity);
        let keep = history.len().min(capacity);
        let mut slots = Vec::with_capacity(keep);
        slots.extend_from_slice(&history[history.len() - keep..]);
        Self {
            slots,
            capacity,
            cursor: keep,
            pending_upload: true,
            pending_realloc: true,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of live points (distinct slots written)
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Raw slot contents in storage order
    pub fn slots(&self) -> &[Point] {
        &self.slots
    }

    /// Append a batch, overwriting the oldest points once full
    pub fn append(&mut self, batch: &[Point]) {
        if batch.is_empty() {
            return;
        }

        let capacity = self.capacity;
        let n = batch.len();

        if n >= capacity {
            // Only the newest `capacity` points survive
            self.slots.clear();
            self.slots.extend_from_slice(&batch[n - capacity..]);
            self.cursor = 0;
        } else if self.cursor + n >= capacity {
            let tail = capacity - self.cursor;
            self.write_at(self.cursor, &batch[..tail]);
            let head = &batch[tail..];
            self.write_at(0, head);
            self.cursor = head.len();
        } else {
            self.write_at(self.cursor, batch);
            self.cursor = (self.cursor + n) % capacity;
        }

        self.pending_upload = true;
    }

    /// Write contiguously starting at `start`, growing storage when writing past the end
    fn write_at(&mut self, start: usize, points: &[Point]) {
        let overlap = self.slots.len().saturating_sub(start).min(points.len());
        self.slots[start..start + overlap].copy_from_slice(&points[..overlap]);
        self.slots.extend_from_slice(&points[overlap..]);
    }

    /// Points from oldest to newest
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &Point> {
        let split = if self.slots.len() == self.capacity {
            self.cursor % self.capacity
        } else {
            0
        };
        self.slots[split..].iter().chain(self.slots[..split].iter())
    }

    /// Upload layout of the live slots
    pub fn gpu_points(&self) -> Vec<GpuPoint> {
        self.slots.iter().copied().map(GpuPoint::from).collect()
    }

    /// Consume the pending-upload flag
    pub fn take_pending_upload(&mut self) -> bool {
        std::mem::take(&mut self.pending_upload)
    }

    /// Consume the capacity-changed flag
    pub fn take_pending_realloc(&mut self) -> bool {
        std::mem::take(&mut self.pending_realloc)
    }
}
