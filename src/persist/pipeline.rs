//! Persistence pipeline: buffered session logs with cooperative flushing
//!
//! Records are appended to in-memory buffers every scan. A periodic flush
//! drains both buffers as a task on a single-threaded work queue; each poll
//! writes at most [`FLUSH_CHUNK_BYTES`] per stream and yields, so a large
//! drain spreads over several frames. Shutdown bypasses the queue and writes
//! everything synchronously, exactly once.

use std::cell::{Cell, RefCell};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::rc::Rc;

use tokio::runtime::{Builder, Runtime};
use tokio::task::LocalSet;

use crate::core::camera::CameraPose;
use crate::core::config::{FLUSH_INTERVAL_RANGE, ScannerConfig, clamp_f32};
use crate::core::types::Result;
use crate::scan::point::Point;

use super::record::{write_camera_record, write_point_record};
use super::session::SessionPaths;
use super::stream::StreamLog;

/// Bytes written per stream per cooperative step
pub const FLUSH_CHUNK_BYTES: usize = 64 * 1024;

fn create_new(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

/// Pollable completion flag of one cooperative flush
#[derive(Clone, Debug)]
pub struct FlushTicket {
    done: Rc<Cell<bool>>,
}

impl FlushTicket {
    pub fn is_complete(&self) -> bool {
        self.done.get()
    }
}

type SharedStream = Rc<RefCell<StreamLog>>;

/// Session logger for point and camera records
pub struct PersistencePipeline {
    runtime: Runtime,
    queue: LocalSet,
    points: SharedStream,
    camera: SharedStream,
    paths: Option<SessionPaths>,
    flush_interval: f64,
    since_flush: f64,
    in_flight: Option<FlushTicket>,
    flushes: Rc<Cell<u64>>,
    shut_down: bool,
}

impl PersistencePipeline {
    /// Open a new session under the configured root
    pub fn open(config: &ScannerConfig) -> Result<Self> {
        let paths = SessionPaths::create(&config.session_root, &config.scene_name)?;
        let points = BufWriter::new(create_new(&paths.points)?);
        let camera = BufWriter::new(create_new(&paths.camera)?);
        log::info!("Session logging to {}", paths.dir.display());

        let mut pipeline = Self::with_sinks(Box::new(points), Box::new(camera), config.flush_interval)?;
        pipeline.paths = Some(paths);
        Ok(pipeline)
    }

    /// Pipeline over arbitrary writers
    pub fn with_sinks(points: Box<dyn Write>, camera: Box<dyn Write>, flush_interval: f32) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_time().build()?;
        Ok(Self {
            runtime,
            queue: LocalSet::new(),
            points: Rc::new(RefCell::new(StreamLog::new("points", points))),
            camera: Rc::new(RefCell::new(StreamLog::new("camera", camera))),
            paths: None,
            flush_interval: clamp_f32(flush_interval, FLUSH_INTERVAL_RANGE, 15.0) as f64,
            since_flush: 0.0,
            in_flight: None,
            flushes: Rc::new(Cell::new(0)),
            shut_down: false,
        })
    }

    pub fn paths(&self) -> Option<&SessionPaths> {
        self.paths.as_ref()
    }

    pub fn set_flush_interval(&mut self, seconds: f32) {
        self.flush_interval = clamp_f32(seconds, FLUSH_INTERVAL_RANGE, self.flush_interval as f32) as f64;
    }

    pub fn flush_interval(&self) -> f64 {
        self.flush_interval
    }

    /// Buffer one camera record and one record per point
    pub fn append_scan(&mut self, pose: &CameraPose, points: &[Point], time: f64) {
        if self.shut_down {
            log::warn!("Dropped {} points: session already closed", points.len());
            return;
        }
        write_camera_record(self.camera.borrow_mut().buffer_mut(), pose, time);
        let mut stream = self.points.borrow_mut();
        let buffer = stream.buffer_mut();
        buffer.reserve(points.len() * 32);
        for point in points {
            write_point_record(buffer, point, time);
        }
    }

    /// Advance the flush timer, start a flush when due, then run queued work
    pub fn tick(&mut self, dt: f32) {
        if self.shut_down {
            return;
        }
        if dt.is_finite() && dt > 0.0 {
            self.since_flush += dt as f64;
        }
        if self.since_flush >= self.flush_interval {
            if self.is_flushing() {
                log::debug!("Flush due while previous flush still running, deferring");
            } else {
                self.since_flush = 0.0;
                self.begin_flush();
            }
        }
        self.pump();
    }

    /// Start a cooperative flush of both buffers.
    ///
    /// Returns None when there is nothing to write, or the ticket of a flush
    /// already in flight.
    pub fn begin_flush(&mut self) -> Option<FlushTicket> {
        if self.shut_down {
            return None;
        }
        if let Some(ticket) = self.in_flight.as_ref().filter(|t| !t.is_complete()) {
            return Some(ticket.clone());
        }
        if !self.points.borrow().has_buffered() && !self.camera.borrow().has_buffered() {
            return None;
        }

        self.points.borrow_mut().begin_drain();
        self.camera.borrow_mut().begin_drain();

        let ticket = FlushTicket { done: Rc::new(Cell::new(false)) };
        let done = Rc::clone(&ticket.done);
        let flushes = Rc::clone(&self.flushes);
        let streams = [Rc::clone(&self.points), Rc::clone(&self.camera)];

        self.queue.spawn_local(async move {
            loop {
                let mut pending = false;
                for stream in &streams {
                    let mut stream = stream.borrow_mut();
                    match stream.write_chunk(FLUSH_CHUNK_BYTES) {
                        Ok(finished) => pending |= !finished,
                        Err(e) => log::error!("Flush of {} stream failed: {}", stream.name(), e),
                    }
                }
                if !pending {
                    break;
                }
                tokio::task::yield_now().await;
            }
            flushes.set(flushes.get() + 1);
            done.set(true);
            log::debug!("Flush complete");
        });

        self.in_flight = Some(ticket.clone());
        Some(ticket)
    }

    /// Give queued flush work one turn without blocking on it
    pub fn pump(&self) {
        if self.shut_down {
            return;
        }
        self.queue.block_on(&self.runtime, tokio::task::yield_now());
    }

    /// Drive the queue until `ticket` completes
    pub fn wait(&self, ticket: &FlushTicket) {
        while !ticket.is_complete() && !self.shut_down {
            self.pump();
        }
    }

    pub fn is_flushing(&self) -> bool {
        self.in_flight.as_ref().is_some_and(|t| !t.is_complete())
    }

    /// Cooperative flushes completed so far
    pub fn flush_count(&self) -> u64 {
        self.flushes.get()
    }

    /// Buffered bytes not yet handed to any flush
    pub fn buffered_bytes(&self) -> usize {
        self.points.borrow().buffered_len() + self.camera.borrow().buffered_len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Synchronously drain, flush and close both streams. Runs once; later calls do nothing.
    ///
    /// A failure on one stream is logged and does not stop the other.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        for stream in [&self.points, &self.camera] {
            let mut stream = stream.borrow_mut();
            match stream.finish() {
                Ok(()) => log::info!(
                    "Closed {} stream ({} bytes written)",
                    stream.name(),
                    stream.bytes_written()
                ),
                Err(e) => log::error!("Final drain of {} stream failed: {}", stream.name(), e),
            }
        }

        // The synchronous drain covered whatever the cooperative flush had left
        if let Some(ticket) = self.in_flight.take() {
            ticket.done.set(true);
        }
    }
}

impl Drop for PersistencePipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::super::record::parse_point_record;
    use super::super::stream::test_sinks::{BrokenSink, SharedSink};
    use super::*;
    use crate::core::types::{Quat, Vec3};
    use crate::scan::point::PackedColor;

    fn pose() -> CameraPose {
        CameraPose { position: Vec3::ZERO, rotation: Quat::IDENTITY, forward: -Vec3::Z }
    }

    fn points(n: usize) -> Vec<Point> {
        (0..n)
            .map(|i| Point::new(Vec3::new(i as f32, 0.5, -1.0), PackedColor::rgba(10, 20, 30, 255)))
            .collect()
    }

    fn pipeline(flush_interval: f32) -> (PersistencePipeline, SharedSink, SharedSink) {
        let pts = SharedSink::default();
        let cam = SharedSink::default();
        let pipeline =
            PersistencePipeline::with_sinks(Box::new(pts.clone()), Box::new(cam.clone()), flush_interval).unwrap();
        (pipeline, pts, cam)
    }

    #[test]
    fn test_periodic_flush() {
        let (mut pipeline, pts, cam) = pipeline(1.0);
        pipeline.append_scan(&pose(), &points(3), 0.25);

        pipeline.tick(0.5);
        assert_eq!(pts.text(), "");

        pipeline.tick(0.6);
        assert_eq!(pipeline.flush_count(), 1);
        assert_eq!(pts.text().lines().count(), 3);
        assert_eq!(cam.text(), "0 0 0 0 0 0 0 0 0 0.25\n");
    }

    #[test]
    fn test_flush_with_nothing_buffered() {
        let (mut pipeline, _, _) = pipeline(1.0);
        assert!(pipeline.begin_flush().is_none());
        pipeline.tick(5.0);
        assert_eq!(pipeline.flush_count(), 0);
    }

    #[test]
    fn test_large_flush_completes_via_wait() {
        let (mut pipeline, pts, _) = pipeline(15.0);
        let batch = points(20_000);
        pipeline.append_scan(&pose(), &batch, 1.0);
        assert!(pipeline.buffered_bytes() > FLUSH_CHUNK_BYTES);

        let ticket = pipeline.begin_flush().unwrap();
        assert!(!ticket.is_complete());
        assert!(pipeline.is_flushing());
        assert_eq!(pipeline.buffered_bytes(), 0);

        // Records added mid-flush stay buffered for the next one
        pipeline.append_scan(&pose(), &points(1), 2.0);

        pipeline.wait(&ticket);
        assert!(ticket.is_complete());
        assert!(!pipeline.is_flushing());

        let text = pts.text();
        assert_eq!(text.lines().count(), 20_000);
        for line in text.lines() {
            let record = parse_point_record(line).unwrap();
            assert_eq!(record.rgb, [10, 20, 30]);
            assert_eq!(record.time, 1.0);
        }
        assert!(pipeline.buffered_bytes() > 0);
    }

    #[test]
    fn test_begin_flush_while_in_flight_returns_same_ticket() {
        let (mut pipeline, _, _) = pipeline(15.0);
        pipeline.append_scan(&pose(), &points(10), 0.0);
        let first = pipeline.begin_flush().unwrap();
        pipeline.append_scan(&pose(), &points(10), 1.0);
        let second = pipeline.begin_flush().unwrap();
        assert!(Rc::ptr_eq(&first.done, &second.done));
    }

    #[test]
    fn test_shutdown_drains_everything_once() {
        let (mut pipeline, pts, cam) = pipeline(15.0);
        pipeline.append_scan(&pose(), &points(20_000), 1.0);
        let ticket = pipeline.begin_flush().unwrap();
        pipeline.pump();
        pipeline.append_scan(&pose(), &points(5), 2.0);

        pipeline.shutdown();
        assert!(ticket.is_complete());
        assert_eq!(pts.text().lines().count(), 20_005);
        assert_eq!(cam.text().lines().count(), 2);

        pipeline.shutdown();
        pipeline.append_scan(&pose(), &points(5), 3.0);
        pipeline.tick(100.0);
        drop(pipeline);
        assert_eq!(pts.text().lines().count(), 20_005);
        assert_eq!(cam.text().lines().count(), 2);
    }

    #[test]
    fn test_drop_runs_shutdown() {
        let (mut pipeline, pts, _) = pipeline(15.0);
        pipeline.append_scan(&pose(), &points(4), 0.0);
        drop(pipeline);
        assert_eq!(pts.text().lines().count(), 4);
    }

    #[test]
    fn test_failing_stream_does_not_block_sibling() {
        let pts = SharedSink::default();
        let mut pipeline =
            PersistencePipeline::with_sinks(Box::new(pts.clone()), Box::new(BrokenSink), 1.0).unwrap();

        pipeline.append_scan(&pose(), &points(2), 0.0);
        pipeline.tick(1.0);
        assert_eq!(pipeline.flush_count(), 1);
        assert_eq!(pts.text().lines().count(), 2);

        pipeline.append_scan(&pose(), &points(3), 1.0);
        pipeline.shutdown();
        assert_eq!(pts.text().lines().count(), 5);
    }

    #[test]
    fn test_open_creates_session_files() {
        let root = tempfile::tempdir().unwrap();
        let config = ScannerConfig {
            session_root: root.path().to_path_buf(),
            scene_name: "unit test".into(),
            ..Default::default()
        };
        let mut pipeline = PersistencePipeline::open(&config).unwrap();
        pipeline.append_scan(&pose(), &points(2), 0.5);
        pipeline.shutdown();

        let paths = pipeline.paths().unwrap().clone();
        let name = paths.points.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("_lidar_unit_test_pointcloudstr.txt"));
        let text = std::fs::read_to_string(&paths.points).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec!["0 0.5 -1 10 20 30 0.5", "-1 0.5 -1 10 20 30 0.5"]);
        assert_eq!(std::fs::read_to_string(&paths.camera).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_back_to_back_sessions_keep_earlier_logs() {
        let root = tempfile::tempdir().unwrap();
        let config = ScannerConfig {
            session_root: root.path().to_path_buf(),
            scene_name: "repeat".into(),
            ..Default::default()
        };

        let mut first = PersistencePipeline::open(&config).unwrap();
        first.append_scan(&pose(), &points(1), 0.1);
        first.shutdown();
        let first_paths = first.paths().unwrap().clone();
        drop(first);

        let mut second = PersistencePipeline::open(&config).unwrap();
        let second_paths = second.paths().unwrap().clone();
        second.shutdown();

        assert_ne!(first_paths.dir, second_paths.dir);
        assert_ne!(first_paths.points, second_paths.points);
        let text = std::fs::read_to_string(&first_paths.points).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert_eq!(std::fs::read_to_string(&second_paths.points).unwrap(), "");
    }
}
