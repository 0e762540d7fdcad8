//! End-to-end session: scan a small scene, then read the logs back

use glam::{Mat4, Vec3};

use scancloud::cloud::PointRing;
use scancloud::core::camera::Camera;
use scancloud::core::config::ScannerConfig;
use scancloud::mesh::source::{MeshId, box_mesh, grid_mesh};
use scancloud::persist::{parse_camera_record, parse_point_record};
use scancloud::scan::{ColorFrame, LodSurface, ObjectId, PackedColor, Point, SceneObject, TriangleScene};
use scancloud::{FrameInputs, Scanner};

fn scene() -> TriangleScene {
    let mut scene = TriangleScene::new();
    scene.add(SceneObject::new(ObjectId(1), "ground").with_mesh(grid_mesh(MeshId(1), 40.0, 8), Mat4::IDENTITY));
    scene.add(
        SceneObject::new(ObjectId(2), "crate")
            .with_mesh(box_mesh(MeshId(2), Vec3::ONE), Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0))),
    );
    scene.add(
        SceneObject::new(ObjectId(3), "pillar").with_lod_surface(LodSurface::new(
            box_mesh(MeshId(3), Vec3::new(0.5, 2.0, 0.5)),
            Mat4::from_translation(Vec3::new(3.0, 2.0, 0.0)),
        )),
    );
    scene
}

#[test]
fn session_logs_match_history() {
    let root = tempfile::tempdir().unwrap();
    let config = ScannerConfig {
        session_root: root.path().to_path_buf(),
        scene_name: "integration".into(),
        seed: Some(1234),
        rays_per_scan: 200,
        ring_capacity: 1_000,
        flush_interval: 0.5,
        ..Default::default()
    };

    let mut scanner = Scanner::new(config);
    let scene = scene();
    let frame_color = ColorFrame::solid(16, 9, PackedColor::rgba(40, 160, 220, 255)).unwrap();
    let mut camera = Camera::new(Vec3::ZERO, 60.0, 16.0 / 9.0);

    let mut scans = 0;
    for frame in 0..120 {
        let angle = frame as f32 * 0.02;
        camera.position = Vec3::new(angle.cos() * 8.0, 3.0, angle.sin() * 8.0);
        camera.set_look_at(Vec3::new(0.0, 1.0, 0.0), Vec3::Y);
        let inputs = FrameInputs { camera: Some(&camera), scene: Some(&scene), color: Some(&frame_color) };
        if scanner.tick(1.0 / 60.0, &inputs).scanned {
            scans += 1;
        }
    }
    assert!(scans > 1);
    assert!(scanner.persistence().unwrap().flush_count() >= 1);

    let history_len = scanner.store().history().len();
    assert_eq!(scanner.store().ring().len(), history_len.min(1_000));

    let seen = scanner.seen();
    assert!(seen.seen_count() > 0);
    assert_eq!(seen.mesh().vertices().len(), 3 * seen.seen_count());
    assert_eq!(seen.mesh().indices().len(), seen.mesh().vertices().len());

    scanner.shutdown();
    scanner.shutdown();
    let paths = scanner.persistence().unwrap().paths().unwrap().clone();
    drop(scanner);

    let points = std::fs::read_to_string(&paths.points).unwrap();
    let lines: Vec<&str> = points.lines().collect();
    assert_eq!(lines.len(), history_len);
    for line in &lines {
        assert_eq!(line.split(' ').count(), 7);
        assert!(!line.contains(','));
        let record = parse_point_record(line).unwrap();
        assert_eq!(record.rgb, [40, 160, 220]);
    }

    let cameras = std::fs::read_to_string(&paths.camera).unwrap();
    let mut last_time = -1.0;
    for line in cameras.lines() {
        let record = parse_camera_record(line).unwrap();
        assert!(record.time > last_time);
        last_time = record.time;
    }
    assert_eq!(cameras.lines().count(), scans);
}

#[test]
fn ring_wraps_with_fifo_overwrite() {
    let p = |i: u32| Point::new(Vec3::splat(i as f32), PackedColor(i));
    let mut ring = PointRing::new(5);
    ring.append(&[p(1), p(2), p(3)]);
    ring.append(&[p(4), p(5), p(6), p(7)]);

    assert_eq!(ring.len(), 5);
    let oldest_first: Vec<u32> = ring.iter_oldest_first().map(|pt| pt.color().0).collect();
    assert_eq!(oldest_first, vec![3, 4, 5, 6, 7]);
    // p3 keeps the slot it was written to by the first batch
    assert_eq!(ring.slots()[2].color().0, 3);
}

#[test]
fn scanner_runs_without_collaborators() {
    let root = tempfile::tempdir().unwrap();
    let config = ScannerConfig {
        session_root: root.path().to_path_buf(),
        ..Default::default()
    };
    let mut scanner = Scanner::new(config);
    for _ in 0..10 {
        let report = scanner.tick(0.1, &FrameInputs::default());
        assert!(!report.scanned);
    }
    assert!(scanner.store().history().is_empty());
}
