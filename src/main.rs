//! Scancloud headless driver
//!
//! Usage: cargo run --release -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>       JSON scanner config (default: built-in defaults)
//!   --frames <N>          Frames to simulate at 60 Hz (default: 600)
//!   --scene-name <NAME>   Scene name used in session file names
//!   --color <PNG>         Color frame to sample point colors from
//!   --gpu                 Mirror the cloud into a headless wgpu surface
//!   --realtime            Pace frames to wall-clock time instead of running flat out

use std::path::Path;
use std::time::Duration;

use glam::{Mat4, Vec3};

use scancloud::core::camera::Camera;
use scancloud::core::config::ScannerConfig;
use scancloud::core::logging;
use scancloud::core::time::FixedStep;
use scancloud::mesh::source::{MeshId, box_mesh, grid_mesh};
use scancloud::render::GpuPointSurface;
use scancloud::scan::{ColorFrame, LodSurface, ObjectId, SceneObject, TriangleScene};
use scancloud::{FrameInputs, Scanner};

const ORBIT_RADIUS: f32 = 12.0;
const ORBIT_HEIGHT: f32 = 4.0;
/// Radians per second
const ORBIT_SPEED: f32 = 0.4;

fn main() {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    if let Err(e) = run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> scancloud::core::Result<()> {
    let mut config = match parse_str_arg(args, "--config") {
        Some(path) => ScannerConfig::load(Path::new(&path))?,
        None => ScannerConfig::default(),
    };
    if let Some(name) = parse_str_arg(args, "--scene-name") {
        config.scene_name = name;
    }
    let frames = parse_u32_arg(args, "--frames").unwrap_or(600);

    let color = match parse_str_arg(args, "--color") {
        Some(path) => {
            let image = image::open(&path)
                .map_err(|e| scancloud::core::Error::Config(format!("{}: {}", path, e)))?
                .to_rgba8();
            ColorFrame::new(image)
        }
        None => None,
    };

    println!("=== Scancloud ===");
    println!("Scene:    {}", config.scene_name);
    println!("Frames:   {}", frames);
    println!("Capacity: {}", config.ring_capacity);
    println!("Rays:     {}", config.rays_per_scan);
    println!();

    let mut scanner = Scanner::new(config);
    scanner.exclusions_mut().exclude_tag("no_scan");

    if args.iter().any(|a| a == "--gpu") {
        match pollster::block_on(GpuPointSurface::headless()) {
            Ok(surface) => scanner.attach_surface(Box::new(surface)),
            Err(e) => log::warn!("GPU surface unavailable, continuing without: {}", e),
        }
    }

    let scene = demo_scene();
    let realtime = args.iter().any(|a| a == "--realtime");
    let mut stepper = FixedStep::new(60.0);
    let dt = stepper.step_secs();
    let mut camera = Camera::new(Vec3::ZERO, 70.0, 16.0 / 9.0);
    let mut scans = 0u32;
    let mut frame = 0u32;

    while frame < frames {
        let steps = if realtime { stepper.advance() } else { 1 };
        if steps == 0 {
            std::thread::sleep(Duration::from_millis(1));
            continue;
        }

        for _ in 0..steps.min(frames - frame) {
            let angle = frame as f32 * dt * ORBIT_SPEED;
            camera.position = Vec3::new(angle.cos() * ORBIT_RADIUS, ORBIT_HEIGHT, angle.sin() * ORBIT_RADIUS);
            camera.set_look_at(Vec3::new(0.0, 1.0, 0.0), Vec3::Y);

            let inputs = FrameInputs {
                camera: Some(&camera),
                scene: Some(&scene),
                color: color.as_ref(),
            };
            if scanner.tick(dt, &inputs).scanned {
                scans += 1;
            }
            frame += 1;
        }
    }

    scanner.shutdown();

    println!("Scans:          {}", scans);
    println!("History points: {}", scanner.store().history().len());
    println!("Ring points:    {}", scanner.store().ring().len());
    println!("Seen triangles: {}", scanner.seen().seen_count());
    println!("Collision bakes: {}", scanner.seen().collision().bake_count());
    if let Some(paths) = scanner.persistence().and_then(|p| p.paths()) {
        println!("Session:        {}", paths.dir.display());
    }

    Ok(())
}

/// Ground plane, a few boxes and a pillar with a two-part LOD group
fn demo_scene() -> TriangleScene {
    let mut scene = TriangleScene::new();

    scene.add(
        SceneObject::new(ObjectId(1), "ground")
            .with_mesh(grid_mesh(MeshId(1), 60.0, 12), Mat4::IDENTITY),
    );

    let crate_mesh = box_mesh(MeshId(2), Vec3::splat(1.0));
    for (i, position) in [Vec3::new(4.0, 1.0, 0.0), Vec3::new(-3.0, 1.0, 3.0), Vec3::new(0.0, 1.0, -5.0)]
        .into_iter()
        .enumerate()
    {
        scene.add(
            SceneObject::new(ObjectId(10 + i as u32), format!("crate_{}", i))
                .with_mesh(crate_mesh.clone(), Mat4::from_translation(position)),
        );
    }

    let base = box_mesh(MeshId(3), Vec3::new(0.5, 1.5, 0.5));
    let cap = box_mesh(MeshId(4), Vec3::new(0.8, 0.3, 0.8));
    scene.add(
        SceneObject::new(ObjectId(20), "pillar")
            .with_lod_surface(LodSurface::new(base, Mat4::from_translation(Vec3::new(-4.0, 1.5, -3.0))))
            .with_lod_surface(LodSurface::new(cap, Mat4::from_translation(Vec3::new(-4.0, 3.3, -3.0)))),
    );

    // Never scanned
    scene.add(
        SceneObject::new(ObjectId(30), "marker")
            .with_tag("no_scan")
            .with_mesh(box_mesh(MeshId(5), Vec3::splat(0.3)), Mat4::from_translation(Vec3::new(2.0, 0.3, 2.0))),
    );

    scene
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
