mod camera;

use crate::camera::Camera;
use anyhow::{ensure, Context, Result};
use rand::prelude::*;
use raygeom::{DefaultRng, Intersect, Scene};
use rayon::prelude::*;
use std::{
    env,
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};

static DEFAULT_SCENE: &str = "scenes/csg.toml";
// Darkest to brightest
static RAMP: &[u8] = b" .:-=+*#%@";

// Casts a jittered grid of camera rays and shades every cell by how squarely the surface faces
// the viewer. Returns the frame as rows of characters and the number of rays cast.
fn render(scene: &Scene, camera: &Camera) -> (Vec<u8>, u64) {
    let settings = scene.settings();
    let width = settings.width as usize;
    let height = settings.height as usize;
    let samples = settings.samples.max(1);

    let mut buffer = vec![b' '; width * height];
    let ray_count = AtomicU64::new(0);

    buffer
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(row, line)| {
            // Seeded per row so the result does not depend on scheduling
            let mut rng = DefaultRng::seed_from_u64(settings.seed.wrapping_add(row as u64));

            for (col, cell) in line.iter_mut().enumerate() {
                let mut brightness = 0.0;

                for _ in 0..samples {
                    let s = (col as f64 + rng.gen::<f64>()) / width as f64;
                    let t = 1.0 - (row as f64 + rng.gen::<f64>()) / height as f64;
                    let ray = camera.ray(s, t, &mut rng);

                    if let Some(hit) = scene.intersection(&ray) {
                        brightness += hit.normal.dot(hit.ray_dir).abs();
                    }
                }

                brightness /= f64::from(samples);
                let level = (brightness * (RAMP.len() - 1) as f64).round() as usize;
                *cell = RAMP[level.min(RAMP.len() - 1)];
            }

            ray_count.fetch_add(u64::from(samples) * width as u64, Ordering::Relaxed);
        });

    (buffer, ray_count.load(Ordering::Relaxed))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = env::args().skip(1);
    let path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCENE));
    let frames: i64 = match args.next() {
        Some(frames) => frames
            .parse()
            .with_context(|| format!("frame count {:?} is not a number", frames))?,
        None => 1,
    };

    let mut scene =
        Scene::load(&path).with_context(|| format!("failed to load {}", path.display()))?;
    let settings = scene.settings().clone();
    ensure!(
        settings.width > 0 && settings.height > 0,
        "frame size {}x{} is empty",
        settings.width,
        settings.height
    );
    log::info!(
        "loaded {} with {} nodes",
        path.display(),
        scene.nodes().len()
    );

    rayon::ThreadPoolBuilder::new()
        .num_threads(settings.threads)
        .build_global()
        .context("failed to start the worker threads")?;

    // Terminal cells are roughly twice as tall as they are wide
    let aspect = f64::from(settings.width) / (2.0 * f64::from(settings.height));
    let camera = Camera::new(&settings.camera, aspect);

    for frame in 1..=frames {
        scene.begin_frame(frame);

        let start = Instant::now();
        let (buffer, rays) = render(&scene, &camera);
        let duration = start.elapsed();

        for line in buffer.chunks(settings.width as usize) {
            println!("{}", String::from_utf8_lossy(line));
        }

        let total_rays = rays as f64 / 1_000_000.0;
        let rays_per_second = total_rays / duration.as_secs_f64();
        println!(
            "Frame: {}\nTime elapsed: {:.2?}\nTotal Rays: {:.2}M\nRays per second: {:.2}M",
            frame, duration, total_rays, rays_per_second
        );
    }

    Ok(())
}
