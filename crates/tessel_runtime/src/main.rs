//! Tessel Runtime
//!
//! Headless smoke loop: boots the recorder on the null backend, records a
//! few seconds of the cube scene and reports frame statistics.
//!
//! Usage: `tessel [settings.json]`

mod scene;

use anyhow::{Context, Result};
use tessel_asset::AssetLoader;
use tessel_metrics::FrameTimer;
use tessel_render::{ClearFlags, DebugFlags, InitSettings, PlatformData, Renderer, ViewId};
use tracing_subscriber::EnvFilter;

const FRAMES: u32 = 180;
const TICK_SECS: f32 = 1.0 / 60.0;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Tessel v{}", tessel_core::VERSION);

    let settings = match std::env::args().nth(1) {
        Some(path) => InitSettings::from_json_file(&path)
            .with_context(|| format!("failed to load settings from {path}"))?,
        None => InitSettings::default(),
    };
    let (width, height, reset) = (
        settings.resolution.width,
        settings.resolution.height,
        settings.resolution.reset,
    );

    let mut renderer = Renderer::init(settings, PlatformData::default())
        .context("failed to initialize renderer")?;
    renderer.reset(width, height, reset)?;
    renderer.set_debug(renderer.debug_flags() | DebugFlags::TEXT);
    renderer.set_view_clear(
        ViewId(0),
        ClearFlags::COLOR | ClearFlags::DEPTH,
        0x3030_30ff,
        1.0,
        0,
    );

    let loader = AssetLoader::from_env();
    let mut cubes = scene::Cubes::new(&mut renderer, &loader)?;
    let mut timer = FrameTimer::new(60);

    for frame in 0..FRAMES {
        let dt = timer.tick();
        cubes.update(&mut renderer, frame as f32 * TICK_SECS, dt.as_secs_f64() * 1000.0)?;
        renderer.frame()?;

        if frame % 60 == 59 {
            let stats = renderer.stats();
            tracing::info!(
                "frame {}: {} draws, {} primitives, {} KiB transient, {:.3} ms",
                stats.frame,
                stats.num_draws,
                stats.num_primitives,
                stats.transient.vertex_bytes / 1024,
                stats.cpu_time_ms
            );
        }
    }

    let (min_ms, max_ms) = timer.frame_time_range_ms();
    tracing::info!(
        "{} frames recorded, {:.3} ms avg ({:.3}..{:.3}), {} transient cubes skipped",
        FRAMES,
        timer.frame_time_ms(),
        min_ms,
        max_ms,
        cubes.skipped()
    );

    cubes.destroy(&mut renderer)?;
    renderer.shutdown();
    Ok(())
}
