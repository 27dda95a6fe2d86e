use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use lumen::{ChunkCoord, LumenConfig, VoxelWorld, config, load_registry};

#[derive(Parser, Debug)]
#[command(name = "lumen", about = "Headless chunk streaming and lighting run")]
struct Args {
    /// Config file; defaults apply when omitted
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Number of update ticks to run
    #[arg(long, default_value_t = 600)]
    ticks: u32,
    /// Observer speed in blocks per tick along +X
    #[arg(long, default_value_t = 0.5)]
    speed: f32,
    /// Target tick length in milliseconds
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,
    /// Override the world seed
    #[arg(long)]
    seed: Option<i32>,
    /// Override the load radius (chunks)
    #[arg(long)]
    radius: Option<i32>,
    /// Override the worker count (0 = all cores)
    #[arg(long)]
    workers: Option<usize>,
    /// Use the flat generator
    #[arg(long, default_value_t = false)]
    flat: bool,
    /// Place a torch at the spawn surface and report the light around it
    #[arg(long, default_value_t = false)]
    torch: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let (mut cfg, base_dir) = match &args.config {
        Some(path) => {
            let cfg = config::load_from_path(path)?;
            let dir = path.parent().map(PathBuf::from).unwrap_or_default();
            (cfg, dir)
        }
        None => (LumenConfig::default(), PathBuf::from(".")),
    };
    if let Some(seed) = args.seed {
        cfg.world.seed = seed;
    }
    if let Some(radius) = args.radius {
        cfg.stream.load_radius = radius.max(0);
    }
    if let Some(workers) = args.workers {
        cfg.stream.workers = workers;
    }
    if args.flat {
        cfg.world.mode = lumen_world::worldgen::Mode::Flat;
    }

    let reg = load_registry(&cfg, &base_dir)?;
    let mut world = VoxelWorld::from_config(reg.clone(), &cfg)?;
    log::info!(
        "world: {} sections, seed {}, mode {:?}, radius {}",
        cfg.world.sections,
        cfg.world.seed,
        cfg.world.mode,
        cfg.stream.load_radius
    );

    let t0 = Instant::now();
    for dz in -1..=1 {
        for dx in -1..=1 {
            if let Err(e) = world.load_now(ChunkCoord::new(dx, dz)) {
                log::warn!("spawn chunk ({dx}, {dz}) failed: {e}");
            }
        }
    }
    log::info!("spawn area ready in {} ms", t0.elapsed().as_millis());

    if args.torch {
        place_torch(&mut world, &reg)?;
    }

    let tick = Duration::from_millis(args.tick_ms);
    let mut x = 8.0f32;
    let z = 8.0f32;
    let mut rebuilt = 0usize;
    for i in 0..args.ticks {
        let started = Instant::now();
        let report = world.update(x, z);
        for coord in world.ready_chunks().collect::<Vec<_>>() {
            if world.consume_geometry_dirty(coord.cx, coord.cz) {
                rebuilt += 1;
            }
            world.consume_lighting_dirty(coord.cx, coord.cz);
        }
        if i % 60 == 0 {
            let s = world.stats();
            log::info!(
                "tick {i} x={x:.1}: ready {} pending {} inflight {} (jobs {}/{}) stitch {} | +{} -{} fail {} drop {}",
                s.ready,
                s.pending,
                s.inflight,
                s.jobs_queued,
                s.jobs_running,
                s.relight_queued,
                report.completed,
                report.unloaded,
                s.counters.failed,
                s.counters.dropped
            );
        }
        x += args.speed;
        if let Some(rest) = tick.checked_sub(started.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    let s = world.stats();
    println!(
        "resident {} ready {} dispatched {} completed {} discarded {} failed {} meshes {}",
        s.resident,
        s.ready,
        s.counters.dispatched,
        s.counters.completed,
        s.counters.discarded,
        s.counters.failed,
        rebuilt
    );
    Ok(())
}

fn place_torch(world: &mut VoxelWorld, reg: &lumen::BlockRegistry) -> Result<(), Box<dyn std::error::Error>> {
    let torch = reg
        .block_by_name("torch")
        .ok_or("block registry has no 'torch'")?;
    let top = world.dims().height() as i32 - 1;
    let Some(y) = (0..top).rev().find(|&y| !world.get_voxel(8, y, 8).is_air()) else {
        log::warn!("no ground under spawn; torch skipped");
        return Ok(());
    };
    let (tx, ty, tz) = (8, y + 1, 8);
    if !world.set_voxel(tx, ty, tz, torch) {
        log::warn!("torch at ({tx}, {ty}, {tz}) rejected");
        return Ok(());
    }
    for d in 0..=4 {
        println!(
            "block light at +{d}: {} (sky {})",
            world.get_block_light(tx + d, ty, tz),
            world.get_sky_light(tx + d, ty, tz)
        );
    }
    Ok(())
}
