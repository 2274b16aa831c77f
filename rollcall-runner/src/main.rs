mod app;
mod records;

use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rollcall_config::{load_config, validate, Config};
use rollcall_core::{SpawnRegion, SurfaceSize};
use rollcall_simulation::{Animation, AnimationSettings, SimulatorSettings};
use rollcall_transport::TransportController;

use crate::app::{App, AppSettings};
use crate::records::{MemoryStore, RecordService, RecordStore};

const SEED_NAMES: &[&str] = &["Ana", "Budi", "Citra", "Dewi", "Eko", "Fajar", "Gita", "Hadi"];

#[derive(Parser, Debug)]
#[command(author, version, about = "Roster ball panel runner", long_about = None)]
struct Args {
    /// Path to a JSON or TOML configuration file; defaults are used when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many seconds instead of waiting for Ctrl+C
    #[arg(short, long)]
    duration_secs: Option<u64>,

    /// Override the number of records the store starts with
    #[arg(short, long)]
    seed_records: Option<u32>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn animation_settings(config: &Config) -> AnimationSettings {
    let sim = &config.simulation;
    AnimationSettings {
        simulator: SimulatorSettings {
            tick: Duration::from_millis(sim.tick_ms),
            radius: sim.radius,
            min_extent: sim.min_extent,
            parallel_threshold: sim.parallel_threshold,
        },
        spawn: SpawnRegion {
            x: sim.spawn.x_min..sim.spawn.x_max,
            y: sim.spawn.y_min..sim.spawn.y_max,
            speed: sim.spawn.speed_min..sim.spawn.speed_max,
        },
        seed: sim.seed,
    }
}

fn seeded_store(count: u32, seed: Option<u64>) -> Result<MemoryStore, records::StoreError> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut store = MemoryStore::new();
    for _ in 0..count {
        let name = SEED_NAMES.choose(&mut rng).copied().unwrap_or("Student");
        store.insert(name, rng.gen_range(17..30))?;
    }
    Ok(store)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    let mut config = match &args.config {
        Some(path) => {
            info!("Using configuration from {}", path.display());
            load_config(path)?
        }
        None => {
            info!("No configuration file given, using defaults");
            Config::default()
        }
    };
    if let Some(count) = args.seed_records {
        config.records.seed_count = count;
    }
    validate(&config)?;

    let surface = SurfaceSize::new(config.surface.width, config.surface.height);
    let (animation, redraw) = Animation::start(animation_settings(&config), surface)?;

    let store = seeded_store(config.records.seed_count, config.simulation.seed)?;
    let (records, events) = RecordService::start(store)?;

    let transport = TransportController::from_config(&config.transport)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
        warn!("Failed to install Ctrl+C handler: {}", e);
    }

    let settings = AppSettings {
        max_fps: config.render.max_fps,
        log_frequency: config.render.log_frequency,
        churn_interval: config.records.churn_interval_ms.map(Duration::from_millis),
        target_records: config.records.seed_count as usize,
        seed: config.simulation.seed,
    };
    let deadline = args.duration_secs.map(|secs| Instant::now() + Duration::from_secs(secs));

    info!(
        "Ball panel {}x{} with {} records, tick {} ms",
        config.surface.width, config.surface.height, config.records.seed_count, config.simulation.tick_ms
    );
    let app = App::new(animation, redraw, records, events, transport, settings)?;
    let summary = app.run(&shutdown, deadline)?;

    info!(
        "Finished: {} frames rendered, {} sent, {} record events, {} balls at exit",
        summary.frames_rendered,
        summary.frames_sent,
        summary.record_events,
        summary.final_ids.len()
    );
    Ok(())
}
