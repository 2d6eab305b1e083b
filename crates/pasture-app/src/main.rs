use anyhow::Result;
use pasture_core::{ControlCommand, PastureConfig, WorldState, apply_control_command};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Cadence of the headless run loop, matching a 60 Hz display refresh.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const DEMO_FRAMES: u64 = 600;
const LOG_INTERVAL: u64 = 120;

fn main() -> Result<()> {
    init_tracing();
    let mut world = bootstrap_world()?;
    info!("Starting pasture simulation shell");
    run_headless(&mut world)?;
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn bootstrap_world() -> Result<WorldState> {
    let config = PastureConfig {
        wolf_count: 4,
        sheep_count: 12,
        forage_rate: 0.02,
        rng_seed: Some(0xFACA_DE12_3456_789A),
        ..PastureConfig::default()
    };
    let mut world = WorldState::new(config)?;
    world.set_running(true);
    Ok(world)
}

fn run_headless(world: &mut WorldState) -> Result<()> {
    for frame in 0..DEMO_FRAMES {
        if !world.is_running() {
            break;
        }
        let events = world.step();
        if events.sheep_eaten > 0 {
            info!(
                tick = events.tick.0,
                eaten = events.sheep_eaten,
                remaining = world.sheep().len(),
                "wolves took sheep",
            );
        }
        if events.dog_recalled {
            info!(tick = events.tick.0, "guard dog recalled home");
        }
        if frame == DEMO_FRAMES / 2 {
            apply_control_command(world, ControlCommand::SetWolfSpeed(0.3))?;
            info!(tick = events.tick.0, "slowed wolves mid-run");
        }
        if frame % LOG_INTERVAL == 0 {
            log_latest_summary(world);
        }
        if world.sheep().is_empty() {
            info!(tick = events.tick.0, "flock is gone, stopping the run");
            apply_control_command(world, ControlCommand::SetRunning(false))?;
        }
        thread::sleep(FRAME_INTERVAL);
    }

    if let Some(summary) = world.history().last() {
        info!(
            tick = summary.tick.0,
            wolves = summary.wolves,
            sheep = summary.sheep,
            forage = summary.forage,
            "Run complete",
        );
    } else {
        warn!("Run completed without recording any tick summaries");
    }
    Ok(())
}

fn log_latest_summary(world: &WorldState) {
    if let Some(summary) = world.history().last() {
        info!(
            tick = summary.tick.0,
            wolves = summary.wolves,
            sheep = summary.sheep,
            forage = summary.forage,
            "population",
        );
    }
}
