//! Entry loop: read the handshake and one world snapshot per tick from
//! stdin, call the planner, print the chosen command to stdout (spec §6,
//! §10). All physics and search logic lives in `strategy-core`; this binary
//! is the thin line-delimited-JSON boundary adapter.

mod wire;

use std::io::{BufRead, Write};
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use strategy_core::config::tuning;
use strategy_core::Planner;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let debug_mode = std::env::var("DEBUG_STRATEGY").map(|v| !v.is_empty()).unwrap_or(false);
    init_logging(debug_mode)?;

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut lines = stdin.lock().lines();

    let Some(handshake) = lines.next() else {
        // Clean EOF before the handshake even arrives: nothing to do.
        return Ok(());
    };
    let cfg = wire::parse_handshake(&handshake?)?;
    tracing::info!(width = cfg.game_width, height = cfg.game_height, "handshake parsed");

    let mut planner = Planner::new();
    let mut rng = seed_rng();
    let mut tick: u64 = 0;

    for line in lines {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let observed = wire::parse_tick(&line, tick, &cfg)?;

        let started = Instant::now();
        let decision = planner.tick(observed, &cfg, &mut rng);
        let elapsed = started.elapsed();

        let mut debug = decision.debug;
        if elapsed.as_secs_f32() > tuning::AVG_TICK_TIME_SECS {
            tracing::warn!(elapsed_ms = elapsed.as_millis(), "slow tick");
            debug = format!("{debug}; slow tick: {:.1}ms", elapsed.as_secs_f32() * 1000.0);
        }

        let output = wire::WireOutput::from_command(decision.command, debug, debug_mode);
        serde_json::to_writer(&mut out, &output)?;
        out.write_all(b"\n")?;
        out.flush()?;

        tick += 1;
    }

    Ok(())
}

/// Seed the tip-selection PRNG (spec §5, "seeding for reproducibility").
/// `STRATEGY_SEED`, when set, pins the seed so an identical input stream
/// reproduces byte-identical output; otherwise a fresh seed is drawn so
/// repeated runs explore different branches.
fn seed_rng() -> SmallRng {
    let seed = std::env::var("STRATEGY_SEED")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or_else(|| rand::rng().random::<u64>());
    SmallRng::seed_from_u64(seed)
}

/// Initialize `tracing`: stderr always (stdout is reserved for the wire
/// protocol), plus a fixed-path file layer when `DEBUG_STRATEGY` is set
/// (spec §6.2).
fn init_logging(debug_mode: bool) -> anyhow::Result<()> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_filter(filter());

    if debug_mode {
        let file = std::fs::OpenOptions::new().create(true).append(true).open("strategy-debug.log")?;
        let file_layer = tracing_subscriber::fmt::layer().with_writer(file).with_ansi(false).with_filter(filter());
        tracing_subscriber::registry().with(stderr_layer).with(file_layer).init();
    } else {
        tracing_subscriber::registry().with(stderr_layer).init();
    }
    Ok(())
}
