//! # vmcu
//!
//! Virtual microcontroller runner. Compiles a sketch against a resource
//! directory, boots a board with the configured pins and drivers, and
//! drives the emulation tick loop for a fixed number of ticks.
//!
//! # Usage
//!
//! ```bash
//! # Run a sketch as described by run.toml
//! vmcu --config run.toml
//!
//! # Override the tick count, verbose logging
//! vmcu --config run.toml --ticks 1000 -v
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use vmcu_common::config::{ConfigLoader, RunConfig};
use vmcu_core::{Board, Sketch, SketchConfig, Status, Toolchain};

/// vmcu - compile and run a sketch on a virtual board
#[derive(Parser, Debug)]
#[command(name = "vmcu")]
#[command(version)]
#[command(about = "Virtual microcontroller board runner")]
#[command(long_about = None)]
struct Args {
    /// Path to the TOML run description.
    #[arg(short, long, default_value = "run.toml")]
    config: PathBuf,

    /// Override the number of ticks from the run description.
    #[arg(long)]
    ticks: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("vmcu run failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    setup_tracing(&args);

    info!("vmcu v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = RunConfig::load(&args.config)?;
    config.validate()?;
    if let Some(ticks) = args.ticks {
        config.run.ticks = ticks.max(1);
    }

    let mut toolchain = Toolchain::new(&config.toolchain.resource_dir);
    if let Some(e) = toolchain.check_suitable_environment() {
        return Err(format!(
            "build environment at {} is unusable: {}",
            config.toolchain.resource_dir.display(),
            e
        )
        .into());
    }

    let mut sketch = Sketch::new(
        &config.toolchain.sketch,
        SketchConfig {
            fqbn: config.toolchain.fqbn.clone(),
        },
    );
    info!(
        sketch = %config.toolchain.sketch.display(),
        fqbn = %config.toolchain.fqbn,
        "compiling sketch"
    );
    if let Some(e) = toolchain.compile(&mut sketch) {
        let (_, stderr) = toolchain.build_log();
        if !stderr.is_empty() {
            eprintln!("{stderr}");
        }
        return Err(format!("sketch compilation failed: {e}").into());
    }

    let exited = Arc::new(AtomicBool::new(false));
    let exit_flag = Arc::clone(&exited);
    let mut board = Board::with_exit_notify(move |code| {
        info!(code, "sketch exited");
        exit_flag.store(true, Ordering::Release);
    });

    if !board.configure(config.board.clone()) {
        return Err("board rejected the configuration".into());
    }
    if !board.attach_sketch(&sketch) {
        return Err("board rejected the compiled sketch".into());
    }
    if !board.start() {
        board.tick(); // delivers the spawn-failure notification
        return Err("board failed to start the sketch".into());
    }

    let view = board.view();
    let tick_period = Duration::from_millis(config.run.tick_period_ms);
    info!(
        ticks = config.run.ticks,
        period_ms = config.run.tick_period_ms,
        "entering tick loop"
    );

    for tick in 0..config.run.ticks {
        board.tick();
        if exited.load(Ordering::Acquire) {
            debug!(tick, "sketch is gone, leaving tick loop");
            break;
        }
        if tick % 100 == 0 {
            log_pin_states(&view);
        }
        std::thread::sleep(tick_period);
    }

    match board.status() {
        Status::Running => {
            if !board.stop() {
                warn!("graceful stop failed, forcing termination");
                board.terminate();
            }
        }
        Status::Suspended => {
            board.terminate();
        }
        _ => {}
    }

    info!("vmcu run complete");
    Ok(())
}

fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn log_pin_states(view: &vmcu_core::BoardView) {
    for pin_id in view.pin_ids() {
        let pin = view.pin(pin_id);
        if !pin.exists() {
            continue;
        }
        let digital = pin.digital().read();
        let analog = pin.analog().read();
        debug!(pin = pin_id, ?digital, ?analog, "pin state");
    }
}
