use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::{error, info, LevelFilter};

use mantlebox::config;
use mantlebox::error::SimError;
use mantlebox::output::{create_sink, NullSink, OutputSink};
use mantlebox::physics::{self, RunSummary};
use mantlebox::solver::Problem;

/// Staggered-grid Stokes and advection-diffusion simulator
#[derive(Parser)]
#[command(name = "mantlebox")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "2-D Stokes / advection-diffusion simulator", long_about = None)]
struct Cli {
    /// Parameter file (.yaml/.yml, or the enter/set/leave line format)
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(filter)
        .parse_default_env()
        .format_timestamp_millis()
        .init();
}

fn simulate(path: &Path) -> Result<RunSummary, SimError> {
    let tree = config::load(path)?;
    let mut problem = Problem::from_params(&tree)?;
    problem.initialize()?;

    let mut sink: Box<dyn OutputSink> = match create_sink(problem.params(), problem.grid()) {
        Ok(sink) => sink,
        Err(e) => {
            error!("output disabled: {}", e);
            Box::new(NullSink)
        }
    };
    physics::run(&mut problem, sink.as_mut())
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    info!("reading parameters from {}", cli.config.display());

    match simulate(&cli.config) {
        Ok(summary) => info!(
            "done: {} steps, t={}, KE={:.6e}, max |div u|={:.3e}",
            summary.steps, summary.time, summary.fields.kinetic_energy, summary.fields.max_divergence
        ),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}
