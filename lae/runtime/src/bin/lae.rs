//! LAE command line runner
//!
//! Run with: cargo run --release --bin lae -- 4 input.json output.json --report

use clap::Parser;
use lae_runtime::tree::input;
use lae_runtime::{
    ComputationNode, EngineConfig, ExecutorConfig, LaeError, LaeResult, LinearAlgebraEngine,
    RunOutput,
};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "lae")]
#[command(about = "Evaluate a matrix expression tree on a fatigue-aware worker pool")]
#[command(version)]
struct Cli {
    /// Number of worker threads
    threads: usize,

    /// Expression tree (JSON)
    input: PathBuf,

    /// Where to write the result or the error (JSON)
    output: PathBuf,

    /// Print the worker report after the run
    #[arg(long)]
    report: bool,

    /// Run row tasks inline on the calling thread
    #[arg(long)]
    sequential: bool,

    /// Random seed for worker fatigue factors
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let outcome = match evaluate(&cli) {
        Ok(result) => RunOutput::Result(result),
        Err(e) => {
            error!("evaluation failed: {e}");
            RunOutput::Error(e.to_string())
        }
    };

    if let Err(e) = outcome.write_to(&cli.output) {
        eprintln!("Error: cannot write {}: {e}", cli.output.display());
        std::process::exit(1);
    }
}

fn evaluate(cli: &Cli) -> LaeResult<Vec<Vec<f64>>> {
    let tree = input::parse_file(&cli.input)?;
    let config = EngineConfig {
        executor: ExecutorConfig {
            seed: cli.seed,
            ..ExecutorConfig::with_threads(cli.threads)
        },
        parallel: !cli.sequential,
    };
    let threads = if cli.sequential { 1 } else { cli.threads };
    let mut engine = LinearAlgebraEngine::with_config(config)?;

    let start = Instant::now();
    let result = engine.run(tree);
    info!(
        "evaluated {} on {} thread(s) in {:.3}ms",
        display_name(&cli.input),
        threads,
        start.elapsed().as_secs_f64() * 1000.0
    );

    if cli.report {
        println!("{}", engine.worker_report());
    }
    let shutdown = engine.shutdown();
    settle(result, shutdown)
}

/// The run's outcome wins over a failed shutdown, which is only logged
fn settle(
    result: LaeResult<ComputationNode>,
    shutdown: LaeResult<()>,
) -> LaeResult<Vec<Vec<f64>>> {
    if let Err(e) = shutdown {
        warn!("executor shutdown failed: {e}");
    }
    result?
        .into_matrix()
        .ok_or_else(|| LaeError::IllegalState("run finished without a literal".to_string()))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
