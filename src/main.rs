use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    time::Instant,
};

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    error::FlowError,
    generator::RandomInstance,
    instance::FlowInstance,
    solver::{PushRelabel, SolverConfig},
};

pub mod checker;
pub mod dimacs;
pub mod dinic;
pub mod error;
pub mod generator;
pub mod global_relabel;
pub mod instance;
pub mod network;
pub mod push;
pub mod solver;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
pub struct Cli {
    /// Path to the flow instance.
    #[arg(short, long, required_unless_present = "random")]
    pub graph_path: Option<PathBuf>,
    /// Format of the flow instance file.
    #[arg(short, long, default_value = "dimacs")]
    pub format: Format,
    /// Solve a random instance with this many vertices instead of reading a file.
    #[arg(long, conflicts_with = "graph_path")]
    pub random: Option<usize>,
    /// Number of arcs of the random instance (defaults to 4 per vertex).
    #[arg(long, requires = "random")]
    pub arcs: Option<usize>,
    /// Largest capacity of the random instance.
    #[arg(long, default_value_t = 100)]
    pub max_capacity: isize,
    /// Seed of the random instance.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
    /// Number of threads to use (use all available threads if not specified).
    #[arg(short = 't', long)]
    pub num_of_threads: Option<usize>,
    /// Number of times to solve the instance.
    #[arg(short, long, default_value_t = 1)]
    pub repetitions: usize,
    /// Per-vertex weight of the global relabel threshold.
    #[arg(long, default_value_t = 6)]
    pub alpha: usize,
    /// Work charged for each visit of an active vertex.
    #[arg(long, default_value_t = 12)]
    pub beta: usize,
    /// Scale of the accumulated work compared with the global relabel threshold.
    #[arg(long, default_value_t = 0.5)]
    pub freq: f64,
    /// Skip the post-solve correctness check.
    #[arg(long)]
    pub no_check: bool,
    /// Compare the result with the sequential reference solver.
    #[arg(long)]
    pub verify: bool,
    /// Write the instance in DIMACS format before solving.
    #[arg(long)]
    pub write_dimacs: Option<PathBuf>,
}

#[derive(Debug, ValueEnum, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Dimacs,
    Json,
}

fn load(cli: &Cli) -> anyhow::Result<FlowInstance> {
    if let Some(vertices) = cli.random {
        let random = RandomInstance {
            vertices,
            arcs: cli.arcs.unwrap_or(4 * vertices),
            max_capacity: cli.max_capacity,
            seed: cli.seed,
        };
        return random.generate().map_err(Into::into);
    }
    let path = cli.graph_path.as_ref().context("no graph path given")?;
    match cli.format {
        Format::Dimacs => dimacs::read_from_file(path),
        Format::Json => FlowInstance::load_json(path),
    }
}

fn run(cli: &Cli, instance: &FlowInstance) -> anyhow::Result<isize> {
    let config = SolverConfig {
        alpha: cli.alpha,
        beta: cli.beta,
        freq: cli.freq,
        check: !cli.no_check,
    };
    let mut result = None;
    for iteration in 0..cli.repetitions.max(1) {
        let start = Instant::now();
        let solution = match PushRelabel::solve(instance, config) {
            Ok(solution) => solution,
            Err(err @ FlowError::CorrectnessViolation { .. }) => {
                error!("{}", err);
                std::process::abort();
            }
            Err(err) => return Err(err.into()),
        };
        info!(
            iteration,
            elapsed = ?start.elapsed(),
            rounds = solution.stats.rounds,
            global_relabels = solution.stats.global_relabels,
            relabels = solution.stats.relabels,
            pushes = solution.stats.pushes,
            "push_relabel_max_flow"
        );
        if result.is_some_and(|value| value != solution.max_flow) {
            warn!(iteration, value = solution.max_flow, "result changed between runs");
        }
        result = Some(solution.max_flow);
    }
    result.context("no run completed")
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("SYNCFLOW_LOG_LEVEL")
                .from_env_lossy(),
        )
        .init();
    let cli = Cli::parse();
    let thd_cnt = cli.num_of_threads.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|x| x.get())
            .unwrap_or(1)
    });
    rayon::ThreadPoolBuilder::new()
        .num_threads(thd_cnt)
        .build_global()?;
    let start = Instant::now();
    let instance = load(&cli)?;
    info!(
        n = instance.n,
        m = instance.m,
        elapsed = ?start.elapsed(),
        "instance loaded"
    );
    if let Some(path) = &cli.write_dimacs {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        dimacs::write(&mut writer, &instance)?;
        writer.flush()?;
        info!(path = %path.display(), "instance written");
    }
    let value = run(&cli, &instance)?;
    if cli.verify {
        let start = Instant::now();
        let expected = dinic::max_flow(&instance);
        info!(elapsed = ?start.elapsed(), "reference solver");
        if expected != value {
            bail!("max flow {} differs from reference value {}", value, expected);
        }
        info!("result matches reference solver");
    }
    println!("max flow: {}", value);
    Ok(())
}
