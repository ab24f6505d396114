//! bigtest - capacity and performance sweeps for the grouper classifier
//!
//! `bigtest run` walks bit-lengths, rule counts and memory budgets,
//! benchmarks every configuration worth running and writes one CSV row
//! per configuration. `bigtest levels` and `bigtest solve` answer the
//! planning questions without running anything.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use grouper_planner::{Configuration, MemoryLevels, GB};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grouper_bench::output::{self, format_duration, LevelRow, OutputFormat};
use grouper_bench::{
    build_plan, listed_levels, round_file_name, run_round, solve, BenchConfig, BenchError,
    BenchResult, RunOptions,
};

/// bigtest CLI
#[derive(Parser)]
#[command(name = "bigtest")]
#[command(about = "Capacity and performance sweeps for the grouper classifier", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level
    #[arg(long, global = true, env = "GROUPER_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, global = true, env = "GROUPER_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Run a benchmark sweep
    Run(RunArgs),

    /// List the memory levels of a bits/rules pair
    Levels {
        #[arg(short, long)]
        bits: u64,

        #[arg(short, long)]
        rules: u64,

        /// Enumeration ceiling in bytes
        #[arg(long, default_value_t = 2 * GB)]
        max_space: u64,

        /// At most this many evenly spaced levels
        #[arg(short = 'm', long)]
        max_mem_steps: Option<usize>,

        /// Coarse plus fine sampling with this many levels in total
        #[arg(short = 'M', long = "massive-test")]
        massive: Option<usize>,

        /// Only levels with these table counts
        #[arg(short, long, value_delimiter = ',')]
        tables: Option<Vec<u64>>,

        /// Output format (table, json, yaml)
        #[arg(short, long, default_value = "table")]
        output: OutputFormat,
    },

    /// Bounds, verdict and minimum table count for one memory budget
    Solve {
        #[arg(short, long)]
        bits: u64,

        #[arg(short, long)]
        rules: u64,

        /// Memory budget in bytes
        #[arg(short, long)]
        memory: u64,

        /// Output format (table, json, yaml)
        #[arg(short, long, default_value = "table")]
        output: OutputFormat,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Base name of the result file(s)
    #[arg(short, long)]
    output: Option<String>,

    /// Classifier executable
    #[arg(short, long)]
    program: Option<String>,

    /// Sweep every enumerated memory level
    #[arg(short, long)]
    all_tests: bool,

    /// Number of rounds
    #[arg(short = 'r', long = "repeat", default_value_t = 1,
          value_parser = clap::value_parser!(u64).range(1..))]
    rounds: u64,

    /// Pattern width for all-tests and massive modes
    #[arg(short, long)]
    bits: Option<u64>,

    /// Packets per measurement, in thousands
    #[arg(short, long)]
    data_size: Option<u64>,

    /// Step file (YAML, TOML or JSON), needed unless running all tests
    #[arg(short, long, env = "GROUPER_CONFIG")]
    config: Option<String>,

    /// At most this many evenly spaced memory levels per rule count
    #[arg(short = 'm', long)]
    max_mem_steps: Option<usize>,

    /// Comma-separated rule counts
    #[arg(short = 'l', long, value_delimiter = ',')]
    rule_steps: Option<Vec<u64>>,

    /// Coarse plus fine sampling with this many levels in total
    #[arg(short = 'M', long = "massive-test")]
    massive: Option<usize>,

    /// Dry run: generate fixtures but fake the timings
    #[arg(short = 'T', long = "testrun")]
    dry_run: bool,

    /// Directory for generated fixtures
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Seed for fixture generation
    #[arg(long)]
    seed: Option<u64>,
}

impl RunArgs {
    fn options(&self) -> RunOptions {
        RunOptions {
            all_tests: self.all_tests,
            bits: self.bits,
            rule_steps: self.rule_steps.clone(),
            max_mem_steps: self.max_mem_steps,
            massive: self.massive,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json);

    let result = match cli.command {
        Commands::Run(args) => run(args),
        Commands::Levels {
            bits,
            rules,
            max_space,
            max_mem_steps,
            massive,
            tables,
            output,
        } => {
            let levels = MemoryLevels::new(bits, rules, max_space);
            let rows: Vec<LevelRow> =
                listed_levels(levels, max_mem_steps, massive, tables.as_deref())
                    .into_iter()
                    .map(LevelRow::from)
                    .collect();
            output::print_output(rows, output)
        }
        Commands::Solve {
            bits,
            rules,
            memory,
            output,
        } => output::print_single(&solve(Configuration::new(bits, rules, memory)), output),
    };

    if let Err(e) = result {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}

fn init_tracing(level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.to_string().into());

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn run(args: RunArgs) -> BenchResult<()> {
    let mut config = BenchConfig::load(args.config.as_deref())?;
    if let Some(program) = &args.program {
        config.program = program.clone();
    }
    if let Some(data_size) = args.data_size {
        config.data_size = data_size;
    }
    if let Some(work_dir) = &args.work_dir {
        config.work_dir = work_dir.clone();
    }
    config.validate()?;

    let (plan, prefix) = build_plan(&config, &args.options())?;
    let base = args.output.clone().unwrap_or(prefix);
    let rounds = usize::try_from(args.rounds)
        .map_err(|_| BenchError::Config(format!("too many rounds: {}", args.rounds)))?;

    let started = Utc::now();
    for round in 0..rounds {
        let path = round_file_name(&base, round, rounds);
        let round_started = Utc::now();

        let report = run_round(&config, &plan, &path, args.dry_run, args.seed)?;

        info!(
            round = round + 1,
            took = %format_duration(Utc::now() - round_started),
            "Round finished"
        );
        if !report.abandoned_bits.is_empty() {
            output::print_warning(&format!(
                "CPU time fell below timer resolution for bit-lengths {:?}; \
                 increase the data size and try again",
                report.abandoned_bits
            ));
        }
        output::print_success(&format!("{}: {}", path.display(), report));
    }

    info!(took = %format_duration(Utc::now() - started), "Total runtime");
    Ok(())
}
