use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::{io::Write, path::PathBuf};
use tariffcmp::{
    compare::{
        build_heatmap, build_progression_graph_data, build_progression_logic_comparison,
        calculate_metrics, check_quality, compare_allowances, compare_multiple_tables,
        simulate::{Components, SimulationParams, DEFAULT_STAGE_YEARS},
        simulate_lifetime,
    },
    DataPaths, TableStore,
};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Compare remuneration tables across collective agreements"
)]
struct Args {
    /// YAML file with `tables_dir` / `allowances_dir`
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding one sub-directory per table
    #[arg(long, env = "TARIFFCMP_TABLES_DIR", global = true)]
    tables_dir: Option<PathBuf>,

    /// Directory holding one sub-directory per allowance
    #[arg(long, env = "TARIFFCMP_ALLOWANCES_DIR", global = true)]
    allowances_dir: Option<PathBuf>,

    /// Indent the JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Full comparison payload for two or more tables
    Compare {
        /// Table names, e.g. TV-L TVöD-VKA
        #[arg(required = true)]
        tables: Vec<String>,
        /// Baseline table for focused comparisons
        #[arg(long)]
        baseline: Option<String>,
    },
    /// Cell-wise salary deltas
    Heatmap { base: String, compare: String },
    /// Salary progression series per group
    Graph { base: String, compare: String },
    /// Stage duration differences per group
    Logic { base: String, compare: String },
    /// Salary distribution of one table
    Metrics { table: String },
    /// Allowance overview and presence matrix
    Allowances {
        #[arg(required = true)]
        tables: Vec<String>,
    },
    /// Plausibility checks on one salary grid
    Quality { table: String },
    /// Year-by-year earnings of one group in two tables
    Simulate {
        base: String,
        compare: String,
        #[arg(long)]
        group: String,
        #[arg(long, default_value_t = 10)]
        years: u32,
        /// 1-based stage to start from
        #[arg(long, default_value_t = 1)]
        start_stage: usize,
        #[arg(long, default_value_t = 1.0)]
        work_factor: f64,
        /// Years per stage when the base table has no duration
        #[arg(long, default_value_t = DEFAULT_STAGE_YEARS)]
        default_duration: f64,
        /// Leave the grid salary out of the monthly amount
        #[arg(long)]
        exclude_base: bool,
        #[arg(long)]
        include_vwl: bool,
        #[arg(long)]
        include_allowances: bool,
        #[arg(long)]
        include_bonus: bool,
    },
    /// Names of all tables under the tables directory
    List,
}

fn resolve_paths(args: &Args) -> Result<DataPaths> {
    let base = match &args.config {
        Some(path) => DataPaths::from_yaml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DataPaths::default(),
    };
    Ok(base.with_overrides(args.tables_dir.clone(), args.allowances_dir.clone()))
}

fn emit<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", text).context("writing output")?;
    Ok(())
}

fn main() -> Result<()> {
    // logs go to stderr; stdout carries the JSON payload
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    let paths = resolve_paths(&args)?;
    debug!(?paths, "resolved data paths");
    let store = TableStore::new(paths);
    let pretty = args.pretty;

    match args.command {
        Command::Compare { tables, baseline } => {
            info!(tables = ?tables, baseline = ?baseline, "comparing tables");
            let payload = compare_multiple_tables(&store, tables.as_slice(), baseline.as_deref())?;
            emit(&payload, pretty)
        }
        Command::Heatmap { base, compare } => {
            emit(&build_heatmap(&store, &base, &compare)?, pretty)
        }
        Command::Graph { base, compare } => emit(
            &build_progression_graph_data(&store, &base, &compare)?,
            pretty,
        ),
        Command::Logic { base, compare } => emit(
            &build_progression_logic_comparison(&store, &base, &compare)?,
            pretty,
        ),
        Command::Metrics { table } => emit(&calculate_metrics(&store, &table)?, pretty),
        Command::Allowances { tables } => {
            emit(&compare_allowances(&store, tables.as_slice())?, pretty)
        }
        Command::Quality { table } => emit(&check_quality(&store, &table)?, pretty),
        Command::Simulate {
            base,
            compare,
            group,
            years,
            start_stage,
            work_factor,
            default_duration,
            exclude_base,
            include_vwl,
            include_allowances,
            include_bonus,
        } => {
            let params = SimulationParams {
                group,
                years,
                start_stage,
                work_factor,
                default_duration,
                components: Components {
                    base_salary: !exclude_base,
                    vwl: include_vwl,
                    flat_allowances: include_allowances,
                    annual_bonus: include_bonus,
                },
            };
            emit(
                &simulate_lifetime(&store, &base, &compare, &params)?,
                pretty,
            )
        }
        Command::List => emit(&store.list_tables()?, pretty),
    }
}
