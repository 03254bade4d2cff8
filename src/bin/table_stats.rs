use anyhow::{Context, Result};
use clap::Parser;
use prettytable::{format, Cell, Row, Table};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use tariffcmp::{
    compare::{metrics::metrics_from_bundle, quality::quality_from_bundle},
    config::{DEFAULT_ALLOWANCES_DIR, DEFAULT_TABLES_DIR},
    CompareError, DataPaths, TableStore,
};

/// Print salary statistics for every known table (or the given ones).
#[derive(Parser, Debug)]
#[command(author, version, about = "Salary statistics per remuneration table")]
struct Args {
    /// Tables to show; defaults to all under the tables directory
    tables: Vec<String>,

    #[arg(long, env = "TARIFFCMP_TABLES_DIR", default_value = DEFAULT_TABLES_DIR)]
    tables_dir: PathBuf,

    #[arg(long, env = "TARIFFCMP_ALLOWANCES_DIR", default_value = DEFAULT_ALLOWANCES_DIR)]
    allowances_dir: PathBuf,
}

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr) // Log to stderr
        .init();

    let args = Args::parse();
    let store = TableStore::new(DataPaths::new(&args.tables_dir, &args.allowances_dir));

    let names = if args.tables.is_empty() {
        store.list_tables().context("listing tables")?
    } else {
        args.tables
    };
    if names.is_empty() {
        println!(
            "No tables found under {}.",
            store.paths().tables_dir.display()
        );
        return Ok(());
    }
    tracing::info!("Collecting statistics for {} tables.", names.len());

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.add_row(Row::new(vec![
        Cell::new("Table").style_spec("bFg"),
        Cell::new("Cells").style_spec("bFg"),
        Cell::new("Mean").style_spec("bFg"),
        Cell::new("Median").style_spec("bFg"),
        Cell::new("Min").style_spec("bFg"),
        Cell::new("Max").style_spec("bFg"),
        Cell::new("Spread").style_spec("bFg"),
        Cell::new("Monotone").style_spec("bFg"),
        Cell::new("Outliers").style_spec("bFg"),
    ]));

    for name in &names {
        let bundle = store
            .load_bundle(name)
            .with_context(|| format!("loading table {}", name))?;
        let quality = quality_from_bundle(&bundle);
        match metrics_from_bundle(&bundle) {
            Ok(m) => {
                table.add_row(Row::new(vec![
                    Cell::new(name),
                    Cell::new(&m.count.to_string()).style_spec("r"),
                    Cell::new(&format!("{:.2}", m.mean)).style_spec("r"),
                    Cell::new(&format!("{:.2}", m.median)).style_spec("r"),
                    Cell::new(&format!("{:.2}", m.min)).style_spec("r"),
                    Cell::new(&format!("{:.2}", m.max)).style_spec("r"),
                    Cell::new(&format!("{:.2}", m.spread)).style_spec("r"),
                    Cell::new(if quality.monotone { "yes" } else { "no" }),
                    Cell::new(&quality.outliers.to_string()).style_spec("r"),
                ]));
            }
            Err(CompareError::EmptyData { .. }) => {
                tracing::warn!(table = %name, "no numeric salary values");
                let mut cells = vec![Cell::new(name), Cell::new("0").style_spec("r")];
                cells.extend((0..7).map(|_| Cell::new("-")));
                table.add_row(Row::new(cells));
            }
            Err(e) => return Err(e.into()),
        }
    }

    println!("\n--- Table Statistics ---");
    table.printstd();
    Ok(())
}
