use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::{io, path::PathBuf};
use stressmap::{
    config::{Config, ExportFormat, MapScope},
    export,
    filter::{DateRange, Region, Selection},
    index::IndexCache,
    report, Session,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Identity stress dashboard: filter, aggregate and rank district stress scores"
)]
struct Args {
    /// YAML config file; command-line flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input CSV, Parquet or ZIP file, or a glob pattern
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// State to drill into ("All India" for the national view)
    #[arg(short, long)]
    region: Option<String>,

    /// First month to include (YYYY-MM-DD); defaults to the earliest in the data
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last month to include (YYYY-MM-DD); defaults to the latest in the data
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Number of districts in the priority list
    #[arg(short, long)]
    top: Option<usize>,

    /// Rows feeding the map
    #[arg(long, value_enum)]
    map_scope: Option<MapScope>,

    /// Write the priority list to the export directory
    #[arg(long)]
    export: bool,

    #[arg(long, value_enum)]
    export_format: Option<ExportFormat>,

    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Print the dashboard as JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn build_config(args: &Args) -> Result<Config> {
    let mut cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(input) = &args.input {
        cfg.input = input.clone();
    }
    if let Some(top) = args.top {
        cfg.top_n = top;
    }
    if let Some(scope) = args.map_scope {
        cfg.map_scope = scope;
    }
    if let Some(format) = args.export_format {
        cfg.export_format = format;
    }
    if let Some(dir) = &args.export_dir {
        cfg.export_dir = dir.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // ─── 1) init logging ─────────────────────────────────────────────
    let default_filter = if args.verbose {
        "info,stressmap=debug"
    } else {
        "info"
    };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(io::stderr)
        .init();
    info!("startup");

    // ─── 2) config ───────────────────────────────────────────────────
    let cfg = build_config(&args)?;

    // ─── 3) load + enrich once ───────────────────────────────────────
    let mut cache = IndexCache::new(cfg.quantile);
    let session = Session::open(&cfg, &mut cache)
        .with_context(|| format!("cannot open dataset {}", cfg.input.display()))?;

    // ─── 4) selection ────────────────────────────────────────────────
    let region = Region::parse(args.region.as_deref());
    if let Region::State(name) = &region {
        if !session.region_options().iter().any(|o| o == name) {
            warn!(region = %name, "region not present in data");
        }
    }
    let bounds = session.date_bounds();
    let dates = match (args.start, args.end, bounds) {
        (None, None, None) => None,
        (start, end, Some((lo, hi))) => {
            Some(DateRange::new(start.unwrap_or(lo), end.unwrap_or(hi)))
        }
        (start, end, None) => Some(DateRange::new(
            start.unwrap_or(NaiveDate::MIN),
            end.unwrap_or(NaiveDate::MAX),
        )),
    };
    let selection = Selection::new(region, dates);

    // ─── 5) render ───────────────────────────────────────────────────
    let view = session.render(&selection);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        report::render_dashboard(&view, &mut io::stdout().lock())?;
    }

    // ─── 6) export ───────────────────────────────────────────────────
    if args.export {
        if view.ranking.is_empty() {
            info!("nothing to export for current selection");
        } else {
            let path = export::export_ranking(
                &view.ranking,
                &selection.region,
                &cfg.export_dir,
                cfg.export_format,
            )?;
            eprintln!("priority list written to {}", path.display());
        }
    }

    info!("all done");
    Ok(())
}
