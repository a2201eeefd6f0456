use anyhow::{Context, Result};
use arrow::array::Array;
use clap::Parser;
use prettytable::{format, Cell, Row, Table};
use std::path::PathBuf;
use stressmap::{
    columns::HIGH_STRESS,
    index::{enrich_with, DEFAULT_QUANTILE},
    store,
};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "inspect_dataset")]
#[command(about = "Show the columns of a stress dataset and what enrichment derives from it")]
struct Args {
    /// CSV, Parquet or ZIP file, or a glob pattern
    source: PathBuf,

    /// Quantile used for the high-stress flag
    #[arg(short, long, default_value_t = DEFAULT_QUANTILE)]
    quantile: f64,
}

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let raw = store::load(&args.source)
        .with_context(|| format!("loading {}", args.source.display()))?;
    let enriched = enrich_with(&raw, args.quantile).context("enriching dataset")?;

    println!("=== Dataset: {} ===", args.source.display());
    println!("Source id:        {}", raw.source());
    println!("Rows:             {}", raw.num_rows());
    match enriched.threshold() {
        Some(t) => println!("Threshold (q{}): {:.4}", args.quantile, t),
        None => println!("Threshold:        <supplied or empty>"),
    }
    let flagged = enriched
        .batch()
        .column_by_name(HIGH_STRESS)
        .and_then(|c| c.as_any().downcast_ref::<arrow::array::BooleanArray>())
        .map_or(0, |a| a.true_count());
    println!("High stress rows: {}", flagged);
    println!();

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.add_row(Row::new(vec![
        Cell::new("Column").style_spec("bFg"),
        Cell::new("Loaded As").style_spec("bFg"),
        Cell::new("Enriched As").style_spec("bFg"),
        Cell::new("Nulls").style_spec("bFg"),
    ]));
    let raw_schema = raw.schema();
    for (field, column) in enriched.schema().fields().iter().zip(enriched.batch().columns()) {
        let loaded = raw_schema
            .field_with_name(field.name())
            .map_or_else(|_| "(derived)".to_string(), |f| f.data_type().to_string());
        table.add_row(Row::new(vec![
            Cell::new(field.name()),
            Cell::new(&loaded),
            Cell::new(&field.data_type().to_string()),
            Cell::new(&column.null_count().to_string()).style_spec("r"),
        ]));
    }
    table.printstd();
    Ok(())
}
