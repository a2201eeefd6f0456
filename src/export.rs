use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Float64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use once_cell::sync::Lazy;
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use regex::Regex;
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::info;

use crate::aggregate::RankedDistrict;
use crate::config::ExportFormat;
use crate::filter::Region;

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("valid regex"));

/// `high_stress_districts_<region>.<ext>`, with the region made filename-safe.
pub fn file_name(region: &Region, format: ExportFormat) -> String {
    let region = UNSAFE_CHARS.replace_all(region.label(), "_");
    format!("high_stress_districts_{}.{}", region, format.extension())
}

/// Write the ranking as CSV: `district,state,total_stress_index`.
pub fn write_csv<W: Write>(rows: &[RankedDistrict], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["district", "state", "total_stress_index"])?;
    for row in rows {
        let score = row
            .total_stress_index
            .map(|v| v.to_string())
            .unwrap_or_default();
        wtr.write_record([row.district.as_str(), row.state.as_str(), score.as_str()])?;
    }
    wtr.flush().context("flushing CSV export")?;
    Ok(())
}

fn ranking_batch(rows: &[RankedDistrict]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("district", DataType::Utf8, false),
        Field::new("state", DataType::Utf8, false),
        Field::new("total_stress_index", DataType::Float64, true),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.district.as_str()))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.state.as_str()))),
        Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.total_stress_index))),
    ];
    RecordBatch::try_new(schema, columns).context("building ranking batch")
}

/// Write the ranking as a single-row-group Parquet file.
pub fn write_parquet<W: Write + Send>(rows: &[RankedDistrict], writer: W) -> Result<()> {
    let batch = ranking_batch(rows)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(writer, batch.schema(), Some(props))
        .context("creating parquet writer")?;
    writer.write(&batch).context("writing ranking batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

/// Export `rows` into `dir`, writing to a temp file first and renaming over
/// the final name. Returns the written path.
pub fn export_ranking(
    rows: &[RankedDistrict],
    region: &Region,
    dir: &Path,
    format: ExportFormat,
) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating export directory {}", dir.display()))?;
    let name = file_name(region, format);
    let path = dir.join(&name);
    let tmp = dir.join(format!(".{}.tmp", name));

    let file = File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    match format {
        ExportFormat::Csv => write_csv(rows, file)?,
        ExportFormat::Parquet => write_parquet(rows, file)?,
    }
    fs::rename(&tmp, &path)
        .with_context(|| format!("renaming {} -> {}", tmp.display(), path.display()))?;

    info!(path = %path.display(), rows = rows.len(), "exported priority list");
    Ok(path)
}
