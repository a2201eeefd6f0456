use arrow::{
    compute::concat_batches,
    csv::ReaderBuilder,
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::{
    io::{Cursor, Read},
    path::Path,
    sync::Arc,
};
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::{Result, StressError};

const BATCH_SIZE: usize = 8_192;

/// Trim whitespace, a UTF-8 BOM and outer quotes from a header cell.
pub fn clean_header(raw: &str) -> String {
    let trimmed = raw.trim_start_matches('\u{feff}').trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Read CSV bytes into one batch of text columns. Typing happens at enrichment.
pub fn read_csv(data: &[u8]) -> Result<RecordBatch> {
    let headers: Vec<String> = {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(Cursor::new(data));
        rdr.headers()?.iter().map(clean_header).collect()
    };

    let fields: Vec<Field> = headers
        .iter()
        .map(|n| Field::new(n, DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));
    if headers.is_empty() {
        warn!("CSV source has no header row");
        return Ok(RecordBatch::new_empty(schema));
    }

    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_header(true)
        .with_batch_size(BATCH_SIZE)
        .with_quote(b'"')
        .with_delimiter(b',')
        .build(Cursor::new(data))?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    debug!(columns = headers.len(), batches = batches.len(), "parsed CSV");

    Ok(concat_batches(&schema, &batches)?)
}

/// Read every row group of a Parquet file, keeping its column types.
pub fn read_parquet(data: Bytes, path: &Path) -> Result<RecordBatch> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(data)?.with_batch_size(BATCH_SIZE);
    let schema = Arc::clone(builder.schema());
    let reader = builder.build()?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    debug!(path = %path.display(), batches = batches.len(), "parsed Parquet");

    Ok(concat_batches(&schema, &batches)?)
}

/// Read the first `.csv` entry of a ZIP archive.
pub fn read_zip(data: &[u8], path: &Path) -> Result<RecordBatch> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if !entry.is_file() || !name.to_lowercase().ends_with(".csv") {
            debug!(entry = %name, "skipping archive entry");
            continue;
        }
        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut buf)?;
        debug!(entry = %name, bytes = buf.len(), "extracted CSV from archive");
        return read_csv(&buf);
    }

    warn!(path = %path.display(), "archive contains no CSV entry");
    Err(StressError::NotFound {
        path: path.join("*.csv"),
    })
}
