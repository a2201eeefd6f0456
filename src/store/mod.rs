// src/store/mod.rs
use arrow::{
    compute::concat_batches,
    datatypes::SchemaRef,
    record_batch::RecordBatch,
};
use bytes::Bytes;
use glob::glob;
use sha2::{Digest, Sha256};
use std::{
    fmt,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::columns::META_THRESHOLD;
use crate::error::{Result, StressError};

pub mod reader;

/// Identity of a loaded snapshot: SHA-256 over the length and raw bytes of
/// every file read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceId(String);

impl SourceId {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self::of_parts([bytes])
    }

    pub fn of_parts<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            // length prefix keeps file boundaries part of the identity
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        SourceId(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, enough for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One tabular snapshot held as a single Arrow batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    source: SourceId,
    batch: RecordBatch,
}

impl Dataset {
    pub fn new(source: SourceId, batch: RecordBatch) -> Self {
        Self { source, batch }
    }

    /// Parse CSV text held in memory. The source id is the hash of the text.
    pub fn from_csv_str(text: &str) -> Result<Self> {
        let batch = reader::read_csv(text.as_bytes())?;
        Ok(Self::new(SourceId::of_bytes(text.as_bytes()), batch))
    }

    pub fn source(&self) -> &SourceId {
        &self.source
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.batch.schema().column_with_name(name).is_some()
    }

    /// The high-stress threshold recorded by enrichment, if one was computed.
    pub fn threshold(&self) -> Option<f64> {
        self.batch
            .schema()
            .metadata()
            .get(META_THRESHOLD)
            .and_then(|s| s.parse().ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Csv,
    Parquet,
    Zip,
}

impl SourceKind {
    fn of(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("parquet") | Some("pq") => SourceKind::Parquet,
            Some("zip") => SourceKind::Zip,
            _ => SourceKind::Csv,
        }
    }
}

fn is_pattern(source: &str) -> bool {
    source.contains(['*', '?', '['])
}

/// Load `source` into a [`Dataset`].
///
/// `source` is a CSV, Parquet or ZIP file, or a glob pattern matching several
/// files with one column layout; directories a pattern matches are skipped.
/// An absent file, or a pattern matching no file, is [`StressError::NotFound`].
#[tracing::instrument(level = "info", skip(source), fields(source = %source.as_ref().display()))]
pub fn load(source: impl AsRef<Path>) -> Result<Dataset> {
    let source = source.as_ref();
    let text = source.to_string_lossy();

    let paths: Vec<PathBuf> = if is_pattern(&text) && !source.exists() {
        let mut matched: Vec<PathBuf> = glob(&text)?
            .filter_map(|p| p.ok())
            .filter(|p| p.is_file())
            .collect();
        matched.sort();
        matched
    } else if source.is_file() {
        vec![source.to_path_buf()]
    } else {
        Vec::new()
    };

    if paths.is_empty() {
        return Err(StressError::NotFound {
            path: source.to_path_buf(),
        });
    }

    let mut raw = Vec::with_capacity(paths.len());
    let mut batches = Vec::with_capacity(paths.len());
    for path in &paths {
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StressError::NotFound { path: path.clone() },
            _ => StressError::Io(e),
        })?;
        let bytes = Bytes::from(bytes);
        let batch = match SourceKind::of(path) {
            SourceKind::Csv => reader::read_csv(&bytes)?,
            SourceKind::Parquet => reader::read_parquet(bytes.clone(), path)?,
            SourceKind::Zip => reader::read_zip(&bytes, path)?,
        };
        debug!(path = %path.display(), rows = batch.num_rows(), "read source file");

        let mismatched = batches
            .first()
            .is_some_and(|first: &RecordBatch| first.schema().fields() != batch.schema().fields());
        if mismatched {
            return Err(StressError::SchemaMismatch { path: path.clone() });
        }
        raw.push(bytes);
        batches.push(batch);
    }

    let schema = batches[0].schema();
    let batch = if batches.len() == 1 {
        batches.remove(0)
    } else {
        concat_batches(&schema, &batches)?
    };
    let id = SourceId::of_parts(raw.iter().map(|b| &b[..]));

    info!(
        files = paths.len(),
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        id = %id.short(),
        "loaded dataset"
    );
    Ok(Dataset::new(id, batch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use tempfile::tempdir;

    const SAMPLE: &str = "state,district,month,demo_update_ratio,bio_update_ratio\n\
Bihar,Patna,2024-01-01,0.3,0.4\n\
Bihar,Gaya,2024-01-01,0.1,0.1\n";

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("final_uidai_data.csv");
        match load(&path) {
            Err(StressError::NotFound { path: p }) => assert_eq!(p, path),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn empty_pattern_is_not_found() {
        let dir = tempdir().unwrap();
        let pattern = dir.path().join("*.csv");
        assert!(matches!(load(&pattern), Err(StressError::NotFound { .. })));
    }

    #[test]
    fn loads_csv_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("data.csv");
        fs::File::create(&path)?.write_all(SAMPLE.as_bytes())?;

        let ds = load(&path)?;
        assert_eq!(ds.num_rows(), 2);
        assert!(ds.has_column("district"));
        assert!(!ds.has_column("total_enrolments"));
        assert_eq!(ds.source(), &SourceId::of_bytes(SAMPLE.as_bytes()));
        assert_eq!(ds, Dataset::from_csv_str(SAMPLE)?);
        Ok(())
    }

    #[test]
    fn pattern_concatenates_in_path_order() -> Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join("b.csv"),
            "state,district,month\nKerala,Kochi,2024-02-01\n",
        )?;
        fs::write(
            dir.path().join("a.csv"),
            "state,district,month\nBihar,Patna,2024-01-01\nBihar,Gaya,2024-01-01\n",
        )?;

        let ds = load(dir.path().join("*.csv"))?;
        assert_eq!(ds.num_rows(), 3);
        let states = ds
            .batch()
            .column_by_name("state")
            .unwrap()
            .as_any()
            .downcast_ref::<arrow::array::StringArray>()
            .unwrap()
            .iter()
            .map(|s| s.unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(states, vec!["Bihar", "Bihar", "Kerala"]);
        Ok(())
    }

    #[test]
    fn pattern_skips_directories() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("a.csv"), "state,district\nBihar,Patna\n")?;
        fs::create_dir(dir.path().join("archive"))?;

        let ds = load(dir.path().join("*"))?;
        assert_eq!(ds.num_rows(), 1);
        Ok(())
    }

    #[test]
    fn directory_is_not_found() {
        let dir = tempdir().unwrap();
        match load(dir.path()) {
            Err(StressError::NotFound { path }) => assert_eq!(path, dir.path()),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn loads_parquet_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("data.parquet");
        let batch = Dataset::from_csv_str(SAMPLE)?.batch().clone();
        let mut writer =
            parquet::arrow::ArrowWriter::try_new(fs::File::create(&path)?, batch.schema(), None)?;
        writer.write(&batch)?;
        writer.close()?;

        let ds = load(&path)?;
        assert_eq!(ds.num_rows(), 2);
        assert_eq!(ds.source(), &SourceId::of_bytes(&fs::read(&path)?));
        Ok(())
    }

    #[test]
    fn pattern_rejects_mixed_layouts() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("a.csv"), "state,district\nBihar,Patna\n")?;
        fs::write(dir.path().join("b.csv"), "state,month\nBihar,2024-01-01\n")?;

        let err = load(dir.path().join("*.csv")).unwrap_err();
        assert!(matches!(err, StressError::SchemaMismatch { .. }));
        Ok(())
    }

    #[test]
    fn source_id_tracks_content() {
        let a = SourceId::of_bytes(b"one");
        let b = SourceId::of_bytes(b"two");
        assert_ne!(a, b);
        assert_eq!(a, SourceId::of_parts([b"one".as_slice()]));
        assert_ne!(
            SourceId::of_parts([b"o".as_slice(), b"ne".as_slice()]),
            SourceId::of_parts([b"on".as_slice(), b"e".as_slice()])
        );
        assert_ne!(a, SourceId::of_parts([b"o".as_slice(), b"ne".as_slice()]));
        assert_eq!(a.short().len(), 12);
    }
}
