use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};

use crate::aggregate::DEFAULT_TOP_N;
use crate::index::DEFAULT_QUANTILE;

/// Which rows feed the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MapScope {
    /// The whole dataset, whatever the selection.
    #[default]
    National,
    /// The same filtered view as the trend and ranking.
    Filtered,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Parquet,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub input: PathBuf,
    pub top_n: usize,
    pub quantile: f64,
    pub map_scope: MapScope,
    pub export_dir: PathBuf,
    pub export_format: ExportFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from("final_uidai_data.csv"),
            top_n: DEFAULT_TOP_N,
            quantile: DEFAULT_QUANTILE,
            map_scope: MapScope::default(),
            export_dir: PathBuf::from("."),
            export_format: ExportFormat::default(),
        }
    }
}

impl Config {
    /// Read a YAML config; fields left out keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg: Config = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.quantile > 0.0 && self.quantile <= 1.0) {
            bail!("quantile must be in (0, 1], got {}", self.quantile);
        }
        if self.top_n == 0 {
            bail!("top_n must be at least 1");
        }
        Ok(())
    }
}
