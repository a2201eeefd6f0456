// src/index/mod.rs
//! Stress index derivation.
//!
//! `enrich` normalises the known numeric columns, derives
//! `total_stress_index` and `is_high_stress` when the source lacks them, and
//! parses `month` into `month_date`. Columns the source already supplies are
//! kept as they are, so enriching twice is the same as enriching once.

use arrow::{
    array::{Array, ArrayRef, AsArray, BooleanArray, Float64Array},
    compute::kernels::numeric::add,
    datatypes::{Field, FieldRef, Float64Type, Schema},
    record_batch::{RecordBatch, RecordBatchOptions},
};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info};

use crate::columns::{
    BIO_RATIO, DEMO_RATIO, HIGH_STRESS, META_QUANTILE, META_THRESHOLD, MONTH, MONTH_DATE,
    STRESS_INDEX, TOTAL_ENROLMENTS,
};
use crate::error::Result;
use crate::store::{Dataset, SourceId};

pub mod convert;
pub mod date_parser;
pub mod quantile;
pub mod table;

pub use table::{Row, StressTable};

/// Rows strictly above this quantile of the national index are high stress.
pub const DEFAULT_QUANTILE: f64 = 0.95;

/// [`enrich_with`] at the default 95th percentile.
pub fn enrich(dataset: &Dataset) -> Result<Dataset> {
    enrich_with(dataset, DEFAULT_QUANTILE)
}

#[tracing::instrument(
    level = "info",
    skip(dataset),
    fields(id = %dataset.source().short(), rows = dataset.num_rows())
)]
pub fn enrich_with(dataset: &Dataset, q: f64) -> Result<Dataset> {
    let batch = dataset.batch();
    let schema = batch.schema();
    let rows = batch.num_rows();

    // 1) normalise the columns we know, keep everything else untouched
    let mut fields: Vec<FieldRef> = Vec::with_capacity(schema.fields().len() + 3);
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len() + 3);
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        let name = field.name().as_str();
        let normalised = match name {
            DEMO_RATIO | BIO_RATIO | STRESS_INDEX => convert::to_f64(name, column)?,
            TOTAL_ENROLMENTS => convert::to_i64(name, column)?,
            HIGH_STRESS => convert::to_bool(name, column)?,
            MONTH_DATE => convert::to_date32(name, column)?,
            _ => {
                fields.push(Arc::clone(field));
                columns.push(Arc::clone(column));
                continue;
            }
        };
        debug!(column = name, nulls = convert::nulls(&normalised), "normalised column");
        fields.push(Arc::new(Field::new(
            name,
            normalised.data_type().clone(),
            true,
        )));
        columns.push(normalised);
    }

    let position = |fields: &[FieldRef], name: &str| fields.iter().position(|f| f.name() == name);
    let mut metadata = schema.metadata().clone();

    // 2) total_stress_index = demo + bio, a missing ratio counts as zero
    if position(&fields, STRESS_INDEX).is_none() {
        let zeros: ArrayRef = Arc::new(Float64Array::from(vec![0.0; rows]));
        let demo = position(&fields, DEMO_RATIO).map_or_else(|| Arc::clone(&zeros), |i| Arc::clone(&columns[i]));
        let bio = position(&fields, BIO_RATIO).map_or_else(|| Arc::clone(&zeros), |i| Arc::clone(&columns[i]));
        let stress = add(&demo, &bio)?;
        debug!(nulls = stress.null_count(), "derived stress index");
        fields.push(Arc::new(Field::new(STRESS_INDEX, stress.data_type().clone(), true)));
        columns.push(stress);
    }

    // 3) is_high_stress: strictly above the quantile of the full dataset
    if position(&fields, HIGH_STRESS).is_none() {
        let stress_idx = position(&fields, STRESS_INDEX).unwrap_or(fields.len() - 1);
        let stress = columns[stress_idx].as_primitive::<Float64Type>();
        let values: Vec<f64> = stress.iter().flatten().filter(|v| !v.is_nan()).collect();

        let flags = match quantile::quantile(&values, q) {
            Some(threshold) => {
                metadata.insert(META_THRESHOLD.to_string(), threshold.to_string());
                metadata.insert(META_QUANTILE.to_string(), q.to_string());
                let flags: BooleanArray = stress
                    .iter()
                    .map(|v| Some(v.is_some_and(|v| v > threshold)))
                    .collect();
                info!(
                    threshold,
                    quantile = q,
                    flagged = flags.true_count(),
                    "flagged high-stress rows"
                );
                flags
            }
            None => {
                info!("no stress values; nothing flagged");
                BooleanArray::from(vec![false; rows])
            }
        };
        fields.push(Arc::new(Field::new(HIGH_STRESS, flags.data_type().clone(), true)));
        columns.push(Arc::new(flags));
    }

    // 4) month → month_date, failing on any malformed cell
    if position(&fields, MONTH_DATE).is_none() {
        if let Some(i) = position(&fields, MONTH) {
            let dates = convert::to_date32(MONTH, &columns[i])?;
            debug!(nulls = dates.null_count(), "parsed month column");
            fields.push(Arc::new(Field::new(MONTH_DATE, dates.data_type().clone(), true)));
            columns.push(dates);
        }
    }

    let schema = Arc::new(Schema::new_with_metadata(fields, metadata));
    let options = RecordBatchOptions::new().with_row_count(Some(rows));
    let batch = RecordBatch::try_new_with_options(schema, columns, &options)?;
    Ok(Dataset::new(dataset.source().clone(), batch))
}

/// Enriched datasets keyed by source identity.
///
/// Owned by whoever opens sessions, so the quantile sort runs once per
/// snapshot no matter how often a view is re-filtered.
#[derive(Debug)]
pub struct IndexCache {
    quantile: f64,
    entries: HashMap<SourceId, Arc<Dataset>>,
}

impl Default for IndexCache {
    fn default() -> Self {
        Self::new(DEFAULT_QUANTILE)
    }
}

impl IndexCache {
    pub fn new(quantile: f64) -> Self {
        Self {
            quantile,
            entries: HashMap::new(),
        }
    }

    pub fn quantile(&self) -> f64 {
        self.quantile
    }

    /// Enriched form of `dataset`, computed on first request for its source id.
    pub fn enrich(&mut self, dataset: &Dataset) -> Result<Arc<Dataset>> {
        if let Some(hit) = self.entries.get(dataset.source()) {
            debug!(id = %dataset.source().short(), "index cache hit");
            return Ok(Arc::clone(hit));
        }
        let enriched = Arc::new(enrich_with(dataset, self.quantile)?);
        self.entries
            .insert(dataset.source().clone(), Arc::clone(&enriched));
        Ok(enriched)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StressError;
    use anyhow::Result;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,stressmap::index=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    const BIHAR: &str = "state,district,month,demo_update_ratio,bio_update_ratio\n\
Bihar,Patna,2024-01-01,0.3,0.4\n\
Bihar,Gaya,2024-01-01,0.1,0.1\n";

    fn stress_of(ds: &Dataset) -> Vec<Option<f64>> {
        ds.batch()
            .column_by_name(STRESS_INDEX)
            .unwrap()
            .as_primitive::<Float64Type>()
            .iter()
            .collect()
    }

    fn flags_of(ds: &Dataset) -> Vec<bool> {
        ds.batch()
            .column_by_name(HIGH_STRESS)
            .unwrap()
            .as_boolean()
            .iter()
            .map(|v| v.unwrap_or(false))
            .collect()
    }

    /// CSV with one district per value and no month column.
    fn csv_of(values: &[f64]) -> String {
        let mut csv = String::from("state,district,demo_update_ratio,bio_update_ratio\n");
        for (i, v) in values.iter().enumerate() {
            csv.push_str(&format!("S{},D{},{},0\n", i % 7, i, v));
        }
        csv
    }

    #[test]
    fn stress_is_sum_of_ratios() -> Result<()> {
        init_test_logging();
        let ds = enrich(&Dataset::from_csv_str(BIHAR)?)?;
        let stress = stress_of(&ds);
        assert!((stress[0].unwrap() - 0.7).abs() < 1e-12);
        assert!((stress[1].unwrap() - 0.2).abs() < 1e-12);
        assert!(ds.has_column(MONTH_DATE));
        Ok(())
    }

    #[test]
    fn missing_ratio_counts_as_zero() -> Result<()> {
        let ds = enrich(&Dataset::from_csv_str(
            "state,district,bio_update_ratio\nGoa,North Goa,0.25\n",
        )?)?;
        assert_eq!(stress_of(&ds), vec![Some(0.25)]);
        Ok(())
    }

    #[test]
    fn blank_ratio_gives_null_index() -> Result<()> {
        let ds = enrich(&Dataset::from_csv_str(
            "state,district,demo_update_ratio,bio_update_ratio\nGoa,North Goa,,0.25\nGoa,South Goa,0.1,0.1\n",
        )?)?;
        assert_eq!(stress_of(&ds)[0], None);
        assert!(!flags_of(&ds)[0]);
        Ok(())
    }

    #[test]
    fn supplied_columns_are_not_overwritten() -> Result<()> {
        let ds = enrich(&Dataset::from_csv_str(
            "state,district,demo_update_ratio,bio_update_ratio,total_stress_index,is_high_stress\n\
Kerala,Kochi,0.1,0.1,9.5,False\n\
Kerala,Idukki,0.1,0.1,0.2,True\n",
        )?)?;
        assert_eq!(stress_of(&ds), vec![Some(9.5), Some(0.2)]);
        assert_eq!(flags_of(&ds), vec![false, true]);
        assert_eq!(ds.threshold(), None);
        Ok(())
    }

    #[test]
    fn enrich_is_idempotent() -> Result<()> {
        let once = enrich(&Dataset::from_csv_str(BIHAR)?)?;
        let twice = enrich(&once)?;
        assert_eq!(once, twice);

        let values: Vec<f64> = (0..57).map(|i| f64::from(i % 13) * 0.17).collect();
        let once = enrich(&Dataset::from_csv_str(&csv_of(&values))?)?;
        assert_eq!(enrich(&once)?, once);
        Ok(())
    }

    #[test]
    fn top_five_percent_is_flagged() -> Result<()> {
        let values: Vec<f64> = (1..=100).map(f64::from).collect();
        let ds = enrich(&Dataset::from_csv_str(&csv_of(&values))?)?;
        let threshold = ds.threshold().expect("threshold recorded");
        assert!((threshold - 95.05).abs() < 1e-9);

        let flags = flags_of(&ds);
        let stress = stress_of(&ds);
        assert_eq!(flags.iter().filter(|f| **f).count(), 5);
        for (flag, v) in flags.iter().zip(&stress) {
            assert_eq!(*flag, v.unwrap() > threshold);
        }
        Ok(())
    }

    #[test]
    fn ties_at_threshold_are_not_flagged() -> Result<()> {
        // the top four rows sit exactly on the 95th percentile
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 9.0, 9.0, 9.0, 9.0];
        let ds = enrich(&Dataset::from_csv_str(&csv_of(&values))?)?;
        assert_eq!(ds.threshold(), Some(9.0));
        assert!(flags_of(&ds).iter().all(|f| !f));
        Ok(())
    }

    #[test]
    fn empty_dataset_flags_nothing() -> Result<()> {
        let ds = enrich(&Dataset::from_csv_str(
            "state,district,month,demo_update_ratio,bio_update_ratio\n",
        )?)?;
        assert_eq!(ds.num_rows(), 0);
        assert!(ds.has_column(HIGH_STRESS));
        assert_eq!(ds.threshold(), None);
        assert_eq!(enrich(&ds)?, ds);
        Ok(())
    }

    #[test]
    fn malformed_month_fails_enrichment() -> Result<()> {
        let raw = Dataset::from_csv_str(
            "state,district,month,demo_update_ratio,bio_update_ratio\n\
Bihar,Patna,2024-01-01,0.3,0.4\n\
Bihar,Gaya,sometime,0.1,0.1\n",
        )?;
        match enrich(&raw) {
            Err(StressError::Parse { column, row, .. }) => {
                assert_eq!(column, MONTH);
                assert_eq!(row, 1);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn negative_ratios_pass_through() -> Result<()> {
        let ds = enrich(&Dataset::from_csv_str(
            "state,district,demo_update_ratio,bio_update_ratio\nGoa,North Goa,-0.5,0.2\n",
        )?)?;
        assert!((stress_of(&ds)[0].unwrap() + 0.3).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn cache_enriches_once_per_source() -> Result<()> {
        let raw = Dataset::from_csv_str(BIHAR)?;
        let mut cache = IndexCache::default();
        let a = cache.enrich(&raw)?;
        let b = cache.enrich(&raw)?;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        let other = Dataset::from_csv_str(&csv_of(&[1.0, 2.0]))?;
        let c = cache.enrich(&other)?;
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
        Ok(())
    }
}
