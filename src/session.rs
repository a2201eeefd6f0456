use chrono::NaiveDate;
use serde::Serialize;
use std::{collections::BTreeSet, sync::Arc};
use tracing::{debug, info};

use crate::aggregate::{self, Metrics, MonthMean, RankedDistrict};
use crate::config::{Config, MapScope};
use crate::error::Result;
use crate::filter::{filter, DateRange, Region, Selection, View, ALL_REGIONS};
use crate::geo::{self, GeoBounds, MapPoint};
use crate::index::{IndexCache, StressTable};
use crate::store::{self, Dataset};

/// Read-only handle on one enriched snapshot.
///
/// Cloning shares the dataset; every selection builds its own view.
#[derive(Debug, Clone)]
pub struct Session {
    dataset: Arc<Dataset>,
    table: StressTable,
    map_scope: MapScope,
    top_n: usize,
}

/// Everything the presentation layer draws for one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub title: String,
    pub region: String,
    pub dates: Option<DateRange>,
    pub threshold: Option<f64>,
    /// Flagged rows in the current view, present only when there are some.
    pub alert: Option<usize>,
    pub metrics: Metrics,
    pub map_scope: MapScope,
    pub map: Vec<MapPoint>,
    pub bounds: GeoBounds,
    pub trend: Vec<MonthMean>,
    pub ranking: Vec<RankedDistrict>,
}

impl Session {
    /// Load `config.input` and enrich it through `cache`.
    pub fn open(config: &Config, cache: &mut IndexCache) -> Result<Self> {
        let raw = store::load(&config.input)?;
        Self::from_dataset(&raw, cache, config.map_scope, config.top_n)
    }

    pub fn from_dataset(
        raw: &Dataset,
        cache: &mut IndexCache,
        map_scope: MapScope,
        top_n: usize,
    ) -> Result<Self> {
        let dataset = cache.enrich(raw)?;
        let table = StressTable::new(&dataset)?;
        info!(
            rows = table.len(),
            threshold = ?dataset.threshold(),
            "session ready"
        );
        Ok(Self {
            dataset,
            table,
            map_scope,
            top_n,
        })
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn table(&self) -> &StressTable {
        &self.table
    }

    pub fn view(&self, selection: &Selection) -> View<'_> {
        filter(&self.table, selection.region.clone(), selection.dates)
    }

    /// "All India" followed by every distinct state, sorted.
    pub fn region_options(&self) -> Vec<String> {
        let states: BTreeSet<&str> = self
            .table
            .rows()
            .map(|r| r.state())
            .filter(|s| !s.trim().is_empty())
            .collect();
        std::iter::once(ALL_REGIONS)
            .chain(states)
            .map(str::to_string)
            .collect()
    }

    /// Earliest and latest month in the data; the date picker's defaults.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut months = self.table.rows().filter_map(|r| r.month());
        let first = months.next()?;
        Some(months.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Default selection: every region over the full date range.
    pub fn default_selection(&self) -> Selection {
        Selection::new(
            Region::All,
            self.date_bounds().map(|(lo, hi)| DateRange::new(lo, hi)),
        )
    }

    pub fn render(&self, selection: &Selection) -> DashboardView {
        let view = self.view(selection);
        let metrics = aggregate::metrics(&view);
        debug!(region = %selection.region, rows = metrics.rows, "rendering selection");

        let map_rows = match self.map_scope {
            MapScope::National => aggregate::by_state(&View::all(&self.table)),
            MapScope::Filtered => aggregate::by_state(&view),
        };

        DashboardView {
            title: match &selection.region {
                Region::All => "National".to_string(),
                Region::State(s) => s.clone(),
            },
            region: selection.region.label().to_string(),
            dates: selection.dates,
            threshold: self.dataset.threshold(),
            alert: (metrics.high_risk_count > 0).then_some(metrics.high_risk_count),
            map_scope: self.map_scope,
            map: geo::resolve(&map_rows),
            bounds: geo::bounds_for(selection.region.state()),
            trend: aggregate::by_month(&view),
            ranking: aggregate::top_districts(&view, self.top_n),
            metrics,
        }
    }
}
