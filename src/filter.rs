use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::index::{Row, StressTable};

/// Selector label meaning "no region restriction".
pub const ALL_REGIONS: &str = "All India";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Region {
    #[default]
    All,
    State(String),
}

impl Region {
    /// `None`, "All" and "All India" select every state; anything else is an
    /// exact state name.
    pub fn parse(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            None | Some("") => Region::All,
            Some(s) if s.eq_ignore_ascii_case("all") || s == ALL_REGIONS => Region::All,
            Some(s) => Region::State(s.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Region::All => ALL_REGIONS,
            Region::State(s) => s,
        }
    }

    pub fn state(&self) -> Option<&str> {
        match self {
            Region::All => None,
            Region::State(s) => Some(s),
        }
    }

    pub fn matches(&self, state: &str) -> bool {
        match self {
            Region::All => true,
            Region::State(s) => s == state,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive range of date-only values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A reversed range contains nothing.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// What the user picked: a region and an optional date window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub region: Region,
    pub dates: Option<DateRange>,
}

impl Selection {
    pub fn new(region: Region, dates: Option<DateRange>) -> Self {
        Self { region, dates }
    }
}

/// A predicate over a borrowed [`StressTable`]. Rows are visited lazily, in
/// base order, every time the view is iterated.
#[derive(Debug, Clone)]
pub struct View<'a> {
    table: &'a StressTable,
    selection: Selection,
}

impl<'a> View<'a> {
    /// Every row, no restriction.
    pub fn all(table: &'a StressTable) -> Self {
        Self {
            table,
            selection: Selection::default(),
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn table(&self) -> &'a StressTable {
        self.table
    }

    fn keeps(&self, row: &Row<'_>) -> bool {
        if !self.selection.region.matches(row.state()) {
            return false;
        }
        // without a month column the date window has nothing to act on
        match (self.selection.dates, self.table.has_months()) {
            (Some(range), true) => row.month().is_some_and(|d| range.contains(d)),
            _ => true,
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'a>> + '_ {
        self.table.rows().filter(move |row| self.keeps(row))
    }

    pub fn len(&self) -> usize {
        self.rows().count()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().next().is_none()
    }
}

/// Restrict `table` to `region` and the inclusive `dates` window.
pub fn filter(table: &StressTable, region: Region, dates: Option<DateRange>) -> View<'_> {
    View {
        table,
        selection: Selection::new(region, dates),
    }
}
