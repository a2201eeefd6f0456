use arrow::{
    array::{Array, ArrayRef, AsArray, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray},
    compute::cast,
    datatypes::{DataType, Date32Type, Float64Type, Int64Type},
};
use chrono::NaiveDate;

use crate::columns::{
    BIO_RATIO, DEMO_RATIO, DISTRICT, HIGH_STRESS, MONTH_DATE, STATE, STRESS_INDEX, TOTAL_ENROLMENTS,
};
use crate::error::{Result, StressError};
use crate::index::date_parser::days_to_date;
use crate::store::Dataset;

/// Typed, row-addressable face of an enriched [`Dataset`].
///
/// Holds the Arrow columns the views read; cloning is cheap because the
/// arrays share their buffers with the dataset.
#[derive(Debug, Clone)]
pub struct StressTable {
    state: StringArray,
    district: StringArray,
    month: Option<Date32Array>,
    demo: Option<Float64Array>,
    bio: Option<Float64Array>,
    enrolments: Option<Int64Array>,
    stress: Float64Array,
    high: BooleanArray,
}

fn required<'a>(dataset: &'a Dataset, name: &str) -> Result<&'a ArrayRef> {
    dataset
        .batch()
        .column_by_name(name)
        .ok_or_else(|| StressError::MissingColumn(name.to_string()))
}

fn text_column(column: &ArrayRef) -> Result<StringArray> {
    Ok(cast(column, &DataType::Utf8)?.as_string::<i32>().clone())
}

fn typed<T: arrow::datatypes::ArrowPrimitiveType>(
    column: &ArrayRef,
    dt: &DataType,
) -> Result<arrow::array::PrimitiveArray<T>> {
    Ok(cast(column, dt)?.as_primitive::<T>().clone())
}

impl StressTable {
    /// Bind the columns of an enriched dataset. `state` and `district` are
    /// checked here; the derived columns exist once enrichment ran.
    pub fn new(dataset: &Dataset) -> Result<Self> {
        let batch = dataset.batch();
        let optional_f64 = |name: &str| -> Result<Option<Float64Array>> {
            batch
                .column_by_name(name)
                .map(|c| typed::<Float64Type>(c, &DataType::Float64))
                .transpose()
        };

        Ok(Self {
            state: text_column(required(dataset, STATE)?)?,
            district: text_column(required(dataset, DISTRICT)?)?,
            month: batch
                .column_by_name(MONTH_DATE)
                .map(|c| typed::<Date32Type>(c, &DataType::Date32))
                .transpose()?,
            demo: optional_f64(DEMO_RATIO)?,
            bio: optional_f64(BIO_RATIO)?,
            enrolments: batch
                .column_by_name(TOTAL_ENROLMENTS)
                .map(|c| typed::<Int64Type>(c, &DataType::Int64))
                .transpose()?,
            stress: typed::<Float64Type>(required(dataset, STRESS_INDEX)?, &DataType::Float64)?,
            high: cast(required(dataset, HIGH_STRESS)?, &DataType::Boolean)?
                .as_boolean()
                .clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_months(&self) -> bool {
        self.month.is_some()
    }

    pub fn has_enrolments(&self) -> bool {
        self.enrolments.is_some()
    }

    pub fn row(&self, index: usize) -> Row<'_> {
        Row { table: self, index }
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        (0..self.len()).map(move |index| Row { table: self, index })
    }
}

fn value_f64(array: &Option<Float64Array>, i: usize) -> Option<f64> {
    array
        .as_ref()
        .filter(|a| a.is_valid(i))
        .map(|a| a.value(i))
        .filter(|v| !v.is_nan())
}

/// One record of a [`StressTable`]. Null text reads as "".
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a StressTable,
    index: usize,
}

impl<'a> Row<'a> {
    /// Position in the base dataset.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> &'a str {
        self.table.state.value(self.index)
    }

    pub fn district(&self) -> &'a str {
        self.table.district.value(self.index)
    }

    pub fn month(&self) -> Option<NaiveDate> {
        self.table
            .month
            .as_ref()
            .filter(|a| a.is_valid(self.index))
            .and_then(|a| days_to_date(a.value(self.index)))
    }

    pub fn demo_ratio(&self) -> Option<f64> {
        value_f64(&self.table.demo, self.index)
    }

    pub fn bio_ratio(&self) -> Option<f64> {
        value_f64(&self.table.bio, self.index)
    }

    pub fn enrolments(&self) -> Option<i64> {
        self.table
            .enrolments
            .as_ref()
            .filter(|a| a.is_valid(self.index))
            .map(|a| a.value(self.index))
    }

    pub fn stress_index(&self) -> Option<f64> {
        let stress = &self.table.stress;
        Some(stress)
            .filter(|a| a.is_valid(self.index))
            .map(|a| a.value(self.index))
            .filter(|v| !v.is_nan())
    }

    pub fn is_high_stress(&self) -> bool {
        let high = &self.table.high;
        high.is_valid(self.index) && high.value(self.index)
    }
}
