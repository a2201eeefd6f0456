//! Column names shared by the loader, the enrichment step and the views.

pub const STATE: &str = "state";
pub const DISTRICT: &str = "district";
pub const MONTH: &str = "month";
pub const DEMO_RATIO: &str = "demo_update_ratio";
pub const BIO_RATIO: &str = "bio_update_ratio";
pub const TOTAL_ENROLMENTS: &str = "total_enrolments";
pub const STRESS_INDEX: &str = "total_stress_index";
pub const HIGH_STRESS: &str = "is_high_stress";

/// Parsed `month`, appended by enrichment. Only used for filtering and grouping.
pub const MONTH_DATE: &str = "month_date";

/// Schema metadata keys written by enrichment.
pub const META_THRESHOLD: &str = "stress.threshold";
pub const META_QUANTILE: &str = "stress.quantile";
