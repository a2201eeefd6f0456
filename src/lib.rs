pub mod aggregate;
pub mod columns;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod geo;
pub mod index;
pub mod report;
pub mod session;
pub mod store;

pub use error::{Result, StressError};
pub use session::{DashboardView, Session};
pub use store::{load, Dataset, SourceId};
