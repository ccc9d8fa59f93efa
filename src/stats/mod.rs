pub mod model;
pub mod plot;
pub mod report;
pub use model::{Distribution, StatsFile};
pub use report::{CacheSummary, RunSummary};
