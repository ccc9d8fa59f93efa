pub mod cache_config;
pub mod paths;
pub mod run_config;
pub use cache_config::{ChiL3Config, MesiThreeLevelConfig};
pub use paths::Layout;
pub use run_config::{CacheClass, CheckpointMode, CpuType, Isa, RunConfig};
