pub mod config;
pub mod resources;
pub mod sim;
pub mod stats;
pub mod term;
pub mod util;
