pub mod monitor;
pub mod paths;

pub use monitor::{MonitorConfig, ScrapeConfig, StrategyPreference};
pub use paths::ConfigPaths;
