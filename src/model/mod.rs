pub mod analysis;
pub mod config;
pub mod extracted;
pub mod labels;

pub use analysis::*;
pub use config::{
    Config, ConfigFile, FeatureConfig, ProviderSettings, SearchConfig, ThresholdConfig,
};
pub use extracted::*;
