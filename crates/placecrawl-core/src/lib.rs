pub mod app_config;
pub mod config;
pub mod record;
pub mod targets;

pub use app_config::{AppConfig, StorageMode, MAX_WORKERS};
pub use config::{load_app_config, load_app_config_from_env};
pub use record::{
    EntityId, MasterIdSet, MenuItem, ReviewSnippet, SecondaryRatings, StoreRecord,
};
pub use targets::{load_targets, CrawlTarget, TargetsFile};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read targets file {path}: {source}")]
    TargetsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse targets file: {0}")]
    TargetsFileParse(#[from] serde_yaml::Error),

    #[error("targets validation failed: {0}")]
    Validation(String),
}
