#![forbid(unsafe_code)]
//! Shared primitives for the commissioning test workspace: identifiers,
//! error envelopes, configuration and canonical hashing.

pub mod canonical;
mod config;
mod errors;
mod types {
    pub mod ids;
}

pub use config::{resolve_config_path, CommtestConfig};
pub use errors::{ConfigPathScope, Error, ExitCode, MachineError, Result};
pub use types::ids::{AssetId, CellId, InputId, JobId, ResultId, TestId, ID_MAX_LEN};

pub const CRATE_NAME: &str = "commtest-core";

pub const ENV_COMMTEST_LOG_LEVEL: &str = "COMMTEST_LOG_LEVEL";
pub const ENV_COMMTEST_LOG_JSON: &str = "COMMTEST_LOG_JSON";
pub const ENV_COMMTEST_DATA_DIR: &str = "COMMTEST_DATA_DIR";
pub const ENV_COMMTEST_CONFIG: &str = "COMMTEST_CONFIG";
