//! Config loader (strict parsing).

pub mod schema;

use std::fs;

use promkit_core::error::{PromError, Result};

pub use schema::{AppConfig, PromOptions, ServerSection};

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| PromError::Internal(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<AppConfig> {
    let cfg: AppConfig = serde_yaml::from_str(s)
        .map_err(|e| PromError::InvalidConfiguration(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
