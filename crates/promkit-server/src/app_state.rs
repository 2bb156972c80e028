//! Shared application state for the promkit server.

use std::sync::Arc;

use promkit_core::error::Result;

use crate::config::AppConfig;
use crate::module::PromModule;

#[derive(Clone)]
pub struct AppState {
    cfg: Arc<AppConfig>,
    prom: PromModule,
}

impl AppState {
    /// Build the prom module and declare every configured metric.
    /// Returns Result so main can fail startup cleanly.
    pub fn new(cfg: AppConfig) -> Result<Self> {
        let prom = PromModule::for_root(cfg.prom.clone())?;
        let declared = prom.for_metrics(&cfg.metrics)?;
        tracing::info!(count = declared.len(), "configured metrics declared");

        Ok(Self {
            cfg: Arc::new(cfg),
            prom,
        })
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn prom(&self) -> &PromModule {
        &self.prom
    }
}
