use std::sync::Arc;

use crate::{aggregator::Aggregator, config::Config};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub aggregator: Aggregator,
}

impl AppState {
    pub fn initialize(config: Config) -> anyhow::Result<Self> {
        let aggregator = Aggregator::from_config(&config)?;
        Ok(Self::with_aggregator(config, aggregator))
    }

    pub fn with_aggregator(config: Config, aggregator: Aggregator) -> Self {
        Self {
            config: Arc::new(config),
            aggregator,
        }
    }

    pub fn catalog_limit(&self) -> usize {
        self.config.catalog_limit
    }
}
