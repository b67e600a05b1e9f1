// src/state.rs
use std::sync::Arc;

use tracing::info;

use crate::{
    config::Config,
    db::create_pool,
    media::MediaStore,
    store::{MemoryStore, PgStore, Repository},
};

pub struct State {
    pub config: Config,
    pub store: Box<dyn Repository>,
    pub media: MediaStore,
}

pub type SharedState = Arc<State>;

impl State {
    /// Connects to PostgreSQL when a database URL is configured.
    pub async fn new(config: Config) -> Result<SharedState, sqlx::Error> {
        let store: Box<dyn Repository> = match &config.database_url {
            Some(url) => {
                info!("Connecting to database...");
                Box::new(PgStore::new(create_pool(url, config.max_connections).await?))
            }
            None => Box::new(MemoryStore::new()),
        };

        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Config, store: Box<dyn Repository>) -> SharedState {
        let media = MediaStore::new(config.media_root.clone());
        Arc::new(Self {
            config,
            store,
            media,
        })
    }
}
