use mongodb::{
    bson::doc,
    options::{ClientOptions, ServerApi, ServerApiVersion},
    Client, Collection,
};
use std::time::Duration;

use crate::{config::Config, errors::AppResult};

const MAX_POOL_SIZE: u32 = 10;
const MIN_POOL_SIZE: u32 = 2;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle on the configured MongoDB database holding questions, themes and
/// leaderboard entries.
#[derive(Clone)]
pub struct Database {
    inner: mongodb::Database,
}

impl Database {
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let mut client_options = ClientOptions::parse(&config.mongo_conn_string).await?;

        client_options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());
        client_options.max_pool_size = Some(MAX_POOL_SIZE);
        client_options.min_pool_size = Some(MIN_POOL_SIZE);
        client_options.connect_timeout = Some(CONNECT_TIMEOUT);
        client_options.server_selection_timeout = Some(CONNECT_TIMEOUT);

        let database = Self {
            inner: Client::with_options(client_options)?.database(&config.mongo_db_name),
        };
        database.health_check().await?;

        log::info!("Connected to MongoDB database '{}'", database.inner.name());
        Ok(database)
    }

    pub fn get_collection<T>(&self, collection_name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.inner.collection(collection_name)
    }

    /// Pings the configured database rather than `admin`.
    pub async fn health_check(&self) -> AppResult<()> {
        self.inner.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
