//! Host lifecycle integration: start connects and creates the schema, stop
//! disconnects.

use crate::error::Error;
use crate::schema::Schema;
use crate::session::Session;
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Start/stop hooks a host calls around the life of a component.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    fn name(&self) -> &str;

    async fn start(&self) -> anyhow::Result<()>;

    async fn stop(&self) -> anyhow::Result<()>;
}

/// SQLite Service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Path to the SQLite database file
    pub db_path: PathBuf,
    /// Tables created on start when missing
    #[serde(default)]
    pub schema: Schema,
}

impl SqliteConfig {
    /// Create a new SQLite config with path and schema
    pub fn new(db_path: impl Into<PathBuf>, schema: Schema) -> Self {
        Self {
            db_path: db_path.into(),
            schema,
        }
    }
}

/// A [`Session`] driven by a host lifecycle.
#[derive(Debug)]
pub struct SqliteService {
    config: SqliteConfig,
    session: Arc<Session>,
}

impl SqliteService {
    /// Create a new SQLite service with the given config
    pub fn new(config: SqliteConfig) -> crate::Result<Self> {
        let session = Arc::new(Session::new(&config.db_path)?);
        Ok(Self { config, session })
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Shared handle to the session, for callers that run commands.
    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }

    fn initialize_schema(&self) -> anyhow::Result<()> {
        for table in &self.config.schema.tables {
            if self
                .session
                .table_exists(&table.name)
                .with_context(|| format!("checking for table {}", table.name))?
            {
                continue;
            }
            self.session
                .create_table(&table.name, &table.columns)
                .with_context(|| format!("creating table {}", table.name))?;
            info!("Created table {}", table.name);
        }
        Ok(())
    }
}

#[async_trait]
impl Lifecycle for SqliteService {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn start(&self) -> anyhow::Result<()> {
        info!("Starting sqlite service at path: {}", self.config.db_path.display());
        self.session.connect()?;
        self.initialize_schema()
    }

    /// Close the session. Stopping a service that holds no connection, because
    /// it was never started, already stopped, or failed to connect, succeeds.
    async fn stop(&self) -> anyhow::Result<()> {
        match self.session.disconnect() {
            Ok(()) => {
                info!("Sqlite service stopped");
                Ok(())
            }
            Err(Error::NotConnected) => {
                debug!("Sqlite service at {} holds no connection", self.config.db_path.display());
                Ok(())
            }
            Err(e) => Err(e).with_context(|| {
                format!("stopping sqlite service at {}", self.config.db_path.display())
            }),
        }
    }
}
