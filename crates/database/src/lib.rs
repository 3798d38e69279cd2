use std::{env, error::Error, time::Duration};

use async_trait::async_trait;
use queries::convert_error;
use ride_pool::database::{
    Database, DatabaseAutocommit, DatabaseTransaction, Result,
};
use sqlx::{postgres::PgPoolOptions, Transaction};

pub mod data_model;
pub mod queries;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(5000);

pub struct DatabaseConnectionInfo {
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub port: u16,
    pub database: String,
    pub max_connections: u32,
    /// How long a transaction waits for a group row held by another session.
    pub lock_timeout: Duration,
}

impl DatabaseConnectionInfo {
    /// Reads the connection settings, `None` if any of them is missing.
    pub fn from_env() -> Option<Self> {
        let username = env::var("DATABASE_USER").ok()?;
        let password = env::var("DATABASE_PASSWORD").ok()?;
        let hostname = env::var("DATABASE_HOST").ok()?;
        let port: u16 = env::var("DATABASE_PORT").ok()?.parse().ok()?;
        let database = env::var("DATABASE_NAME").ok()?;
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let lock_timeout = env::var("DATABASE_LOCK_TIMEOUT_MS")
            .ok()
            .and_then(|value| value.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_LOCK_TIMEOUT);
        Some(Self {
            username,
            password,
            hostname,
            port,
            database,
            max_connections,
            lock_timeout,
        })
    }

    pub(self) fn postgres_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.hostname, self.port, self.database
        )
    }
}

#[derive(Clone)]
pub struct PgDatabase {
    connection: sqlx::PgPool,
    lock_timeout: Duration,
}

pub struct PgDatabaseTransaction<'a> {
    tx: Transaction<'a, sqlx::Postgres>,
    lock_timeout: Duration,
}

#[async_trait]
impl<'a> DatabaseTransaction for PgDatabaseTransaction<'a> {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(convert_error)
    }
}

pub struct PgDatabaseAutocommit {
    pool: sqlx::PgPool,
}

impl DatabaseAutocommit for PgDatabaseAutocommit {}

impl PgDatabase {
    pub async fn connect(
        database_connection_info: DatabaseConnectionInfo,
    ) -> std::result::Result<Self, Box<dyn Error>> {
        let url = database_connection_info.postgres_url();
        let pool = PgPoolOptions::new()
            .max_connections(database_connection_info.max_connections)
            .connect(&url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        log::info!(
            "connected to ride store {} at {}:{}",
            database_connection_info.database,
            database_connection_info.hostname,
            database_connection_info.port
        );

        Ok(Self {
            connection: pool,
            lock_timeout: database_connection_info.lock_timeout,
        })
    }
}

#[async_trait]
impl Database for PgDatabase {
    type Transaction = PgDatabaseTransaction<'static>;
    type Autocommit = PgDatabaseAutocommit;

    fn auto(&self) -> Self::Autocommit {
        PgDatabaseAutocommit {
            pool: self.connection.clone(),
        }
    }

    async fn transaction(&self) -> Result<Self::Transaction> {
        let tx: Transaction<'static, sqlx::Postgres> =
            self.connection.begin().await.map_err(convert_error)?;

        Ok(PgDatabaseTransaction {
            tx,
            lock_timeout: self.lock_timeout,
        })
    }
}
