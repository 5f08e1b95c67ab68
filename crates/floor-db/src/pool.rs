//! # Database Pool Management
//!
//! Connection pool creation and the [`Database`] handle.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Handle                                    │
//! │                                                                         │
//! │  FloorConfig::load() ──► Database::open(&config)                       │
//! │                               │                                         │
//! │            ┌──────────────────┼──────────────────────┐                  │
//! │            ▼                  ▼                      ▼                  │
//! │      SqlitePool          EventHub              FloorSettings           │
//! │   (WAL, FKs, busy       (notifier +           (report limit,           │
//! │    timeout)              print queue)          kitchen printer)        │
//! │            │                  │                                         │
//! │            └────────┬─────────┘                                         │
//! │                     ▼                                                   │
//! │   db.tables() / db.commands() / db.orders() / db.payments() / ...      │
//! │   (cheap clones; each operation opens its own transaction)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking Model
//! SQLite has one writer at a time. Every floor transaction starts with a
//! write to the row it gates on, so the write lock is taken before any
//! state is read and held until commit. Stock rows updated later in the
//! same transaction are therefore covered by that lock. Contending writers
//! wait up to `busy_timeout`.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::{FloorConfig, FloorSettings};
use crate::error::{DbError, DbResult};
use crate::events::{BroadcastNotifier, EventHub, FloorEvent, LogPrintQueue, Notifier, PrintQueue};
use crate::migrations;
use crate::repository::activity::ActivityRepository;
use crate::repository::catalog::CatalogRepository;
use crate::repository::command::CommandRepository;
use crate::repository::employee::EmployeeRepository;
use crate::repository::inventory::InventoryRepository;
use crate::repository::order::OrderRepository;
use crate::repository::payment::PaymentRepository;
use crate::repository::saloon::SaloonRepository;
use crate::repository::table::TableRepository;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Pool configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/floor/floor.db")
///     .max_connections(5)
///     .busy_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Pool acquire timeout.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection; `None` keeps them.
    pub idle_timeout: Option<Duration>,

    /// How long a statement waits on the write lock.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a configuration for the given database file.
    /// The file and its parent directory are created if missing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// In-memory database for tests.
    ///
    /// One connection that never idles out: the data lives and dies with it.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            if let Some(parent) = self.database_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
                }
            }
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                // Readers don't block the writer
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };

        Ok(options
            // SQLite ships with foreign keys off
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    broadcaster: BroadcastNotifier,
    hub: EventHub,
    settings: FloorSettings,
}

impl Database {
    /// Creates the pool with default floor settings.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures WAL, foreign keys and the busy timeout
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use database handle
    /// * `Err(DbError)` - Connection or migration failed
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        Self::with_settings(config, FloorSettings::default()).await
    }

    /// Creates the pool from a loaded [`FloorConfig`].
    pub async fn open(config: &FloorConfig) -> DbResult<Self> {
        Self::with_settings(config.db_config(), config.floor.clone()).await
    }

    /// Creates the pool with explicit floor settings.
    pub async fn with_settings(config: DbConfig, settings: FloorSettings) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_options = config.connect_options()?;
        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let broadcaster = BroadcastNotifier::new(settings.event_capacity);
        let hub = EventHub::new(
            Arc::new(broadcaster.clone()),
            Arc::new(LogPrintQueue),
            settings.kitchen_printer.clone(),
        );

        let db = Database {
            pool,
            broadcaster,
            hub,
            settings,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Replaces the notifier. [`Database::subscribe`] only sees events while
    /// the built-in broadcaster is in use.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.hub = EventHub::new(
            notifier,
            self.hub.printer(),
            self.settings.kitchen_printer.clone(),
        );
        self
    }

    /// Attaches the printer service.
    pub fn with_print_queue(mut self, printer: Arc<dyn PrintQueue>) -> Self {
        self.hub = EventHub::new(
            self.hub.notifier(),
            printer,
            self.settings.kitchen_printer.clone(),
        );
        self
    }

    /// Runs database migrations.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn settings(&self) -> &FloorSettings {
        &self.settings
    }

    /// Receives floor events emitted after each committed operation.
    pub fn subscribe(&self) -> broadcast::Receiver<FloorEvent> {
        self.broadcaster.subscribe()
    }

    pub fn saloons(&self) -> SaloonRepository {
        SaloonRepository::new(self.pool.clone())
    }

    pub fn tables(&self) -> TableRepository {
        TableRepository::new(self.pool.clone(), self.hub.clone())
    }

    pub fn commands(&self) -> CommandRepository {
        CommandRepository::new(self.pool.clone(), self.hub.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone(), self.hub.clone())
    }

    pub fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.pool.clone())
    }

    pub fn payments(&self) -> PaymentRepository {
        PaymentRepository::new(self.pool.clone(), self.hub.clone())
    }

    pub fn activity(&self) -> ActivityRepository {
        ActivityRepository::new(self.pool.clone(), self.settings.activity_report_limit)
    }

    pub fn catalog(&self) -> CatalogRepository {
        CatalogRepository::new(self.pool.clone())
    }

    pub fn employees(&self) -> EmployeeRepository {
        EmployeeRepository::new(self.pool.clone())
    }

    /// Closes the database connection pool.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database can execute queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/floor.db")
            .max_connections(10)
            .min_connections(2)
            .busy_timeout(Duration::from_millis(100));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.busy_timeout, Duration::from_millis(100));
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_settings_flow_into_repositories() {
        let settings = FloorSettings {
            activity_report_limit: 7,
            kitchen_printer: "grill".into(),
            event_capacity: 8,
        };
        let db = Database::with_settings(DbConfig::in_memory(), settings)
            .await
            .unwrap();

        assert_eq!(db.settings().activity_report_limit, 7);
        assert_eq!(db.hub.kitchen_printer(), "grill");
    }
}
