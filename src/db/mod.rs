//! SQLite backing store for Idea Bank
//!
//! ## Architecture
//!
//! - `Database` owns an r2d2 pool of rusqlite connections (WAL, foreign keys on)
//! - `SqliteSessionFactory` hands each query scope one pooled connection
//!   holding an open transaction
//! - `QueryScope` buffers statements and commits or rolls back as a unit
//!
//! ## Tables
//!
//! - `accounts` - display name, profile text, password hash and salt
//! - `concepts` - author/title keyed ideas with description and diagram
//! - `concept_links` - ancestor -> descendant edges forming a DAG
//! - `follows`, `likes`, `comments` - engagement records

pub mod results;
pub mod schema;
pub mod scope;
pub mod session;
pub mod statement;

use r2d2::Pool;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::types::{IdeaBankError, Result};

pub use results::{ResultSet, Row};
pub use scope::QueryScope;
pub use session::{Session, SessionFactory, SqliteSession, SqliteSessionFactory};
pub use statement::{Param, Statement};

/// r2d2 connection manager for on-disk SQLite databases
#[derive(Debug, Clone)]
pub struct SqliteManager {
    path: PathBuf,
}

impl SqliteManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl r2d2::ManageConnection for SqliteManager {
    type Connection = Connection;
    type Error = rusqlite::Error;

    fn connect(&self) -> std::result::Result<Connection, rusqlite::Error> {
        let conn = Connection::open(&self.path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }

    fn is_valid(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch("SELECT 1")
    }

    fn has_broken(&self, conn: &mut Connection) -> bool {
        // A connection must never go back to the pool mid-transaction
        !conn.is_autocommit()
    }
}

/// Explicitly constructed connection pool handle
pub struct Database {
    pool: Pool<SqliteManager>,
}

impl Database {
    /// Open or create the database and bring its schema up to date
    pub fn open(path: &Path, pool_size: u32) -> Result<Self> {
        info!("Opening SQLite database at {:?} (pool size {})", path, pool_size);

        if pool_size == 0 {
            return Err(IdeaBankError::Config(
                "Database pool size must be at least 1".into(),
            ));
        }

        let pool = Pool::builder()
            .max_size(pool_size)
            .build(SqliteManager::new(path))?;

        let db = Self { pool };
        db.with_conn(schema::init_schema)?;
        Ok(db)
    }

    /// Run `f` with a pooled connection outside any query scope
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.pool.get()?;
        f(&conn)
    }

    /// Session factory for query scopes
    pub fn sessions(&self) -> SqliteSessionFactory {
        SqliteSessionFactory::new(self.pool.clone())
    }

    /// Pool statistics for health reporting
    pub fn stats(&self) -> DbStats {
        let state = self.pool.state();
        DbStats {
            connections: state.connections,
            idle_connections: state.idle_connections,
        }
    }

    /// Tear the pool down; outstanding session factories keep their clones alive
    pub fn close(self) {
        debug!("Closing database pool");
        drop(self.pool);
    }
}

/// Connection pool statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub connections: u32,
    pub idle_connections: u32,
}
