//! Transactional sessions against the backing store
//!
//! A session is bound to one scope: it opens a transaction when created and
//! ends it with exactly one commit or rollback.

use r2d2::{Pool, PooledConnection};
use rusqlite::types::{Value as SqlValue, ValueRef};
use std::sync::Arc;
use tracing::{debug, warn};

use super::results::{ResultSet, Row};
use super::statement::{Param, Statement};
use super::SqliteManager;
use crate::types::{IdeaBankError, Result};

/// A live transactional session
pub trait Session: Send {
    /// Execute one statement and materialise its cursor
    fn execute(&mut self, statement: &Statement) -> Result<ResultSet>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    /// Release the underlying connection
    fn close(&mut self);
}

/// Produces sessions, one per scope
pub trait SessionFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn Session>>;
}

/// Session factory backed by the SQLite connection pool
#[derive(Clone)]
pub struct SqliteSessionFactory {
    pool: Pool<SqliteManager>,
}

impl SqliteSessionFactory {
    pub fn new(pool: Pool<SqliteManager>) -> Self {
        Self { pool }
    }

    /// Shared handle for service providers
    pub fn shared(self) -> Arc<dyn SessionFactory> {
        Arc::new(self)
    }
}

impl SessionFactory for SqliteSessionFactory {
    fn open(&self) -> Result<Box<dyn Session>> {
        let conn = self.pool.get()?;
        conn.execute_batch("BEGIN DEFERRED")?;
        debug!("Opened SQLite session");
        Ok(Box::new(SqliteSession {
            conn: Some(conn),
            in_transaction: true,
        }))
    }
}

/// One pooled connection holding an open transaction
pub struct SqliteSession {
    conn: Option<PooledConnection<SqliteManager>>,
    in_transaction: bool,
}

impl SqliteSession {
    fn conn(&self) -> Result<&PooledConnection<SqliteManager>> {
        self.conn
            .as_ref()
            .ok_or_else(|| IdeaBankError::Database("Session is already closed".into()))
    }

    fn finish(&mut self, sql: &str) -> Result<()> {
        if !self.in_transaction {
            return Err(IdeaBankError::Database(
                "Session transaction already finished".into(),
            ));
        }
        self.conn()?.execute_batch(sql)?;
        self.in_transaction = false;
        Ok(())
    }
}

impl Session for SqliteSession {
    fn execute(&mut self, statement: &Statement) -> Result<ResultSet> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(statement.sql())?;
        let columns: Arc<Vec<String>> = Arc::new(
            stmt.column_names()
                .into_iter()
                .map(String::from)
                .collect(),
        );

        let params: Vec<SqlValue> = statement.params().iter().map(to_sql_value).collect();
        let mut rows = stmt.query(rusqlite::params_from_iter(params))?;

        let mut materialised = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                values.push(to_json_value(row.get_ref(idx)?));
            }
            materialised.push(Row::new(Arc::clone(&columns), values));
        }
        drop(rows);

        Ok(ResultSet::new(materialised, conn.changes() as usize))
    }

    fn commit(&mut self) -> Result<()> {
        self.finish("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        self.finish("ROLLBACK")
    }

    fn close(&mut self) {
        if self.in_transaction {
            if let Err(e) = self.rollback() {
                warn!("Rollback of abandoned session failed: {}", e);
            }
        }
        self.conn.take();
    }
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn to_sql_value(param: &Param) -> SqlValue {
    match param {
        Param::Null => SqlValue::Null,
        Param::Integer(i) => SqlValue::Integer(*i),
        Param::Text(s) => SqlValue::Text(s.clone()),
        Param::Timestamp(ts) => SqlValue::Text(Param::timestamp_text(ts)),
        Param::Json(v) => SqlValue::Text(v.to_string()),
    }
}

fn to_json_value(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Value::from(f),
        ValueRef::Text(t) => serde_json::Value::from(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => serde_json::Value::from(hex::encode(b)),
    }
}
