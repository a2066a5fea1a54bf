//! Result cursors
//!
//! Rows are materialised when a statement executes. A cursor is consumed by
//! `one()` or `all()`; reading it again requires executing the statement again.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::types::IdeaBankError;

/// One result row with named columns
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<Vec<String>>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<Vec<String>>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Raw column value
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    /// Typed column value
    pub fn get<T: DeserializeOwned>(&self, column: &str) -> Result<T, IdeaBankError> {
        let value = self
            .value(column)
            .ok_or_else(|| IdeaBankError::Internal(format!("No column named {column}")))?;
        serde_json::from_value(value.clone()).map_err(|e| {
            IdeaBankError::Internal(format!("Column {column} has unexpected type: {e}"))
        })
    }
}

/// The result cursor of the most recently executed statement
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    rows: Vec<Row>,
    rows_affected: usize,
}

impl ResultSet {
    pub fn new(rows: Vec<Row>, rows_affected: usize) -> Self {
        Self {
            rows,
            rows_affected,
        }
    }

    /// Rows changed by a write statement
    pub fn rows_affected(&self) -> usize {
        self.rows_affected
    }

    /// Exactly one row, or a not-found condition
    pub fn one(self) -> Result<Row, IdeaBankError> {
        let count = self.rows.len();
        let mut rows = self.rows.into_iter();
        match (rows.next(), count) {
            (Some(row), 1) => Ok(row),
            (None, _) => Err(IdeaBankError::NoResultFound(
                "No row was found when one was required".into(),
            )),
            _ => Err(IdeaBankError::NoResultFound(format!(
                "Multiple rows were found when exactly one was required ({count})"
            ))),
        }
    }

    /// Every row, in the order the store produced them
    pub fn all(self) -> std::vec::IntoIter<Row> {
        self.rows.into_iter()
    }
}
