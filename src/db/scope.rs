//! Query execution scopes
//!
//! A scope is one unit of work: statements are buffered with `add_query`,
//! run in FIFO order with `exec_next`, and the whole lot is committed or
//! rolled back when the scope exits.

use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::results::ResultSet;
use super::session::{Session, SessionFactory};
use super::statement::Statement;
use crate::types::{IdeaBankError, Result};

pub struct QueryScope {
    sessions: Arc<dyn SessionFactory>,
    buffer: VecDeque<Statement>,
    results: Option<ResultSet>,
    session: Option<Box<dyn Session>>,
}

impl QueryScope {
    /// Create a closed scope over the given session factory
    pub fn new(sessions: Arc<dyn SessionFactory>) -> Self {
        Self {
            sessions,
            buffer: VecDeque::new(),
            results: None,
            session: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Open a transactional session for this scope
    pub fn enter(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Err(IdeaBankError::Internal(
                "Query scope is already open".into(),
            ));
        }
        self.session = Some(self.sessions.open()?);
        debug!("Entered query scope");
        Ok(())
    }

    /// Commit (or roll back when `failed`) and close the session
    pub fn exit(&mut self, failed: bool) -> Result<()> {
        self.results = None;
        if !self.buffer.is_empty() {
            warn!(
                "Discarding {} queued statement(s) that never ran",
                self.buffer.len()
            );
            self.buffer.clear();
        }

        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        let outcome = if failed {
            debug!("Rolling back query scope");
            session.rollback()
        } else {
            debug!("Committing query scope");
            session.commit()
        };
        session.close();
        outcome
    }

    /// Run `body` inside an entered scope, committing on `Ok` and rolling back on `Err`
    pub fn run<T>(&mut self, body: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.enter()?;
        let outcome = body(self);
        let exited = self.exit(outcome.is_err());

        match (outcome, exited) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Err(exit_err)) => {
                error!("Rollback failed after scope error: {}", exit_err);
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
        }
    }

    /// Queue a statement; nothing executes yet
    pub fn add_query(&mut self, statement: Statement) {
        self.buffer.push_back(statement);
    }

    /// Execute the oldest queued statement, replacing the current results
    pub fn exec_next(&mut self) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Err(IdeaBankError::NoSessionToQueryOn(
                "The session for this scope is not open. Enter the scope first".into(),
            ));
        };
        let Some(statement) = self.buffer.pop_front() else {
            return Err(IdeaBankError::NoQueryToRun(
                "There is no queued query waiting to run. Queue one with add_query".into(),
            ));
        };

        let results = session.execute(&statement)?;
        debug!("Statement affected {} rows", results.rows_affected());
        self.results = Some(results);
        Ok(())
    }

    /// Take the cursor of the most recently executed statement
    pub fn results(&mut self) -> Result<ResultSet> {
        self.results.take().ok_or_else(|| {
            IdeaBankError::Internal("No results available; execute a query first".into())
        })
    }

    /// Queue, execute and return the cursor in one step
    pub fn execute(&mut self, statement: Statement) -> Result<ResultSet> {
        self.add_query(statement);
        self.exec_next()?;
        self.results()
    }
}

impl Drop for QueryScope {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!("Query scope dropped while open, rolling back");
            let _ = self.exit(true);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::Row;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Session stand-in that records what happened to it
    #[derive(Default)]
    pub struct Ledger {
        pub opened: AtomicUsize,
        pub executed: AtomicUsize,
        pub commits: AtomicUsize,
        pub rollbacks: AtomicUsize,
    }

    pub struct RecordingSessions(pub Arc<Ledger>);

    struct RecordingSession(Arc<Ledger>);

    impl SessionFactory for RecordingSessions {
        fn open(&self) -> Result<Box<dyn Session>> {
            self.0.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(RecordingSession(Arc::clone(&self.0))))
        }
    }

    impl Session for RecordingSession {
        fn execute(&mut self, statement: &Statement) -> Result<ResultSet> {
            self.0.executed.fetch_add(1, Ordering::SeqCst);
            let columns = Arc::new(vec!["sql".to_string()]);
            Ok(ResultSet::new(
                vec![Row::new(columns, vec![json!(statement.sql())])],
                0,
            ))
        }

        fn commit(&mut self) -> Result<()> {
            self.0.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn rollback(&mut self) -> Result<()> {
            self.0.rollbacks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn close(&mut self) {}
    }

    fn scope() -> (QueryScope, Arc<Ledger>) {
        let ledger = Arc::new(Ledger::default());
        let scope = QueryScope::new(Arc::new(RecordingSessions(Arc::clone(&ledger))));
        (scope, ledger)
    }

    #[test]
    fn test_exec_next_requires_open_scope() {
        let (mut scope, _) = scope();
        scope.add_query(Statement::new("SELECT 1"));
        assert!(matches!(
            scope.exec_next(),
            Err(IdeaBankError::NoSessionToQueryOn(_))
        ));
    }

    #[test]
    fn test_exec_next_requires_queued_statement() {
        let (mut scope, _) = scope();
        let outcome = scope.run(|s| s.exec_next());
        assert!(matches!(outcome, Err(IdeaBankError::NoQueryToRun(_))));
    }

    #[test]
    fn test_statements_run_in_fifo_order() {
        let (mut scope, ledger) = scope();
        let seen = scope
            .run(|s| {
                s.add_query(Statement::new("first"));
                s.add_query(Statement::new("second"));
                s.exec_next()?;
                let first: String = s.results()?.one()?.get("sql")?;
                s.exec_next()?;
                let second: String = s.results()?.one()?.get("sql")?;
                Ok((first, second))
            })
            .unwrap();
        assert_eq!(seen, ("first".to_string(), "second".to_string()));
        assert_eq!(ledger.executed.load(Ordering::SeqCst), 2);
        assert_eq!(ledger.commits.load(Ordering::SeqCst), 1);
        assert_eq!(ledger.rollbacks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_body_rolls_back() {
        let (mut scope, ledger) = scope();
        let outcome: Result<()> = scope.run(|s| {
            s.execute(Statement::new("DELETE FROM somewhere"))?;
            Err(IdeaBankError::Internal("boom".into()))
        });
        assert!(outcome.is_err());
        assert_eq!(ledger.commits.load(Ordering::SeqCst), 0);
        assert_eq!(ledger.rollbacks.load(Ordering::SeqCst), 1);
        assert!(!scope.is_open());
    }

    #[test]
    fn test_results_cleared_on_exit() {
        let (mut scope, _) = scope();
        scope.enter().unwrap();
        scope.add_query(Statement::new("SELECT 1"));
        scope.exec_next().unwrap();
        scope.exit(false).unwrap();
        assert!(scope.results().is_err());
    }

    #[test]
    fn test_drop_while_open_rolls_back() {
        let (mut scope, ledger) = scope();
        scope.enter().unwrap();
        drop(scope);
        assert_eq!(ledger.rollbacks.load(Ordering::SeqCst), 1);
    }
}
