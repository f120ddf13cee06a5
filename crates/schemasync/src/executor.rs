//! DDL executor.
//!
//! This module renders reconciliation operations into statements and applies
//! them through a [`DdlSession`].

use schemasync_core::dialect::Dialect;
use schemasync_core::operation::Operation;
use sqlx::mysql::{MySql, MySqlConnection};
use sqlx::{Connection, Transaction};
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};

/// Write access to a database, one statement at a time.
#[allow(async_fn_in_trait)]
pub trait DdlSession {
    /// Executes one DDL statement.
    async fn exec(&mut self, sql: &str) -> Result<()>;

    /// Makes every executed statement permanent.
    async fn commit(self) -> Result<()>;

    /// Discards every executed statement the engine can still discard.
    async fn rollback(self) -> Result<()>;
}

/// Session over a MySQL transaction.
///
/// MySQL commits each DDL statement implicitly, so the transaction only
/// scopes the connection; a rollback keeps what already ran.
pub struct MySqlSession<'c> {
    tx: Transaction<'c, MySql>,
}

impl<'c> MySqlSession<'c> {
    /// Begins a session on the connection.
    pub async fn begin(conn: &'c mut MySqlConnection) -> Result<Self> {
        let tx = conn.begin().await?;
        Ok(Self { tx })
    }
}

impl DdlSession for MySqlSession<'_> {
    async fn exec(&mut self, sql: &str) -> Result<()> {
        sqlx::raw_sql(sql).execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// A rendered operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStatement {
    /// The operation.
    pub operation: Operation,
    /// Its DDL.
    pub sql: String,
}

/// Statements to run, and the operations left out of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Statements in execution order.
    pub statements: Vec<PlannedStatement>,
    /// Destructive operations withheld because they were not allowed.
    pub skipped: Vec<Operation>,
}

impl Plan {
    /// Returns true if there is nothing to run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Prints every statement, `;`-terminated.
    pub fn print(&self) {
        for statement in &self.statements {
            println!("{};", statement.sql);
        }
    }
}

/// Renders and applies operations.
pub struct Executor<'d> {
    dialect: &'d dyn Dialect,
    allow_destructive: bool,
}

impl<'d> Executor<'d> {
    /// Creates an executor that withholds destructive operations.
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            allow_destructive: false,
        }
    }

    /// Allows table and column drops.
    #[must_use]
    pub fn allow_destructive(mut self, enabled: bool) -> Self {
        self.allow_destructive = enabled;
        self
    }

    /// Renders operations in order, withholding destructive ones unless
    /// they are allowed.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Render`] on the first operation the dialect
    /// cannot express; nothing has run at that point.
    pub fn plan(&self, operations: Vec<Operation>) -> Result<Plan> {
        let mut plan = Plan::default();
        for operation in operations {
            if operation.is_destructive() && !self.allow_destructive {
                warn!(
                    operation = %operation,
                    "Skipping destructive operation; pass --allow-destructive to apply it"
                );
                plan.skipped.push(operation);
                continue;
            }
            let sql = self.dialect.generate_sql(&operation)?;
            plan.statements.push(PlannedStatement { operation, sql });
        }
        Ok(plan)
    }

    /// Applies a plan statement by statement and returns how many ran.
    ///
    /// # Errors
    ///
    /// On a failing statement, returns [`SyncError::RolledBack`] if the
    /// dialect has transactional DDL and [`SyncError::PartiallyApplied`]
    /// otherwise.
    pub async fn apply<S: DdlSession>(&self, mut session: S, plan: &Plan) -> Result<usize> {
        let mut applied = 0;
        for statement in &plan.statements {
            debug!(sql = %statement.sql, "Executing SQL");
            if let Err(source) = session.exec(&statement.sql).await {
                return Err(self.abort(session, statement, applied, source).await);
            }
            applied += 1;
        }

        session.commit().await?;
        info!(applied, dialect = self.dialect.name(), "Schema synchronized");
        Ok(applied)
    }

    async fn abort<S: DdlSession>(
        &self,
        session: S,
        statement: &PlannedStatement,
        applied: usize,
        source: SyncError,
    ) -> SyncError {
        let target = statement.operation.target();
        if let Err(err) = session.rollback().await {
            warn!(error = %err, "Rollback failed");
        }
        if self.dialect.transactional_ddl() {
            warn!(target = %target, "Statement failed; rolled back");
            SyncError::RolledBack {
                target,
                statement: statement.sql.clone(),
                source: Box::new(source),
            }
        } else {
            warn!(
                target = %target,
                applied,
                "Statement failed; earlier statements remain applied"
            );
            SyncError::PartiallyApplied {
                applied,
                target,
                statement: statement.sql.clone(),
                source: Box::new(source),
            }
        }
    }
}
