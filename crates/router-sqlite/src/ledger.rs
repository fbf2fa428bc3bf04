//! Ordered list of schema migrations.

use crate::schema::*;
use crate::MigrateError;
use rusqlite::Connection;

/// Data rewrite run inside a migration's transaction.
pub type StepFn = fn(&Connection) -> Result<(), MigrateError>;

pub enum Step {
    Sql(&'static str),
    Func(StepFn),
}

/// One ledger entry. All of its steps share a single transaction.
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    steps: Vec<Step>,
}

impl Migration {
    pub fn new(version: u32, name: &'static str) -> Self {
        Migration { version, name, steps: Vec::new() }
    }

    pub fn sql(mut self, sql: &'static str) -> Self {
        self.steps.push(Step::Sql(sql));
        self
    }

    pub fn func(mut self, f: StepFn) -> Self {
        self.steps.push(Step::Func(f));
        self
    }

    pub(crate) fn run(&self, conn: &Connection) -> Result<(), MigrateError> {
        for step in &self.steps {
            match step {
                Step::Sql(sql) => conn.execute_batch(sql)?,
                Step::Func(f) => f(conn)?,
            }
        }
        Ok(())
    }
}

/// Migrations ordered by version; index `i` holds version `i + 1`.
pub struct Ledger {
    migrations: Vec<Migration>,
}

impl Ledger {
    pub fn new(migrations: Vec<Migration>) -> Result<Self, MigrateError> {
        for (i, m) in migrations.iter().enumerate() {
            let expected = i as u32 + 1;
            if m.version != expected {
                return Err(MigrateError::InvalidLedger { expected, found: m.version });
            }
        }
        Ok(Ledger { migrations })
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Migration> {
        self.migrations.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Migration> {
        self.migrations.iter()
    }
}

/// The router's schema history.
pub fn router_ledger() -> Result<Ledger, MigrateError> {
    Ledger::new(vec![
        Migration::new(1, "http_routes").sql(MIG_0001_HTTP_ROUTES),
        Migration::new(2, "tcp_routes").sql(MIG_0002_TCP_ROUTES),
        Migration::new(3, "route_events").sql(MIG_0003_ROUTE_EVENTS),
        Migration::new(4, "http_route_paths").sql(MIG_0004_HTTP_PATHS),
        Migration::new(5, "tls_objects")
            .sql(MIG_0005_TLS_OBJECTS)
            .func(crate::scan::migrate_tls_objects),
    ])
}
