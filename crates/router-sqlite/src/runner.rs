//! Applies ledger ranges, one transaction per migration.

use crate::schema::LEDGER_TABLE;
use crate::{Ledger, MigrateError, Migration};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use std::collections::BTreeMap;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    NotStarted,
    InProgress,
    Committed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepStatus {
    pub version: u32,
    pub name: &'static str,
    pub state: StepState,
    pub run_id: Option<String>,
    pub applied_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    pub applied: Vec<u32>,
    pub already_committed: Vec<u32>,
}

struct AppliedRow {
    run_id: String,
    applied_at: String,
}

pub struct Runner<'l> {
    ledger: &'l Ledger,
    run_id: Uuid,
    states: Vec<StepState>,
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| String::new())
}

impl<'l> Runner<'l> {
    pub fn new(ledger: &'l Ledger) -> Self {
        Runner {
            ledger,
            run_id: Uuid::now_v7(),
            states: vec![StepState::NotStarted; ledger.len()],
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// State of the step at `index` as last observed by this runner.
    pub fn state(&self, index: usize) -> Option<StepState> {
        self.states.get(index).copied()
    }

    pub fn migrate_all(&mut self, conn: &mut Connection) -> Result<ApplyReport, MigrateError> {
        self.apply(conn, 0, self.ledger.len())
    }

    pub fn migrate_to(&mut self, conn: &mut Connection, target: usize) -> Result<ApplyReport, MigrateError> {
        self.apply(conn, 0, target)
    }

    /// Apply steps `[from, to)` in order. Committed steps are skipped; the
    /// first failure stops the run with that step rolled back.
    pub fn apply(&mut self, conn: &mut Connection, from: usize, to: usize) -> Result<ApplyReport, MigrateError> {
        let len = self.ledger.len();
        if from > to || to > len {
            return Err(MigrateError::InvalidRange { from, to, len });
        }
        let applied = if ledger_exists(conn)? { applied_rows(conn)? } else { BTreeMap::new() };
        if let Some(missing) = self.ledger.iter().take(from).find(|m| !applied.contains_key(&m.version)) {
            return Err(MigrateError::OutOfOrder { from, missing: missing.version });
        }
        conn.execute_batch(LEDGER_TABLE)?;

        let mut report = ApplyReport::default();
        for index in from..to {
            let Some(migration) = self.ledger.get(index) else { break; };
            if applied.contains_key(&migration.version) {
                tracing::debug!(version = migration.version, name = migration.name, "migration already applied");
                self.states[index] = StepState::Committed;
                report.already_committed.push(migration.version);
                continue;
            }
            self.states[index] = StepState::InProgress;
            match self.apply_one(conn, migration) {
                Ok(()) => {
                    self.states[index] = StepState::Committed;
                    report.applied.push(migration.version);
                    tracing::info!(version = migration.version, name = migration.name, run_id = %self.run_id, "applied migration");
                }
                Err(e) => {
                    self.states[index] = StepState::Failed;
                    tracing::error!(version = migration.version, name = migration.name, error = %e, "migration failed");
                    return Err(e);
                }
            }
        }
        Ok(report)
    }

    fn apply_one(&self, conn: &mut Connection, migration: &Migration) -> Result<(), MigrateError> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let seen: Option<u32> = tx
            .query_row(
                "SELECT version FROM schema_migrations WHERE version=?",
                [migration.version],
                |r| r.get(0),
            )
            .optional()?;
        if seen.is_some() {
            return Ok(());
        }
        migration.run(&tx)?;
        tx.execute(
            "INSERT INTO schema_migrations(version, name, run_id, applied_at) VALUES (?,?,?,?)",
            params![migration.version, migration.name, self.run_id.to_string(), now_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Per-step state: persisted commits merged with this runner's view.
    pub fn status(&self, conn: &Connection) -> Result<Vec<StepStatus>, MigrateError> {
        let mut applied = if ledger_exists(conn)? { applied_rows(conn)? } else { BTreeMap::new() };
        Ok(self
            .ledger
            .iter()
            .zip(&self.states)
            .map(|(m, local)| {
                let row = applied.remove(&m.version);
                let state = if row.is_some() { StepState::Committed } else { *local };
                StepStatus {
                    version: m.version,
                    name: m.name,
                    state,
                    run_id: row.as_ref().map(|r| r.run_id.clone()),
                    applied_at: row.map(|r| r.applied_at),
                }
            })
            .collect())
    }
}

/// Highest version `v` such that every version `1..=v` is committed.
pub fn current_version(conn: &Connection) -> Result<u32, MigrateError> {
    if !ledger_exists(conn)? {
        return Ok(0);
    }
    let applied = applied_rows(conn)?;
    let mut v = 0;
    while applied.contains_key(&(v + 1)) {
        v += 1;
    }
    Ok(v)
}

fn ledger_exists(conn: &Connection) -> Result<bool, MigrateError> {
    let cnt: i64 = conn.query_row(
        "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name='schema_migrations'",
        [],
        |r| r.get(0),
    )?;
    Ok(cnt > 0)
}

fn applied_rows(conn: &Connection) -> Result<BTreeMap<u32, AppliedRow>, MigrateError> {
    let mut stmt = conn.prepare("SELECT version, run_id, applied_at FROM schema_migrations ORDER BY version")?;
    let rows = stmt.query_map([], |r| {
        Ok((r.get::<_, u32>(0)?, AppliedRow { run_id: r.get(1)?, applied_at: r.get(2)? }))
    })?;
    let mut out = BTreeMap::new();
    for row in rows {
        let (version, applied) = row?;
        out.insert(version, applied);
    }
    Ok(out)
}
