use crate::{Ledger, MigrateError, Runner, ApplyReport};
use rusqlite::Connection;

pub struct Db {
    pub conn: Connection,
}

impl Db {
    /// Open (or create) a database file. Does not migrate; see [`Db::migrate`].
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, MigrateError> {
        let conn = Connection::open(path)?;
        apply_pragmas(&conn)?;
        Ok(Db { conn })
    }

    pub fn open_in_memory() -> Result<Self, MigrateError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", &"ON")?;
        Ok(Db { conn })
    }

    /// Apply every pending step of `ledger`.
    pub fn migrate(&mut self, ledger: &Ledger) -> Result<ApplyReport, MigrateError> {
        Runner::new(ledger).migrate_all(&mut self.conn)
    }
}

fn apply_pragmas(conn: &Connection) -> Result<(), MigrateError> {
    conn.pragma_update(None, "journal_mode", &"WAL")?;
    conn.pragma_update(None, "synchronous", &"NORMAL")?;
    conn.pragma_update(None, "foreign_keys", &"ON")?;
    conn.pragma_update(None, "busy_timeout", &5000i64)?;
    Ok(())
}
