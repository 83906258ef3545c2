// src/db/schema.rs — Schema + migrations

use rusqlite::{params, Connection};
use tracing::info;

/// A database migration with version, name, and SQL statements.
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        up: include_str!("migrations/001_initial_schema.up.sql"),
        down: include_str!("migrations/001_initial_schema.down.sql"),
    },
    Migration {
        version: 2,
        name: "add_version_to_refresh_token",
        up: include_str!("migrations/002_add_version_to_refresh_token.up.sql"),
        down: include_str!("migrations/002_add_version_to_refresh_token.down.sql"),
    },
];

/// A row of the `_migrations` tracking table.
#[derive(Debug, Clone)]
pub struct AppliedMigration {
    pub version: u32,
    pub name: String,
    pub applied_at: String,
}

/// Highest migration version compiled into this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.iter().map(|m| m.version).max().unwrap_or(0)
}

fn ensure_tracking_table(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;
    Ok(())
}

/// Current schema version (0 when nothing has been applied).
pub fn current_version(conn: &Connection) -> anyhow::Result<u32> {
    ensure_tracking_table(conn)?;
    let version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;
    Ok(version)
}

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    migrate_to(conn, latest_version())
}

/// Apply pending migrations up to and including `target`.
pub fn migrate_to(conn: &Connection, target: u32) -> anyhow::Result<()> {
    let current = current_version(conn)?;

    for migration in MIGRATIONS
        .iter()
        .filter(|m| m.version > current && m.version <= target)
    {
        info!(
            "Applying migration {}: {}",
            migration.version, migration.name
        );

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.up)?;
        tx.execute(
            "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;
    }

    Ok(())
}

/// Roll back the most recently applied migration using its down SQL.
/// Returns the version that was rolled back, or `None` if nothing was applied.
pub fn rollback_last(conn: &Connection) -> anyhow::Result<Option<u32>> {
    let current = current_version(conn)?;
    if current == 0 {
        return Ok(None);
    }

    let migration = MIGRATIONS
        .iter()
        .find(|m| m.version == current)
        .ok_or_else(|| anyhow::anyhow!("Migration v{current} is not known to this binary"))?;

    info!(
        "Rolling back migration {}: {}",
        migration.version, migration.name
    );

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(migration.down)?;
    tx.execute(
        "DELETE FROM _migrations WHERE version = ?1",
        params![migration.version],
    )?;
    tx.commit()?;

    Ok(Some(migration.version))
}

/// List applied migrations in version order.
pub fn applied_migrations(conn: &Connection) -> anyhow::Result<Vec<AppliedMigration>> {
    ensure_tracking_table(conn)?;
    let mut stmt =
        conn.prepare("SELECT version, name, applied_at FROM _migrations ORDER BY version")?;
    let rows = stmt.query_map([], |row| {
        Ok(AppliedMigration {
            version: row.get(0)?,
            name: row.get(1)?,
            applied_at: row.get(2)?,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
