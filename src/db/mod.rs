// src/db/mod.rs — Database handle

pub mod models;
pub mod schema;
pub mod store;

use rusqlite::Connection;
use std::path::Path;

pub use store::Store;

/// Open (or create) the database at the given path and run migrations.
pub fn open(path: &Path) -> anyhow::Result<Store> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;

    schema::run_migrations(&conn)?;

    Ok(Store::new(conn))
}

/// Create an in-memory database (for testing).
pub fn in_memory() -> anyhow::Result<Store> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    schema::run_migrations(&conn)?;
    Ok(Store::new(conn))
}
