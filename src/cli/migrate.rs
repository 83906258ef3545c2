// src/cli/migrate.rs — Database migration command
//
// Migrations run automatically whenever the database is opened; this
// command shows what was applied and can undo the latest one.

use rusqlite::Connection;

use crate::db::schema;
use crate::infra::paths;

/// Show migration status, roll back, or run pending migrations.
pub fn run_migrate(status_only: bool, rollback: bool) -> anyhow::Result<()> {
    let db_path = paths::db_path();

    if !db_path.exists() && (status_only || rollback) {
        println!("No database found at: {}", db_path.display());
        println!("Run `eveapi migrate` to create it.");
        return Ok(());
    }

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(&db_path)?;

    if status_only {
        return show_migration_status(&conn);
    }

    if rollback {
        match schema::rollback_last(&conn)? {
            Some(version) => {
                println!("Migration v{version} rolled back.");
                println!("Run `eveapi migrate --status` to verify.");
            }
            None => println!("No migrations to roll back."),
        }
        return Ok(());
    }

    println!("Running database migrations...");
    schema::run_migrations(&conn)?;
    println!("Migrations complete.");

    show_migration_status(&conn)
}

fn show_migration_status(conn: &Connection) -> anyhow::Result<()> {
    let applied = schema::applied_migrations(conn)?;
    if applied.is_empty() {
        println!("No migrations have been run yet.");
        return Ok(());
    }

    println!("Database: {}", paths::db_path().display());
    println!(
        "Current schema version: {} (latest {})",
        schema::current_version(conn)?,
        schema::latest_version()
    );
    println!();
    println!("Applied migrations:");
    for m in applied {
        println!("  v{}: {} (applied {})", m.version, m.name, m.applied_at);
    }

    Ok(())
}
