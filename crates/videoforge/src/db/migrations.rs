//! Schema versions for the SQLite store. Each migration runs in its
//! own transaction and is recorded in `_migrations`.

use rusqlite::Connection;

use super::error::DatabaseError;

/// A single migration definition.
struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// All migrations in order. Each is applied at most once.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_generation_jobs_table",
        sql: include_str!("sql/001_create_generation_jobs.sql"),
    },
    Migration {
        version: 2,
        description: "create_stories_tables",
        sql: include_str!("sql/002_create_stories.sql"),
    },
    Migration {
        version: 3,
        description: "create_scripts_table",
        sql: include_str!("sql/003_create_scripts.sql"),
    },
    Migration {
        version: 4,
        description: "create_voice_overs_table",
        sql: include_str!("sql/004_create_voice_overs.sql"),
    },
    Migration {
        version: 5,
        description: "create_media_tables",
        sql: include_str!("sql/005_create_media.sql"),
    },
    Migration {
        version: 6,
        description: "create_final_videos_table",
        sql: include_str!("sql/006_create_final_videos.sql"),
    },
];

/// Applies every migration newer than the recorded version.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let applied = current_version(conn)?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > applied) {
        log::info!(
            "Applying schema v{} ({})",
            migration.version,
            migration.description
        );
        apply(conn, migration).map_err(|e| DatabaseError::Migration {
            version: migration.version,
            reason: e.to_string(),
        })?;
    }

    Ok(())
}

fn apply(conn: &Connection, migration: &Migration) -> Result<(), rusqlite::Error> {
    // Dropped without commit on error, which rolls back.
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(migration.sql)?;
    tx.execute(
        "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
        rusqlite::params![migration.version, migration.description],
    )?;
    tx.commit()
}

/// Highest applied schema version, 0 on a fresh database.
pub fn current_version(conn: &Connection) -> Result<u32, DatabaseError> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?)
}
