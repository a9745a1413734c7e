//! SQLite schema creation and migration for the graph store.
//!
//! Versioned via `PRAGMA user_version`; safe to run on every boot.

use rusqlite::Connection;

/// Current schema version.
const SCHEMA_VERSION: u32 = 2;

/// Run all migrations to bring the database up to date.
pub fn run_migrations(conn: &Connection) -> Result<(), rusqlite::Error> {
    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    if current_version < 2 {
        migrate_v2(conn)?;
    }

    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}

/// Get the current schema version from the database.
fn get_schema_version(conn: &Connection) -> u32 {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0)
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: u32) -> Result<(), rusqlite::Error> {
    conn.pragma_update(None, "user_version", version)
}

/// Check if a column exists in a table (SQLite has no ADD COLUMN IF NOT EXISTS).
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    let sql = format!("PRAGMA table_info({})", table);
    let Ok(mut stmt) = conn.prepare(&sql) else {
        return false;
    };
    let Ok(rows) = stmt.query_map([], |row| row.get::<_, String>(1)) else {
        return false;
    };
    let found = rows.filter_map(|r| r.ok()).any(|n| n == column);
    found
}

/// Version 1: node and edge tables.
fn migrate_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS nodes (
            id TEXT PRIMARY KEY,
            label TEXT NOT NULL,
            props_json TEXT NOT NULL DEFAULT '{}',
            confidence REAL NOT NULL DEFAULT 0.5,
            source TEXT NOT NULL DEFAULT '',
            updated_at_ms INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_nodes_label ON nodes(label);
        CREATE INDEX IF NOT EXISTS idx_nodes_updated ON nodes(updated_at_ms);

        CREATE TABLE IF NOT EXISTS edges (
            id TEXT PRIMARY KEY,
            src TEXT NOT NULL,
            rel TEXT NOT NULL,
            dst TEXT NOT NULL,
            props_json TEXT NOT NULL DEFAULT '{}',
            source TEXT NOT NULL DEFAULT '',
            created_at_ms INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_edges_src ON edges(src);
        CREATE INDEX IF NOT EXISTS idx_edges_dst ON edges(dst);
        CREATE INDEX IF NOT EXISTS idx_edges_rel ON edges(rel);
        ",
    )?;
    Ok(())
}

/// Version 2: housekeeping score columns on nodes.
fn migrate_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    let cols = [
        ("decay", "REAL DEFAULT NULL"),
        ("importance", "REAL DEFAULT NULL"),
        ("archived", "INTEGER NOT NULL DEFAULT 0"),
    ];
    for (name, typedef) in &cols {
        if !column_exists(conn, "nodes", name) {
            conn.execute(
                &format!("ALTER TABLE nodes ADD COLUMN {} {}", name, typedef),
                [],
            )?;
        }
    }
    Ok(())
}
