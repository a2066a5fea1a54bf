//! Database schema definitions

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::types::{IdeaBankError, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version = current_version(conn)?;

    if current_version == 0 {
        info!("Creating new database schema v{}", SCHEMA_VERSION);
        conn.execute_batch(SCHEMA)
            .map_err(|e| IdeaBankError::Database(format!("Failed to create tables: {}", e)))?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!("Migrating schema from v{} to v{}", current_version, SCHEMA_VERSION);
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else {
        info!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
pub fn current_version(conn: &Connection) -> Result<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )
    .map_err(|e| IdeaBankError::Database(format!("Failed to create schema_version table: {}", e)))?;

    let version = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .optional()?;

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    display_name TEXT PRIMARY KEY,
    preferred_name TEXT NOT NULL DEFAULT '',
    biography TEXT NOT NULL DEFAULT '',
    password_hash TEXT NOT NULL,
    salt_value TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS concepts (
    identifier TEXT PRIMARY KEY,
    author TEXT NOT NULL REFERENCES accounts(display_name) ON DELETE CASCADE,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    diagram TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (author, title)
);

CREATE TABLE IF NOT EXISTS concept_links (
    ancestor TEXT NOT NULL REFERENCES concepts(identifier) ON DELETE CASCADE,
    descendant TEXT NOT NULL REFERENCES concepts(identifier) ON DELETE CASCADE,
    PRIMARY KEY (ancestor, descendant),
    CHECK (ancestor <> descendant)
);

CREATE TABLE IF NOT EXISTS follows (
    follower TEXT NOT NULL REFERENCES accounts(display_name) ON DELETE CASCADE,
    followee TEXT NOT NULL REFERENCES accounts(display_name) ON DELETE CASCADE,
    followed_on TEXT NOT NULL,
    PRIMARY KEY (follower, followee)
);

CREATE TABLE IF NOT EXISTS likes (
    user_liking TEXT NOT NULL REFERENCES accounts(display_name) ON DELETE CASCADE,
    concept_liked TEXT NOT NULL REFERENCES concepts(identifier) ON DELETE CASCADE,
    liked_on TEXT NOT NULL,
    PRIMARY KEY (user_liking, concept_liked)
);

CREATE TABLE IF NOT EXISTS comments (
    comment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    comment_on TEXT NOT NULL REFERENCES concepts(identifier) ON DELETE CASCADE,
    comment_by TEXT NOT NULL REFERENCES accounts(display_name) ON DELETE CASCADE,
    free_text TEXT NOT NULL,
    response_to INTEGER REFERENCES comments(comment_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_concepts_updated ON concepts(updated_at);
CREATE INDEX IF NOT EXISTS idx_links_descendant ON concept_links(descendant);
CREATE INDEX IF NOT EXISTS idx_comments_thread ON comments(comment_on, response_to);
"#;
