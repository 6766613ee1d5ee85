//! Additive, idempotent schema migrations, run once at startup.
//!
//! Every statement uses `IF NOT EXISTS` or tolerates re-application so
//! that starting against an already-migrated database is a no-op.

use rusqlite::Connection;

pub fn run(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS sections (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            indent_level INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY,
            section_id INTEGER NOT NULL REFERENCES sections(id) ON DELETE CASCADE,
            identifier TEXT NOT NULL,
            status TEXT NOT NULL,
            title TEXT NOT NULL,
            details TEXT NOT NULL DEFAULT '[]',
            tags TEXT NOT NULL DEFAULT '[]',
            archived INTEGER NOT NULL DEFAULT 0,
            ttl INTEGER,
            UNIQUE(section_id, identifier)
        );

        CREATE TABLE IF NOT EXISTS pr_records (
            owner TEXT NOT NULL,
            repo TEXT NOT NULL,
            number INTEGER NOT NULL,
            latest_sha TEXT NOT NULL,
            body TEXT NOT NULL,
            PRIMARY KEY (owner, repo, number)
        );

        CREATE TABLE IF NOT EXISTS pr_comments_blobs (
            owner TEXT NOT NULL,
            repo TEXT NOT NULL,
            number INTEGER NOT NULL,
            blob TEXT NOT NULL,
            PRIMARY KEY (owner, repo, number)
        );

        CREATE TABLE IF NOT EXISTS pr_diff_blobs (
            owner TEXT NOT NULL,
            repo TEXT NOT NULL,
            number INTEGER NOT NULL,
            blob TEXT NOT NULL,
            PRIMARY KEY (owner, repo, number)
        );

        CREATE TABLE IF NOT EXISTS requested_reviewers_blobs (
            owner TEXT NOT NULL,
            repo TEXT NOT NULL,
            number INTEGER NOT NULL,
            blob TEXT NOT NULL,
            PRIMARY KEY (owner, repo, number)
        );

        CREATE TABLE IF NOT EXISTS ci_status_blobs (
            owner TEXT NOT NULL,
            repo TEXT NOT NULL,
            number INTEGER NOT NULL,
            sha TEXT NOT NULL,
            blob TEXT NOT NULL,
            PRIMARY KEY (owner, repo, number, sha)
        );

        CREATE TABLE IF NOT EXISTS local_comments (
            id INTEGER PRIMARY KEY,
            owner TEXT NOT NULL,
            repo TEXT NOT NULL,
            number INTEGER NOT NULL,
            filename TEXT NOT NULL,
            position INTEGER NOT NULL,
            body TEXT,
            reply_to_id INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_local_comments_pr
            ON local_comments(owner, repo, number);

        CREATE TABLE IF NOT EXISTS feedback (
            owner TEXT NOT NULL,
            repo TEXT NOT NULL,
            number INTEGER NOT NULL,
            body TEXT NOT NULL,
            PRIMARY KEY (owner, repo, number)
        );

        CREATE TABLE IF NOT EXISTS worktrees (
            owner TEXT NOT NULL,
            repo TEXT NOT NULL,
            number INTEGER NOT NULL,
            path TEXT NOT NULL,
            branch TEXT NOT NULL,
            PRIMARY KEY (owner, repo, number)
        );

        CREATE TABLE IF NOT EXISTS plugin_configs (
            name TEXT PRIMARY KEY,
            command TEXT NOT NULL,
            include_diff INTEGER NOT NULL DEFAULT 0,
            include_headers INTEGER NOT NULL DEFAULT 0,
            include_comments INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS plugin_results (
            owner TEXT NOT NULL,
            repo TEXT NOT NULL,
            number INTEGER NOT NULL,
            plugin_name TEXT NOT NULL,
            status TEXT NOT NULL,
            output TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (owner, repo, number, plugin_name)
        );
        "#,
    )
}
