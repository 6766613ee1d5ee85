//! The embedded Store: transactional upserts over sections/items,
//! read-through cache blobs, local comment drafts, worktree records,
//! and plugin results.
//!
//! A single `rusqlite::Connection` is shared behind a `tokio::sync::Mutex`
//! so the Applier's serialized writes and RPC handlers' draft-table
//! writes never race on the same connection, matching the ownership
//! split in the data model (§3 "Lifecycle").

use crate::error::{Result, StoreError};
use crate::model::{Item, LocalComment, NewItem, PluginResult, PluginStatus, PrKey, PrRecord, Section, Worktree};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (creating if absent) the database at `path` and run migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        crate::migrations::run(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        crate::migrations::run(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ---- Sections / Items (reconciler-owned) ----

    /// Create the section if absent and return its id.
    pub async fn ensure_section(&self, name: &str) -> Result<i64> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR IGNORE INTO sections (name, indent_level) VALUES (?1, 0)",
            params![name],
        )?;
        let id: i64 = conn.query_row(
            "SELECT id FROM sections WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// All sections, ordered by `indent_level` then `name`, for a
    /// dashboard view across every workflow's output.
    pub async fn list_sections(&self) -> Result<Vec<Section>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, name, indent_level FROM sections ORDER BY indent_level, name",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Section {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    indent_level: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub async fn delete_section(&self, name: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM sections WHERE name = ?1", params![name])?;
        Ok(())
    }

    pub async fn list_items(&self, section_id: i64) -> Result<Vec<Item>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, section_id, identifier, status, title, details, tags, archived, ttl
             FROM items WHERE section_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![section_id], row_to_item)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub async fn get_item(&self, section_id: i64, identifier: &str) -> Result<Option<Item>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, section_id, identifier, status, title, details, tags, archived, ttl
             FROM items WHERE section_id = ?1 AND identifier = ?2",
            params![section_id, identifier],
            row_to_item,
        )
        .optional()
        .map_err(StoreError::from)
    }

    /// Insert or fully overwrite an item's status/title/details/tags/archived.
    pub async fn upsert_item(&self, section_id: i64, item: &NewItem) -> Result<Item> {
        let details = serde_json::to_string(&item.details).map_err(|e| StoreError::InvalidBlob {
            table: "items.details",
            key: item.identifier.clone(),
            source: e,
        })?;
        let tags = serde_json::to_string(&item.tags).map_err(|e| StoreError::InvalidBlob {
            table: "items.tags",
            key: item.identifier.clone(),
            source: e,
        })?;

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO items (section_id, identifier, status, title, details, tags, archived, ttl)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(section_id, identifier) DO UPDATE SET
                status = excluded.status,
                title = excluded.title,
                details = excluded.details,
                tags = excluded.tags,
                archived = excluded.archived,
                ttl = excluded.ttl",
            params![
                section_id,
                item.identifier,
                item.status,
                item.title,
                details,
                tags,
                item.archived,
                item.ttl,
            ],
        )?;

        conn.query_row(
            "SELECT id, section_id, identifier, status, title, details, tags, archived, ttl
             FROM items WHERE section_id = ?1 AND identifier = ?2",
            params![section_id, item.identifier],
            row_to_item,
        )
        .map_err(StoreError::from)
    }

    pub async fn archive_item(&self, section_id: i64, identifier: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE items SET archived = 1 WHERE section_id = ?1 AND identifier = ?2",
            params![section_id, identifier],
        )?;
        Ok(())
    }

    pub async fn delete_item(&self, section_id: i64, identifier: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM items WHERE section_id = ?1 AND identifier = ?2",
            params![section_id, identifier],
        )?;
        Ok(())
    }

    // ---- PR record / cached blobs (written by any fetching handler) ----

    pub async fn get_pr_record(&self, key: &PrKey) -> Result<Option<PrRecord>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT latest_sha, body FROM pr_records WHERE owner=?1 AND repo=?2 AND number=?3",
            params![key.owner, key.repo, key.number],
            |row| {
                Ok(PrRecord {
                    key: key.clone(),
                    latest_sha: row.get(0)?,
                    body: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub async fn put_pr_record(&self, key: &PrKey, latest_sha: &str, body: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO pr_records (owner, repo, number, latest_sha, body)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(owner, repo, number) DO UPDATE SET
                latest_sha = excluded.latest_sha, body = excluded.body",
            params![key.owner, key.repo, key.number, latest_sha, body],
        )?;
        Ok(())
    }

    pub async fn get_comments_blob(&self, key: &PrKey) -> Result<Option<String>> {
        self.get_blob("pr_comments_blobs", key).await
    }

    pub async fn put_comments_blob(&self, key: &PrKey, blob: &str) -> Result<()> {
        self.put_blob("pr_comments_blobs", key, blob).await
    }

    pub async fn get_diff_blob(&self, key: &PrKey) -> Result<Option<String>> {
        self.get_blob("pr_diff_blobs", key).await
    }

    pub async fn put_diff_blob(&self, key: &PrKey, blob: &str) -> Result<()> {
        self.put_blob("pr_diff_blobs", key, blob).await
    }

    pub async fn get_requested_reviewers_blob(&self, key: &PrKey) -> Result<Option<String>> {
        self.get_blob("requested_reviewers_blobs", key).await
    }

    pub async fn put_requested_reviewers_blob(&self, key: &PrKey, blob: &str) -> Result<()> {
        self.put_blob("requested_reviewers_blobs", key, blob).await
    }

    pub async fn get_ci_status_blob(&self, key: &PrKey, sha: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT blob FROM ci_status_blobs WHERE owner=?1 AND repo=?2 AND number=?3 AND sha=?4",
            params![key.owner, key.repo, key.number, sha],
            |row| row.get(0),
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub async fn put_ci_status_blob(&self, key: &PrKey, sha: &str, blob: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO ci_status_blobs (owner, repo, number, sha, blob)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(owner, repo, number, sha) DO UPDATE SET blob = excluded.blob",
            params![key.owner, key.repo, key.number, sha, blob],
        )?;
        Ok(())
    }

    async fn get_blob(&self, table: &'static str, key: &PrKey) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT blob FROM {table} WHERE owner=?1 AND repo=?2 AND number=?3",
            table = table
        );
        conn.query_row(&sql, params![key.owner, key.repo, key.number], |row| {
            row.get(0)
        })
        .optional()
        .map_err(StoreError::from)
    }

    async fn put_blob(&self, table: &'static str, key: &PrKey, blob: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "INSERT INTO {table} (owner, repo, number, blob) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(owner, repo, number) DO UPDATE SET blob = excluded.blob",
            table = table
        );
        conn.execute(&sql, params![key.owner, key.repo, key.number, blob])?;
        Ok(())
    }

    // ---- Local comments / feedback (client-owned) ----

    pub async fn add_comment(
        &self,
        key: &PrKey,
        filename: &str,
        position: u32,
        body: Option<&str>,
        reply_to_id: Option<i64>,
    ) -> Result<i64> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO local_comments (owner, repo, number, filename, position, body, reply_to_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![key.owner, key.repo, key.number, filename, position, body, reply_to_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub async fn edit_comment(&self, id: i64, body: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        let rows = conn.execute(
            "UPDATE local_comments SET body = ?1 WHERE id = ?2",
            params![body, id],
        )?;
        if rows == 0 {
            return Err(StoreError::NoSuchComment(id));
        }
        Ok(())
    }

    pub async fn delete_comment(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM local_comments WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub async fn list_comments(&self, key: &PrKey) -> Result<Vec<LocalComment>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, owner, repo, number, filename, position, body, reply_to_id
             FROM local_comments WHERE owner=?1 AND repo=?2 AND number=?3 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![key.owner, key.repo, key.number], row_to_comment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub async fn remove_pr_comments(&self, key: &PrKey) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM local_comments WHERE owner=?1 AND repo=?2 AND number=?3",
            params![key.owner, key.repo, key.number],
        )?;
        Ok(())
    }

    pub async fn get_feedback(&self, key: &PrKey) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT body FROM feedback WHERE owner=?1 AND repo=?2 AND number=?3",
            params![key.owner, key.repo, key.number],
            |row| row.get(0),
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub async fn set_feedback(&self, key: &PrKey, body: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO feedback (owner, repo, number, body) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(owner, repo, number) DO UPDATE SET body = excluded.body",
            params![key.owner, key.repo, key.number, body],
        )?;
        Ok(())
    }

    pub async fn clear_feedback(&self, key: &PrKey) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM feedback WHERE owner=?1 AND repo=?2 AND number=?3",
            params![key.owner, key.repo, key.number],
        )?;
        Ok(())
    }

    // ---- Worktrees (WorktreeManager-owned) ----

    pub async fn get_worktree(&self, key: &PrKey) -> Result<Option<Worktree>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT path, branch FROM worktrees WHERE owner=?1 AND repo=?2 AND number=?3",
            params![key.owner, key.repo, key.number],
            |row| {
                Ok(Worktree {
                    key: key.clone(),
                    path: row.get(0)?,
                    branch: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub async fn put_worktree(&self, key: &PrKey, path: &str, branch: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO worktrees (owner, repo, number, path, branch) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(owner, repo, number) DO UPDATE SET path = excluded.path, branch = excluded.branch",
            params![key.owner, key.repo, key.number, path, branch],
        )?;
        Ok(())
    }

    pub async fn delete_worktree(&self, key: &PrKey) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM worktrees WHERE owner=?1 AND repo=?2 AND number=?3",
            params![key.owner, key.repo, key.number],
        )?;
        Ok(())
    }

    // ---- Plugin configs / results (PluginRunner-owned) ----

    pub async fn seed_plugin_config(
        &self,
        name: &str,
        command: &str,
        include_diff: bool,
        include_headers: bool,
        include_comments: bool,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO plugin_configs (name, command, include_diff, include_headers, include_comments)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(name) DO UPDATE SET
                command = excluded.command,
                include_diff = excluded.include_diff,
                include_headers = excluded.include_headers,
                include_comments = excluded.include_comments",
            params![name, command, include_diff, include_headers, include_comments],
        )?;
        Ok(())
    }

    pub async fn put_plugin_result(
        &self,
        key: &PrKey,
        plugin_name: &str,
        status: PluginStatus,
        output: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO plugin_results (owner, repo, number, plugin_name, status, output)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(owner, repo, number, plugin_name) DO UPDATE SET
                status = excluded.status, output = excluded.output",
            params![
                key.owner,
                key.repo,
                key.number,
                plugin_name,
                status_str(status),
                output
            ],
        )?;
        Ok(())
    }

    pub async fn list_plugin_results(&self, key: &PrKey) -> Result<Vec<PluginResult>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT plugin_name, status, output FROM plugin_results
             WHERE owner=?1 AND repo=?2 AND number=?3",
        )?;
        let rows = stmt
            .query_map(params![key.owner, key.repo, key.number], |row| {
                let status: String = row.get(1)?;
                Ok(PluginResult {
                    key: key.clone(),
                    plugin_name: row.get(0)?,
                    status: parse_status(&status),
                    output: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn status_str(status: PluginStatus) -> &'static str {
    match status {
        PluginStatus::Pending => "pending",
        PluginStatus::Success => "success",
        PluginStatus::Error => "error",
    }
}

fn parse_status(s: &str) -> PluginStatus {
    match s {
        "success" => PluginStatus::Success,
        "error" => PluginStatus::Error,
        _ => PluginStatus::Pending,
    }
}

fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<Item> {
    let details: String = row.get(5)?;
    let tags: String = row.get(6)?;
    Ok(Item {
        id: row.get(0)?,
        section_id: row.get(1)?,
        identifier: row.get(2)?,
        status: row.get(3)?,
        title: row.get(4)?,
        details: serde_json::from_str(&details).unwrap_or_default(),
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        archived: row.get(7)?,
        ttl: row.get(8)?,
    })
}

fn row_to_comment(row: &rusqlite::Row) -> rusqlite::Result<LocalComment> {
    Ok(LocalComment {
        id: row.get(0)?,
        owner: row.get(1)?,
        repo: row.get(2)?,
        number: row.get(3)?,
        filename: row.get(4)?,
        position: row.get(5)?,
        body: row.get(6)?,
        reply_to_id: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr() -> PrKey {
        PrKey::new("acme", "widgets", 42)
    }

    #[tokio::test]
    async fn upsert_item_is_idempotent_and_overwrites() {
        let store = Store::open_in_memory().unwrap();
        let section_id = store.ensure_section("Review requests").await.unwrap();

        let item = NewItem {
            identifier: "acme/widgets-42".to_string(),
            status: "open".to_string(),
            title: "Fix the thing".to_string(),
            details: vec!["line one".to_string()],
            tags: vec!["needs-review".to_string()],
            archived: false,
            ttl: None,
        };
        let inserted = store.upsert_item(section_id, &item).await.unwrap();

        let mut updated = item.clone();
        updated.title = "Fix the thing, properly".to_string();
        store.upsert_item(section_id, &updated).await.unwrap();

        let items = store.list_items(section_id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, inserted.id);
        assert_eq!(items[0].title, "Fix the thing, properly");
    }

    #[tokio::test]
    async fn list_sections_returns_every_created_section() {
        let store = Store::open_in_memory().unwrap();
        store.ensure_section("Review requests").await.unwrap();
        store.ensure_section("My PRs").await.unwrap();
        store.ensure_section("Review requests").await.unwrap();

        let sections = store.list_sections().await.unwrap();
        let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Review requests"));
        assert!(names.contains(&"My PRs"));
    }

    #[tokio::test]
    async fn delete_section_cascades_to_items() {
        let store = Store::open_in_memory().unwrap();
        let section_id = store.ensure_section("Review requests").await.unwrap();
        store
            .upsert_item(
                section_id,
                &NewItem {
                    identifier: "a".to_string(),
                    status: "open".to_string(),
                    title: "t".to_string(),
                    details: vec![],
                    tags: vec![],
                    archived: false,
                    ttl: None,
                },
            )
            .await
            .unwrap();

        store.delete_section("Review requests").await.unwrap();
        let items = store.list_items(section_id).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn add_comment_then_delete_is_a_no_op() {
        let store = Store::open_in_memory().unwrap();
        let key = pr();
        let id = store
            .add_comment(&key, "a.rs", 3, Some("nit"), None)
            .await
            .unwrap();
        store.delete_comment(id).await.unwrap();
        let remaining = store.list_comments(&key).await.unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn submit_review_success_clears_drafts_and_feedback() {
        let store = Store::open_in_memory().unwrap();
        let key = pr();
        store
            .add_comment(&key, "a.rs", 3, Some("nit"), None)
            .await
            .unwrap();
        store.set_feedback(&key, "looks good").await.unwrap();

        store.remove_pr_comments(&key).await.unwrap();
        store.clear_feedback(&key).await.unwrap();

        assert!(store.list_comments(&key).await.unwrap().is_empty());
        assert!(store.get_feedback(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ci_status_blob_is_keyed_by_sha() {
        let store = Store::open_in_memory().unwrap();
        let key = pr();
        store
            .put_ci_status_blob(&key, "sha1", "{\"state\":\"success\"}")
            .await
            .unwrap();
        store
            .put_ci_status_blob(&key, "sha2", "{\"state\":\"pending\"}")
            .await
            .unwrap();

        assert_eq!(
            store.get_ci_status_blob(&key, "sha1").await.unwrap(),
            Some("{\"state\":\"success\"}".to_string())
        );
        assert_eq!(
            store.get_ci_status_blob(&key, "sha2").await.unwrap(),
            Some("{\"state\":\"pending\"}".to_string())
        );
    }

    #[tokio::test]
    async fn plugin_result_upsert_overwrites_status() {
        let store = Store::open_in_memory().unwrap();
        let key = pr();
        store
            .put_plugin_result(&key, "lint-bot", PluginStatus::Pending, "")
            .await
            .unwrap();
        store
            .put_plugin_result(&key, "lint-bot", PluginStatus::Error, "boom")
            .await
            .unwrap();

        let results = store.list_plugin_results(&key).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, PluginStatus::Error);
        assert_eq!(results[0].output, "boom");
    }

    #[tokio::test]
    async fn pr_record_and_diff_blob_round_trip() {
        let store = Store::open_in_memory().unwrap();
        let key = pr();

        assert!(store.get_pr_record(&key).await.unwrap().is_none());
        assert!(store.get_diff_blob(&key).await.unwrap().is_none());

        store.put_pr_record(&key, "sha1", "a description").await.unwrap();
        store.put_diff_blob(&key, "--- a/x\n+++ b/x\n").await.unwrap();

        let record = store.get_pr_record(&key).await.unwrap().unwrap();
        assert_eq!(record.latest_sha, "sha1");
        assert_eq!(record.body, "a description");
        assert_eq!(store.get_diff_blob(&key).await.unwrap().unwrap(), "--- a/x\n+++ b/x\n");

        store.put_pr_record(&key, "sha2", "updated").await.unwrap();
        let record = store.get_pr_record(&key).await.unwrap().unwrap();
        assert_eq!(record.latest_sha, "sha2");
        assert_eq!(record.body, "updated");
    }
}
