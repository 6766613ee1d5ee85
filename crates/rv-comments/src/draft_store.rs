//! Thin, named wrapper over the Store's client-owned draft tables.
//! Exists as its own type so the RPC handlers depend on an API shaped
//! after the spec's verbs rather than the Store's generic CRUD.

use rv_store::{LocalComment, PrKey, Result, Store};

#[derive(Clone)]
pub struct DraftStore {
    store: Store,
}

impl DraftStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn add_comment(
        &self,
        key: &PrKey,
        filename: &str,
        position: u32,
        body: Option<&str>,
        reply_to_id: Option<i64>,
    ) -> Result<i64> {
        self.store.add_comment(key, filename, position, body, reply_to_id).await
    }

    pub async fn edit_comment(&self, id: i64, body: &str) -> Result<()> {
        self.store.edit_comment(id, body).await
    }

    pub async fn delete_comment(&self, id: i64) -> Result<()> {
        self.store.delete_comment(id).await
    }

    pub async fn remove_pr_comments(&self, key: &PrKey) -> Result<()> {
        self.store.remove_pr_comments(key).await
    }

    pub async fn list_comments(&self, key: &PrKey) -> Result<Vec<LocalComment>> {
        self.store.list_comments(key).await
    }

    pub async fn set_feedback(&self, key: &PrKey, body: &str) -> Result<()> {
        self.store.set_feedback(key, body).await
    }

    pub async fn get_feedback(&self, key: &PrKey) -> Result<Option<String>> {
        self.store.get_feedback(key).await
    }
}
