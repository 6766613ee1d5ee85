//! `FileChange`: the event a workflow emits for one Item, and the
//! per-workflow tally the Listener/Applier accumulate from them.

use rv_store::NewItem;

/// How one Item should be reconciled into the Store.
#[derive(Debug, Clone, PartialEq)]
pub enum FileChangeKind {
    /// A new identifier not previously present in the section.
    Addition(NewItem),
    /// An existing identifier whose content differs from the stored row.
    Update(NewItem),
    /// A previously-present identifier, now missing from the workflow's
    /// PR set, whose prune policy is `archive`.
    Archive,
    /// A previously-present identifier, now missing, whose prune policy
    /// is `delete`.
    Delete,
    /// An existing identifier whose computed content is identical to
    /// what's stored.
    NoChange,
}

/// One workflow's emitted event for one item identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct FileChange {
    pub section: String,
    pub identifier: String,
    pub kind: FileChangeKind,
    /// The PR's head branch, set on `Addition`/`Update` so the Applier
    /// can hand it to the WorktreeManager without re-fetching the PR.
    pub branch: Option<String>,
}

/// Per-workflow tally of what a cycle's run produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunResult {
    pub added: u32,
    pub updated: u32,
    pub deleted: u32,
    pub skipped: u32,
}

impl RunResult {
    pub fn record(&mut self, kind: &FileChangeKind) {
        match kind {
            FileChangeKind::Addition(_) => self.added += 1,
            FileChangeKind::Update(_) => self.updated += 1,
            FileChangeKind::Archive | FileChangeKind::Delete => self.deleted += 1,
            FileChangeKind::NoChange => self.skipped += 1,
        }
    }

    /// Per §8: the number of `FileChange` events equals `added +
    /// updated + deleted + skipped`.
    pub fn total(&self) -> u32 {
        self.added + self.updated + self.deleted + self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_matches_event_count_invariant() {
        let mut result = RunResult::default();
        let item = NewItem {
            identifier: "o/r-1".to_string(),
            status: "open".to_string(),
            title: "t".to_string(),
            details: vec![],
            tags: vec![],
            archived: false,
            ttl: None,
        };
        let kinds = vec![
            FileChangeKind::Addition(item.clone()),
            FileChangeKind::Update(item),
            FileChangeKind::Archive,
            FileChangeKind::Delete,
            FileChangeKind::NoChange,
        ];
        for kind in &kinds {
            result.record(kind);
        }
        assert_eq!(result.total(), kinds.len() as u32);
        assert_eq!(result.added, 1);
        assert_eq!(result.updated, 1);
        assert_eq!(result.deleted, 2);
        assert_eq!(result.skipped, 1);
    }
}
