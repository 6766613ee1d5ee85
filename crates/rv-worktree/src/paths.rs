//! Pure path conventions, kept free of I/O so they're trivially testable.

use std::path::{Path, PathBuf};

/// Where a repo's own local clone is expected to live.
pub fn base_repo_path(repo_location: &Path, repo: &str) -> PathBuf {
    repo_location.join(repo)
}

/// `<repo_location>/<repo>_worktrees/<number>_<branch>`
pub fn worktree_path(repo_location: &Path, repo: &str, number: u64, branch: &str) -> PathBuf {
    repo_location
        .join(format!("{repo}_worktrees"))
        .join(format!("{number}_{branch}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worktree_path_follows_the_documented_convention() {
        let path = worktree_path(Path::new("/home/me/src"), "widgets", 42, "fix-thing");
        assert_eq!(path, Path::new("/home/me/src/widgets_worktrees/42_fix-thing"));
    }

    #[test]
    fn base_repo_path_is_repo_location_joined_with_repo_name() {
        let path = base_repo_path(Path::new("/home/me/src"), "widgets");
        assert_eq!(path, Path::new("/home/me/src/widgets"));
    }
}
