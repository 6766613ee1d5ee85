//! Turns a fetched `PullRequest` (plus optional diff text and release
//! check output) into the Store's generic `NewItem` shape.

use rv_remote::PullRequest;
use rv_store::NewItem;

/// Identifier convention shared by every workflow kind: `"<owner>/<repo>-<number>"`.
pub fn identifier(owner: &str, repo: &str, number: u64) -> String {
    format!("{owner}/{repo}-{number}")
}

/// Inverse of `identifier`: recovers `(owner, repo, number)`. Assumes
/// the repo name itself doesn't end in `-<digits>`.
pub fn parse_identifier(identifier: &str) -> Option<(String, String, u64)> {
    let (owner, rest) = identifier.split_once('/')?;
    let (repo, number_str) = rest.rsplit_once('-')?;
    let number = number_str.parse().ok()?;
    Some((owner.to_string(), repo.to_string(), number))
}

/// Builds the `NewItem` a workflow emits for one PR.
///
/// `diff_text` is `Some` only when the workflow's `include_diff` is set
/// and the diff was fetched successfully. `release_check_output` is the
/// captured stdout of the workflow's `release_check_command`, if any.
pub struct PrItemBuilder<'a> {
    pub owner: &'a str,
    pub repo: &'a str,
    pub pr: &'a PullRequest,
    pub diff_text: Option<&'a str>,
    pub release_check_output: Option<&'a str>,
}

impl<'a> PrItemBuilder<'a> {
    pub fn build(&self) -> NewItem {
        let mut details = Vec::new();
        if let Some(body) = &self.pr.body {
            if !body.trim().is_empty() {
                details.push(body.clone());
            }
        }
        details.push(format!(
            "{} -> {} ({} files, +{}/-{})",
            self.pr.head_branch, self.pr.base_branch, self.pr.comments, self.pr.additions, self.pr.deletions
        ));
        if let Some(output) = self.release_check_output {
            details.push(format!("release check: {output}"));
        }
        if let Some(diff) = self.diff_text {
            details.push(diff.to_string());
        }

        NewItem {
            identifier: identifier(self.owner, self.repo, self.pr.number),
            status: status(self.pr),
            title: self.pr.title.clone(),
            details,
            tags: self.pr.labels.clone(),
            archived: false,
            ttl: None,
        }
    }
}

fn status(pr: &PullRequest) -> String {
    if pr.draft {
        "draft".to_string()
    } else {
        "open".to_string()
    }
}
