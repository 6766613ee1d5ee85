//! Builds the `GetPR` payload: a human-readable rendering that
//! interleaves the diff with its comments, the structured PR header,
//! and the comments themselves classified by anchor reachability.

use rv_diff::{parse_diff, ParsedLine};
use rv_remote::{PullRequest, ReviewComment};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct PrMetadata {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub title: String,
    pub author: String,
    pub draft: bool,
    pub base_branch: String,
    pub head_branch: String,
    pub head_sha: String,
    pub labels: Vec<String>,
}

impl PrMetadata {
    pub fn new(owner: &str, repo: &str, pr: &PullRequest) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number: pr.number,
            title: pr.title.clone(),
            author: pr.author.clone(),
            draft: pr.draft,
            base_branch: pr.base_branch.clone(),
            head_branch: pr.head_branch.clone(),
            head_sha: pr.head_sha.clone(),
            labels: pr.labels.clone(),
        }
    }
}

/// How a comment's anchor relates to the diff currently on file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentCategory {
    /// The anchor is still reachable from the current diff.
    Review,
    /// The anchor no longer exists in the current diff (the file moved on).
    Outdated,
    /// Anchored at position 0: a file-level comment, not a line comment.
    File,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedComment {
    pub id: u64,
    pub path: String,
    pub position: Option<u32>,
    pub in_reply_to_id: Option<u64>,
    pub author: String,
    pub body: String,
    pub category: CommentCategory,
}

/// There is no remote capability for fetching formal review objects
/// (approve/request-changes/comment), only the flat inline comments
/// `RemoteRepo::fetch_review_comments` returns. `reviews[]` is
/// synthesized as a per-author activity summary over those comments.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewSummary {
    pub author: String,
    pub comment_count: u64,
}

pub fn classify_comments(diff_lines: &[ParsedLine], comments: &[ReviewComment]) -> Vec<RenderedComment> {
    let mut anchors: HashMap<(String, u32), ()> = HashMap::new();
    for line in diff_lines {
        if !line.clickable {
            continue;
        }
        if let (Some(file), Some(pos)) = (line.file.as_deref(), line.pos) {
            anchors.insert((file.to_string(), pos), ());
        }
    }

    comments
        .iter()
        .map(|comment| {
            let category = match comment.position {
                Some(0) => CommentCategory::File,
                Some(pos) if anchors.contains_key(&(comment.path.clone(), pos)) => CommentCategory::Review,
                _ => CommentCategory::Outdated,
            };
            RenderedComment {
                id: comment.id,
                path: comment.path.clone(),
                position: comment.position,
                in_reply_to_id: comment.in_reply_to_id,
                author: comment.author.clone(),
                body: comment.body.clone(),
                category,
            }
        })
        .collect()
}

pub fn summarize_reviews(comments: &[ReviewComment]) -> Vec<ReviewSummary> {
    let mut counts: Vec<(String, u64)> = Vec::new();
    for comment in comments {
        match counts.iter_mut().find(|(author, _)| *author == comment.author) {
            Some((_, count)) => *count += 1,
            None => counts.push((comment.author.clone(), 1)),
        }
    }
    counts
        .into_iter()
        .map(|(author, comment_count)| ReviewSummary { author, comment_count })
        .collect()
}

/// Walks the parsed diff in order, emitting each line's text and
/// appending any comment anchored at that exact `(file, position)`
/// directly below it. File-level (`position 0`) and outdated comments
/// that never match a line are appended at the end.
pub fn render_content(diff_lines: &[ParsedLine], comments: &[RenderedComment]) -> String {
    let mut out = String::new();
    let mut rendered = vec![false; comments.len()];

    for line in diff_lines {
        out.push_str(&line.text);
        out.push('\n');
        if let Some(pos) = line.pos {
            for (idx, comment) in comments.iter().enumerate() {
                if rendered[idx] {
                    continue;
                }
                if comment.position == Some(pos) && line.file.as_deref() == Some(comment.path.as_str()) {
                    out.push_str(&format!("    > {}: {}\n", comment.author, comment.body));
                    rendered[idx] = true;
                }
            }
        }
    }

    let trailing: Vec<&RenderedComment> = comments
        .iter()
        .enumerate()
        .filter(|(idx, _)| !rendered[*idx])
        .map(|(_, comment)| comment)
        .collect();
    if !trailing.is_empty() {
        out.push_str("\n-- unanchored comments --\n");
        for comment in trailing {
            out.push_str(&format!("{} ({}): {}\n", comment.path, comment.author, comment.body));
        }
    }

    out
}

pub fn parse_and_render(diff_text: &str, comments: &[ReviewComment]) -> (String, Vec<RenderedComment>, Vec<ReviewSummary>) {
    let diff_lines = parse_diff(diff_text);
    let classified = classify_comments(&diff_lines, comments);
    let reviews = summarize_reviews(comments);
    let content = render_content(&diff_lines, &classified);
    (content, classified, reviews)
}
