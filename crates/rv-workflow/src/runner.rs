//! `WorkflowRunner`: fetches PRs for one configured workflow, filters
//! and classifies them against the Store's current section contents,
//! and emits one `FileChange` per item.

use crate::change::{FileChange, FileChangeKind, RunResult};
use crate::filters::{self, Filter};
use crate::item_serializer::PrItemBuilder;
use crate::project_tracker::ProjectTracker;
use log::{error, warn};
use rv_config::{PrunePolicy, WorkflowConfig, WorkflowKind};
use rv_remote::{PullRequest, PullRequestState, RemoteRepo};
use rv_store::{Item, NewItem, Store};

/// Runs one configured workflow to completion and returns its emitted
/// changes plus the cycle's tally.
///
/// On a PR-list fetch failure the whole run returns empty per the
/// bounded-failure rule: nothing is emitted and `RunResult` is zeroed,
/// rather than partially reconciling a section against an incomplete
/// PR set.
pub async fn run(
    remote: &dyn RemoteRepo,
    store: &Store,
    tracker: &dyn ProjectTracker,
    config: &WorkflowConfig,
    viewer_login: &str,
) -> anyhow::Result<(Vec<FileChange>, RunResult)> {
    let prs = match fetch_candidate_prs(remote, tracker, config, viewer_login).await {
        Ok(prs) => prs,
        Err(err) => {
            error!(
                "workflow '{}' failed to fetch PRs, emitting nothing this cycle: {err:#}",
                config.section_title
            );
            return Ok((Vec::new(), RunResult::default()));
        }
    };

    let mut filters = filters::parse_filter_names(&config.filters);
    if !config.teams.is_empty() {
        if let Some((org, _, _)) = prs.first() {
            let org = org.clone();
            let mut members = Vec::new();
            for team in &config.teams {
                match remote.fetch_team_members(&org, team).await {
                    Ok(mut logins) => members.append(&mut logins),
                    Err(err) => warn!("failed to resolve team '{team}' in org '{org}': {err:#}"),
                }
            }
            filters::prepend_team_filter(&mut filters, members);
        }
    }

    let prs: Vec<PullRequest> = prs.into_iter().map(|(_, _, pr)| pr).collect();

    let narrowed = narrow_for_kind(remote, config, viewer_login, prs).await;
    let filtered = filters::apply(narrowed, &filters);

    let mut incoming: Vec<NewItem> = Vec::new();
    for (owner, repo, pr) in reattach_coordinates(config, filtered) {
        let diff_text = if config.include_diff {
            match remote.fetch_pull_request_diff(&owner, &repo, pr.number).await {
                Ok(diff) => Some(diff),
                Err(err) => {
                    warn!("failed to fetch diff for {owner}/{repo}#{}: {err:#}", pr.number);
                    None
                }
            }
        } else {
            None
        };

        let release_check_output = match &config.release_check_command {
            Some(cmd) => run_release_check(cmd).await,
            None => None,
        };

        let item = PrItemBuilder {
            owner: &owner,
            repo: &repo,
            pr: &pr,
            diff_text: diff_text.as_deref(),
            release_check_output: release_check_output.as_deref(),
        }
        .build();
        incoming.push((item, pr.head_branch.clone()));
    }

    let section_id = store.ensure_section(&config.section_title).await?;
    let current = store.list_items(section_id).await?;
    let (changes, result) = classify(&config.section_title, current, incoming, config.prune);
    Ok((changes, result))
}

/// Fetches the PR set a workflow kind operates over, before generic
/// filters or kind-specific narrowing are applied.
async fn fetch_candidate_prs(
    remote: &dyn RemoteRepo,
    tracker: &dyn ProjectTracker,
    config: &WorkflowConfig,
    _viewer_login: &str,
) -> anyhow::Result<Vec<(String, String, PullRequest)>> {
    match config.kind {
        WorkflowKind::SyncReviewRequests | WorkflowKind::SingleRepoSyncReviewRequests => {
            let mut prs = Vec::new();
            for repo_spec in &config.repos {
                let (owner, repo) = split_owner_repo(repo_spec)?;
                let fetched = remote.list_pull_requests(owner, repo, PullRequestState::Open).await?;
                prs.extend(fetched.into_iter().map(|pr| (owner.to_string(), repo.to_string(), pr)));
            }
            Ok(prs)
        }
        WorkflowKind::ListMyPrs => {
            let state = config
                .state
                .as_deref()
                .map(parse_state)
                .unwrap_or_default();
            let mut prs = Vec::new();
            for repo_spec in &config.repos {
                let (owner, repo) = split_owner_repo(repo_spec)?;
                let fetched = remote.list_pull_requests(owner, repo, state).await?;
                prs.extend(fetched.into_iter().map(|pr| (owner.to_string(), repo.to_string(), pr)));
            }
            Ok(prs)
        }
        WorkflowKind::ProjectList => {
            let project_key = config
                .project_key
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("ProjectList workflow '{}' has no project_key configured", config.section_title))?;
            let coords = tracker.resolve_pr_numbers(project_key).await?;
            let mut prs = Vec::new();
            for (owner, repo, number) in coords {
                match remote.fetch_pull_request(&owner, &repo, number).await {
                    Ok(pr) => prs.push((owner, repo, pr)),
                    Err(err) => warn!("failed to fetch {owner}/{repo}#{number} for project list: {err:#}"),
                }
            }
            Ok(prs)
        }
    }
}

/// Re-threads the `(owner, repo)` coordinates a generic filter pass
/// drops, by re-deriving them from the configured repos. Workflows with
/// exactly one configured repo (the common case) use it directly;
/// multi-repo workflows rely on the PR's `html_url` to disambiguate.
fn reattach_coordinates(config: &WorkflowConfig, prs: Vec<PullRequest>) -> Vec<(String, String, PullRequest)> {
    if config.repos.len() == 1 {
        if let Ok((owner, repo)) = split_owner_repo(&config.repos[0]) {
            return prs
                .into_iter()
                .map(|pr| (owner.to_string(), repo.to_string(), pr))
                .collect();
        }
    }
    prs.into_iter()
        .filter_map(|pr| {
            coordinates_from_url(&pr.html_url).map(|(owner, repo)| (owner, repo, pr))
        })
        .collect()
}

fn coordinates_from_url(url: &str) -> Option<(String, String)> {
    let rest = url.split("github.com/").nth(1)?;
    let mut parts = rest.split('/');
    let owner = parts.next()?.to_string();
    let repo = parts.next()?.to_string();
    Some((owner, repo))
}

async fn narrow_for_kind(
    remote: &dyn RemoteRepo,
    config: &WorkflowConfig,
    viewer_login: &str,
    prs: Vec<PullRequest>,
) -> Vec<PullRequest> {
    match config.kind {
        WorkflowKind::SyncReviewRequests | WorkflowKind::SingleRepoSyncReviewRequests => {
            let mut narrowed = Vec::new();
            for pr in prs {
                if pr.draft || pr.author == viewer_login {
                    continue;
                }
                let (owner, repo) = match reattach_single(config, &pr) {
                    Some(coords) => coords,
                    None => continue,
                };
                match remote.fetch_requested_reviewers(&owner, &repo, pr.number).await {
                    Ok(reviewers) => {
                        if reviewers.iter().any(|r| r == viewer_login) {
                            narrowed.push(pr);
                        }
                    }
                    Err(err) => warn!(
                        "failed to fetch requested reviewers for {owner}/{repo}#{}: {err:#}",
                        pr.number
                    ),
                }
            }
            narrowed
        }
        WorkflowKind::ListMyPrs => prs.into_iter().filter(|pr| pr.author == viewer_login).collect(),
        WorkflowKind::ProjectList => prs,
    }
}

fn reattach_single(config: &WorkflowConfig, pr: &PullRequest) -> Option<(String, String)> {
    if config.repos.len() == 1 {
        return split_owner_repo(&config.repos[0]).ok().map(|(o, r)| (o.to_string(), r.to_string()));
    }
    coordinates_from_url(&pr.html_url)
}

fn split_owner_repo(spec: &str) -> anyhow::Result<(&str, &str)> {
    spec.split_once('/')
        .ok_or_else(|| anyhow::anyhow!("repo entry '{spec}' is not in 'owner/repo' form"))
}

fn parse_state(raw: &str) -> PullRequestState {
    match raw {
        "closed" => PullRequestState::Closed,
        "all" => PullRequestState::All,
        _ => PullRequestState::Open,
    }
}

async fn run_release_check(command: &str) -> Option<String> {
    match tokio::process::Command::new("sh").arg("-c").arg(command).output().await {
        Ok(output) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
        }
        Ok(output) => {
            warn!(
                "release check command exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
            None
        }
        Err(err) => {
            warn!("failed to run release check command '{command}': {err}");
            None
        }
    }
}

/// Classifies the incoming item set against a section's current items,
/// yielding one `FileChange` per outcome and the cycle's tally.
///
/// `incoming` pairs each computed item with the PR's head branch, so
/// `Addition`/`Update` events carry enough to provision a worktree
/// without the Applier re-fetching the PR.
fn classify(
    section: &str,
    current: Vec<Item>,
    incoming: Vec<(NewItem, String)>,
    prune: PrunePolicy,
) -> (Vec<FileChange>, RunResult) {
    let mut result = RunResult::default();
    let mut changes = Vec::new();
    let incoming_ids: std::collections::HashSet<&str> =
        incoming.iter().map(|(item, _)| item.identifier.as_str()).collect();

    for (item, branch) in incoming {
        let kind = match current.iter().find(|existing| existing.identifier == item.identifier) {
            None => FileChangeKind::Addition(item.clone()),
            Some(existing) => {
                if !existing.archived
                    && existing.status == item.status
                    && existing.title == item.title
                    && existing.details == item.details
                    && existing.tags == item.tags
                {
                    FileChangeKind::NoChange
                } else {
                    FileChangeKind::Update(item.clone())
                }
            }
        };
        result.record(&kind);
        let branch = matches!(kind, FileChangeKind::Addition(_) | FileChangeKind::Update(_)).then_some(branch);
        changes.push(FileChange {
            section: section.to_string(),
            identifier: item.identifier,
            kind,
            branch,
        });
    }

    for stale in current.iter().filter(|item| !incoming_ids.contains(item.identifier.as_str())) {
        let kind = match prune {
            PrunePolicy::Delete => Some(FileChangeKind::Delete),
            PrunePolicy::Archive if !stale.archived => Some(FileChangeKind::Archive),
            PrunePolicy::Archive | PrunePolicy::None => None,
        };
        if let Some(kind) = kind {
            result.record(&kind);
            changes.push(FileChange {
                section: section.to_string(),
                identifier: stale.identifier.clone(),
                kind,
                branch: None,
            });
        }
    }

    (changes, result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(identifier: &str, title: &str, archived: bool) -> Item {
        Item {
            id: 1,
            section_id: 1,
            identifier: identifier.to_string(),
            status: "open".to_string(),
            title: title.to_string(),
            details: vec![],
            tags: vec![],
            archived,
            ttl: None,
        }
    }

    fn new_item(identifier: &str, title: &str) -> (NewItem, String) {
        (
            NewItem {
                identifier: identifier.to_string(),
                status: "open".to_string(),
                title: title.to_string(),
                details: vec![],
                tags: vec![],
                archived: false,
                ttl: None,
            },
            "feature".to_string(),
        )
    }

    #[test]
    fn new_identifier_is_an_addition() {
        let (changes, result) = classify("Reviews", vec![], vec![new_item("a", "A")], PrunePolicy::None);
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0].kind, FileChangeKind::Addition(_)));
        assert_eq!(changes[0].branch.as_deref(), Some("feature"));
        assert_eq!(result.added, 1);
    }

    #[test]
    fn identical_content_is_no_change() {
        let current = vec![item("a", "A", false)];
        let (changes, result) = classify("Reviews", current, vec![new_item("a", "A")], PrunePolicy::None);
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0].kind, FileChangeKind::NoChange));
        assert!(changes[0].branch.is_none());
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn differing_title_is_an_update() {
        let current = vec![item("a", "Old title", false)];
        let (changes, result) = classify("Reviews", current, vec![new_item("a", "New title")], PrunePolicy::None);
        assert!(matches!(changes[0].kind, FileChangeKind::Update(_)));
        assert_eq!(changes[0].branch.as_deref(), Some("feature"));
        assert_eq!(result.updated, 1);
    }

    #[test]
    fn missing_with_prune_delete_is_a_delete() {
        let current = vec![item("a", "A", false)];
        let (changes, result) = classify("Reviews", current, vec![], PrunePolicy::Delete);
        assert!(matches!(changes[0].kind, FileChangeKind::Delete));
        assert_eq!(result.deleted, 1);
    }

    #[test]
    fn missing_with_prune_archive_is_an_archive() {
        let current = vec![item("a", "A", false)];
        let (changes, result) = classify("Reviews", current, vec![], PrunePolicy::Archive);
        assert!(matches!(changes[0].kind, FileChangeKind::Archive));
        assert_eq!(result.deleted, 1);
    }

    #[test]
    fn missing_with_prune_none_emits_nothing() {
        let current = vec![item("a", "A", false)];
        let (changes, result) = classify("Reviews", current, vec![], PrunePolicy::None);
        assert!(changes.is_empty());
        assert_eq!(result.total(), 0);
    }

    #[test]
    fn already_archived_item_is_not_re_archived() {
        let current = vec![item("a", "A", true)];
        let (changes, _) = classify("Reviews", current, vec![], PrunePolicy::Archive);
        assert!(changes.is_empty());
    }

    #[test]
    fn coordinates_from_url_parses_owner_repo() {
        let parsed = coordinates_from_url("https://github.com/octo/widgets/pull/7");
        assert_eq!(parsed, Some(("octo".to_string(), "widgets".to_string())));
    }

    #[test]
    fn split_owner_repo_rejects_missing_slash() {
        assert!(split_owner_repo("not-a-repo-spec").is_err());
    }
}
