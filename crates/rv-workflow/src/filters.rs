//! `FilterRegistry`: named, composable predicates over PR lists.
//!
//! A filter name is parsed on the first `:`; everything before it is
//! the filter key, everything after (if any) is its argument. Unknown
//! names are logged at warn level and skipped — never fatal.

use log::warn;
use rv_remote::PullRequest;

/// A resolved, ready-to-apply filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    ByLabel(String),
    ByAuthor(String),
    ExcludeAuthor(String),
    /// Prepended automatically when a workflow configures `teams`;
    /// holds the already-resolved member logins.
    Team(Vec<String>),
}

/// Parse configured filter names into `Filter` values, skipping and
/// warning about anything unrecognized.
pub fn parse_filter_names(names: &[String]) -> Vec<Filter> {
    names
        .iter()
        .filter_map(|raw| match raw.split_once(':') {
            Some(("FilterByLabel", arg)) => Some(Filter::ByLabel(arg.to_string())),
            Some(("FilterByAuthor", arg)) => Some(Filter::ByAuthor(arg.to_string())),
            Some(("FilterExcludeAuthor", arg)) => Some(Filter::ExcludeAuthor(arg.to_string())),
            _ => {
                warn!("unknown filter name, skipping: {raw}");
                None
            }
        })
        .collect()
}

/// Prepend a resolved team-membership filter, if any team slugs were
/// configured for the workflow.
pub fn prepend_team_filter(filters: &mut Vec<Filter>, resolved_members: Vec<String>) {
    if !resolved_members.is_empty() {
        filters.insert(0, Filter::Team(resolved_members));
    }
}

/// Apply every filter in order, narrowing the PR list.
pub fn apply(prs: Vec<PullRequest>, filters: &[Filter]) -> Vec<PullRequest> {
    filters.iter().fold(prs, |acc, filter| match filter {
        Filter::ByLabel(label) => acc
            .into_iter()
            .filter(|pr| pr.labels.iter().any(|l| l == label))
            .collect(),
        Filter::ByAuthor(login) => acc.into_iter().filter(|pr| &pr.author == login).collect(),
        Filter::ExcludeAuthor(login) => {
            acc.into_iter().filter(|pr| &pr.author != login).collect()
        }
        Filter::Team(members) => acc
            .into_iter()
            .filter(|pr| members.iter().any(|m| m == &pr.author))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn pr(number: u64, author: &str, labels: &[&str]) -> PullRequest {
        PullRequest {
            number,
            title: format!("PR {number}"),
            body: None,
            author: author.to_string(),
            draft: false,
            labels: labels.iter().map(|s| s.to_string()).collect(),
            comments: 0,
            head_sha: "sha".to_string(),
            base_branch: "main".to_string(),
            head_branch: "feature".to_string(),
            mergeable: None,
            mergeable_state: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            html_url: String::new(),
            additions: 0,
            deletions: 0,
        }
    }

    #[test]
    fn unknown_filter_name_is_skipped() {
        let filters = parse_filter_names(&["FilterDoesNotExist:x".to_string()]);
        assert!(filters.is_empty());
    }

    #[test]
    fn by_label_narrows_to_matching_prs() {
        let prs = vec![pr(1, "alice", &["needs-review"]), pr(2, "bob", &[])];
        let filters = parse_filter_names(&["FilterByLabel:needs-review".to_string()]);
        let result = apply(prs, &filters);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].number, 1);
    }

    #[test]
    fn exclude_author_removes_matching_author() {
        let prs = vec![pr(1, "alice", &[]), pr(2, "bob", &[])];
        let filters = parse_filter_names(&["FilterExcludeAuthor:bob".to_string()]);
        let result = apply(prs, &filters);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].author, "alice");
    }

    #[test]
    fn team_filter_is_prepended_and_applied() {
        let prs = vec![pr(1, "alice", &[]), pr(2, "carol", &[])];
        let mut filters = parse_filter_names(&[]);
        prepend_team_filter(&mut filters, vec!["alice".to_string()]);
        assert_eq!(filters[0], Filter::Team(vec!["alice".to_string()]));
        let result = apply(prs, &filters);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].author, "alice");
    }
}
