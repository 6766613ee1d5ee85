//! Parses unified diff text into an anchor-bearing line sequence.
//!
//! The position numbering implemented here is the code-hosting
//! convention used for inline review comments: the file header is
//! anchor 0, and every addition/deletion/context line and every hunk
//! header after the first advances the anchor by one. This must stay
//! bit-identical across versions — it is the only thing that makes a
//! stored `(file, pos)` comment anchor round-trip.

use crate::model::{FileStatus, LineKind, ParsedLine};

struct FileState {
    /// Filename to fall back on if no `+++`/annotated header is ever seen
    /// (e.g. a diff for a newly added, empty file).
    fallback_name: String,
    file_status: FileStatus,
    header_emitted: bool,
    hunks_seen: u32,
    pos: u32,
}

/// Parse a unified diff into its flat, anchor-bearing line sequence.
///
/// This is a pure function: the same input always produces the same
/// output, and output order matches input order.
pub fn parse_diff(diff_text: &str) -> Vec<ParsedLine> {
    let mut out = Vec::new();
    let mut file: Option<FileState> = None;

    for (original_line_index, text) in diff_text.lines().enumerate() {
        if let Some(name) = parse_diff_git_line(text) {
            if let Some(prev) = file.take() {
                flush_unreleased_header(&mut out, prev, original_line_index);
            }
            file = Some(FileState {
                fallback_name: name,
                file_status: FileStatus::Modified,
                header_emitted: false,
                hunks_seen: 0,
                pos: 0,
            });
            continue;
        }

        let Some(state) = file.as_mut() else {
            // Content before the first `diff --git` line (e.g. a leading
            // commit message in `git format-patch` output) carries no
            // anchor and is not part of any file.
            continue;
        };

        if text.starts_with("new file mode") {
            state.file_status = FileStatus::New;
            continue;
        }
        if text.starts_with("deleted file mode") {
            state.file_status = FileStatus::Deleted;
            continue;
        }
        if text.starts_with("rename from ") || text.starts_with("rename to ") {
            state.file_status = FileStatus::Renamed;
            continue;
        }
        if text.starts_with("similarity index")
            || text.starts_with("index ")
            || (text.starts_with("--- ") && !state.header_emitted)
        {
            continue;
        }

        if !state.header_emitted {
            if let Some(path) = parse_header_line(text) {
                out.push(ParsedLine {
                    text: text.to_string(),
                    file: Some(path),
                    pos: Some(0),
                    clickable: true,
                    kind: LineKind::FileHeader,
                    file_status: state.file_status,
                    original_line_index,
                });
                state.header_emitted = true;
                state.file_status = FileStatus::Modified;
                continue;
            }
            // Not a header line and header not yet emitted: a stray
            // line (e.g. a second `--- `/`+++ ` pair for a binary
            // file) that carries no anchor.
            continue;
        }

        if text.starts_with("@@") {
            state.hunks_seen += 1;
            if state.hunks_seen > 1 {
                state.pos += 1;
            }
            out.push(ParsedLine {
                text: text.to_string(),
                file: Some(current_file_name(state)),
                pos: Some(state.pos),
                clickable: false,
                kind: LineKind::Hunk,
                file_status: state.file_status,
                original_line_index,
            });
            continue;
        }

        let kind = if text.starts_with('+') && !text.starts_with("+++") {
            Some(LineKind::Addition)
        } else if text.starts_with('-') && !text.starts_with("---") {
            Some(LineKind::Deletion)
        } else if text.starts_with(' ') {
            Some(LineKind::Code)
        } else {
            None
        };

        if let Some(kind) = kind {
            state.pos += 1;
            out.push(ParsedLine {
                text: text.to_string(),
                file: Some(current_file_name(state)),
                pos: Some(state.pos),
                clickable: true,
                kind,
                file_status: state.file_status,
                original_line_index,
            });
        }
    }

    if let Some(state) = file {
        let total_lines = diff_text.lines().count();
        flush_unreleased_header(&mut out, state, total_lines);
    }

    out
}

/// Synthesize a trailing file header for a file section whose `+++`
/// line never appeared (an empty new file: `diff --git` / `new file
/// mode` / `--- /dev/null` with no hunks at all).
fn flush_unreleased_header(out: &mut Vec<ParsedLine>, state: FileState, at_line: usize) {
    if state.header_emitted {
        return;
    }
    out.push(ParsedLine {
        text: format!("+++ b/{}", state.fallback_name),
        file: Some(state.fallback_name),
        pos: Some(0),
        clickable: true,
        kind: LineKind::FileHeader,
        file_status: state.file_status,
        original_line_index: at_line,
    });
}

fn current_file_name(state: &FileState) -> String {
    state.fallback_name.clone()
}

/// `diff --git a/X b/Y` -> fallback filename (`X` if `a/X b/X`, else the
/// substring after ` b/`).
fn parse_diff_git_line(line: &str) -> Option<String> {
    let rest = line.strip_prefix("diff --git ")?;
    let b_idx = rest.rfind(" b/")?;
    let (a_part, b_part) = rest.split_at(b_idx);
    let b_name = &b_part[3..];
    if let Some(a_name) = a_part.strip_prefix("a/") {
        if a_name == b_name {
            return Some(a_name.to_string());
        }
    }
    Some(b_name.to_string())
}

/// Matches `+++ b/<path>`, `+++ <path>`, or an annotated header
/// (`modified|deleted|new file|renamed <path>`, as re-synthesized diff
/// text produced elsewhere in this system uses).
fn parse_header_line(line: &str) -> Option<String> {
    if let Some(rest) = line.strip_prefix("+++ ") {
        let path = rest.strip_prefix("b/").unwrap_or(rest);
        if path == "/dev/null" {
            return None;
        }
        return Some(path.trim().to_string());
    }
    for prefix in ["modified ", "deleted ", "new file ", "renamed "] {
        if let Some(rest) = line.strip_prefix(prefix) {
            return Some(rest.trim().to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_HUNKS: &str = "diff --git a/old.txt b/old.txt\nindex abc..def 100644\n--- a/old.txt\n+++ b/old.txt\n@@ -1,3 +1,3 @@\n line one\n-line two\n+line two changed\n line three\n@@ -10,2 +10,3 @@\n line ten\n+line eleven\n line twelve\n";

    #[test]
    fn first_hunk_does_not_advance_position() {
        let lines = parse_diff(TWO_HUNKS);
        let header = &lines[0];
        assert_eq!(header.kind, LineKind::FileHeader);
        assert_eq!(header.pos, Some(0));

        let first_hunk = &lines[1];
        assert_eq!(first_hunk.kind, LineKind::Hunk);
        assert_eq!(first_hunk.pos, Some(0));
        assert!(!first_hunk.clickable);
    }

    #[test]
    fn second_hunk_advances_position_but_is_unclickable() {
        let lines = parse_diff(TWO_HUNKS);
        let second_hunk = lines
            .iter()
            .filter(|l| l.kind == LineKind::Hunk)
            .nth(1)
            .unwrap();
        // header(0) -> hunk1(0) -> 4 content lines (1,2,3,4) -> hunk2 increments to 5
        assert_eq!(second_hunk.pos, Some(5));
        assert!(!second_hunk.clickable);
    }

    #[test]
    fn content_lines_increment_and_are_clickable() {
        let lines = parse_diff(TWO_HUNKS);
        let content: Vec<_> = lines
            .iter()
            .filter(|l| {
                matches!(
                    l.kind,
                    LineKind::Code | LineKind::Addition | LineKind::Deletion
                )
            })
            .collect();
        let positions: Vec<u32> = content.iter().map(|l| l.pos.unwrap()).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 6, 7, 8]);
        assert!(content.iter().all(|l| l.clickable));
    }

    #[test]
    fn empty_new_file_emits_single_synthesized_header() {
        let diff = "diff --git a/new.txt b/new.txt\nnew file mode 100644\nindex 0000000..e69de29\n";
        let lines = parse_diff(diff);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].kind, LineKind::FileHeader);
        assert_eq!(lines[0].file_status, FileStatus::New);
        assert_eq!(lines[0].pos, Some(0));
        assert_eq!(lines[0].file.as_deref(), Some("new.txt"));
    }

    #[test]
    fn new_file_with_added_content_sets_new_status() {
        let diff = "diff --git a/new.txt b/new.txt\nnew file mode 100644\nindex 0000000..abc123\n--- /dev/null\n+++ b/new.txt\n@@ -0,0 +1,2 @@\n+hello\n+world\n";
        let lines = parse_diff(diff);
        let header = &lines[0];
        assert_eq!(header.file_status, FileStatus::New);
        assert_eq!(header.pos, Some(0));
        let additions: Vec<_> = lines
            .iter()
            .filter(|l| l.kind == LineKind::Addition)
            .collect();
        assert_eq!(additions.len(), 2);
        assert_eq!(additions[0].pos, Some(1));
        assert_eq!(additions[1].pos, Some(2));
    }

    #[test]
    fn renamed_file_status() {
        let diff = "diff --git a/old_name.rs b/new_name.rs\nsimilarity index 95%\nrename from old_name.rs\nrename to new_name.rs\nindex abc..def 100644\n--- a/old_name.rs\n+++ b/new_name.rs\n@@ -1,1 +1,1 @@\n-old\n+new\n";
        let lines = parse_diff(diff);
        assert_eq!(lines[0].file_status, FileStatus::Renamed);
        assert_eq!(lines[0].file.as_deref(), Some("new_name.rs"));
    }

    #[test]
    fn two_file_diff_positions_reset_per_file() {
        let diff = "diff --git a/a.txt b/a.txt\nnew file mode 100644\nindex 0000000..e69de29\ndiff --git a/old.txt b/old.txt\nindex abc..def 100644\n--- a/old.txt\n+++ b/old.txt\n@@ -1,3 +1,3 @@\n line one\n-line two\n+line two changed\n line three\n@@ -10,2 +10,3 @@\n line ten\n+line eleven\n line twelve\n";
        let lines = parse_diff(diff);
        assert_eq!(lines[0].kind, LineKind::FileHeader);
        assert_eq!(lines[0].file.as_deref(), Some("a.txt"));
        assert_eq!(lines[0].pos, Some(0));

        let second_header = &lines[1];
        assert_eq!(second_header.kind, LineKind::FileHeader);
        assert_eq!(second_header.file.as_deref(), Some("old.txt"));
        assert_eq!(second_header.pos, Some(0));
    }

    #[test]
    fn reparsing_the_same_diff_is_deterministic() {
        let first = parse_diff(TWO_HUNKS);
        let second = parse_diff(TWO_HUNKS);
        assert_eq!(first, second);
    }

    #[test]
    fn clickable_anchor_count_matches_invariant() {
        // sum over files of |clickable lines| + 1 (header) = valid anchors
        let lines = parse_diff(TWO_HUNKS);
        let clickable = lines.iter().filter(|l| l.clickable).count();
        // 1 file-header (clickable) + 7 content lines (clickable) = 8
        // the two hunk headers are never clickable.
        assert_eq!(clickable, 8);
    }
}
