//! The flat, anchor-bearing representation a parsed diff is reduced to.

/// One line of a unified diff after the parser has assigned it a
/// GitHub-style inline comment anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// The raw line text, without a trailing newline.
    pub text: String,
    /// The file this line belongs to, once a file section has started.
    pub file: Option<String>,
    /// The inline-comment anchor. `Some(0)` for a file header, `None`
    /// before any file header has been emitted.
    pub pos: Option<u32>,
    /// Whether this line can anchor an inline comment.
    pub clickable: bool,
    pub kind: LineKind,
    pub file_status: FileStatus,
    /// Index of the source line (0-based, counting every line of the
    /// original diff text, including ones this parser discards).
    pub original_line_index: usize,
}

/// The kind of a [`ParsedLine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Code,
    Addition,
    Deletion,
    Hunk,
    FileHeader,
}

/// A file's status within the diff, as carried by its file-header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileStatus {
    #[default]
    Modified,
    New,
    Deleted,
    Renamed,
}
