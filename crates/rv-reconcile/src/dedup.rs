//! The per-item deduplication rule, as a pure function over one
//! cycle's event buffer grouped by section.
//!
//! Rule: among events bearing the same identifier, if any `Update` or
//! `Archive` exists, keep exactly that one and drop the rest; else if
//! `Addition` exists, drop `Delete`s and keep `Addition`; else if only
//! `Delete` exists, keep it. `NoChange` events never survive.

use rv_workflow::{FileChange, FileChangeKind};
use std::collections::HashMap;

pub struct DedupOutcome {
    pub survivors: Vec<FileChange>,
    /// Count of events dropped by this pass, including every `NoChange`.
    pub dropped: u64,
}

pub fn dedup(events: Vec<FileChange>) -> DedupOutcome {
    let mut by_section: HashMap<String, Vec<FileChange>> = HashMap::new();
    for event in events {
        by_section.entry(event.section.clone()).or_default().push(event);
    }

    let mut survivors = Vec::new();
    let mut dropped = 0u64;

    for (_, section_events) in by_section {
        let mut by_identifier: HashMap<String, Vec<FileChange>> = HashMap::new();
        for event in section_events {
            by_identifier.entry(event.identifier.clone()).or_default().push(event);
        }

        for (_, mut group) in by_identifier {
            let total = group.len() as u64;
            let kept = pick_survivor(&mut group);
            match kept {
                Some(event) => {
                    dropped += total - 1;
                    survivors.push(event);
                }
                None => dropped += total,
            }
        }
    }

    DedupOutcome { survivors, dropped }
}

fn pick_survivor(group: &mut Vec<FileChange>) -> Option<FileChange> {
    if let Some(pos) = group
        .iter()
        .position(|e| matches!(e.kind, FileChangeKind::Update(_) | FileChangeKind::Archive))
    {
        return Some(group.swap_remove(pos));
    }
    if let Some(pos) = group.iter().position(|e| matches!(e.kind, FileChangeKind::Addition(_))) {
        return Some(group.swap_remove(pos));
    }
    if let Some(pos) = group.iter().position(|e| matches!(e.kind, FileChangeKind::Delete)) {
        return Some(group.swap_remove(pos));
    }
    None
}
