//! Copies matching top-level entries next to the originals.
//!
//! Pass one duplicates every top-level entry whose name matches, renamed, and
//! walks the whole subtree of a matching directory while copying it: nested
//! names are substituted and file contents rewritten in the copy. Pass two
//! duplicates top-level files whose content matches but whose name does not
//! under a free name. Originals are never modified.

use crate::effects::Effects;
use crate::engine::{Candidate, Run};
use crate::errors::Result;
use crate::preview::MatchRecord;
use crate::traversal::{EntryKind, Node};
use crate::unique_name::{exists, unique_name};
use std::path::Path;

pub(crate) fn run<E: Effects>(run: &mut Run<'_, E>) -> Result<()> {
    let root = Node::root(&run.engine.config().folder);
    let children = root.children()?;
    run.begin_work();

    let count = children.len();
    let total = count * 2;

    for (idx, child) in children.iter().enumerate() {
        if run.stop_requested() {
            return Ok(());
        }
        run.sink.progress(idx + 1, total);
        run.sink
            .status(format!("Copying matches {} of {count}...", idx + 1));

        let candidate = match run.screen_node(child) {
            Ok(Some(candidate)) => {
                run.report_name_error(&child.path, &candidate);
                if candidate.new_name.is_none() {
                    continue;
                }
                candidate
            }
            Ok(None) => continue,
            Err(err) => {
                run.entry_failed(&child.path, &err);
                continue;
            }
        };
        if let Err(err) = copy_node(run, child, candidate, &root.path) {
            run.entry_failed(&child.path, &err);
        }
    }

    for (idx, child) in children.iter().enumerate() {
        if run.stop_requested() {
            return Ok(());
        }
        run.sink.progress(count + idx + 1, total);
        if !child.is_file() {
            continue;
        }
        run.sink
            .status(format!("Checking content {} of {count}...", idx + 1));

        let decoded = match run.screen_node(child) {
            Ok(Some(Candidate {
                new_name: None,
                content: Some(decoded),
                ..
            })) => decoded,
            Ok(_) => continue,
            Err(err) => {
                run.entry_failed(&child.path, &err);
                continue;
            }
        };
        if let Err(err) = run.duplicate_for_content(&root, child, &decoded) {
            run.entry_failed(&child.path, &err);
        }
    }

    Ok(())
}

/// Copies `node` into `dest_dir`, substituting its name when it matches and
/// its content when that matches, then does the same for its children.
fn copy_node<E: Effects>(
    run: &mut Run<'_, E>,
    node: &Node,
    candidate: Candidate,
    dest_dir: &Path,
) -> Result<()> {
    let name = node.name()?;
    let target = match &candidate.new_name {
        Some(new_name) => {
            let target = dest_dir.join(new_name);
            if exists(&target) {
                run.sink
                    .log(format!("Cannot copy, already exists: {}", target.display()));
                return Ok(());
            }
            target
        }
        None => dest_dir.join(unique_name(name, dest_dir)),
    };

    match node.kind {
        EntryKind::File => {
            run.effects.copy_file(&node.source, &target)?;
            commit_copy(run, node, name, &target, candidate.new_name);
            if let Some(decoded) = candidate.content {
                run.rewrite_file(&target, &decoded)?;
            }
        }
        EntryKind::Dir => {
            run.effects.create_dir(&target)?;
            commit_copy(run, node, name, &target, candidate.new_name);
            for child in node.children()? {
                if run.stop_requested() {
                    break;
                }
                match run.screen_node(&child) {
                    Ok(Some(candidate)) => {
                        run.report_name_error(&child.path, &candidate);
                        if let Err(err) = copy_node(run, &child, candidate, &target) {
                            run.entry_failed(&child.path, &err);
                        }
                    }
                    Ok(None) => {}
                    Err(err) => run.entry_failed(&child.path, &err),
                }
            }
        }
        EntryKind::Other => {
            run.sink
                .log(format!("Skipped, not a file or folder: {}", node.path.display()));
        }
    }
    Ok(())
}

fn commit_copy<E: Effects>(
    run: &mut Run<'_, E>,
    node: &Node,
    old_name: &str,
    target: &Path,
    new_name: Option<String>,
) {
    let record = match new_name {
        Some(new_name) => MatchRecord::CreatedRenamedCopy {
            source: node.path.clone(),
            path: target.to_path_buf(),
            old_name: old_name.to_string(),
            new_name,
            is_file: node.is_file(),
        },
        None => MatchRecord::CreatedCopy {
            source: node.path.clone(),
            path: target.to_path_buf(),
            is_file: node.is_file(),
        },
    };
    run.commit(record);
}
