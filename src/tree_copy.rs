//! Copies matching entries at every level of the tree.
//!
//! Each directory is handled in four passes over a single snapshot of its
//! children:
//!
//! 1. every child whose name matches is duplicated under the new name (files
//!    get their content rewritten, directories are copied verbatim);
//! 2. every file whose content matches but whose name does not is duplicated
//!    under a free name and rewritten;
//! 3. every original subdirectory is processed the same way;
//! 4. every directory copy made in pass 1 is processed the same way.
//!
//! Copies therefore get copied again further down, so the number of new
//! entries grows with the depth at which a name matches.
//!
//! Directories are processed from an explicit worklist rather than by
//! recursion. Popping from the end of the stack and pushing each level's
//! pass 4 copies below its pass 3 directories, both reversed, visits them in
//! exactly the order the passes above describe.

use crate::effects::Effects;
use crate::engine::{Candidate, Run};
use crate::errors::Result;
use crate::preview::MatchRecord;
use crate::traversal::{EntryKind, Node};
use crate::unique_name::exists;

pub(crate) fn run<E: Effects>(run: &mut Run<'_, E>) -> Result<()> {
    let root = Node::root(&run.engine.config().folder);
    let mut pending = vec![root];
    let mut visited = 0;
    run.begin_work();

    while let Some(dir) = pending.pop() {
        if run.stop_requested() {
            return Ok(());
        }
        visited += 1;
        run.sink.progress(visited, visited + pending.len());
        run.sink
            .status(format!("Processing folder {}...", dir.path.display()));

        let children = match dir.children() {
            Ok(children) => children,
            // Only the working folder itself is fatal.
            Err(err) if visited == 1 => return Err(err),
            Err(err) => {
                run.entry_failed(&dir.path, &err);
                continue;
            }
        };

        let (originals, copies) = process_level(run, &dir, children);
        pending.extend(copies.into_iter().rev());
        pending.extend(originals.into_iter().rev());
    }

    Ok(())
}

/// Runs passes 1 and 2 over one directory. Returns the eligible original
/// subdirectories and the directory copies made, both in child order.
fn process_level<E: Effects>(
    run: &mut Run<'_, E>,
    dir: &Node,
    children: Vec<Node>,
) -> (Vec<Node>, Vec<Node>) {
    let mut eligible: Vec<(Node, Candidate)> = Vec::with_capacity(children.len());
    for child in children {
        if run.stop_requested() {
            break;
        }
        match run.screen_node(&child) {
            Ok(Some(candidate)) => {
                run.report_name_error(&child.path, &candidate);
                eligible.push((child, candidate));
            }
            Ok(None) => {}
            Err(err) => run.entry_failed(&child.path, &err),
        }
    }

    let mut copies = Vec::new();
    for (child, candidate) in &eligible {
        if run.stop_requested() {
            break;
        }
        let Some(new_name) = &candidate.new_name else {
            continue;
        };
        match duplicate_renamed(run, dir, child, new_name, candidate) {
            Ok(Some(copy)) => copies.push(copy),
            Ok(None) => {}
            Err(err) => run.entry_failed(&child.path, &err),
        }
    }

    for (child, candidate) in &eligible {
        if run.stop_requested() {
            break;
        }
        if !child.is_file() || candidate.new_name.is_some() {
            continue;
        }
        if let Some(decoded) = &candidate.content {
            if let Err(err) = run.duplicate_for_content(dir, child, decoded) {
                run.entry_failed(&child.path, &err);
            }
        }
    }

    let originals = eligible
        .into_iter()
        .filter(|(child, _)| child.is_dir())
        .map(|(child, _)| child)
        .collect();
    (originals, copies)
}

/// Pass 1 for one child. Returns the copy when it is a directory to revisit.
fn duplicate_renamed<E: Effects>(
    run: &mut Run<'_, E>,
    dir: &Node,
    child: &Node,
    new_name: &str,
    candidate: &Candidate,
) -> Result<Option<Node>> {
    let target = dir.path.join(new_name);
    if exists(&dir.source.join(new_name)) {
        run.sink
            .log(format!("Cannot copy, already exists: {}", target.display()));
        return Ok(None);
    }

    let record = MatchRecord::CreatedRenamedCopy {
        source: child.path.clone(),
        path: target.clone(),
        old_name: child.name()?.to_string(),
        new_name: new_name.to_string(),
        is_file: child.is_file(),
    };

    match child.kind {
        EntryKind::File => {
            run.effects.copy_file(&child.source, &target)?;
            run.commit(record);
            if let Some(decoded) = &candidate.content {
                run.rewrite_file(&target, decoded)?;
            }
            Ok(None)
        }
        EntryKind::Dir => {
            run.effects.copy_tree(&child.source, &target)?;
            run.commit(record);
            let source = run.effects.revisit_source(&child.source, &target);
            Ok(Some(Node {
                path: target,
                source,
                kind: EntryKind::Dir,
            }))
        }
        EntryKind::Other => {
            run.sink
                .log(format!("Skipped, not a file or folder: {}", child.path.display()));
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{Configuration, Mode};
    use crate::engine::Engine;
    use crate::events::{CancellationToken, EventSink};
    use std::fs;
    use tempfile::TempDir;

    fn run(dir: &std::path::Path, search: &str, replacement: &str) {
        let mut config = Configuration::new(dir, search, replacement);
        config.mode = Mode::TreeCopy;
        let engine = Engine::new(config.normalize().unwrap()).unwrap();
        let (sink, _rx) = EventSink::channel();
        assert!(engine.execute(&sink, &CancellationToken::new()));
    }

    #[test]
    fn test_file_rename_copy_rewrites_content() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("foo.txt"), "foo!").unwrap();

        run(dir.path(), "foo", "bar");

        assert_eq!(fs::read_to_string(dir.path().join("foo.txt")).unwrap(), "foo!");
        assert_eq!(fs::read_to_string(dir.path().join("bar.txt")).unwrap(), "bar!");
    }

    #[test]
    fn test_content_duplicates_at_every_level() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/readme.md"), "use foo").unwrap();

        run(dir.path(), "foo", "bar");

        assert_eq!(
            fs::read_to_string(dir.path().join("docs/readme_2.md")).unwrap(),
            "use bar"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("docs/readme.md")).unwrap(),
            "use foo"
        );
    }

    #[test]
    fn test_directory_copy_is_revisited() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("foo")).unwrap();
        fs::write(dir.path().join("foo/foo.txt"), "foo").unwrap();

        run(dir.path(), "foo", "bar");

        // The verbatim copy keeps the original file, then gets its own
        // renamed copy on the next visit.
        assert_eq!(fs::read_to_string(dir.path().join("bar/foo.txt")).unwrap(), "foo");
        assert_eq!(fs::read_to_string(dir.path().join("bar/bar.txt")).unwrap(), "bar");
        assert_eq!(fs::read_to_string(dir.path().join("foo/bar.txt")).unwrap(), "bar");
    }

    #[test]
    fn test_unusable_folder_name_still_walks_subtree() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("v1")).unwrap();
        fs::write(dir.path().join("v1/readme.md"), "see v1 docs").unwrap();

        run(dir.path(), "v1", "api/v1");

        assert_eq!(
            fs::read_to_string(dir.path().join("v1/readme_2.md")).unwrap(),
            "see api/v1 docs"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("v1/readme.md")).unwrap(),
            "see v1 docs"
        );
    }
}
