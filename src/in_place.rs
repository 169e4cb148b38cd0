//! Rewrites contents, then renames entries where they are.
//!
//! All entries are enumerated before anything changes. Contents are rewritten
//! in discovery order; renames happen in reverse discovery order so that a
//! directory is renamed only after everything inside it, and no path still
//! waiting in the list goes stale.

use crate::effects::Effects;
use crate::engine::Run;
use crate::errors::Result;
use crate::preview::MatchRecord;
use crate::traversal::{self, Entry};
use crate::unique_name::exists;
use std::collections::HashMap;
use std::path::PathBuf;

pub(crate) fn run<E: Effects>(run: &mut Run<'_, E>) -> Result<()> {
    let config = run.engine.config();
    let entries = traversal::enumerate(&config.folder, config.recursive, |path, err| {
        run.entry_failed(path, err)
    })?;
    run.begin_work();

    let files = entries.file_count();
    let total = files + entries.len();
    let mut done = 0;

    // Name verdicts for files are taken before their content changes.
    let mut file_renames: HashMap<PathBuf, String> = HashMap::new();

    for entry in entries.discovery_order().filter(|e| e.is_file()) {
        if run.stop_requested() {
            return Ok(());
        }
        done += 1;
        run.sink.progress(done, total);
        run.sink.status(format!("Processing file {done} of {files}..."));

        let candidate = match run.screen(&entry.path, &entry.path, entry.kind) {
            Ok(Some(candidate)) => candidate,
            Ok(None) => continue,
            Err(err) => {
                run.entry_failed(&entry.path, &err);
                continue;
            }
        };
        if let Some(decoded) = &candidate.content {
            if let Err(err) = run.rewrite_file(&entry.path, decoded) {
                run.entry_failed(&entry.path, &err);
            }
        }
        run.report_name_error(&entry.path, &candidate);
        if let Some(new_name) = candidate.new_name {
            file_renames.insert(entry.path.clone(), new_name);
        }
    }

    for entry in entries.reverse_order() {
        if run.stop_requested() {
            return Ok(());
        }
        done += 1;
        run.sink.progress(done, total);
        run.sink.status(format!("Renaming {}...", entry.path.display()));

        let new_name = if entry.is_file() {
            file_renames.remove(&entry.path)
        } else {
            match run.screen(&entry.path, &entry.path, entry.kind) {
                Ok(Some(candidate)) => {
                    run.report_name_error(&entry.path, &candidate);
                    candidate.new_name
                }
                Ok(None) => None,
                Err(err) => {
                    run.entry_failed(&entry.path, &err);
                    continue;
                }
            }
        };
        if let Some(new_name) = new_name {
            if let Err(err) = rename(run, entry, new_name) {
                run.entry_failed(&entry.path, &err);
            }
        }
    }

    Ok(())
}

fn rename<E: Effects>(run: &mut Run<'_, E>, entry: &Entry, new_name: String) -> Result<()> {
    let target = entry.path.with_file_name(&new_name);
    if exists(&target) {
        run.sink
            .log(format!("Cannot rename, already exists: {}", target.display()));
        return Ok(());
    }
    run.effects.rename(&entry.path, &target)?;
    run.commit(MatchRecord::NameChange {
        path: entry.path.clone(),
        old_name: entry.name()?.to_string(),
        new_name,
        is_file: entry.is_file(),
    });
    Ok(())
}
