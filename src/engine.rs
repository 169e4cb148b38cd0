//! Runs a configured substitution, on the calling thread or a worker.

use crate::codec::{Content, ContentCodec, Decoded};
use crate::config::{Configuration, Mode};
use crate::effects::{DiskEffects, Effects};
use crate::errors::{Error, Result};
use crate::events::{CancellationToken, Event, EventSink};
use crate::ignore_policy::IgnorePolicy;
use crate::matcher::Matcher;
use crate::preview::{ContentDiff, MatchRecord, PreviewSimulator};
use crate::traversal::{EntryKind, Node, file_name};
use crate::unique_name::unique_name;
use crate::{in_place, sibling_copy, tree_copy};
use crossbeam_channel::Receiver;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// The lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Scanning,
    Mutating,
    Simulating,
    Cancelling,
    Finished(bool),
}

/// A validated configuration together with everything derived from it.
#[derive(Debug, Clone)]
pub struct Engine {
    config: Configuration,
    matcher: Matcher,
    policy: IgnorePolicy,
    codec: ContentCodec,
}

impl Engine {
    /// Derives the matcher, ignore policy and codec from `config`.
    ///
    /// No validation happens here; an empty search text produces an engine
    /// whose runs do nothing.
    pub fn new(config: Configuration) -> Result<Self> {
        let matcher = Matcher::from_config(&config)?;
        let policy = IgnorePolicy::from_config(&config);
        let codec = ContentCodec::from_labels(&config.encodings)?;
        Ok(Self {
            config,
            matcher,
            policy,
            codec,
        })
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Runs to completion on the current thread and reports the outcome.
    ///
    /// `Finished` is always the last event sent to `sink`.
    pub fn execute(&self, sink: &EventSink, cancel: &CancellationToken) -> bool {
        let success = if self.config.preview {
            let mut run = Run::new(self, sink, cancel, PreviewSimulator::new());
            let outcome = run.drive();
            let success = run.conclude(outcome);
            let records = run.effects.into_records();
            sink.status(format!("Preview ready: {} planned changes", records.len()));
            sink.send(Event::PreviewReady(records));
            success
        } else {
            let mut run = Run::new(self, sink, cancel, DiskEffects::new(sink.clone()));
            let outcome = run.drive();
            run.conclude(outcome)
        };
        sink.finished(success);
        success
    }
}

/// Validates `config` and starts a run on a background thread.
pub fn start(config: Configuration) -> Result<RunHandle> {
    config.validate()?;
    let engine = Engine::new(config)?;
    let (sink, events) = EventSink::channel();
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let worker = thread::Builder::new()
        .name("replitex-run".to_string())
        .spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| engine.execute(&sink, &token)));
            if outcome.is_err() {
                sink.log("Run aborted by an internal error");
                sink.finished(false);
            }
        })?;

    Ok(RunHandle {
        events,
        cancel,
        worker,
    })
}

/// The caller's side of a run started with [`start`].
pub struct RunHandle {
    events: Receiver<Event>,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
}

impl RunHandle {
    pub fn events(&self) -> &Receiver<Event> {
        &self.events
    }

    /// Asks the run to stop at the next entry boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Blocks until the run is over and returns every event not yet received.
    pub fn wait(self) -> Vec<Event> {
        let events: Vec<Event> = self.events.iter().collect();
        let _ = self.worker.join();
        events
    }
}

/// What screening decided about an eligible entry.
#[derive(Debug)]
pub(crate) struct Candidate {
    /// The substituted name, when the name matches.
    pub new_name: Option<String>,
    /// The decoded content, when it matches.
    pub content: Option<Decoded>,
    /// Set when the name matches but the substitution is not a usable name.
    /// Content and subtree handling go on as if the name did not match.
    pub name_error: Option<Error>,
}

/// The state of one run, shared by all modes.
pub(crate) struct Run<'a, E: Effects> {
    pub engine: &'a Engine,
    pub sink: &'a EventSink,
    cancel: &'a CancellationToken,
    pub effects: E,
    state: RunState,
    processed: usize,
}

impl<'a, E: Effects> Run<'a, E> {
    fn new(
        engine: &'a Engine,
        sink: &'a EventSink,
        cancel: &'a CancellationToken,
        effects: E,
    ) -> Self {
        Self {
            engine,
            sink,
            cancel,
            effects,
            state: RunState::Idle,
            processed: 0,
        }
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "run state");
        self.state = next;
    }

    fn drive(&mut self) -> Result<()> {
        self.transition(RunState::Scanning);
        self.sink.status("Scanning...");
        if self.engine.matcher.is_empty() {
            self.sink.log("Search text is empty, nothing to do");
            return Ok(());
        }
        match self.engine.config.mode {
            Mode::InPlace => in_place::run(self),
            Mode::SiblingCopy => sibling_copy::run(self),
            Mode::TreeCopy => tree_copy::run(self),
        }
    }

    /// Moves from scanning to the working phase.
    pub fn begin_work(&mut self) {
        if self.state == RunState::Scanning {
            let next = if self.engine.config.preview {
                RunState::Simulating
            } else {
                RunState::Mutating
            };
            self.transition(next);
        }
    }

    /// Polled at every entry boundary.
    pub fn stop_requested(&mut self) -> bool {
        if self.state == RunState::Cancelling {
            return true;
        }
        if self.cancel.is_cancelled() {
            self.transition(RunState::Cancelling);
            self.sink.log("Stop requested, finishing early");
            return true;
        }
        false
    }

    fn conclude(&mut self, outcome: Result<()>) -> bool {
        let cancelled = self.state == RunState::Cancelling;
        let success = match outcome {
            Ok(()) => {
                let verb = if self.engine.config.preview {
                    "Preview finished"
                } else {
                    "Replacement finished"
                };
                self.sink
                    .log(format!("{verb}. Objects processed: {}", self.processed));
                if cancelled {
                    self.sink
                        .status(format!("Stopped. Objects processed: {}", self.processed));
                } else {
                    self.sink
                        .status(format!("Finished. Objects processed: {}", self.processed));
                }
                true
            }
            Err(err) => {
                warn!(error = %err, "run failed");
                self.sink.log(format!("Run failed: {err}"));
                self.sink.status("Failed");
                false
            }
        };
        self.transition(RunState::Finished(success));
        success
    }

    /// Reports an action that took place.
    pub fn commit(&mut self, record: MatchRecord) {
        self.processed += 1;
        self.effects.record(record);
    }

    /// Logs a per-entry failure. The run carries on.
    pub fn entry_failed(&self, path: &Path, err: &Error) {
        warn!(path = %path.display(), error = %err, "entry not processed");
        self.sink
            .log(format!("Error processing {}: {err}", path.display()));
    }

    /// Applies the ignore rules to an entry and finds out what matches.
    ///
    /// `path` is where the entry logically is, `source` where its content is
    /// read from. Returns `None` for entries that take part in no action.
    pub fn screen(&self, path: &Path, source: &Path, kind: EntryKind) -> Result<Option<Candidate>> {
        let policy = &self.engine.policy;
        if policy.contains_ignored_keyword(&path.to_string_lossy()) {
            debug!(path = %path.display(), "ignored keyword in path");
            return Ok(None);
        }
        let name = file_name(path)?;
        if policy.contains_ignored_keyword(name) {
            debug!(path = %path.display(), "ignored keyword in name");
            return Ok(None);
        }
        let is_file = kind == EntryKind::File;
        if policy.is_fully_ignored(path, is_file) {
            debug!(path = %path.display(), "ignored path or extension");
            return Ok(None);
        }

        let mut content = None;
        if is_file && !policy.is_binary_by_extension(path) {
            match self.engine.codec.read(source)? {
                Content::Text(decoded) => {
                    if policy.contains_ignored_keyword(&decoded.text) {
                        debug!(path = %path.display(), "ignored keyword in content");
                        return Ok(None);
                    }
                    if self.engine.matcher.matches(&decoded.text) {
                        content = Some(decoded);
                    }
                }
                Content::Undecodable => {
                    debug!(path = %path.display(), "content not decodable");
                }
            }
        }

        let (new_name, name_error) = match self.substituted_name(path, name) {
            Ok(new_name) => (new_name, None),
            Err(err) => (None, Some(err)),
        };
        Ok(Some(Candidate {
            new_name,
            content,
            name_error,
        }))
    }

    /// Logs the failed name substitution of a screened entry, if any.
    pub fn report_name_error(&self, path: &Path, candidate: &Candidate) {
        if let Some(err) = &candidate.name_error {
            self.entry_failed(path, err);
        }
    }

    pub fn screen_node(&self, node: &Node) -> Result<Option<Candidate>> {
        self.screen(&node.path, &node.source, node.kind)
    }

    fn substituted_name(&self, path: &Path, name: &str) -> Result<Option<String>> {
        let matcher = &self.engine.matcher;
        if !matcher.matches(name) {
            return Ok(None);
        }
        let new_name = matcher.replace(name).into_owned();
        if new_name.is_empty()
            || new_name == "."
            || new_name == ".."
            || new_name.contains(['/', '\\'])
        {
            return Err(Error::InvalidName(path.to_path_buf()));
        }
        if new_name == name {
            return Ok(None);
        }
        Ok(Some(new_name))
    }

    /// Writes the substituted content to `path` and reports it.
    pub fn rewrite_file(&mut self, path: &Path, decoded: &Decoded) -> Result<()> {
        let matcher = self.engine.matcher();
        let diff = ContentDiff::compute(&decoded.text, matcher);
        let text = matcher.replace(&decoded.text);
        self.effects.rewrite(path, &text, decoded.encoding)?;
        self.commit(MatchRecord::ContentChange {
            path: path.to_path_buf(),
            diff,
        });
        Ok(())
    }

    /// Duplicates `file`, whose content matches but whose name does not,
    /// under a free name inside `dir` and rewrites the duplicate.
    pub fn duplicate_for_content(&mut self, dir: &Node, file: &Node, decoded: &Decoded) -> Result<()> {
        let name = file.name()?;
        let target: PathBuf = dir.path.join(unique_name(name, &dir.source));
        let matcher = self.engine.matcher();
        let diff = ContentDiff::compute(&decoded.text, matcher);
        let text = matcher.replace(&decoded.text);
        self.effects.copy_file(&file.source, &target)?;
        self.effects.rewrite(&target, &text, decoded.encoding)?;
        self.commit(MatchRecord::CreatedCopyForContent {
            source: file.path.clone(),
            path: target,
            diff,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn engine(dir: &Path, search: &str, replacement: &str) -> Engine {
        Engine::new(Configuration::new(dir, search, replacement).normalize().unwrap()).unwrap()
    }

    fn collect(engine: &Engine) -> Vec<Event> {
        let (sink, rx) = EventSink::channel();
        engine.execute(&sink, &CancellationToken::new());
        drop(sink);
        rx.iter().collect()
    }

    #[test]
    fn test_empty_search_is_noop() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "anything").unwrap();
        let events = collect(&engine(dir.path(), "", "x"));
        assert_eq!(events.last(), Some(&Event::Finished(true)));
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "anything");
    }

    #[test]
    fn test_screen_applies_rules_in_order() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("temp")).unwrap();
        fs::write(dir.path().join("temp/foo.txt"), "foo").unwrap();
        fs::write(dir.path().join("foo.png"), "foo").unwrap();
        fs::write(dir.path().join("plain.txt"), "foo").unwrap();
        fs::write(dir.path().join("secret.txt"), "foo TEMP").unwrap();

        let mut config = Configuration::new(dir.path(), "foo", "bar");
        config.ignored_keywords.insert("temp".into());
        let engine = Engine::new(config.normalize().unwrap()).unwrap();
        let (sink, _rx) = EventSink::channel();
        let cancel = CancellationToken::new();
        let run = Run::new(&engine, &sink, &cancel, PreviewSimulator::new());

        let root = engine.config().folder.clone();
        let screen = |rel: &str| {
            let path = root.join(rel);
            run.screen(&path, &path, EntryKind::File).unwrap()
        };

        assert!(screen("temp/foo.txt").is_none());
        assert!(screen("secret.txt").is_none());

        let binary = screen("foo.png").unwrap();
        assert_eq!(binary.new_name.as_deref(), Some("bar.png"));
        assert!(binary.content.is_none());

        let plain = screen("plain.txt").unwrap();
        assert!(plain.new_name.is_none());
        assert_eq!(plain.content.unwrap().text, "foo");
    }

    #[test]
    fn test_substituted_name_must_stay_a_name() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("foo"), "").unwrap();
        let engine = engine(dir.path(), "foo", "a/b");
        let (sink, _rx) = EventSink::channel();
        let cancel = CancellationToken::new();
        let run = Run::new(&engine, &sink, &cancel, PreviewSimulator::new());
        let path = engine.config().folder.join("foo");
        let candidate = run.screen(&path, &path, EntryKind::File).unwrap().unwrap();
        assert!(candidate.new_name.is_none());
        assert!(matches!(candidate.name_error, Some(Error::InvalidName(_))));
    }

    #[test]
    fn test_invalid_name_keeps_content_verdict() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("v1.py"), "url = '/v1/users'").unwrap();
        let engine = engine(dir.path(), "v1", "api/v1");
        let (sink, _rx) = EventSink::channel();
        let cancel = CancellationToken::new();
        let run = Run::new(&engine, &sink, &cancel, PreviewSimulator::new());
        let path = engine.config().folder.join("v1.py");
        let candidate = run.screen(&path, &path, EntryKind::File).unwrap().unwrap();
        assert!(candidate.name_error.is_some());
        assert_eq!(candidate.content.unwrap().text, "url = '/v1/users'");
    }

    #[test]
    fn test_start_rejects_invalid_configuration() {
        let dir = TempDir::new().unwrap();
        let config = Configuration::new(dir.path(), "  ", "x").normalize().unwrap();
        assert!(start(config).is_err());
    }

    #[test]
    fn test_preview_reports_before_finishing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("foo.txt"), "foo").unwrap();
        let mut config = Configuration::new(dir.path(), "foo", "bar");
        config.preview = true;
        let events = start(config.normalize().unwrap()).unwrap().wait();

        let n = events.len();
        assert_eq!(events[n - 1], Event::Finished(true));
        assert!(events[..n - 1]
            .iter()
            .any(|e| matches!(e, Event::PreviewReady(records) if records.len() == 2)));
        assert!(dir.path().join("foo.txt").exists());
    }
}
