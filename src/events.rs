//! Events flowing from a run to its caller, and the cancellation flag flowing
//! the other way.

use crate::preview::MatchRecord;
use chrono::Local;
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Everything a run reports back. Delivered in order to a single listener.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StatusChanged(String),
    Progress { done: usize, total: usize },
    /// A human-readable line prefixed with a `[HH:MM:SS]` timestamp.
    LogLine(String),
    /// Sent once, by preview runs only.
    PreviewReady(Vec<MatchRecord>),
    /// Always the last event of a run.
    Finished(bool),
}

/// The sending half of the event channel, owned by the run.
///
/// Sends never fail: if the listener has gone away the run keeps going and
/// its events are dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Sender<Event>,
}

impl EventSink {
    /// Creates a sink and the receiver its listener reads from.
    pub fn channel() -> (Self, Receiver<Event>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }

    pub fn send(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    pub fn status(&self, text: impl Into<String>) {
        self.send(Event::StatusChanged(text.into()));
    }

    pub fn progress(&self, done: usize, total: usize) {
        self.send(Event::Progress { done, total });
    }

    pub fn log(&self, text: impl AsRef<str>) {
        self.send(Event::LogLine(format!(
            "[{}] {}",
            Local::now().format("%H:%M:%S"),
            text.as_ref()
        )));
    }

    pub fn finished(&self, success: bool) {
        self.send(Event::Finished(success));
    }
}

/// Strips the timestamp that [`EventSink::log`] puts in front of a line.
pub fn log_text(line: &str) -> &str {
    match line.strip_prefix('[').and_then(|rest| rest.split_once("] ")) {
        Some((_, text)) => text,
        None => line,
    }
}

/// A cooperative stop request. The caller sets it, the run polls it once per
/// entry and winds down without rolling anything back.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
