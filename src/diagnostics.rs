//! Structured reporting of per-file failures.
//!
//! Nothing in the scanning, grouping or deletion core prints. Every file
//! that is skipped, every rejected keep selection and every failed removal
//! becomes a [`Diagnostic`] handed to a [`DiagnosticSink`]. Results never
//! contain failed files; the sink is the only place they show up.
//!
//! Two sinks are provided: [`LogSink`] forwards to the `log` facade at
//! `warn` level, and [`DiagnosticLog`] collects events in memory so callers
//! can count them, render them, or assert on them in tests.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::scanner::PerceptualError;

/// Category of a reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A file or directory could not be read.
    Io,
    /// An image could not be decoded.
    Decode,
    /// A keep selection was not a valid index for its group.
    InvalidSelection,
    /// A file could not be removed.
    DeletionFailure,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Io => "io",
            Self::Decode => "decode",
            Self::InvalidSelection => "invalid selection",
            Self::DeletionFailure => "deletion failure",
        };
        f.write_str(label)
    }
}

/// A single side-channel event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// File the event refers to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Zero-based group index, for selection failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<usize>,
    /// Category.
    pub kind: DiagnosticKind,
    /// Human-readable reason.
    pub reason: String,
}

impl Diagnostic {
    /// An unreadable file or directory.
    pub fn io(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::for_path(DiagnosticKind::Io, path, reason)
    }

    /// An undecodable image.
    pub fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::for_path(DiagnosticKind::Decode, path, reason)
    }

    /// An image that could not be fingerprinted: `Io` when the file could
    /// not be read, `Decode` otherwise.
    pub fn for_image(path: impl Into<PathBuf>, error: &PerceptualError) -> Self {
        match error {
            PerceptualError::LoadError(_, image::ImageError::IoError(io)) => {
                Self::io(path, io.to_string())
            }
            other => Self::decode(path, other.to_string()),
        }
    }

    /// A failed removal.
    pub fn deletion_failure(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::for_path(DiagnosticKind::DeletionFailure, path, reason)
    }

    /// A rejected keep selection for group `group`.
    pub fn invalid_selection(group: usize, reason: impl Into<String>) -> Self {
        Self {
            path: None,
            group: Some(group),
            kind: DiagnosticKind::InvalidSelection,
            reason: reason.into(),
        }
    }

    fn for_path(kind: DiagnosticKind, path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            group: None,
            kind,
            reason: reason.into(),
        }
    }

    /// The path, if this event refers to one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, self.group) {
            (Some(path), _) => write!(f, "[{}] {}: {}", self.kind, path.display(), self.reason),
            (None, Some(group)) => {
                write!(f, "[{}] group {}: {}", self.kind, group + 1, self.reason)
            }
            (None, None) => write!(f, "[{}] {}", self.kind, self.reason),
        }
    }
}

/// Receiver of [`Diagnostic`] events.
///
/// Implementations must be shareable across the hashing pool.
pub trait DiagnosticSink: Send + Sync {
    /// Record one event.
    fn report(&self, diagnostic: Diagnostic);
}

/// Sink that logs every event at `warn` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
    }
}

/// Sink that keeps every event in memory, in arrival order.
///
/// When `echo` is set, events are also logged like [`LogSink`].
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    events: Mutex<Vec<Diagnostic>>,
    echo: bool,
}

impl DiagnosticLog {
    /// Create an empty, silent log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty log that also forwards events to `log::warn!`.
    #[must_use]
    pub fn echoing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            echo: true,
        }
    }

    /// Number of events recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no event has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of every event recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    /// Count of events of one kind.
    #[must_use]
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.lock().iter().filter(|d| d.kind == kind).count()
    }

    /// Consume the log and return its events.
    #[must_use]
    pub fn into_inner(self) -> Vec<Diagnostic> {
        self.events
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Diagnostic>> {
        // A panic while holding the lock cannot leave a Vec half-pushed.
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DiagnosticSink for DiagnosticLog {
    fn report(&self, diagnostic: Diagnostic) {
        if self.echo {
            log::warn!("{}", diagnostic);
        }
        self.lock().push(diagnostic);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &S {
    fn report(&self, diagnostic: Diagnostic) {
        (**self).report(diagnostic);
    }
}
