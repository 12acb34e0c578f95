//! Event logging for the deobfuscation pipeline.
//!
//! Every transformation a pass performs and every local failure it absorbs is recorded as
//! an [`Event`]. Events can be inspected for debugging or reporting, and all statistics in
//! a [`DeobfuscationResult`](crate::deobfuscation::DeobfuscationResult) are derived from
//! them rather than tracked separately.
//!
//! # Architecture
//!
//! - [`Event`] - A single recorded event
//! - [`EventLog`] - Append-only collection with query and summary helpers
//! - [`EventBuilder`] - Fluent API, the event is committed when the builder drops
//! - [`DerivedStats`] - Counters computed from a log
//!
//! # Example
//!
//! ```rust
//! use macroscope::deobfuscation::{EventKind, EventLog};
//!
//! let log = EventLog::new();
//! log.record(EventKind::ConstantFolded)
//!     .procedure("Main")
//!     .pass("arithmetic")
//!     .message("2 + 3 -> 5");
//! log.info("starting resolution");
//!
//! assert_eq!(log.count_kind(EventKind::ConstantFolded), 1);
//! println!("{}", log.summary());
//! ```

use std::{
    collections::{HashMap, HashSet},
    fmt,
    time::Duration,
};

/// Categories of events that can be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A boilerplate module attribute was removed.
    AttributeRemoved,
    /// A pure arithmetic expression was replaced by its value.
    ConstantFolded,
    /// An identifier was given a fresh name.
    IdentifierRenamed,
    /// A statement without effect was removed.
    StatementRemoved,
    /// A call site was replaced by the value the call evaluates to.
    CallResolved,
    /// A procedure was removed from the module.
    ProcedureRemoved,
    /// A procedure body was spliced into a caller.
    ProcedureInlined,

    /// The cleaner reached its fixed point on a procedure.
    ProcedureCleaned,
    /// The cleaner met a construct it has no rule for.
    CleanFailed,
    /// A procedure was lowered and registered with the evaluator.
    ProcedureTranslated,
    /// A procedure could not be lowered or registered.
    TranslationFailed,
    /// A call site naming a translated procedure was left as is.
    CallUnresolved,
    /// A procedure was not inlined.
    InlineRejected,
    /// A procedure kept dependencies that never became evaluable.
    UnresolvedDependencies,

    /// A pass started.
    PassStarted,
    /// A pass completed.
    PassCompleted,

    /// Informational message.
    Info,
    /// Warning (something unexpected but recoverable).
    Warning,
    /// Error (something failed).
    Error,
}

impl EventKind {
    /// Returns a human-readable description of this event kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            // Transformations
            Self::AttributeRemoved => "attribute removed",
            Self::ConstantFolded => "constant folded",
            Self::IdentifierRenamed => "identifier renamed",
            Self::StatementRemoved => "statement removed",
            Self::CallResolved => "call resolved",
            Self::ProcedureRemoved => "procedure removed",
            Self::ProcedureInlined => "procedure inlined",
            // Analysis
            Self::ProcedureCleaned => "procedure cleaned",
            Self::CleanFailed => "clean failed",
            Self::ProcedureTranslated => "procedure translated",
            Self::TranslationFailed => "translation failed",
            Self::CallUnresolved => "call unresolved",
            Self::InlineRejected => "inline rejected",
            Self::UnresolvedDependencies => "unresolved dependencies",
            // Engine
            Self::PassStarted => "pass started",
            Self::PassCompleted => "pass completed",
            // Diagnostic
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Returns true if this event represents a change to the module.
    #[must_use]
    pub fn is_transformation(&self) -> bool {
        matches!(
            self,
            Self::AttributeRemoved
                | Self::ConstantFolded
                | Self::IdentifierRenamed
                | Self::StatementRemoved
                | Self::CallResolved
                | Self::ProcedureRemoved
                | Self::ProcedureInlined
        )
    }

    /// Returns true if this event records a local failure the pipeline absorbed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::CleanFailed
                | Self::TranslationFailed
                | Self::CallUnresolved
                | Self::InlineRejected
                | Self::UnresolvedDependencies
        )
    }

    /// Returns true if this is a diagnostic event (info/warning/error).
    #[must_use]
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Self::Info | Self::Warning | Self::Error)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A single logged event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// The type of event.
    pub kind: EventKind,
    /// The procedure the event concerns, if any.
    pub procedure: Option<String>,
    /// Human-readable description.
    pub message: String,
    /// The pass that recorded the event, if any.
    pub pass: Option<String>,
}

impl Event {
    fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            procedure: None,
            message: message.into(),
            pass: None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.procedure {
            Some(procedure) => write!(f, "[{}] {}: {}", self.kind, procedure, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Builder for creating events with a fluent API.
///
/// Created by [`EventLog::record`]. The event is added to the log when the builder is
/// dropped.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    kind: EventKind,
    procedure: Option<String>,
    message: Option<String>,
    pass: Option<String>,
}

impl<'a> EventBuilder<'a> {
    fn new(log: &'a EventLog, kind: EventKind) -> Self {
        Self {
            log,
            kind,
            procedure: None,
            message: None,
            pass: None,
        }
    }

    /// Sets the procedure the event concerns.
    pub fn procedure(mut self, name: impl Into<String>) -> Self {
        self.procedure = Some(name.into());
        self
    }

    /// Sets a custom message describing the event.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Associates this event with a specific pass.
    pub fn pass(mut self, pass_name: impl Into<String>) -> Self {
        self.pass = Some(pass_name.into());
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let message = self
            .message
            .take()
            .unwrap_or_else(|| self.kind.description().to_string());

        self.log.events.push(Event {
            kind: self.kind,
            procedure: self.procedure.take(),
            message,
            pass: self.pass.take(),
        });
    }
}

/// Collection of events from deobfuscation.
///
/// Appending only needs a shared reference, so passes that borrow the module mutably can
/// still record into the log owned next to it.
#[derive(Debug)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self {
            events: boxcar::Vec::new(),
        }
    }
}

impl Clone for EventLog {
    fn clone(&self) -> Self {
        self.iter().cloned().collect()
    }
}

impl EventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no events have been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Returns the total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Starts building a new event of the given kind.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder::new(self, kind)
    }

    /// Records an informational message.
    pub fn info(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Info, message));
    }

    /// Records a warning message.
    pub fn warn(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Warning, message));
    }

    /// Records an error message.
    pub fn error(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Error, message));
    }

    /// Appends copies of all events of `other`.
    pub fn merge(&self, other: &EventLog) {
        for event in other {
            self.events.push(event.clone());
        }
    }

    /// Returns true if any event of the given kind exists.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.iter().any(|e| e.kind == kind)
    }

    /// Counts events of the given kind.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.filter_kind(kind).count()
    }

    /// Returns an iterator over all events.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, e)| e)
    }

    /// Returns an iterator over events of a specific kind.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |e| e.kind == kind)
    }

    /// Returns an iterator over events concerning one procedure.
    pub fn filter_procedure<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.iter().filter(move |e| e.procedure.as_deref() == Some(name))
    }

    /// Returns an iterator over transformation events only.
    pub fn transformations(&self) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(|e| e.kind.is_transformation())
    }

    /// Returns an iterator over absorbed local failures.
    pub fn failures(&self) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(|e| e.kind.is_failure())
    }

    /// Returns an iterator over info, warning and error events.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(|e| e.kind.is_diagnostic())
    }

    /// Returns an iterator over warning events.
    pub fn warnings(&self) -> impl Iterator<Item = &Event> + '_ {
        self.filter_kind(EventKind::Warning)
    }

    /// Counts events grouped by kind.
    #[must_use]
    pub fn count_by_kind(&self) -> HashMap<EventKind, usize> {
        let mut counts = HashMap::new();
        for event in self {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Returns the number of transformation events.
    #[must_use]
    pub fn transformation_count(&self) -> usize {
        self.transformations().count()
    }

    /// Returns the number of distinct procedures touched by a transformation.
    #[must_use]
    pub fn procedures_affected(&self) -> usize {
        self.transformations()
            .filter_map(|e| e.procedure.as_deref())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Generates a human-readable summary of all transformation events.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no events".to_string();
        }

        let mut parts: Vec<String> = self
            .count_by_kind()
            .iter()
            .filter(|(k, _)| k.is_transformation())
            .map(|(kind, count)| format!("{} {}", count, kind.description()))
            .collect();

        if parts.is_empty() {
            return format!("{} events", self.len());
        }

        parts.sort();
        parts.join(", ")
    }
}

/// Iterator wrapper for EventLog that yields &Event
pub struct EventLogIter<'a> {
    inner: boxcar::Iter<'a, Event>,
}

impl<'a> Iterator for EventLogIter<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, e)| e)
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = EventLogIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        EventLogIter {
            inner: self.events.iter(),
        }
    }
}

impl FromIterator<Event> for EventLog {
    fn from_iter<T: IntoIterator<Item = Event>>(iter: T) -> Self {
        let log = Self::new();
        for event in iter {
            log.events.push(event);
        }
        log
    }
}

/// Statistics derived from an EventLog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedStats {
    /// Number of procedures that had any transformation.
    pub procedures_transformed: usize,
    /// Number of attributes removed.
    pub attributes_removed: usize,
    /// Number of arithmetic expressions folded.
    pub constants_folded: usize,
    /// Number of identifiers renamed.
    pub identifiers_renamed: usize,
    /// Number of statements removed.
    pub statements_removed: usize,
    /// Number of procedures translated.
    pub procedures_translated: usize,
    /// Number of call sites replaced by values.
    pub calls_resolved: usize,
    /// Number of procedures inlined.
    pub procedures_inlined: usize,
    /// Number of procedures removed.
    pub procedures_removed: usize,
    /// Number of local failures absorbed.
    pub failures: usize,
    /// Number of warnings.
    pub warnings: usize,
    /// Number of errors.
    pub errors: usize,
    /// Number of fixed-point iterations.
    pub iterations: usize,
    /// Processing time.
    pub total_time: Duration,
}

impl DerivedStats {
    /// Computes statistics from an event log.
    #[must_use]
    pub fn from_log(log: &EventLog) -> Self {
        let counts = log.count_by_kind();
        let get = |kind: EventKind| counts.get(&kind).copied().unwrap_or(0);

        Self {
            procedures_transformed: log.procedures_affected(),
            attributes_removed: get(EventKind::AttributeRemoved),
            constants_folded: get(EventKind::ConstantFolded),
            identifiers_renamed: get(EventKind::IdentifierRenamed),
            statements_removed: get(EventKind::StatementRemoved),
            procedures_translated: get(EventKind::ProcedureTranslated),
            calls_resolved: get(EventKind::CallResolved),
            procedures_inlined: get(EventKind::ProcedureInlined),
            procedures_removed: get(EventKind::ProcedureRemoved),
            failures: log.failures().count(),
            warnings: get(EventKind::Warning),
            errors: get(EventKind::Error),
            iterations: 0,
            total_time: Duration::ZERO,
        }
    }

    /// Sets the total processing time.
    #[must_use]
    pub fn with_time(mut self, time: Duration) -> Self {
        self.total_time = time;
        self
    }

    /// Sets the number of iterations.
    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Generates a human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let counters = [
            (self.procedures_transformed, "procedures"),
            (self.attributes_removed, "attributes removed"),
            (self.constants_folded, "constants folded"),
            (self.identifiers_renamed, "renamed"),
            (self.statements_removed, "statements removed"),
            (self.procedures_translated, "translated"),
            (self.calls_resolved, "calls resolved"),
            (self.procedures_inlined, "inlined"),
            (self.procedures_removed, "procedures removed"),
            (self.failures, "local failures"),
            (self.errors, "errors"),
            (self.warnings, "warnings"),
        ];
        let parts: Vec<String> = counters
            .iter()
            .filter(|(count, _)| *count > 0)
            .map(|(count, label)| format!("{count} {label}"))
            .collect();

        let stats = if parts.is_empty() {
            "no transformations".to_string()
        } else {
            parts.join(", ")
        };

        if self.total_time.as_millis() > 0 {
            format!("{} in {:?} ({} iterations)", stats, self.total_time, self.iterations)
        } else {
            stats
        }
    }
}

impl fmt::Display for DerivedStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_log() {
        let log = EventLog::new();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
        assert!(!log.has(EventKind::ConstantFolded));
        assert_eq!(log.summary(), "no events");
    }

    #[test]
    fn test_record_event() {
        let log = EventLog::new();

        log.record(EventKind::StatementRemoved)
            .procedure("Main")
            .pass("dead-code")
            .message("x = 1");

        assert_eq!(log.len(), 1);
        let event = log.iter().next().unwrap();
        assert_eq!(event.procedure.as_deref(), Some("Main"));
        assert_eq!(event.pass.as_deref(), Some("dead-code"));
        assert_eq!(event.message, "x = 1");
        assert_eq!(event.to_string(), "[statement removed] Main: x = 1");
    }

    #[test]
    fn test_default_message() {
        let log = EventLog::new();
        log.record(EventKind::ProcedureInlined);
        assert_eq!(log.iter().next().unwrap().message, "procedure inlined");
    }

    #[test]
    fn test_info_warn_error() {
        let log = EventLog::new();

        log.info("informational message");
        log.warn("warning message");
        log.error("error message");

        assert_eq!(log.count_kind(EventKind::Info), 1);
        assert_eq!(log.warnings().count(), 1);
        assert_eq!(log.count_kind(EventKind::Error), 1);
        assert_eq!(log.summary(), "3 events");
    }

    #[test]
    fn test_transformation_and_diagnostic_counts() {
        let log = EventLog::new();
        log.record(EventKind::ConstantFolded);
        log.record(EventKind::ProcedureInlined);
        log.record(EventKind::PassStarted);
        log.record(EventKind::InlineRejected);
        log.info("starting");
        log.warn("iteration cap reached");

        assert_eq!(log.transformation_count(), 2);
        assert_eq!(log.diagnostics().count(), 2);
        assert!(EventKind::Warning.is_diagnostic());
        assert!(!EventKind::InlineRejected.is_diagnostic());
        assert!(!EventKind::PassStarted.is_transformation());
    }

    #[test]
    fn test_merge_and_filter() {
        let first = EventLog::new();
        let second = EventLog::new();

        first.record(EventKind::ConstantFolded).procedure("A");
        second.record(EventKind::CleanFailed).procedure("B");
        second.record(EventKind::ProcedureRemoved).procedure("B");

        first.merge(&second);
        assert_eq!(first.len(), 3);
        assert_eq!(first.filter_procedure("B").count(), 2);
        assert_eq!(first.failures().count(), 1);
        assert_eq!(first.procedures_affected(), 2);
    }

    #[test]
    fn test_summary() {
        let log = EventLog::new();
        log.record(EventKind::CallResolved);
        log.record(EventKind::CallResolved);
        log.record(EventKind::ConstantFolded);
        log.record(EventKind::TranslationFailed);

        let summary = log.summary();
        assert_eq!(summary, "1 constant folded, 2 call resolved");
    }

    #[test]
    fn test_derived_stats() {
        let log = EventLog::new();
        log.record(EventKind::StatementRemoved).procedure("Main");
        log.record(EventKind::StatementRemoved).procedure("Main");
        log.record(EventKind::CleanFailed).procedure("Other");
        log.warn("cap reached");

        let stats = DerivedStats::from_log(&log).with_iterations(3);
        assert_eq!(stats.statements_removed, 2);
        assert_eq!(stats.procedures_transformed, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.iterations, 3);
        assert_eq!(
            stats.summary(),
            "1 procedures, 2 statements removed, 1 local failures, 1 warnings"
        );
    }

    #[test]
    fn test_clone_is_independent() {
        let log = EventLog::new();
        log.info("one");
        let copy = log.clone();
        log.info("two");
        assert_eq!(copy.len(), 1);
        assert_eq!(log.len(), 2);
    }
}
