//! Deobfuscation result types.
//!
//! This module contains the [`DeobfuscationResult`] struct which encapsulates
//! the outcome of running the deobfuscator on a module.

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use crate::deobfuscation::{DerivedStats, EventLog};

/// Result of running deobfuscation.
///
/// Statistics are derived from the event log on demand.
///
/// # Example
///
/// ```rust,ignore
/// use macroscope::deobfuscation::{Deobfuscator, DeobfuscatorConfig};
///
/// let mut deobfuscator = Deobfuscator::new(module, DeobfuscatorConfig::default());
/// let result = deobfuscator.run()?;
///
/// println!("Translated: {:?}", result.translated);
/// println!("Stats: {}", result.stats().summary());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DeobfuscationResult {
    /// All events from the run.
    pub events: EventLog,
    /// Procedures registered with the evaluator, in translation order.
    pub translated: Vec<String>,
    /// Procedures removed from the module, in removal order.
    pub removed: Vec<String>,
    /// Procedures whose dependencies never became evaluable, with those dependencies.
    pub unresolved: BTreeMap<String, BTreeSet<String>>,
    /// Fixed-point iterations of the resolution pass.
    pub iterations: usize,
    /// Total processing time.
    pub total_time: Duration,
}

impl DeobfuscationResult {
    /// Creates a new deobfuscation result around an event log.
    #[must_use]
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    /// Sets timing and iteration info.
    #[must_use]
    pub fn with_timing(mut self, time: Duration, iterations: usize) -> Self {
        self.total_time = time;
        self.iterations = iterations;
        self
    }

    /// Computes statistics derived from the event log.
    #[must_use]
    pub fn stats(&self) -> DerivedStats {
        DerivedStats::from_log(&self.events)
            .with_time(self.total_time)
            .with_iterations(self.iterations)
    }

    /// Generates a human-readable summary of the deobfuscation results.
    #[must_use]
    pub fn summary(&self) -> String {
        self.stats().summary()
    }

    /// Generates a multi-line summary including the resolution outcome.
    #[must_use]
    pub fn detailed_summary(&self) -> String {
        let mut lines = vec![format!("Deobfuscation complete: {}", self.summary())];
        if !self.translated.is_empty() {
            lines.push(format!("Translated: {}", self.translated.join(", ")));
        }
        if !self.removed.is_empty() {
            lines.push(format!("Removed: {}", self.removed.join(", ")));
        }
        for (procedure, dependencies) in &self.unresolved {
            let dependencies: Vec<&str> = dependencies.iter().map(String::as_str).collect();
            lines.push(format!("Unresolved: {procedure} -> {}", dependencies.join(", ")));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deobfuscation::EventKind;

    #[test]
    fn test_summary_from_events() {
        let events = EventLog::new();
        events.record(EventKind::CallResolved).procedure("Main");
        let result = DeobfuscationResult::new(events).with_timing(Duration::ZERO, 2);

        assert_eq!(result.stats().calls_resolved, 1);
        assert_eq!(result.stats().iterations, 2);
        assert_eq!(result.summary(), "1 procedures, 1 calls resolved");
    }

    #[test]
    fn test_detailed_summary() {
        let mut result = DeobfuscationResult::default();
        result.translated.push("F".to_string());
        result.removed.push("F".to_string());
        result
            .unresolved
            .insert("Main".to_string(), BTreeSet::from(["Shell".to_string()]));

        let text = result.detailed_summary();
        assert!(text.starts_with("Deobfuscation complete: no transformations"));
        assert!(text.contains("Translated: F"));
        assert!(text.contains("Removed: F"));
        assert!(text.contains("Unresolved: Main -> Shell"));
    }
}
