// Copyright 2026 the Decode Runtime Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::resolver::{DefaultLabelResolver, LabelResolver, default_run_label, default_step_label};
use core::fmt;
use decode_rt::arena::ArenaStats;
use decode_rt::cps::Label;
use decode_rt::trace::{TraceMask, TraceOutcome, TraceSink};
use std::string::{String, ToString};

type BackendGuard = tracy_client::Span;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ScopeKind {
    Run,
    Step,
}

struct ScopeEntry {
    // Keep the label alive for backends that may borrow it.
    label: String,
    guard: Option<BackendGuard>,
}

/// A `TraceSink` that emits Tracy scopes via `tracy-client`.
///
/// A run opens one scope for its whole duration; each step opens a scope that lasts until the
/// next step starts or the run ends.
pub struct ProfilingTraceSink<R = DefaultLabelResolver> {
    resolver: R,
    run: Option<ScopeEntry>,
    step: Option<ScopeEntry>,
}

impl ProfilingTraceSink<DefaultLabelResolver> {
    /// Create a new sink with name-based labels.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: LabelResolver> ProfilingTraceSink<R> {
    /// Create a new sink with a custom label resolver.
    #[must_use]
    pub fn with_resolver(resolver: R) -> Self {
        Self {
            resolver,
            run: None,
            step: None,
        }
    }

    /// Returns the label of the innermost open scope, if any.
    #[must_use]
    pub fn current_label(&self) -> Option<&str> {
        self.step
            .as_ref()
            .or(self.run.as_ref())
            .map(|e| e.label.as_str())
    }

    fn open(&self, kind: ScopeKind, label: String, line: u64) -> ScopeEntry {
        let guard = self.start_scope(kind, &label, line);
        ScopeEntry { label, guard }
    }

    fn start_scope(&self, kind: ScopeKind, label: &str, line: u64) -> Option<BackendGuard> {
        let function_name = match kind {
            ScopeKind::Run => "decode_rt.run",
            ScopeKind::Step => "decode_rt.step",
        };
        let client = tracy_client::Client::running()?;
        let line = u32::try_from(line).unwrap_or(u32::MAX);
        Some(client.span_alloc(Some(label), function_name, "decode_rt", line, 0))
    }

    // Close the step before the run so nested spans close inner-to-outer.
    fn close_all(&mut self) {
        self.step = None;
        self.run = None;
    }
}

impl<R: LabelResolver> TraceSink for ProfilingTraceSink<R> {
    fn mask(&self) -> TraceMask {
        TraceMask::RUN | TraceMask::STEP | TraceMask::VALUE
    }

    fn run_start(&mut self, decoder: &Label, input_len: usize) {
        self.close_all();
        let label = self
            .resolver
            .run_label(decoder)
            .unwrap_or_else(|| default_run_label(decoder));
        self.run = Some(self.open(ScopeKind::Run, label, input_len as u64));
    }

    fn step(&mut self, label: &Label, step: u64, _arena_used: usize) {
        self.step = None;
        let resolved = self
            .resolver
            .step_label(label)
            .unwrap_or_else(|| default_step_label(label));
        self.step = Some(self.open(ScopeKind::Step, resolved, step));
    }

    fn value(&mut self, label: &str, value: &dyn fmt::Display) {
        if let Some(client) = tracy_client::Client::running() {
            client.message(&format!("{label}: {value}"), 0);
        }
    }

    fn run_end(&mut self, outcome: TraceOutcome<'_>, stats: ArenaStats) {
        if let Some(client) = tracy_client::Client::running() {
            let summary = match outcome {
                TraceOutcome::Ok => stats.to_string(),
                TraceOutcome::Fault(info) => format!("{info}; {stats}"),
            };
            client.message(&summary, 0);
        }
        self.close_all();
    }
}

impl<R> Default for ProfilingTraceSink<R>
where
    R: LabelResolver + Default,
{
    fn default() -> Self {
        Self::with_resolver(R::default())
    }
}

impl<R> fmt::Debug for ProfilingTraceSink<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfilingTraceSink")
            .field("in_run", &self.run.is_some())
            .field("in_step", &self.step.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{ProfilingTraceSink, ScopeKind};
    use crate::resolver::DecoderScopedResolver;
    use decode_rt::arena::Arena;
    use decode_rt::cps::HALT;
    use decode_rt::trace::{TraceOutcome, TraceSink};

    #[test]
    fn start_scope_without_tracy_client_does_not_panic() {
        let sink = ProfilingTraceSink::new();
        let _guard = sink.start_scope(ScopeKind::Step, "test", 0);
    }

    #[test]
    fn scopes_follow_run_and_steps() {
        let mut sink = ProfilingTraceSink::with_resolver(DecoderScopedResolver::default());
        assert_eq!(sink.current_label(), None);
        sink.run_start(&HALT, 3);
        assert_eq!(sink.current_label(), Some("decode:halt"));
        sink.step(&HALT, 0, 0);
        assert_eq!(sink.current_label(), Some("halt/halt"));
        sink.run_end(TraceOutcome::Ok, Arena::default().stats());
        assert_eq!(sink.current_label(), None);
    }
}
