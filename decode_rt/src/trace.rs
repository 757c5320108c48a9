// Copyright 2026 the Decode Runtime Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing hooks for `decode_rt`.
//!
//! Tracing is optional and `no_std` friendly. The driver only emits events requested by a
//! [`TraceMask`].
//!
//! To enable tracing, pass a [`TraceMask`] and [`TraceSink`] to [`Runtime::eval_traced`].

#[cfg(doc)]
use crate::runtime::Runtime;

use core::fmt;

use crate::arena::ArenaStats;
use crate::cps::Label;
use crate::fault::FaultInfo;

/// A set of trace events requested by a [`TraceSink`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TraceMask(u32);

impl core::ops::BitOr for TraceMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for TraceMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl TraceMask {
    /// No tracing.
    pub const NONE: Self = Self(0);
    /// Trace run boundaries.
    ///
    /// Enables:
    /// - [`TraceSink::run_start`]
    /// - [`TraceSink::run_end`]
    pub const RUN: Self = Self(1 << 0);
    /// Trace each step the driver executes.
    ///
    /// Enables:
    /// - [`TraceSink::step`]
    pub const STEP: Self = Self(1 << 1);
    /// Trace values decoders report with `Ctx::trace_value`.
    ///
    /// Enables:
    /// - [`TraceSink::value`]
    pub const VALUE: Self = Self(1 << 2);
    /// Every event.
    pub const ALL: Self = Self(Self::RUN.0 | Self::STEP.0 | Self::VALUE.0);

    /// Returns `true` if this mask includes all bits in `other`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

/// Run outcome for tracing.
#[derive(Clone, Debug)]
pub enum TraceOutcome<'a> {
    /// The halt continuation was reached.
    Ok,
    /// The run faulted.
    Fault(&'a FaultInfo),
}

/// A trace sink that can receive driver events.
pub trait TraceSink {
    /// Returns the set of events the sink wants.
    fn mask(&self) -> TraceMask {
        TraceMask::NONE
    }

    /// Called at the start of a run.
    ///
    /// Called only if the mask includes [`TraceMask::RUN`].
    ///
    /// - `decoder`: label of the top-level decoder
    /// - `input_len`: length of the input in bytes
    fn run_start(&mut self, _decoder: &Label, _input_len: usize) {}

    /// Called before each step.
    ///
    /// Called only if the mask includes [`TraceMask::STEP`].
    ///
    /// - `label`: label about to run
    /// - `step`: zero-based step number
    /// - `arena_used`: arena slots in use before the step
    fn step(&mut self, _label: &Label, _step: u64, _arena_used: usize) {}

    /// Called when a decoder reports a value.
    ///
    /// Called only if the mask includes [`TraceMask::VALUE`].
    ///
    /// - `label`: caller-chosen tag for the value
    /// - `value`: structural dump of the value
    fn value(&mut self, _label: &str, _value: &dyn fmt::Display) {}

    /// Called at the end of a run.
    ///
    /// Called only if the mask includes [`TraceMask::RUN`].
    ///
    /// - `outcome`: whether the run halted or faulted
    /// - `stats`: arena usage at the end of the run
    fn run_end(&mut self, _outcome: TraceOutcome<'_>, _stats: ArenaStats) {}
}

/// A sink that prints traced values and run summaries to stdout.
///
/// Values are printed as `TRACE:<label>:<dump>`.
#[cfg(feature = "std")]
#[derive(Copy, Clone, Debug, Default)]
pub struct PrintTraceSink;

#[cfg(feature = "std")]
impl TraceSink for PrintTraceSink {
    fn mask(&self) -> TraceMask {
        TraceMask::RUN | TraceMask::VALUE
    }

    fn value(&mut self, label: &str, value: &dyn fmt::Display) {
        std::println!("TRACE:{label}:{value}");
    }

    fn run_end(&mut self, outcome: TraceOutcome<'_>, stats: ArenaStats) {
        if let TraceOutcome::Fault(info) = outcome {
            std::println!("FAULT:{info}");
        }
        std::println!("{stats}");
    }
}

#[cfg(test)]
mod tests {
    use super::TraceMask;

    #[test]
    fn mask_contains() {
        let m = TraceMask::RUN | TraceMask::VALUE;
        assert!(m.contains(TraceMask::RUN));
        assert!(!m.contains(TraceMask::STEP));
        assert!(TraceMask::ALL.contains(m));
        assert!(m.contains(TraceMask::NONE));
    }
}
