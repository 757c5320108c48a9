// Copyright 2026 the Decode Runtime Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Faults raised while running a decoder.
//!
//! Inside a decode every fault is terminal: steps propagate it with `?` and the driver unwinds the
//! whole pipeline. At the [`Runtime`](crate::runtime::Runtime) boundary the fault is returned as a
//! [`FaultInfo`] so a host can isolate failures per input.

use alloc::string::String;
use core::fmt;

use crate::value::{FieldId, Tag};

/// A runtime fault.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Consumed past the end of the input.
    EndOfInput,
    /// Moved an input view before the start of the buffer.
    BlobUnderflow,
    /// A blob does not denote a sub-range of the bound input.
    BlobOutOfRange,
    /// Looked up a field the record does not have.
    MissingField {
        /// Requested field.
        field: FieldId,
    },
    /// Read a value through the accessor of another variant.
    WrongKind {
        /// Variant the accessor expects.
        expected: Tag,
        /// Variant found in the header.
        actual: Tag,
    },
    /// A reference does not point one slot past a header.
    BadHeader,
    /// A reference was issued before the last arena reset.
    StaleRef,
    /// The arena has no room for an allocation.
    ArenaExhausted {
        /// Slots requested.
        requested: usize,
        /// Slots still available.
        available: usize,
    },
    /// A closure environment was indexed past its end.
    EnvIndex {
        /// Requested environment slot.
        index: usize,
        /// Environment length.
        len: usize,
    },
    /// A closure was invoked with the wrong number of arguments.
    ArityMismatch {
        /// Label of the invoked closure.
        label: &'static str,
        /// Arity declared by the label (environment included).
        expected: u8,
        /// Arity of the invocation (environment included).
        actual: u8,
    },
    /// An invocation carried more arguments than the protocol allows.
    TooManyArgs {
        /// Number of arguments supplied.
        count: usize,
    },
    /// A bit range does not fit in a machine word.
    BitRange {
        /// Starting bit.
        offset: u32,
        /// Number of bits.
        width: u32,
    },
    /// A bit-vector would be wider than 64 bits.
    WidthOverflow {
        /// Requested width.
        width: u32,
    },
    /// A scale operand carried an unknown factor tag.
    BadScale {
        /// The factor tag.
        factor: u64,
    },
    /// An operand list had an unsupported number of operands.
    BadOperandCount {
        /// Number of operands found.
        count: usize,
    },
    /// A value has no operand rendering.
    InvalidOperand {
        /// Variant of the offending value.
        tag: Tag,
    },
    /// A value is not a decoded instruction.
    InvalidInstruction,
    /// The decoder exceeded its step budget.
    StepLimit,
    /// The decoder raised an error value.
    Raised {
        /// Structural dump of the raised value.
        rendered: String,
    },
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndOfInput => write!(f, "<end-of-blob>"),
            Self::BlobUnderflow => write!(f, "blob moved before start of input"),
            Self::BlobOutOfRange => write!(f, "blob outside of input"),
            Self::MissingField { field } => write!(f, "record-field '{}' not found", field.0),
            Self::WrongKind { expected, actual } => {
                write!(f, "kind mismatch (expected {expected}, got {actual})")
            }
            Self::BadHeader => write!(f, "reference does not follow a header"),
            Self::StaleRef => write!(f, "reference used after arena reset"),
            Self::ArenaExhausted {
                requested,
                available,
            } => write!(
                f,
                "arena exhausted (requested {requested} slots, {available} available)"
            ),
            Self::EnvIndex { index, len } => {
                write!(f, "closure slot {index} out of bounds (len {len})")
            }
            Self::ArityMismatch {
                label,
                expected,
                actual,
            } => write!(
                f,
                "arity mismatch invoking {label} (expected {expected}, got {actual})"
            ),
            Self::TooManyArgs { count } => write!(f, "too many arguments ({count})"),
            Self::BitRange { offset, width } => {
                write!(f, "bit range {offset}+{width} exceeds 64 bits")
            }
            Self::WidthOverflow { width } => write!(f, "bit-vector width {width} exceeds 64"),
            Self::BadScale { factor } => write!(f, "invalid scaling factor {factor}"),
            Self::BadOperandCount { count } => {
                write!(f, "unsupported amount of operands ({count})")
            }
            Self::InvalidOperand { tag } => write!(f, "invalid operand ({tag})"),
            Self::InvalidInstruction => write!(f, "invalid instruction object"),
            Self::StepLimit => write!(f, "step limit exceeded"),
            Self::Raised { rendered } => write!(f, "raised: {rendered}"),
        }
    }
}

impl core::error::Error for Fault {}

/// A fault annotated with the step that raised it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaultInfo {
    /// Name of the label that was running (or being set up).
    pub label: &'static str,
    /// Number of steps executed before the fault.
    pub step: u64,
    /// Fault kind.
    pub fault: Fault,
}

impl fmt::Display for FaultInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}: {}", self.label, self.step, self.fault)
    }
}

impl core::error::Error for FaultInfo {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        Some(&self.fault)
    }
}
