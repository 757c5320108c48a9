// Copyright 2026 the Decode Runtime Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Continuation-passing calling convention and driver.
//!
//! Generated decoders are sets of native step functions. A step receives the running [`Ctx`],
//! the closure it was invoked through (its environment) and up to [`MAX_ARGS`] arguments, and
//! ends by naming the next closure to invoke. It never returns the pipeline result directly:
//! the only way out is the halt continuation, whose step returns [`Step::Halt`].
//!
//! Control transfer is a trampoline: [`Ctx::drive`] repeatedly resolves the closure's label,
//! checks the arity and runs the step, so the native stack depth does not grow with the length
//! of the decode.
//!
//! ## Writing a step
//!
//! ```
//! use decode_rt::cps::{Ctx, Label, Step};
//! use decode_rt::fault::Fault;
//! use decode_rt::value::Obj;
//!
//! // (env, k, state): consume one byte and pass the `(byte, state)` pair to `k`.
//! fn one_byte(ctx: &mut Ctx<'_, '_>, _env: Obj, args: &[Obj]) -> Result<Step, Fault> {
//!     let &[k, state] = args else {
//!         return Err(ctx.arity_fault(args));
//!     };
//!     let pair = ctx.consume(state)?;
//!     Ok(Step::resume(k, pair))
//! }
//!
//! pub const ONE_BYTE: Label = Label::new("one_byte", 3, one_byte);
//! ```

use core::fmt;

use crate::arena::Arena;
use crate::fault::{Fault, FaultInfo};
use crate::names::SymbolTable;
use crate::print::{Dump, dump_string};
use crate::trace::{TraceMask, TraceOutcome, TraceSink};
use crate::value::Obj;

/// Most arguments an invocation can carry, not counting the environment.
pub const MAX_ARGS: usize = 6;

/// Native step function: `(ctx, env, args) -> next step`.
pub type StepFn = fn(&mut Ctx<'_, '_>, Obj, &[Obj]) -> Result<Step, Fault>;

/// A native step function with its name and arity.
///
/// The arity counts the environment, so it ranges from 1 to `MAX_ARGS + 1`.
#[derive(Copy, Clone)]
pub struct Label {
    name: &'static str,
    arity: u8,
    f: StepFn,
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Label")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl Label {
    /// Creates a label.
    #[must_use]
    pub const fn new(name: &'static str, arity: u8, f: StepFn) -> Self {
        Self { name, arity, f }
    }

    /// Returns the diagnostic name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the arity, environment included.
    #[must_use]
    pub const fn arity(&self) -> u8 {
        self.arity
    }
}

fn halt(ctx: &mut Ctx<'_, '_>, _env: Obj, args: &[Obj]) -> Result<Step, Fault> {
    match args {
        [result] => Ok(Step::Halt(*result)),
        _ => Err(ctx.arity_fault(args)),
    }
}

/// The halt continuation: `(env, result)`, ends the run with `result`.
pub const HALT: Label = Label::new("halt", 2, halt);

/// Arguments of one invocation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Args {
    len: u8,
    items: [Obj; MAX_ARGS],
}

impl Args {
    /// Copies `args`, failing if there are more than [`MAX_ARGS`].
    pub fn new(args: &[Obj]) -> Result<Self, Fault> {
        if args.len() > MAX_ARGS {
            return Err(Fault::TooManyArgs { count: args.len() });
        }
        let mut items = [Obj::NIL; MAX_ARGS];
        items[..args.len()].copy_from_slice(args);
        #[allow(
            clippy::cast_possible_truncation,
            reason = "length is bounded by MAX_ARGS"
        )]
        let len = args.len() as u8;
        Ok(Self { len, items })
    }

    /// Returns the arguments.
    #[must_use]
    pub fn as_slice(&self) -> &[Obj] {
        &self.items[..usize::from(self.len)]
    }

    /// Returns the number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    /// Returns `true` if there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// What a step asks the driver to do next.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Tail-call `closure` with `args`.
    Invoke {
        /// Closure to invoke.
        closure: Obj,
        /// Arguments, not counting the environment.
        args: Args,
    },
    /// End the run with a result. Only the halt continuation returns this.
    Halt(Obj),
}

impl Step {
    /// Tail-calls `closure` with `args`.
    pub fn invoke(closure: Obj, args: &[Obj]) -> Result<Self, Fault> {
        Ok(Self::Invoke {
            closure,
            args: Args::new(args)?,
        })
    }

    /// Passes `value` to the continuation `k`.
    #[must_use]
    pub fn resume(k: Obj, value: Obj) -> Self {
        let mut items = [Obj::NIL; MAX_ARGS];
        items[0] = value;
        Self::Invoke {
            closure: k,
            args: Args { len: 1, items },
        }
    }
}

/// State of one running decode.
///
/// A `Ctx` borrows the arena mutably and the input immutably for the whole run; every value a
/// step creates goes through it.
pub struct Ctx<'a, 'i> {
    pub(crate) arena: &'a mut Arena,
    names: &'a SymbolTable<'a>,
    pub(crate) input: &'i [u8],
    trace_mask: TraceMask,
    trace: Option<&'a mut dyn TraceSink>,
    max_steps: u64,
    steps: u64,
    label: &'static str,
    arity: u8,
}

impl fmt::Debug for Ctx<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ctx")
            .field("input_len", &self.input.len())
            .field("steps", &self.steps)
            .field("label", &self.label)
            .field("arena", &self.arena)
            .finish_non_exhaustive()
    }
}

impl<'a, 'i> Ctx<'a, 'i> {
    pub(crate) fn new(
        arena: &'a mut Arena,
        names: &'a SymbolTable<'a>,
        input: &'i [u8],
        max_steps: u64,
        trace_mask: TraceMask,
        trace: Option<&'a mut dyn TraceSink>,
    ) -> Self {
        Self {
            arena,
            names,
            input,
            trace_mask,
            trace,
            max_steps,
            steps: 0,
            label: HALT.name,
            arity: HALT.arity,
        }
    }

    /// Returns the arena.
    #[must_use]
    pub fn arena(&self) -> &Arena {
        self.arena
    }

    /// Returns the arena for allocation.
    pub fn arena_mut(&mut self) -> &mut Arena {
        self.arena
    }

    /// Returns the symbol table of the running decoder.
    #[must_use]
    pub fn names(&self) -> &SymbolTable<'a> {
        self.names
    }

    /// Returns the number of steps executed so far.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Allocates a closure over `label` capturing `captures`.
    pub fn closure(&mut self, label: Label, captures: &[Obj]) -> Result<Obj, Fault> {
        let l = self.arena.alloc_label(label)?;
        self.arena.alloc_closure(l, captures)
    }

    /// Returns captured value `index` of `env` (1-based; slot 0 is the code label).
    pub fn env(&self, env: Obj, index: usize) -> Result<Obj, Fault> {
        self.arena.closure_ref(env, index)
    }

    /// Builds the fault a step reports when its argument list has the wrong shape.
    #[must_use]
    pub fn arity_fault(&self, args: &[Obj]) -> Fault {
        Fault::ArityMismatch {
            label: self.label,
            expected: self.arity,
            actual: arity_of(args),
        }
    }

    /// Raises `value`: the run stops with [`Fault::Raised`] carrying its dump.
    #[must_use]
    pub fn raise(&self, value: Obj) -> Fault {
        Fault::Raised {
            rendered: dump_string(self.arena, self.names, value),
        }
    }

    /// Reports `value` to the trace sink under `label` and returns it.
    pub fn trace_value(&mut self, label: &str, value: Obj) -> Obj {
        if self.trace_mask.contains(TraceMask::VALUE)
            && let Some(t) = self.trace.as_mut()
        {
            t.value(label, &Dump::new(self.arena, self.names, value));
        }
        value
    }

    /// Runs steps starting from `step` until the halt continuation is reached.
    pub fn drive(&mut self, mut step: Step) -> Result<Obj, Fault> {
        loop {
            let (closure, args) = match step {
                Step::Halt(result) => return Ok(result),
                Step::Invoke { closure, args } => (closure, args),
            };
            if self.steps >= self.max_steps {
                return Err(Fault::StepLimit);
            }
            let label = self.arena.closure_label(closure)?;
            self.label = label.name;
            self.arity = label.arity;
            let actual = arity_of(args.as_slice());
            if label.arity != actual {
                return Err(Fault::ArityMismatch {
                    label: label.name,
                    expected: label.arity,
                    actual,
                });
            }
            if self.trace_mask.contains(TraceMask::STEP)
                && let Some(t) = self.trace.as_mut()
            {
                t.step(&label, self.steps, self.arena.used());
            }
            self.steps += 1;
            step = (label.f)(self, closure, args.as_slice())?;
        }
    }

    /// Runs `decoder` on `state` with a fresh halt continuation.
    ///
    /// The decoder is invoked as `(env, k, state)`; the result is whatever reaches `k`.
    pub fn run_with_state(&mut self, decoder: Label, state: Obj) -> Result<Obj, Fault> {
        self.label = decoder.name;
        self.arity = decoder.arity;
        let k = self.closure(HALT, &[])?;
        let m = self.closure(decoder, &[])?;
        self.drive(Step::invoke(m, &[k, state])?)
    }

    /// Builds the initial state with `state` and runs `decoder` on it, emitting run events and
    /// annotating a fault with its location.
    pub(crate) fn run(
        &mut self,
        decoder: Label,
        state: impl FnOnce(&mut Self) -> Result<Obj, Fault>,
    ) -> Result<Obj, FaultInfo> {
        if self.trace_mask.contains(TraceMask::RUN)
            && let Some(t) = self.trace.as_mut()
        {
            t.run_start(&decoder, self.input.len());
        }
        self.label = decoder.name;
        self.arity = decoder.arity;
        let result = state(self)
            .and_then(|state| self.run_with_state(decoder, state))
            .map_err(|fault| self.fault_info(fault));
        if self.trace_mask.contains(TraceMask::RUN)
            && let Some(t) = self.trace.as_mut()
        {
            let outcome = match &result {
                Ok(_) => TraceOutcome::Ok,
                Err(e) => TraceOutcome::Fault(e),
            };
            t.run_end(outcome, self.arena.stats());
        }
        result
    }

    pub(crate) fn fault_info(&self, fault: Fault) -> FaultInfo {
        FaultInfo {
            label: self.label,
            step: self.steps,
            fault,
        }
    }
}

fn arity_of(args: &[Obj]) -> u8 {
    u8::try_from(args.len() + 1).unwrap_or(u8::MAX)
}
