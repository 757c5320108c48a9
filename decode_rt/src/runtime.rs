// Copyright 2026 the Decode Runtime Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Top-level entry points: run a decoder over an input and render its result.

use alloc::string::String;

use crate::arena::{Arena, ArenaStats, DEFAULT_ARENA_SLOTS};
use crate::cps::{Ctx, Label};
use crate::fault::{Fault, FaultInfo};
use crate::names::SymbolTable;
use crate::pretty::{PrettySchema, pretty_string};
use crate::print::Dump;
use crate::trace::{TraceMask, TraceSink};
use crate::value::Obj;

/// Resource limits for a [`Runtime`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Arena capacity in slots, excluding the singletons.
    pub arena_slots: usize,
    /// Step budget per run. Each invocation of a closure costs one step.
    pub max_steps: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            arena_slots: DEFAULT_ARENA_SLOTS,
            max_steps: 1_000_000,
        }
    }
}

/// A decoder runtime: an arena plus the symbol table of the decoders it runs.
///
/// One runtime runs one decode at a time; use one runtime per thread for parallel decoding.
#[derive(Debug)]
pub struct Runtime<'n> {
    arena: Arena,
    names: SymbolTable<'n>,
    limits: Limits,
}

fn reborrow<'s>(trace: &'s mut Option<&mut dyn TraceSink>) -> Option<&'s mut dyn TraceSink> {
    match trace {
        Some(t) => Some(&mut **t),
        None => None,
    }
}

impl<'n> Runtime<'n> {
    /// Creates a runtime with an arena sized by `limits`.
    #[must_use]
    pub fn new(names: SymbolTable<'n>, limits: Limits) -> Self {
        Self {
            arena: Arena::with_capacity(limits.arena_slots),
            names,
            limits,
        }
    }

    /// Returns the arena.
    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Returns the arena for building input states.
    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    /// Returns the symbol table.
    #[must_use]
    pub fn names(&self) -> &SymbolTable<'n> {
        &self.names
    }

    /// Returns the configured limits.
    #[must_use]
    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Releases every value of the previous decode.
    pub fn reset_arena(&mut self) {
        self.arena.reset();
    }

    /// Returns an arena usage report.
    #[must_use]
    pub fn stats(&self) -> ArenaStats {
        self.arena.stats()
    }

    /// Runs `decoder` over `input` and returns what reaches the halt continuation.
    ///
    /// The initial state is `{blob: <input>}`. The result lives in the arena until the next
    /// [`Runtime::reset_arena`].
    pub fn eval(&mut self, decoder: Label, input: &[u8]) -> Result<Obj, FaultInfo> {
        self.eval_traced(decoder, input, TraceMask::NONE, None)
    }

    /// Like [`Runtime::eval`], reporting the events in `trace_mask` to `trace`.
    pub fn eval_traced(
        &mut self,
        decoder: Label,
        input: &[u8],
        trace_mask: TraceMask,
        mut trace: Option<&mut dyn TraceSink>,
    ) -> Result<Obj, FaultInfo> {
        let mut ctx = Ctx::new(
            &mut self.arena,
            &self.names,
            input,
            self.limits.max_steps,
            trace_mask,
            reborrow(&mut trace),
        );
        ctx.run(decoder, Ctx::initial_state)
    }

    /// Runs `decoder` on a caller-built `state` whose blobs refer to `input`.
    pub fn run_with_state(
        &mut self,
        decoder: Label,
        state: Obj,
        input: &[u8],
        trace_mask: TraceMask,
        mut trace: Option<&mut dyn TraceSink>,
    ) -> Result<Obj, FaultInfo> {
        let mut ctx = Ctx::new(
            &mut self.arena,
            &self.names,
            input,
            self.limits.max_steps,
            trace_mask,
            reborrow(&mut trace),
        );
        ctx.run(decoder, |_| Ok(state))
    }

    /// Runs `decoder` over `input`, hands the result to `f`, then resets the arena.
    ///
    /// The arena is reset whether or not the decode faulted.
    pub fn decode<R>(
        &mut self,
        decoder: Label,
        input: &[u8],
        f: impl FnOnce(&Arena, &SymbolTable<'n>, Obj) -> R,
    ) -> Result<R, FaultInfo> {
        let out = self
            .eval(decoder, input)
            .map(|result| f(&self.arena, &self.names, result));
        self.arena.reset();
        out
    }

    /// Returns a `Display` adapter dumping `obj`.
    #[must_use]
    pub fn dump(&self, obj: Obj) -> Dump<'_> {
        Dump::new(&self.arena, &self.names, obj)
    }

    /// Renders a decoded instruction.
    pub fn pretty(&self, schema: &PrettySchema, insn: Obj) -> Result<String, Fault> {
        pretty_string(&self.arena, &self.names, schema, insn)
    }
}

#[cfg(feature = "std")]
impl Runtime<'_> {
    /// Prints the dump of `obj` to stdout.
    pub fn print(&self, obj: Obj) {
        std::print!("{}", self.dump(obj));
    }

    /// Prints the dump of `obj` and a newline to stdout.
    pub fn print_line(&self, obj: Obj) {
        std::println!("{}", self.dump(obj));
    }

    /// Prints a decoded instruction to stdout.
    pub fn pretty_print(&self, schema: &PrettySchema, insn: Obj) -> Result<(), Fault> {
        std::print!("{}", self.pretty(schema, insn)?);
        Ok(())
    }

    /// Prints a decoded instruction and a newline to stdout.
    pub fn pretty_print_line(&self, schema: &PrettySchema, insn: Obj) -> Result<(), Fault> {
        std::println!("{}", self.pretty(schema, insn)?);
        Ok(())
    }

    /// Runs `decoder` over `input`, aborting the process on any fault.
    ///
    /// The fault is reported on stderr as `ERROR:<fault>`.
    pub fn eval_or_abort(&mut self, decoder: Label, input: &[u8]) -> Obj {
        match self.eval(decoder, input) {
            Ok(result) => result,
            Err(info) => {
                std::eprintln!("ERROR:{info}");
                std::process::abort()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitVec;
    use crate::cps::{HALT, Step};
    use crate::value::{Blob, FieldId};
    use alloc::string::ToString;
    use alloc::vec::Vec;

    const FIELDS: &[&str] = &["blob", "1", "2"];

    fn first_byte(ctx: &mut Ctx<'_, '_>, _env: Obj, args: &[Obj]) -> Result<Step, Fault> {
        let &[k, state] = args else {
            return Err(ctx.arity_fault(args));
        };
        let pair = ctx.consume(state)?;
        let (byte, _) = ctx.arena().unpair(pair)?;
        Ok(Step::resume(k, byte))
    }

    const FIRST_BYTE: Label = Label::new("first_byte", 3, first_byte);

    fn spin(ctx: &mut Ctx<'_, '_>, env: Obj, args: &[Obj]) -> Result<Step, Fault> {
        let &[k, state] = args else {
            return Err(ctx.arity_fault(args));
        };
        Step::invoke(env, &[k, state])
    }

    const SPIN: Label = Label::new("spin", 3, spin);

    fn bad_call(_ctx: &mut Ctx<'_, '_>, _env: Obj, args: &[Obj]) -> Result<Step, Fault> {
        Step::invoke(args[0], &[args[1], args[1]])
    }

    const BAD_CALL: Label = Label::new("bad_call", 3, bad_call);

    fn runtime() -> Runtime<'static> {
        Runtime::new(
            SymbolTable::new(FIELDS, &[]),
            Limits {
                arena_slots: 256,
                max_steps: 100,
            },
        )
    }

    #[test]
    fn eval_returns_halt_argument() {
        let mut rt = runtime();
        let out = rt.eval(FIRST_BYTE, &[0x4b, 0x00]).unwrap();
        assert_eq!(rt.arena().bitvec(out), Ok(BitVec::byte(0x4b)));
        assert_eq!(rt.dump(out).to_string(), "{tag=__BV,sz=8,vec=4b}");
    }

    #[test]
    fn faults_carry_location() {
        let mut rt = runtime();
        let err = rt.eval(FIRST_BYTE, &[]).unwrap_err();
        assert_eq!(err.fault, Fault::EndOfInput);
        assert_eq!(err.label, "first_byte");
        assert_eq!(err.step, 1);
        assert_eq!(err.to_string(), "first_byte@1: <end-of-blob>");
    }

    #[test]
    fn step_budget_is_enforced() {
        let mut rt = runtime();
        let err = rt.eval(SPIN, &[]).unwrap_err();
        assert_eq!(err.fault, Fault::StepLimit);
        assert_eq!(err.step, 100);
    }

    #[test]
    fn arity_is_checked() {
        let mut rt = runtime();
        let err = rt.eval(BAD_CALL, &[]).unwrap_err();
        assert_eq!(
            err.fault,
            Fault::ArityMismatch {
                label: HALT.name(),
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn decode_resets_even_after_a_fault() {
        let mut rt = runtime();
        let bytes = rt.decode(FIRST_BYTE, &[7], |arena, _, out| arena.bitvec(out));
        assert_eq!(bytes, Ok(Ok(BitVec::byte(7))));
        assert_eq!(rt.stats().used, 0);
        assert!(rt.decode(FIRST_BYTE, &[], |_, _, _| ()).is_err());
        assert_eq!(rt.stats().used, 0);
        assert!(rt.stats().high_water > 0);
    }

    #[test]
    fn run_with_state_uses_caller_state() {
        let mut rt = runtime();
        let input = [1, 2, 3];
        let blob = rt
            .arena_mut()
            .alloc_blob(Blob { offset: 2, len: 1 })
            .unwrap();
        let state = rt
            .arena_mut()
            .record_build(&[(FieldId::BLOB, blob)])
            .unwrap();
        let out = rt
            .run_with_state(FIRST_BYTE, state, &input, TraceMask::NONE, None)
            .unwrap();
        assert_eq!(rt.arena().bitvec(out), Ok(BitVec::byte(3)));
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<alloc::string::String>,
    }

    impl TraceSink for Recorder {
        fn run_start(&mut self, decoder: &Label, input_len: usize) {
            self.events
                .push(alloc::format!("start {} {input_len}", decoder.name()));
        }

        fn step(&mut self, label: &Label, step: u64, _arena_used: usize) {
            self.events.push(alloc::format!("step {step} {}", label.name()));
        }

        fn run_end(&mut self, outcome: crate::trace::TraceOutcome<'_>, _stats: ArenaStats) {
            self.events.push(alloc::format!("end {outcome:?}"));
        }
    }

    #[test]
    fn traced_run_reports_steps() {
        let mut rt = runtime();
        let mut rec = Recorder::default();
        rt.eval_traced(
            FIRST_BYTE,
            &[1],
            TraceMask::RUN | TraceMask::STEP,
            Some(&mut rec),
        )
        .unwrap();
        assert_eq!(
            rec.events,
            ["start first_byte 1", "step 0 first_byte", "step 1 halt", "end Ok"]
        );
    }
}
