// Copyright 2026 the Decode Runtime Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A tiny 32-bit x86 decoder.
//!
//! Supported encodings:
//! - `90` `NOP`, `C3` `RET`
//! - `40+r` `INC r32`
//! - `B8+r id` `MOV r32, imm32`
//! - `89 /r` `MOV r/m32, r32` with register, `[reg]` and `[reg+disp8]` operands
//! - `EB cb` `JMP rel8`
//!
//! Every other opcode raises the offending byte.
//!
//! The entry point [`DECODE`] follows the decoder contract: it is invoked as `(env, k, state)`
//! and passes `pair(instruction, state)` to `k`.

use core::fmt;

use decode_rt::cps::{Ctx, Label, Step};
use decode_rt::fault::{Fault, FaultInfo};
use decode_rt::names::{NamesError, SymbolTable};
use decode_rt::pretty::{PrettySchema, pretty_string};
use decode_rt::runtime::{Limits, Runtime};
use decode_rt::trace::{TraceMask, TraceSink};
use decode_rt::value::{ConId, FieldId, Obj};

/// Field names, indexed by [`FieldId`].
pub const FIELDS: &[&str] = &[
    "blob", "1", "2", "tag", "opnd1", "opnd2", "opnd3", "opnd4", "sz", "segment", "opnd", "a", "b",
    "imm",
];

/// Constructor names, indexed by [`ConId`].
pub const CONS: &[&str] = &[
    "", "MEM", "REG", "SUM", "SCALE", "NEARABS", "FARABS", "REL8", "REL16", "REL32", "REL64",
    "IMM8", "IMM16", "IMM32", "IMM64", "ARITY0", "ARITY1", "ARITY2", "ARITY3", "ARITY4", "EAX",
    "ECX", "EDX", "EBX", "ESP", "EBP", "ESI", "EDI", "DS", "NOP", "RET", "INC", "MOV", "JMP",
];

/// Field ids of [`FIELDS`].
#[allow(missing_docs, reason = "names mirror the field table")]
pub mod field {
    use decode_rt::value::FieldId;

    pub const TAG: FieldId = FieldId(3);
    pub const OPNDS: [FieldId; 4] = [FieldId(4), FieldId(5), FieldId(6), FieldId(7)];
    pub const SZ: FieldId = FieldId(8);
    pub const SEGMENT: FieldId = FieldId(9);
    pub const OPND: FieldId = FieldId(10);
    pub const A: FieldId = FieldId(11);
    pub const B: FieldId = FieldId(12);
}

/// Constructor ids of [`CONS`].
#[allow(missing_docs, reason = "names mirror the constructor table")]
pub mod con {
    use decode_rt::value::ConId;

    pub const MEM: ConId = ConId(1);
    pub const REG: ConId = ConId(2);
    pub const SUM: ConId = ConId(3);
    pub const REL8: ConId = ConId(7);
    pub const IMM8: ConId = ConId(11);
    pub const IMM32: ConId = ConId(13);
    pub const ARITY: [ConId; 5] = [ConId(15), ConId(16), ConId(17), ConId(18), ConId(19)];
    /// `EAX`; the other registers follow in encoding order.
    pub const EAX: ConId = ConId(20);
    pub const DS: ConId = ConId(28);
    pub const NOP: ConId = ConId(29);
    pub const RET: ConId = ConId(30);
    pub const INC: ConId = ConId(31);
    pub const MOV: ConId = ConId(32);
    pub const JMP: ConId = ConId(33);
}

/// Returns the symbol table of this decoder.
#[must_use]
pub fn symbols() -> SymbolTable<'static> {
    SymbolTable::new(FIELDS, CONS)
}

/// Consumes one byte, returning it as a value, as a number and the new state.
fn next_byte(ctx: &mut Ctx<'_, '_>, state: Obj) -> Result<(Obj, u8, Obj), Fault> {
    let p = ctx.consume(state)?;
    let (byte, state) = ctx.arena().unpair(p)?;
    let n = ctx.arena().bitvec(byte)?.bits().to_le_bytes()[0];
    Ok((byte, n, state))
}

/// Extracts a bit field of a byte value.
fn bits(ctx: &mut Ctx<'_, '_>, byte: Obj, offset: u32, width: u32) -> Result<u8, Fault> {
    let v = ctx.arena_mut().slice(byte, offset, width)?;
    Ok(ctx.arena().case_tag(v)?.to_le_bytes()[0])
}

fn reg(ctx: &mut Ctx<'_, '_>, n: u8) -> Result<Obj, Fault> {
    let a = ctx.arena_mut();
    let name = a.alloc_tagged(ConId(con::EAX.0 + u32::from(n & 7)), Obj::NIL)?;
    a.alloc_tagged(con::REG, name)
}

fn mem32(ctx: &mut Ctx<'_, '_>, addr: Obj) -> Result<Obj, Fault> {
    let a = ctx.arena_mut();
    let sz = a.alloc_int(32)?;
    let ds = a.alloc_tagged(con::DS, Obj::NIL)?;
    let ds = a.alloc_tagged(con::REG, ds)?;
    let m = a.record_build(&[(field::SZ, sz), (field::SEGMENT, ds), (field::OPND, addr)])?;
    a.alloc_tagged(con::MEM, m)
}

/// Builds `ARITYn {tag: mnemonic, opnd1..}` and passes `pair(insn, state)` to `k`.
fn finish(
    ctx: &mut Ctx<'_, '_>,
    k: Obj,
    mnemonic: ConId,
    opnds: &[Obj],
    state: Obj,
) -> Result<Step, Fault> {
    let a = ctx.arena_mut();
    let tag = a.alloc_tagged(mnemonic, Obj::NIL)?;
    let mut fields: Vec<(FieldId, Obj)> = Vec::with_capacity(1 + opnds.len());
    fields.push((field::TAG, tag));
    fields.extend(field::OPNDS.iter().copied().zip(opnds.iter().copied()));
    let record = a.record_build(&fields)?;
    let arity = con::ARITY
        .get(opnds.len())
        .copied()
        .ok_or(Fault::BadOperandCount {
            count: opnds.len(),
        })?;
    let insn = a.alloc_tagged(arity, record)?;
    let insn = ctx.trace_value("insn", insn);
    let result = ctx.arena_mut().pair(insn, state)?;
    Ok(Step::resume(k, result))
}

fn decode(ctx: &mut Ctx<'_, '_>, _env: Obj, args: &[Obj]) -> Result<Step, Fault> {
    let &[k, state] = args else {
        return Err(ctx.arity_fault(args));
    };
    let (byte, op, state) = next_byte(ctx, state)?;
    match op {
        0x90 => finish(ctx, k, con::NOP, &[], state),
        0xc3 => finish(ctx, k, con::RET, &[], state),
        0x40..=0x47 => {
            let r = reg(ctx, op)?;
            finish(ctx, k, con::INC, &[r], state)
        }
        0xb8..=0xbf => {
            let p = ctx.consume32(state)?;
            let (imm, state) = ctx.arena().unpair(p)?;
            let imm = ctx.arena_mut().alloc_tagged(con::IMM32, imm)?;
            let r = reg(ctx, op)?;
            finish(ctx, k, con::MOV, &[r, imm], state)
        }
        0x89 => {
            let then = ctx.closure(MOV_RM_R, &[k])?;
            let modrm = ctx.closure(MODRM, &[])?;
            Step::invoke(modrm, &[then, state])
        }
        0xeb => {
            let (disp, _, state) = next_byte(ctx, state)?;
            let a = ctx.arena_mut();
            let imm = a.alloc_tagged(con::IMM8, disp)?;
            let rel = a.alloc_tagged(con::REL8, imm)?;
            finish(ctx, k, con::JMP, &[rel], state)
        }
        _ => Err(ctx.raise(byte)),
    }
}

/// Top-level decoder: `(env, k, state)`.
pub const DECODE: Label = Label::new("x86.decode", 3, decode);

/// `(env, k, state)`: decodes a ModRM byte and passes `pair(pair(rm, reg), state)` to `k`.
fn modrm(ctx: &mut Ctx<'_, '_>, _env: Obj, args: &[Obj]) -> Result<Step, Fault> {
    let &[k, state] = args else {
        return Err(ctx.arity_fault(args));
    };
    let (byte, _, state) = next_byte(ctx, state)?;
    let md = bits(ctx, byte, 6, 2)?;
    let reg_n = bits(ctx, byte, 3, 3)?;
    let rm_n = bits(ctx, byte, 0, 3)?;
    let r = reg(ctx, reg_n)?;
    let (rm, state) = match (md, rm_n) {
        (3, _) => (reg(ctx, rm_n)?, state),
        // rm 4 selects a SIB byte and (0, 5) a bare disp32; neither is supported.
        (0, 0..=3 | 6 | 7) => {
            let base = reg(ctx, rm_n)?;
            (mem32(ctx, base)?, state)
        }
        (1, 0..=3 | 5..=7) => {
            let (disp, _, state) = next_byte(ctx, state)?;
            let base = reg(ctx, rm_n)?;
            let a = ctx.arena_mut();
            let disp = a.alloc_tagged(con::IMM8, disp)?;
            let sum = a.record_build(&[(field::A, base), (field::B, disp)])?;
            let sum = a.alloc_tagged(con::SUM, sum)?;
            (mem32(ctx, sum)?, state)
        }
        _ => return Err(ctx.raise(byte)),
    };
    let a = ctx.arena_mut();
    let ops = a.pair(rm, r)?;
    let result = a.pair(ops, state)?;
    Ok(Step::resume(k, result))
}

const MODRM: Label = Label::new("x86.modrm", 3, modrm);

/// `(env[k], pair(pair(rm, reg), state))`: finishes `MOV r/m32, r32`.
fn mov_rm_r(ctx: &mut Ctx<'_, '_>, env: Obj, args: &[Obj]) -> Result<Step, Fault> {
    let &[p] = args else {
        return Err(ctx.arity_fault(args));
    };
    let k = ctx.env(env, 1)?;
    let (ops, state) = ctx.arena().unpair(p)?;
    let (rm, r) = ctx.arena().unpair(ops)?;
    finish(ctx, k, con::MOV, &[rm, r], state)
}

const MOV_RM_R: Label = Label::new("x86.mov_rm_r", 2, mov_rm_r);

/// Error disassembling a byte buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisasmError {
    /// The decoder faulted.
    Decode {
        /// Offset of the instruction being decoded.
        offset: usize,
        /// Fault and where it happened.
        info: FaultInfo,
    },
    /// The decoded instruction could not be rendered.
    Render {
        /// Offset of the instruction.
        offset: usize,
        /// Rendering fault.
        fault: Fault,
    },
}

impl fmt::Display for DisasmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode { offset, info } => write!(f, "{offset:#06x}: decode failed: {info}"),
            Self::Render { offset, fault } => write!(f, "{offset:#06x}: render failed: {fault}"),
        }
    }
}

impl core::error::Error for DisasmError {}

/// One decoded instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    /// Offset of the first byte.
    pub offset: usize,
    /// Encoded length.
    pub len: usize,
    /// Intel-syntax rendering.
    pub text: String,
}

/// Decodes and renders instructions one at a time, resetting the arena after each.
#[derive(Debug)]
pub struct Disassembler {
    rt: Runtime<'static>,
    schema: PrettySchema,
}

impl Disassembler {
    /// Creates a disassembler with default limits.
    pub fn new() -> Result<Self, NamesError> {
        Self::with_limits(Limits::default())
    }

    /// Creates a disassembler with custom limits.
    pub fn with_limits(limits: Limits) -> Result<Self, NamesError> {
        let names = symbols();
        Ok(Self {
            schema: PrettySchema::resolve(&names)?,
            rt: Runtime::new(names, limits),
        })
    }

    /// Returns the runtime.
    #[must_use]
    pub fn runtime(&self) -> &Runtime<'static> {
        &self.rt
    }

    /// Decodes the instruction at the start of `bytes`.
    pub fn decode_one(&mut self, bytes: &[u8]) -> Result<Line, DisasmError> {
        self.decode_at(bytes, 0, TraceMask::NONE, None)
    }

    /// Decodes the instruction at `offset`, reporting driver events to `trace`.
    pub fn decode_at(
        &mut self,
        bytes: &[u8],
        offset: usize,
        trace_mask: TraceMask,
        trace: Option<&mut dyn TraceSink>,
    ) -> Result<Line, DisasmError> {
        let input = bytes.get(offset..).unwrap_or_default();
        let result = match self.rt.eval_traced(DECODE, input, trace_mask, trace) {
            Ok(result) => result,
            Err(info) => {
                self.rt.reset_arena();
                return Err(DisasmError::Decode { offset, info });
            }
        };
        let rendered = self.render(result);
        self.rt.reset_arena();
        let (text, len) = rendered.map_err(|fault| DisasmError::Render { offset, fault })?;
        Ok(Line { offset, len, text })
    }

    fn render(&self, result: Obj) -> Result<(String, usize), Fault> {
        let arena = self.rt.arena();
        let (insn, state) = arena.unpair(result)?;
        let blob = arena.blob(arena.record_lookup(state, FieldId::BLOB)?)?;
        let text = pretty_string(arena, self.rt.names(), &self.schema, insn)?;
        Ok((text, blob.offset as usize))
    }

    /// Decodes every instruction in `bytes`.
    pub fn disassemble(&mut self, bytes: &[u8]) -> Result<Vec<Line>, DisasmError> {
        let mut lines = Vec::new();
        let mut offset = 0;
        while offset < bytes.len() {
            let line = self.decode_at(bytes, offset, TraceMask::NONE, None)?;
            offset += line.len.max(1);
            lines.push(line);
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(bytes: &[u8]) -> String {
        Disassembler::new().unwrap().decode_one(bytes).unwrap().text
    }

    #[test]
    fn id_constants_match_tables() {
        let names = symbols();
        assert_eq!(names.field_id("tag"), Ok(field::TAG));
        assert_eq!(names.field_id("opnd4"), Ok(field::OPNDS[3]));
        assert_eq!(names.field_id("b"), Ok(field::B));
        assert_eq!(names.con_id("REL8"), Ok(con::REL8));
        assert_eq!(names.con_id("IMM32"), Ok(con::IMM32));
        assert_eq!(names.con_id("ARITY4"), Ok(con::ARITY[4]));
        assert_eq!(names.con_id("EDI"), Ok(ConId(con::EAX.0 + 7)));
        assert_eq!(names.con_id("DS"), Ok(con::DS));
        assert_eq!(names.con_id("JMP"), Ok(con::JMP));
    }

    #[test]
    fn single_byte_instructions() {
        assert_eq!(text(&[0x90]), "NOP");
        assert_eq!(text(&[0xc3]), "RET");
        assert_eq!(text(&[0x4b]), "INC EBX");
    }

    #[test]
    fn mov_forms() {
        assert_eq!(text(&[0x89, 0x18]), "MOV DWORD PTR DS:[EAX],EBX");
        assert_eq!(text(&[0x89, 0xd8]), "MOV EAX,EBX");
        assert_eq!(text(&[0x89, 0x43, 0x10]), "MOV DWORD PTR DS:[EBX+0x10],EAX");
        assert_eq!(text(&[0xb9, 0x78, 0x56, 0x34, 0x12]), "MOV ECX,0x12345678");
    }

    #[test]
    fn relative_jump() {
        assert_eq!(text(&[0xeb, 0x10]), "JMP RELATIVE 0x10");
    }

    #[test]
    fn listing_advances_by_encoded_length() {
        let mut d = Disassembler::new().unwrap();
        let lines = d.disassemble(&[0x90, 0x89, 0x43, 0x10, 0xc3]).unwrap();
        let got: Vec<_> = lines.iter().map(|l| (l.offset, l.text.as_str())).collect();
        assert_eq!(
            got,
            [
                (0, "NOP"),
                (1, "MOV DWORD PTR DS:[EBX+0x10],EAX"),
                (4, "RET")
            ]
        );
        assert_eq!(d.runtime().stats().used, 0);
    }

    #[test]
    fn unknown_opcode_is_raised() {
        let mut d = Disassembler::new().unwrap();
        let err = d.decode_one(&[0xff]).unwrap_err();
        let DisasmError::Decode { offset, info } = err else {
            panic!("expected a decode error");
        };
        assert_eq!(offset, 0);
        assert_eq!(info.label, "x86.decode");
        assert_eq!(
            info.fault,
            Fault::Raised {
                rendered: "{tag=__BV,sz=8,vec=ff}".into()
            }
        );
    }

    #[test]
    fn truncated_input() {
        let mut d = Disassembler::new().unwrap();
        let err = d.decode_one(&[0x89]).unwrap_err();
        assert!(matches!(
            err,
            DisasmError::Decode {
                info: FaultInfo {
                    fault: Fault::EndOfInput,
                    label: "x86.modrm",
                    ..
                },
                ..
            }
        ));
    }
}
