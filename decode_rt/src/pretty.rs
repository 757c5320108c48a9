// Copyright 2026 the Decode Runtime Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Intel-syntax rendering of decoded instructions.
//!
//! A decoded instruction is `ARITYn {tag: <mnemonic>, opnd1: .., opndN: ..}`: a constructor
//! naming the operand count applied to a record. Operands are trees of the `MEM`, `REG`, `SUM`,
//! `SCALE`, jump-target and immediate constructors, bottoming out in bit-vectors, integers and
//! plain constructors (register names).
//!
//! The constructor and field ids the printer dispatches on are looked up by name once, into a
//! [`PrettySchema`].

use alloc::format;
use alloc::string::{String, ToString};

use crate::arena::{Arena, wrong_kind};
use crate::fault::Fault;
use crate::names::{NamesError, SymbolTable};
use crate::value::{ConId, FieldId, Obj, Tag, Value};

/// Constructor and field ids the pretty-printer dispatches on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PrettySchema {
    mem: ConId,
    reg: ConId,
    sum: ConId,
    scale: ConId,
    near_abs: ConId,
    far_abs: ConId,
    rel: [ConId; 4],
    imm: [ConId; 4],
    arity0: ConId,
    tag: FieldId,
    opnds: [FieldId; 4],
    sz: FieldId,
    segment: FieldId,
    opnd: FieldId,
    a: FieldId,
    b: FieldId,
    imm_field: FieldId,
}

impl PrettySchema {
    /// Looks up every name the printer needs in `names`.
    pub fn resolve(names: &SymbolTable<'_>) -> Result<Self, NamesError> {
        let con = |n| names.con_id(n);
        let field = |n| names.field_id(n);
        Ok(Self {
            mem: con("MEM")?,
            reg: con("REG")?,
            sum: con("SUM")?,
            scale: con("SCALE")?,
            near_abs: con("NEARABS")?,
            far_abs: con("FARABS")?,
            rel: [con("REL8")?, con("REL16")?, con("REL32")?, con("REL64")?],
            imm: [con("IMM8")?, con("IMM16")?, con("IMM32")?, con("IMM64")?],
            arity0: con("ARITY0")?,
            tag: field("tag")?,
            opnds: [
                field("opnd1")?,
                field("opnd2")?,
                field("opnd3")?,
                field("opnd4")?,
            ],
            sz: field("sz")?,
            segment: field("segment")?,
            opnd: field("opnd")?,
            a: field("a")?,
            b: field("b")?,
            imm_field: field("imm")?,
        })
    }
}

struct Printer<'a> {
    arena: &'a Arena,
    names: &'a SymbolTable<'a>,
    schema: &'a PrettySchema,
    out: String,
}

impl Printer<'_> {
    fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn field(&self, record: Obj, field: FieldId) -> Result<Obj, Fault> {
        self.arena.record_lookup(record, field)
    }

    fn scalar(&self, obj: Obj) -> Result<i64, Fault> {
        match self.arena.view(obj)? {
            Value::Int(i) => Ok(i),
            Value::BitVec(bv) => Ok(bv.zx()),
            v => Err(wrong_kind(Tag::Int, &v)),
        }
    }

    fn instruction(&mut self, insn: Obj) -> Result<(), Fault> {
        let Value::Tagged { con, payload } = self.arena.view(insn)? else {
            return Err(Fault::InvalidInstruction);
        };
        let mnemonic = self.arena.case_tag(self.field(payload, self.schema.tag)?)?;
        let mnemonic = u32::try_from(mnemonic)
            .map(|c| self.names.con_name(ConId(c)))
            .map_err(|_| Fault::InvalidInstruction)?;
        self.push(mnemonic);
        if con == self.schema.arity0 {
            return Ok(());
        }
        self.push(" ");
        self.operand(payload)
    }

    fn operand(&mut self, opnd: Obj) -> Result<(), Fault> {
        match self.arena.view(opnd)? {
            Value::Tagged { con, payload } => self.constructor(con, payload),
            Value::Record(_) => self.operand_list(opnd),
            Value::BitVec(bv) => {
                self.push(&format!("{:#x}", bv.bits()));
                Ok(())
            }
            Value::Int(i) => {
                self.push(&i.to_string());
                Ok(())
            }
            v => Err(Fault::InvalidOperand { tag: v.tag() }),
        }
    }

    fn constructor(&mut self, con: ConId, payload: Obj) -> Result<(), Fault> {
        let s = self.schema;
        if con == s.mem {
            self.mem(payload)
        } else if con == s.reg || s.imm.contains(&con) {
            self.operand(payload)
        } else if con == s.sum {
            self.operand(self.field(payload, s.a)?)?;
            self.push("+");
            self.operand(self.field(payload, s.b)?)
        } else if con == s.scale {
            let factor = self.arena.case_tag(self.field(payload, s.imm_field)?)?;
            match factor {
                0 => {}
                1 => self.push("2*"),
                2 => self.push("4*"),
                3 => self.push("8*"),
                _ => return Err(Fault::BadScale { factor }),
            }
            self.operand(self.field(payload, s.opnd)?)
        } else if con == s.near_abs {
            self.push("NEAR ");
            self.operand(payload)
        } else if con == s.far_abs {
            self.push("FAR ");
            self.operand(payload)
        } else if s.rel.contains(&con) {
            self.push("RELATIVE ");
            self.operand(payload)
        } else {
            let name = self.names.con_name(con);
            self.push(name);
            if self.arena.is_nil(payload)? {
                return Ok(());
            }
            self.push(",");
            self.operand(payload)
        }
    }

    fn mem(&mut self, mem: Obj) -> Result<(), Fault> {
        let s = self.schema;
        match self.scalar(self.field(mem, s.sz)?)? {
            8 => self.push("BYTE PTR "),
            16 => self.push("WORD PTR "),
            32 => self.push("DWORD PTR "),
            64 => self.push("QWORD PTR "),
            128 => self.push("DQWORD PTR "),
            n => self.push(&format!("PTR({n}) ")),
        }
        self.operand(self.field(mem, s.segment)?)?;
        self.push(":[");
        self.operand(self.field(mem, s.opnd)?)?;
        self.push("]");
        Ok(())
    }

    fn operand_list(&mut self, record: Obj) -> Result<(), Fault> {
        let len = self.arena.record_len(record)?;
        let count = if self.arena.record_contains(record, self.schema.tag)? {
            len - 1
        } else {
            len
        };
        let opnds = self.schema.opnds;
        if !(1..=opnds.len()).contains(&count) {
            return Err(Fault::BadOperandCount { count });
        }
        for (i, field) in opnds[..count].iter().enumerate() {
            if i > 0 {
                self.push(",");
            }
            self.operand(self.field(record, *field)?)?;
        }
        Ok(())
    }
}

/// Renders a decoded instruction.
pub fn pretty_string(
    arena: &Arena,
    names: &SymbolTable<'_>,
    schema: &PrettySchema,
    insn: Obj,
) -> Result<String, Fault> {
    let mut p = Printer {
        arena,
        names,
        schema,
        out: String::new(),
    };
    p.instruction(insn)?;
    Ok(p.out)
}
