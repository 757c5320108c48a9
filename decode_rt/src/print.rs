// Copyright 2026 the Decode Runtime Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural dump of runtime values.
//!
//! The dump shows every value as `{tag=<variant>,...}` with constructor and field names taken
//! from a [`SymbolTable`]. It is the format used for diagnostics, raised values and value traces.

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::arena::Arena;
use crate::fault::Fault;
use crate::names::SymbolTable;
use crate::value::{FieldId, Obj, Tag, Value};

/// `Display` adapter that dumps a value.
#[derive(Copy, Clone, Debug)]
pub struct Dump<'a> {
    arena: &'a Arena,
    names: &'a SymbolTable<'a>,
    obj: Obj,
}

impl<'a> Dump<'a> {
    /// Creates a dump of `obj`.
    #[must_use]
    pub fn new(arena: &'a Arena, names: &'a SymbolTable<'a>, obj: Obj) -> Self {
        Self { arena, names, obj }
    }
}

/// Pending output of a dump. Nested values are rendered from an explicit stack so arbitrarily
/// deep values never grow the native stack.
enum Item {
    Obj(Obj),
    Lit(&'static str),
    FieldName(FieldId),
    Fault(Fault),
}

impl Dump<'_> {
    /// Writes the opening of `obj` and pushes whatever follows it onto `stack`.
    fn open(&self, f: &mut fmt::Formatter<'_>, obj: Obj, stack: &mut Vec<Item>) -> fmt::Result {
        let value = match self.arena.view(obj) {
            Ok(v) => v,
            Err(fault) => return write!(f, "{{tag=<invalid>,fault={fault}}}"),
        };
        match value {
            Value::Closure(c) => write!(f, "{{tag={},sz={},env=..}}", Tag::Closure, c.len()),
            Value::Int(i) => write!(f, "{{tag={},value={i}}}", Tag::Int),
            Value::Tagged { con, payload } => {
                match self.names.con(con) {
                    Some(name) => write!(f, "{{tag={name},payload=")?,
                    None => write!(f, "{{tag=<unknown:{}>,payload=", con.0)?,
                }
                stack.push(Item::Lit("}"));
                stack.push(Item::Obj(payload));
                Ok(())
            }
            Value::Record(r) => {
                write!(f, "{{tag={},sz={},", Tag::Record, r.len())?;
                let fields = match self.arena.record_fields(obj) {
                    Ok(fields) => fields,
                    Err(fault) => return write!(f, "fault={fault}}}"),
                };
                let mut items = Vec::with_capacity(3 * r.len() + 1);
                for (i, field) in fields.enumerate() {
                    if i > 0 {
                        items.push(Item::Lit(","));
                    }
                    match field {
                        Ok((id, v)) => {
                            items.push(Item::FieldName(id));
                            items.push(Item::Obj(v));
                        }
                        Err(fault) => {
                            items.push(Item::Fault(fault));
                            break;
                        }
                    }
                }
                items.push(Item::Lit("}"));
                stack.extend(items.into_iter().rev());
                Ok(())
            }
            Value::Label(l) => write!(f, "{{tag={},f={}}}", Tag::Label, l.name()),
            Value::Blob(b) => write!(
                f,
                "{{tag={},sz={},offset={}}}",
                Tag::Blob,
                b.len,
                b.offset
            ),
            Value::BitVec(bv) => write!(
                f,
                "{{tag={},sz={},vec={:x}}}",
                Tag::BitVec,
                bv.width(),
                bv.bits()
            ),
            Value::Nil => write!(f, "{{tag={}}}", Tag::Nil),
            Value::RopeLeaf(leaf) => write!(f, "{{tag={},sz={}}}", Tag::RopeLeaf, leaf.len()),
            Value::RopeBranch { left, right } => {
                write!(f, "{{tag={},left=", Tag::RopeBranch)?;
                stack.push(Item::Lit("}"));
                stack.push(Item::Obj(right));
                stack.push(Item::Lit(",right="));
                stack.push(Item::Obj(left));
                Ok(())
            }
        }
    }
}

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![Item::Obj(self.obj)];
        while let Some(item) = stack.pop() {
            match item {
                Item::Obj(obj) => self.open(f, obj, &mut stack)?,
                Item::Lit(s) => f.write_str(s)?,
                Item::FieldName(id) => match self.names.field(id) {
                    Some(name) => write!(f, "{name}=")?,
                    None => write!(f, "<unknown:{}>=", id.0)?,
                },
                Item::Fault(fault) => write!(f, "fault={fault}")?,
            }
        }
        Ok(())
    }
}

/// Renders `obj` into a new string.
#[must_use]
pub fn dump_string(arena: &Arena, names: &SymbolTable<'_>, obj: Obj) -> String {
    Dump::new(arena, names, obj).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitVec;
    use crate::value::ConId;

    const FIELDS: &[&str] = &["blob", "1", "2"];
    const CONS: &[&str] = &["", "SOME"];

    #[test]
    fn dumps_scalars() {
        let mut a = Arena::with_capacity(32);
        let names = SymbolTable::new(FIELDS, CONS);
        let i = a.alloc_int(-3).unwrap();
        assert_eq!(dump_string(&a, &names, i), "{tag=__INT,value=-3}");
        let v = a.alloc_bitvec(BitVec::byte(0x4b)).unwrap();
        assert_eq!(dump_string(&a, &names, v), "{tag=__BV,sz=8,vec=4b}");
        assert_eq!(dump_string(&a, &names, Obj::NIL), "{tag=__NIL}");
    }

    #[test]
    fn dumps_nested_values() {
        let mut a = Arena::with_capacity(64);
        let names = SymbolTable::new(FIELDS, CONS);
        let some = a.alloc_tagged(ConId(1), Obj::NIL).unwrap();
        let odd = a.alloc_tagged(ConId(7), Obj::NIL).unwrap();
        let p = a.pair(some, odd).unwrap();
        assert_eq!(
            Dump::new(&a, &names, p).to_string(),
            "{tag=__RECORD,sz=2,1={tag=SOME,payload={tag=__NIL}},\
             2={tag=<unknown:7>,payload={tag=__NIL}}}"
        );
        let r = a.record_build(&[(FieldId(9), Obj::NIL)]).unwrap();
        assert_eq!(
            dump_string(&a, &names, r),
            "{tag=__RECORD,sz=1,<unknown:9>={tag=__NIL}}"
        );
    }

    #[test]
    fn stale_references_are_reported_not_read() {
        let mut a = Arena::with_capacity(8);
        let names = SymbolTable::default();
        let i = a.alloc_int(1).unwrap();
        a.reset();
        assert!(dump_string(&a, &names, i).starts_with("{tag=<invalid>"));
    }

    #[test]
    fn deeply_nested_values_render_iteratively() {
        const DEPTH: usize = 100_000;
        let mut a = Arena::with_capacity(1 << 20);
        let names = SymbolTable::new(FIELDS, CONS);
        let mut o = Obj::NIL;
        for _ in 0..DEPTH {
            o = a.alloc_tagged(ConId(1), o).unwrap();
        }
        let out = dump_string(&a, &names, o);
        assert!(out.starts_with("{tag=SOME,payload={tag=SOME,payload="));
        assert_eq!(out.matches("SOME").count(), DEPTH);
        assert!(out.ends_with("{tag=__NIL}}}}"));
    }

    #[test]
    fn dumps_rope_branches() {
        let mut a = Arena::with_capacity(64);
        let names = SymbolTable::new(FIELDS, CONS);
        let l = a.alloc_rope("ab").unwrap();
        let r = a.alloc_rope("c").unwrap();
        let b = a.rope_concat(l, r).unwrap();
        assert_eq!(
            dump_string(&a, &names, b),
            "{tag=__ROPEBRANCH,left={tag=__ROPELEAF,sz=2},right={tag=__ROPELEAF,sz=1}}"
        );
    }
}
