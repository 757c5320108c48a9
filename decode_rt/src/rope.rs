// Copyright 2026 the Decode Runtime Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ropes: arena-resident strings built by concatenation.
//!
//! Decoders build textual output without copying by joining leaves into branches; text is only
//! materialized when a rope is flattened.

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::arena::{Arena, Slot, pos32, wrong_kind};
use crate::fault::Fault;
use crate::value::{LeafView, Obj, Tag, Value};

const BYTES_PER_SLOT: usize = 8;

impl Arena {
    /// Allocates a rope leaf holding `s`.
    pub fn alloc_rope(&mut self, s: &str) -> Result<Obj, Fault> {
        let bytes = s.as_bytes();
        let n = bytes.len().div_ceil(BYTES_PER_SLOT);
        let at = self.alloc(n)?;
        for (i, chunk) in bytes.chunks(BYTES_PER_SLOT).enumerate() {
            let mut b = [0_u8; BYTES_PER_SLOT];
            b[..chunk.len()].copy_from_slice(chunk);
            self.write(at + i, Slot::Bytes(b));
        }
        self.alloc_object(
            Tag::RopeLeaf,
            &[
                Slot::Word(bytes.len() as u64),
                Slot::Word(u64::from(pos32(at))),
            ],
        )
    }

    /// Concatenates two ropes.
    pub fn rope_concat(&mut self, left: Obj, right: Obj) -> Result<Obj, Fault> {
        self.check_rope(left)?;
        self.check_rope(right)?;
        self.alloc_object(Tag::RopeBranch, &[Slot::Ref(left), Slot::Ref(right)])
    }

    /// Renders an integer as a decimal rope.
    pub fn show_int(&mut self, obj: Obj) -> Result<Obj, Fault> {
        let s = format!("{}", self.int(obj)?);
        self.alloc_rope(&s)
    }

    /// Renders a bit-vector as a hexadecimal rope (`0x..`).
    pub fn show_bitvec(&mut self, obj: Obj) -> Result<Obj, Fault> {
        let s = format!("{:#x}", self.bitvec(obj)?.bits());
        self.alloc_rope(&s)
    }

    /// Returns the length of a rope in bytes.
    pub fn rope_len(&self, rope: Obj) -> Result<usize, Fault> {
        let mut len = 0;
        self.walk_rope(rope, |_, leaf| {
            len += leaf.len();
            true
        })?;
        Ok(len)
    }

    /// Copies the contents of `rope` into `buf`, truncating if `buf` is too short.
    ///
    /// Returns the number of bytes written.
    pub fn flatten_rope(&self, rope: Obj, buf: &mut [u8]) -> Result<usize, Fault> {
        let mut written = 0;
        let mut err = None;
        self.walk_rope(rope, |arena, leaf| {
            for i in 0..leaf.len().div_ceil(BYTES_PER_SLOT) {
                let chunk = match arena.bytes_at(leaf.bytes as usize + i) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        err = Some(e);
                        return false;
                    }
                };
                let take = (leaf.len() - i * BYTES_PER_SLOT)
                    .min(BYTES_PER_SLOT)
                    .min(buf.len() - written);
                buf[written..written + take].copy_from_slice(&chunk[..take]);
                written += take;
                if written == buf.len() {
                    return false;
                }
            }
            true
        })?;
        match err {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }

    /// Returns the contents of `rope` as a string.
    pub fn rope_string(&self, rope: Obj) -> Result<String, Fault> {
        let mut buf = vec![0_u8; self.rope_len(rope)?];
        let n = self.flatten_rope(rope, &mut buf)?;
        buf.truncate(n);
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn check_rope(&self, obj: Obj) -> Result<(), Fault> {
        match self.view(obj)? {
            Value::RopeLeaf(_) | Value::RopeBranch { .. } => Ok(()),
            v => Err(wrong_kind(Tag::RopeLeaf, &v)),
        }
    }

    /// Visits the leaves of `rope` left to right until `visit` returns `false`.
    fn walk_rope(
        &self,
        rope: Obj,
        mut visit: impl FnMut(&Self, LeafView) -> bool,
    ) -> Result<(), Fault> {
        let mut stack: Vec<Obj> = vec![rope];
        while let Some(node) = stack.pop() {
            match self.view(node)? {
                Value::RopeLeaf(leaf) => {
                    if !visit(self, leaf) {
                        break;
                    }
                }
                Value::RopeBranch { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
                v => return Err(wrong_kind(Tag::RopeLeaf, &v)),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitVec;

    #[test]
    fn concat_preserves_order() {
        let mut a = Arena::with_capacity(64);
        let x = a.alloc_rope("MOV ").unwrap();
        let y = a.alloc_rope("EAX,").unwrap();
        let z = a.alloc_rope("a longer leaf").unwrap();
        let xy = a.rope_concat(x, y).unwrap();
        let r = a.rope_concat(xy, z).unwrap();
        assert_eq!(a.rope_len(r), Ok(21));
        assert_eq!(a.rope_string(r).as_deref(), Ok("MOV EAX,a longer leaf"));
    }

    #[test]
    fn flatten_truncates() {
        let mut a = Arena::with_capacity(64);
        let x = a.alloc_rope("abcdefghij").unwrap();
        let mut buf = [0_u8; 4];
        assert_eq!(a.flatten_rope(x, &mut buf), Ok(4));
        assert_eq!(&buf, b"abcd");
    }

    #[test]
    fn show_renders_scalars() {
        let mut a = Arena::with_capacity(64);
        let i = a.alloc_int(-12).unwrap();
        let s = a.show_int(i).unwrap();
        assert_eq!(a.rope_string(s).as_deref(), Ok("-12"));
        let v = a.alloc_bitvec(BitVec::byte(0x4b)).unwrap();
        let s = a.show_bitvec(v).unwrap();
        assert_eq!(a.rope_string(s).as_deref(), Ok("0x4b"));
    }

    #[test]
    fn empty_leaf() {
        let mut a = Arena::with_capacity(8);
        let e = a.alloc_rope("").unwrap();
        assert_eq!(a.rope_len(e), Ok(0));
        assert_eq!(a.rope_string(e).as_deref(), Ok(""));
        assert_eq!(
            a.rope_concat(e, Obj::NIL),
            Err(Fault::WrongKind {
                expected: Tag::RopeLeaf,
                actual: Tag::Nil
            })
        );
    }
}
