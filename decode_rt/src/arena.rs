// Copyright 2026 the Decode Runtime Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-capacity bump arena for runtime values.
//!
//! The arena is a single buffer of slots. The first [`STATIC_SLOTS`] hold the `Nil`, `true` and
//! `false` singletons; they are written once at construction and survive every reset. The rest is
//! the bump region: allocation moves `top` downwards and never reuses memory, and
//! [`Arena::reset`] moves `top` back to the end of the buffer, invalidating everything allocated
//! since the previous reset.
//!
//! Invalidation is enforced with an epoch counter: every reference carries the epoch it was issued
//! in, and accessors reject references from an older epoch with [`Fault::StaleRef`]. Old slot
//! contents are left in place until overwritten.

use alloc::vec::Vec;
use core::fmt;

use crate::bits::BitVec;
use crate::cps::Label;
use crate::fault::Fault;
use crate::value::{
    Blob, ClosureView, ConId, HeaderRef, LeafView, Obj, RecordView, STATIC_EPOCH, Tag, Value,
};

/// Default number of bump-region slots.
pub const DEFAULT_ARENA_SLOTS: usize = 4 * 1024;

/// Number of slots reserved for the singletons.
pub const STATIC_SLOTS: usize = 7;

/// Largest bump region an arena can address.
pub const MAX_ARENA_SLOTS: usize = u32::MAX as usize - STATIC_SLOTS;

/// One arena cell, as wide as its largest variant (an inline [`Label`]).
#[derive(Copy, Clone, Debug)]
pub(crate) enum Slot {
    /// Never written in the current buffer.
    Garbage,
    Header(Tag),
    Word(u64),
    Ref(Obj),
    Label(Label),
    Bytes([u8; 8]),
}

const STATIC_REGION: [Slot; STATIC_SLOTS] = [
    Slot::Header(Tag::Nil),
    Slot::Header(Tag::BitVec),
    Slot::Word(1),
    Slot::Word(1),
    Slot::Header(Tag::BitVec),
    Slot::Word(1),
    Slot::Word(0),
];

pub(crate) fn pos32(pos: usize) -> u32 {
    u32::try_from(pos).unwrap_or(u32::MAX)
}

/// Usage report for an [`Arena`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ArenaStats {
    /// Bump-region capacity in slots.
    pub capacity: usize,
    /// Slots allocated since the last reset.
    pub used: usize,
    /// Most slots ever in use at once.
    pub high_water: usize,
    /// Current epoch.
    pub epoch: u32,
}

impl ArenaStats {
    /// Returns `used` as a percentage of `capacity`.
    #[must_use]
    pub fn percent_used(&self) -> usize {
        if self.capacity == 0 {
            return 100;
        }
        self.used * 100 / self.capacity
    }
}

impl fmt::Display for ArenaStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arena: capacity={} used={} ({}%) high-water={} epoch={} slot-size={}",
            self.capacity,
            self.used,
            self.percent_used(),
            self.high_water,
            self.epoch,
            size_of::<Slot>()
        )
    }
}

/// Bump-down arena holding every value of a decode.
pub struct Arena {
    slots: Vec<Slot>,
    top: usize,
    low_water: usize,
    epoch: u32,
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity())
            .field("used", &self.used())
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_ARENA_SLOTS)
    }
}

impl Arena {
    /// Creates an arena with `capacity` bump-region slots (clamped to [`MAX_ARENA_SLOTS`]).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let len = STATIC_SLOTS + capacity.min(MAX_ARENA_SLOTS);
        let mut slots = Vec::with_capacity(len);
        slots.extend_from_slice(&STATIC_REGION);
        slots.resize(len, Slot::Garbage);
        Self {
            slots,
            top: len,
            low_water: len,
            epoch: STATIC_EPOCH + 1,
        }
    }

    /// Returns the bump-region capacity in slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len() - STATIC_SLOTS
    }

    /// Returns the number of slots allocated since the last reset.
    #[must_use]
    pub fn used(&self) -> usize {
        self.slots.len() - self.top
    }

    /// Returns the number of slots still available.
    #[must_use]
    pub fn available(&self) -> usize {
        self.top - STATIC_SLOTS
    }

    /// Returns the current epoch.
    #[must_use]
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Returns a usage report.
    #[must_use]
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            capacity: self.capacity(),
            used: self.used(),
            high_water: self.slots.len() - self.low_water,
            epoch: self.epoch,
        }
    }

    /// Releases every value allocated since the last reset.
    ///
    /// References issued before the reset fail with [`Fault::StaleRef`] afterwards. The
    /// singletons are unaffected.
    pub fn reset(&mut self) {
        self.top = self.slots.len();
        self.epoch = match self.epoch.wrapping_add(1) {
            STATIC_EPOCH => STATIC_EPOCH + 1,
            e => e,
        };
    }

    /// Reserves `n` slots and returns the position of the first one.
    pub(crate) fn alloc(&mut self, n: usize) -> Result<usize, Fault> {
        let available = self.available();
        if n > available {
            return Err(Fault::ArenaExhausted {
                requested: n,
                available,
            });
        }
        self.top -= n;
        self.low_water = self.low_water.min(self.top);
        Ok(self.top)
    }

    /// Allocates a header for `tag` followed by `payload`.
    pub(crate) fn alloc_object(&mut self, tag: Tag, payload: &[Slot]) -> Result<Obj, Fault> {
        let at = self.alloc(1 + payload.len())?;
        self.slots[at] = Slot::Header(tag);
        self.slots[at + 1..at + 1 + payload.len()].copy_from_slice(payload);
        Ok(self.header_ref(at).wrap())
    }

    pub(crate) fn header_ref(&self, pos: usize) -> HeaderRef {
        HeaderRef {
            pos: pos32(pos),
            epoch: self.epoch,
        }
    }

    pub(crate) fn write(&mut self, pos: usize, slot: Slot) {
        self.slots[pos] = slot;
    }

    pub(crate) fn copy_slots(&mut self, src: usize, len: usize, dst: usize) {
        self.slots.copy_within(src..src + len, dst);
    }

    pub(crate) fn slot(&self, pos: usize) -> Result<Slot, Fault> {
        self.slots.get(pos).copied().ok_or(Fault::BadHeader)
    }

    pub(crate) fn word(&self, pos: usize) -> Result<u64, Fault> {
        match self.slot(pos)? {
            Slot::Word(w) => Ok(w),
            _ => Err(Fault::BadHeader),
        }
    }

    pub(crate) fn word32(&self, pos: usize) -> Result<u32, Fault> {
        u32::try_from(self.word(pos)?).map_err(|_| Fault::BadHeader)
    }

    pub(crate) fn obj_at(&self, pos: usize) -> Result<Obj, Fault> {
        match self.slot(pos)? {
            Slot::Ref(o) => Ok(o),
            _ => Err(Fault::BadHeader),
        }
    }

    pub(crate) fn bytes_at(&self, pos: usize) -> Result<[u8; 8], Fault> {
        match self.slot(pos)? {
            Slot::Bytes(b) => Ok(b),
            _ => Err(Fault::BadHeader),
        }
    }

    fn resolve(&self, header: HeaderRef) -> Result<usize, Fault> {
        let pos = header.pos as usize;
        if pos < STATIC_SLOTS {
            return Ok(pos);
        }
        if header.epoch != self.epoch {
            return Err(Fault::StaleRef);
        }
        if pos < self.top || pos >= self.slots.len() {
            return Err(Fault::BadHeader);
        }
        Ok(pos)
    }

    /// Returns the tag written in the header at `header`.
    pub fn header_tag(&self, header: HeaderRef) -> Result<Tag, Fault> {
        match self.slot(self.resolve(header)?)? {
            Slot::Header(tag) => Ok(tag),
            _ => Err(Fault::BadHeader),
        }
    }

    /// Returns the tag of `obj`.
    pub fn tag(&self, obj: Obj) -> Result<Tag, Fault> {
        self.header_tag(obj.unwrap())
    }

    /// Decodes `obj` into a typed view.
    pub fn view(&self, obj: Obj) -> Result<Value, Fault> {
        let tag = self.tag(obj)?;
        let p = obj.pos as usize;
        Ok(match tag {
            Tag::Nil => Value::Nil,
            Tag::Int => Value::Int(self.word(p)? as i64),
            Tag::BitVec => {
                let width = self.word32(p)?;
                Value::BitVec(BitVec::new(width, self.word(p + 1)?)?)
            }
            Tag::Tagged => Value::Tagged {
                con: ConId(self.word32(p)?),
                payload: self.obj_at(p + 1)?,
            },
            Tag::Record => Value::Record(RecordView {
                len: self.word32(p)?,
                fields: self.word32(p + 1)?,
            }),
            Tag::Closure => Value::Closure(ClosureView {
                len: self.word32(p)?,
                env: self.word32(p + 1)?,
            }),
            Tag::Label => match self.slot(p)? {
                Slot::Label(label) => Value::Label(label),
                _ => return Err(Fault::BadHeader),
            },
            Tag::Blob => Value::Blob(Blob {
                offset: self.word32(p)?,
                len: self.word32(p + 1)?,
            }),
            Tag::RopeLeaf => Value::RopeLeaf(LeafView {
                len: self.word32(p)?,
                bytes: self.word32(p + 1)?,
            }),
            Tag::RopeBranch => Value::RopeBranch {
                left: self.obj_at(p)?,
                right: self.obj_at(p + 1)?,
            },
        })
    }

    /// Allocates an integer.
    pub fn alloc_int(&mut self, value: i64) -> Result<Obj, Fault> {
        self.alloc_object(Tag::Int, &[Slot::Word(value as u64)])
    }

    /// Returns the integer stored in `obj`.
    pub fn int(&self, obj: Obj) -> Result<i64, Fault> {
        match self.view(obj)? {
            Value::Int(i) => Ok(i),
            v => Err(wrong_kind(Tag::Int, &v)),
        }
    }

    /// Allocates a constructor application.
    pub fn alloc_tagged(&mut self, con: ConId, payload: Obj) -> Result<Obj, Fault> {
        self.alloc_object(
            Tag::Tagged,
            &[Slot::Word(u64::from(con.0)), Slot::Ref(payload)],
        )
    }

    /// Returns the constructor and payload of `obj`.
    pub fn tagged(&self, obj: Obj) -> Result<(ConId, Obj), Fault> {
        match self.view(obj)? {
            Value::Tagged { con, payload } => Ok((con, payload)),
            v => Err(wrong_kind(Tag::Tagged, &v)),
        }
    }

    /// Allocates a label value.
    pub fn alloc_label(&mut self, label: Label) -> Result<Obj, Fault> {
        self.alloc_object(Tag::Label, &[Slot::Label(label)])
    }

    /// Returns the label stored in `obj`.
    pub fn label(&self, obj: Obj) -> Result<Label, Fault> {
        match self.view(obj)? {
            Value::Label(label) => Ok(label),
            v => Err(wrong_kind(Tag::Label, &v)),
        }
    }

    /// Allocates a closure whose environment is `label` followed by `captures`.
    ///
    /// Captured references are copied at creation time and never change afterwards.
    pub fn alloc_closure(&mut self, label: Obj, captures: &[Obj]) -> Result<Obj, Fault> {
        let len = 1 + captures.len();
        let env = self.alloc(len)?;
        self.slots[env] = Slot::Ref(label);
        for (i, c) in captures.iter().enumerate() {
            self.slots[env + 1 + i] = Slot::Ref(*c);
        }
        self.alloc_object(
            Tag::Closure,
            &[Slot::Word(len as u64), Slot::Word(u64::from(pos32(env)))],
        )
    }

    /// Returns environment slot `index` of `closure`; slot 0 is the code label.
    pub fn closure_ref(&self, closure: Obj, index: usize) -> Result<Obj, Fault> {
        let view = match self.view(closure)? {
            Value::Closure(view) => view,
            v => return Err(wrong_kind(Tag::Closure, &v)),
        };
        if index >= view.len() {
            return Err(Fault::EnvIndex {
                index,
                len: view.len(),
            });
        }
        self.obj_at(view.env as usize + index)
    }

    /// Returns the code label of `closure`.
    pub fn closure_label(&self, closure: Obj) -> Result<Label, Fault> {
        self.label(self.closure_ref(closure, 0)?)
    }

    /// Allocates an input view.
    pub fn alloc_blob(&mut self, blob: Blob) -> Result<Obj, Fault> {
        self.alloc_object(
            Tag::Blob,
            &[
                Slot::Word(u64::from(blob.offset)),
                Slot::Word(u64::from(blob.len)),
            ],
        )
    }

    /// Returns the input view stored in `obj`.
    pub fn blob(&self, obj: Obj) -> Result<Blob, Fault> {
        match self.view(obj)? {
            Value::Blob(blob) => Ok(blob),
            v => Err(wrong_kind(Tag::Blob, &v)),
        }
    }
}

pub(crate) fn wrong_kind(expected: Tag, actual: &Value) -> Fault {
    Fault::WrongKind {
        expected,
        actual: actual.tag(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singletons_have_expected_layout() {
        let a = Arena::with_capacity(0);
        assert!(matches!(a.view(Obj::NIL), Ok(Value::Nil)));
        assert_eq!(a.tag(Obj::TRUE), Ok(Tag::BitVec));
        let Ok(Value::BitVec(t)) = a.view(Obj::TRUE) else {
            panic!("true is not a bit-vector");
        };
        assert_eq!((t.width(), t.bits()), (1, 1));
        let Ok(Value::BitVec(f)) = a.view(Obj::FALSE) else {
            panic!("false is not a bit-vector");
        };
        assert_eq!((f.width(), f.bits()), (1, 0));
    }

    #[test]
    fn allocation_bumps_down() {
        let mut a = Arena::with_capacity(16);
        let x = a.alloc_int(1).unwrap();
        let y = a.alloc_int(2).unwrap();
        assert!(y.position() < x.position());
        assert_eq!(a.used(), 4);
        assert_eq!(a.int(x), Ok(1));
        assert_eq!(a.int(y), Ok(2));
    }

    #[test]
    fn unwrap_recovers_allocated_tag() {
        let mut a = Arena::with_capacity(16);
        let o = a.alloc_tagged(ConId(7), Obj::NIL).unwrap();
        let h = o.unwrap();
        assert_eq!(h.wrap(), o);
        assert_eq!(a.header_tag(h), Ok(Tag::Tagged));
    }

    #[test]
    fn exhaustion_is_reported() {
        let mut a = Arena::with_capacity(3);
        a.alloc_int(1).unwrap();
        assert_eq!(
            a.alloc_int(2),
            Err(Fault::ArenaExhausted {
                requested: 2,
                available: 1
            })
        );
    }

    #[test]
    fn reset_invalidates_references() {
        let mut a = Arena::with_capacity(8);
        let o = a.alloc_int(5).unwrap();
        a.reset();
        assert_eq!(a.used(), 0);
        assert_eq!(a.int(o), Err(Fault::StaleRef));
        assert!(matches!(a.view(Obj::NIL), Ok(Value::Nil)));
        assert_eq!(a.stats().high_water, 2);
    }

    #[test]
    fn wrong_accessor_is_a_fault() {
        let mut a = Arena::with_capacity(8);
        let o = a.alloc_int(5).unwrap();
        assert_eq!(
            a.blob(o),
            Err(Fault::WrongKind {
                expected: Tag::Blob,
                actual: Tag::Int
            })
        );
    }

    #[test]
    fn closure_env_starts_with_label() {
        let mut a = Arena::with_capacity(16);
        let l = a.alloc_label(crate::cps::HALT).unwrap();
        let x = a.alloc_int(3).unwrap();
        let c = a.alloc_closure(l, &[x]).unwrap();
        assert_eq!(a.closure_ref(c, 0), Ok(l));
        assert_eq!(a.closure_ref(c, 1), Ok(x));
        assert_eq!(a.closure_label(c).map(|l| l.name()), Ok("halt"));
        assert_eq!(
            a.closure_ref(c, 2),
            Err(Fault::EnvIndex { index: 2, len: 2 })
        );
    }
}
