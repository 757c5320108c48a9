// Copyright 2026 the Decode Runtime Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Object model for `decode_rt`.
//!
//! Every runtime value is a header slot holding a [`Tag`] followed by variant-specific payload
//! slots in the [`Arena`](crate::arena::Arena). Values are referenced by position:
//! - a [`HeaderRef`] (internal reference) names the header slot, and is what allocation code
//!   writes;
//! - an [`Obj`] (external reference) names the first payload slot, and is what every consumer
//!   holds.
//!
//! `Obj = HeaderRef + 1` and the inverse hold for every value. Both carry the arena epoch they
//! were issued in so that use after [`Arena::reset`](crate::arena::Arena::reset) is detected.
//!
//! Payloads are never read by reinterpretation: [`Arena::view`](crate::arena::Arena::view)
//! decodes a value into the [`Value`] enum after checking its header.

use core::fmt;

use crate::bits::BitVec;
use crate::cps::Label;

/// Number of slots occupied by a header.
pub const HEADER_SLOTS: u32 = 1;

/// Epoch shared by the statically allocated singletons.
pub(crate) const STATIC_EPOCH: u32 = 0;

/// Variant discriminator stored in every header.
///
/// The set of variants is closed; discriminants are stable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    /// Code label plus captured environment.
    Closure = 0,
    /// Fixed-width bit-vector (0–64 bits).
    BitVec = 1,
    /// Signed machine integer.
    Int = 2,
    /// Constructor tag plus one payload.
    Tagged = 3,
    /// Persistent association array.
    Record = 4,
    /// The unit value.
    Nil = 5,
    /// Non-owning view over the decode input.
    Blob = 6,
    /// Leaf of a rope.
    RopeLeaf = 7,
    /// Concatenation node of a rope.
    RopeBranch = 8,
    /// Native step function.
    Label = 9,
}

impl Tag {
    /// Returns the diagnostic name used by the structural dump.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Closure => "__CLOSURE",
            Self::BitVec => "__BV",
            Self::Int => "__INT",
            Self::Tagged => "__TAGGED",
            Self::Record => "__RECORD",
            Self::Nil => "__NIL",
            Self::Blob => "__BLOB",
            Self::RopeLeaf => "__ROPELEAF",
            Self::RopeBranch => "__ROPEBRANCH",
            Self::Label => "__LABEL",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Record field selector.
///
/// Field ids and constructor ids ([`ConId`]) are separate namespaces.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u32);

impl FieldId {
    /// Remaining decode input of a state record.
    pub const BLOB: Self = Self(0);
    /// First component of a pair.
    pub const FST: Self = Self(1);
    /// Second component of a pair.
    pub const SND: Self = Self(2);
}

/// Constructor (variant) tag of a [`Tag::Tagged`] value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConId(pub u32);

impl ConId {
    /// Reserved constructor id; generated tables start their constructors after it.
    pub const RESERVED: Self = Self(0);
}

/// Internal reference: the position of a value's header slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct HeaderRef {
    pub(crate) pos: u32,
    pub(crate) epoch: u32,
}

impl HeaderRef {
    /// Returns the external reference to this value's payload.
    #[must_use]
    #[inline]
    pub const fn wrap(self) -> Obj {
        Obj {
            pos: self.pos + HEADER_SLOTS,
            epoch: self.epoch,
        }
    }

    /// Returns the slot position of the header.
    #[must_use]
    #[inline]
    pub const fn position(self) -> u32 {
        self.pos
    }
}

/// External reference to a runtime value.
///
/// `Obj` is a plain handle: it is `Copy`, owns nothing and is only meaningful together with the
/// arena that issued it, until that arena is reset.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Obj {
    pub(crate) pos: u32,
    pub(crate) epoch: u32,
}

impl Obj {
    /// The unit value.
    pub const NIL: Self = Self::from_static(0);
    /// The 1-bit vector `1`.
    pub const TRUE: Self = Self::from_static(1);
    /// The 1-bit vector `0`.
    pub const FALSE: Self = Self::from_static(4);

    const fn from_static(header: u32) -> Self {
        HeaderRef {
            pos: header,
            epoch: STATIC_EPOCH,
        }
        .wrap()
    }

    /// Returns the internal reference to this value's header.
    #[must_use]
    #[inline]
    pub const fn unwrap(self) -> HeaderRef {
        HeaderRef {
            pos: self.pos - HEADER_SLOTS,
            epoch: self.epoch,
        }
    }

    /// Returns the boolean singleton for `b`.
    #[must_use]
    #[inline]
    pub const fn bool(b: bool) -> Self {
        if b { Self::TRUE } else { Self::FALSE }
    }

    /// Returns the slot position of the payload.
    #[must_use]
    #[inline]
    pub const fn position(self) -> u32 {
        self.pos
    }
}

/// Record view: field count and location of the field array.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RecordView {
    pub(crate) len: u32,
    pub(crate) fields: u32,
}

impl RecordView {
    /// Returns the number of fields.
    #[must_use]
    pub const fn len(self) -> usize {
        self.len as usize
    }

    /// Returns `true` if the record has no fields.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }
}

/// Closure view: environment length (including the label in slot 0) and its location.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClosureView {
    pub(crate) len: u32,
    pub(crate) env: u32,
}

impl ClosureView {
    /// Returns the number of environment slots, including the code label.
    #[must_use]
    pub const fn len(self) -> usize {
        self.len as usize
    }

    /// Returns `true` if the environment is empty (a closure without a label is malformed).
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }
}

/// Blob view: a window `[offset, offset + len)` over the decode input.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Blob {
    /// Byte offset of the first unconsumed byte.
    pub offset: u32,
    /// Number of remaining bytes.
    pub len: u32,
}

/// Rope leaf view: byte length and location of the byte slots.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LeafView {
    pub(crate) len: u32,
    pub(crate) bytes: u32,
}

impl LeafView {
    /// Returns the length in bytes.
    #[must_use]
    pub const fn len(self) -> usize {
        self.len as usize
    }

    /// Returns `true` if the leaf holds no bytes.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }
}

/// A decoded, type-checked view of one runtime value.
#[derive(Copy, Clone, Debug)]
pub enum Value {
    /// The unit value.
    Nil,
    /// Signed integer.
    Int(i64),
    /// Bit-vector.
    BitVec(BitVec),
    /// Constructor application.
    Tagged {
        /// Constructor tag.
        con: ConId,
        /// Payload.
        payload: Obj,
    },
    /// Record.
    Record(RecordView),
    /// Closure.
    Closure(ClosureView),
    /// Native step function.
    Label(Label),
    /// Input view.
    Blob(Blob),
    /// Rope leaf.
    RopeLeaf(LeafView),
    /// Rope concatenation.
    RopeBranch {
        /// Left (prefix) rope.
        left: Obj,
        /// Right (suffix) rope.
        right: Obj,
    },
}

impl Value {
    /// Returns the header tag this view was decoded from.
    #[must_use]
    pub const fn tag(&self) -> Tag {
        match self {
            Self::Nil => Tag::Nil,
            Self::Int(_) => Tag::Int,
            Self::BitVec(_) => Tag::BitVec,
            Self::Tagged { .. } => Tag::Tagged,
            Self::Record(_) => Tag::Record,
            Self::Closure(_) => Tag::Closure,
            Self::Label(_) => Tag::Label,
            Self::Blob(_) => Tag::Blob,
            Self::RopeLeaf(_) => Tag::RopeLeaf,
            Self::RopeBranch { .. } => Tag::RopeBranch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_unwrap_are_inverse() {
        let h = HeaderRef { pos: 41, epoch: 3 };
        let o = h.wrap();
        assert_eq!(o.position(), 42);
        assert_eq!(o.unwrap(), h);
        assert_eq!(o.unwrap().wrap(), o);
    }

    #[test]
    fn singletons_are_distinct() {
        assert_ne!(Obj::NIL, Obj::TRUE);
        assert_ne!(Obj::TRUE, Obj::FALSE);
        assert_eq!(Obj::bool(true), Obj::TRUE);
        assert_eq!(Obj::bool(false), Obj::FALSE);
    }
}
