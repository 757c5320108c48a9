// Copyright 2026 the Decode Runtime Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-width bit-vectors and the scalar primitives generated decoders use.
//!
//! [`BitVec`] is the pure value type; the `Arena` methods in this module read their operands from
//! runtime values and allocate the result, which is what generated code calls.

use core::fmt;

use crate::arena::{Arena, Slot, wrong_kind};
use crate::fault::Fault;
use crate::value::{Obj, Tag, Value};

/// Widest representable bit-vector.
pub const MAX_WIDTH: u32 = 64;

/// Returns a mask of the low `width` bits.
#[must_use]
#[inline]
pub const fn mask(width: u32) -> u64 {
    if width >= MAX_WIDTH {
        u64::MAX
    } else {
        (1_u64 << width) - 1
    }
}

/// A bit-vector of 0–64 bits.
///
/// Bits above `width` are always zero.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct BitVec {
    width: u8,
    bits: u64,
}

impl fmt::Debug for BitVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitVec({}'{:#x})", self.width, self.bits)
    }
}

impl BitVec {
    /// The 1-bit vector `1`.
    pub const TRUE: Self = Self { width: 1, bits: 1 };
    /// The 1-bit vector `0`.
    pub const FALSE: Self = Self { width: 1, bits: 0 };

    /// Creates a `width`-bit vector from the low bits of `bits`.
    pub fn new(width: u32, bits: u64) -> Result<Self, Fault> {
        if width > MAX_WIDTH {
            return Err(Fault::WidthOverflow { width });
        }
        #[allow(
            clippy::cast_possible_truncation,
            reason = "width was checked against MAX_WIDTH above"
        )]
        let narrow = width as u8;
        Ok(Self {
            width: narrow,
            bits: bits & mask(width),
        })
    }

    /// Creates an 8-bit vector.
    #[must_use]
    pub const fn byte(b: u8) -> Self {
        Self {
            width: 8,
            bits: b as u64,
        }
    }

    /// Returns the declared width.
    #[must_use]
    pub const fn width(self) -> u32 {
        self.width as u32
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.bits
    }

    /// Extracts `width` bits starting `offset` bits above the least significant bit.
    pub fn slice(self, offset: u32, width: u32) -> Result<Self, Fault> {
        match offset.checked_add(width) {
            Some(end) if end <= MAX_WIDTH => {}
            _ => return Err(Fault::BitRange { offset, width }),
        }
        let shifted = self.bits.checked_shr(offset).unwrap_or(0);
        Self::new(width, shifted)
    }

    /// Concatenates `self` (high bits) with `low` (low bits).
    pub fn concat(self, low: Self) -> Result<Self, Fault> {
        let width = self.width() + low.width();
        if width > MAX_WIDTH {
            return Err(Fault::WidthOverflow { width });
        }
        let high = self.bits.checked_shl(low.width()).unwrap_or(0);
        Self::new(width, high | low.bits)
    }

    /// Compares raw contents, ignoring declared widths.
    #[must_use]
    pub const fn raw_eq(self, other: Self) -> bool {
        self.bits == other.bits
    }

    /// Bitwise AND; the result has the width of `self`.
    #[must_use]
    pub const fn and(self, other: Self) -> Self {
        Self {
            width: self.width,
            bits: self.bits & other.bits & mask(self.width as u32),
        }
    }

    /// Bitwise complement within the declared width.
    #[must_use]
    pub const fn not(self) -> Self {
        Self {
            width: self.width,
            bits: !self.bits & mask(self.width as u32),
        }
    }

    /// Zero-extends to a machine integer.
    #[must_use]
    pub const fn zx(self) -> i64 {
        self.bits as i64
    }

    /// Sign-extends from the declared width to a machine integer.
    #[must_use]
    pub const fn sx(self) -> i64 {
        let w = self.width as u32;
        if w == 0 {
            return 0;
        }
        let shift = MAX_WIDTH - w;
        ((self.bits << shift) as i64) >> shift
    }
}

impl Arena {
    /// Allocates a bit-vector.
    pub fn alloc_bitvec(&mut self, bv: BitVec) -> Result<Obj, Fault> {
        self.alloc_object(
            Tag::BitVec,
            &[Slot::Word(u64::from(bv.width())), Slot::Word(bv.bits())],
        )
    }

    /// Returns the bit-vector stored in `obj`.
    pub fn bitvec(&self, obj: Obj) -> Result<BitVec, Fault> {
        match self.view(obj)? {
            Value::BitVec(bv) => Ok(bv),
            v => Err(wrong_kind(Tag::BitVec, &v)),
        }
    }

    /// `slice(v, offset, width)`.
    pub fn slice(&mut self, v: Obj, offset: u32, width: u32) -> Result<Obj, Fault> {
        let bv = self.bitvec(v)?.slice(offset, width)?;
        self.alloc_bitvec(bv)
    }

    /// `concat(high, low)`.
    pub fn concat(&mut self, high: Obj, low: Obj) -> Result<Obj, Fault> {
        let bv = self.bitvec(high)?.concat(self.bitvec(low)?)?;
        self.alloc_bitvec(bv)
    }

    /// Raw-value equality of two bit-vectors, as a boolean singleton.
    ///
    /// Widths are not compared; see [`Arena::equal_strict`].
    pub fn equal(&self, a: Obj, b: Obj) -> Result<Obj, Fault> {
        Ok(Obj::bool(self.bitvec(a)?.raw_eq(self.bitvec(b)?)))
    }

    /// Equality of width and value, as a boolean singleton.
    pub fn equal_strict(&self, a: Obj, b: Obj) -> Result<Obj, Fault> {
        Ok(Obj::bool(self.bitvec(a)? == self.bitvec(b)?))
    }

    /// `and(a, b)`; the result has the width of `a`.
    pub fn and(&mut self, a: Obj, b: Obj) -> Result<Obj, Fault> {
        let bv = self.bitvec(a)?.and(self.bitvec(b)?);
        self.alloc_bitvec(bv)
    }

    /// `not(a)`.
    pub fn not(&mut self, a: Obj) -> Result<Obj, Fault> {
        let bv = self.bitvec(a)?.not();
        self.alloc_bitvec(bv)
    }

    /// Sign-extends a bit-vector to an integer.
    pub fn sx(&mut self, a: Obj) -> Result<Obj, Fault> {
        let i = self.bitvec(a)?.sx();
        self.alloc_int(i)
    }

    /// Zero-extends a bit-vector to an integer.
    pub fn zx(&mut self, a: Obj) -> Result<Obj, Fault> {
        let i = self.bitvec(a)?.zx();
        self.alloc_int(i)
    }

    /// Integer `==`, as a boolean singleton.
    pub fn eqi(&self, a: Obj, b: Obj) -> Result<Obj, Fault> {
        Ok(Obj::bool(self.int(a)? == self.int(b)?))
    }

    /// Integer `<`, as a boolean singleton.
    pub fn lti(&self, a: Obj, b: Obj) -> Result<Obj, Fault> {
        Ok(Obj::bool(self.int(a)? < self.int(b)?))
    }

    /// Integer `<=`, as a boolean singleton.
    pub fn lei(&self, a: Obj, b: Obj) -> Result<Obj, Fault> {
        Ok(Obj::bool(self.int(a)? <= self.int(b)?))
    }

    /// Wrapping integer addition.
    pub fn addi(&mut self, a: Obj, b: Obj) -> Result<Obj, Fault> {
        let i = self.int(a)?.wrapping_add(self.int(b)?);
        self.alloc_int(i)
    }

    /// Wrapping integer subtraction.
    pub fn subi(&mut self, a: Obj, b: Obj) -> Result<Obj, Fault> {
        let i = self.int(a)?.wrapping_sub(self.int(b)?);
        self.alloc_int(i)
    }

    /// Wrapping integer multiplication.
    pub fn muli(&mut self, a: Obj, b: Obj) -> Result<Obj, Fault> {
        let i = self.int(a)?.wrapping_mul(self.int(b)?);
        self.alloc_int(i)
    }

    /// Returns `true` if `obj` is the unit value.
    pub fn is_nil(&self, obj: Obj) -> Result<bool, Fault> {
        Ok(self.tag(obj)? == Tag::Nil)
    }

    /// Returns `true` if `obj` is a 1-bit vector holding `1`.
    pub fn is_true(&self, obj: Obj) -> Result<bool, Fault> {
        Ok(obj == Obj::TRUE || self.bitvec(obj)? == BitVec::TRUE)
    }

    /// Returns `true` if `obj` is a 1-bit vector holding `0`.
    pub fn is_false(&self, obj: Obj) -> Result<bool, Fault> {
        Ok(obj == Obj::FALSE || self.bitvec(obj)? == BitVec::FALSE)
    }

    /// Returns the value a `case` expression switches on: an integer, a constructor tag or the
    /// bits of a bit-vector.
    pub fn case_tag(&self, obj: Obj) -> Result<u64, Fault> {
        match self.view(obj)? {
            Value::Int(i) => Ok(i as u64),
            Value::Tagged { con, .. } => Ok(u64::from(con.0)),
            Value::BitVec(bv) => Ok(bv.bits()),
            v => Err(wrong_kind(Tag::Tagged, &v)),
        }
    }

    /// Returns the payload of a constructor application, or `obj` itself for other values.
    pub fn decon(&self, obj: Obj) -> Result<Obj, Fault> {
        match self.view(obj)? {
            Value::Tagged { payload, .. } => Ok(payload),
            _ => Ok(obj),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ConId;

    fn bv(width: u32, bits: u64) -> BitVec {
        BitVec::new(width, bits).unwrap()
    }

    #[test]
    fn new_masks_high_bits() {
        assert_eq!(bv(4, 0xff).bits(), 0xf);
        assert_eq!(bv(64, u64::MAX).bits(), u64::MAX);
        assert_eq!(bv(0, 1).bits(), 0);
        assert_eq!(
            BitVec::new(65, 0),
            Err(Fault::WidthOverflow { width: 65 })
        );
    }

    #[test]
    fn slice_extracts_nibbles() {
        let v = BitVec::byte(0b1011_0010);
        assert_eq!(v.slice(0, 4).unwrap(), bv(4, 0b0010));
        assert_eq!(v.slice(4, 4).unwrap(), bv(4, 0b1011));
        assert_eq!(v.slice(7, 1).unwrap(), BitVec::TRUE);
        assert_eq!(
            v.slice(60, 8),
            Err(Fault::BitRange {
                offset: 60,
                width: 8
            })
        );
    }

    #[test]
    fn concat_puts_first_operand_high() {
        let v = BitVec::byte(0b1011_0010);
        let hi = v.slice(4, 4).unwrap();
        let lo = v.slice(0, 4).unwrap();
        assert_eq!(hi.concat(lo).unwrap(), v);
        assert_eq!(lo.concat(hi).unwrap(), BitVec::byte(0b0010_1011));
        assert_eq!(
            bv(40, 0).concat(bv(40, 0)),
            Err(Fault::WidthOverflow { width: 80 })
        );
        assert_eq!(bv(0, 0).concat(v).unwrap(), v);
    }

    #[test]
    fn not_respects_width() {
        assert_eq!(bv(3, 0b101).not(), bv(3, 0b010));
        assert_eq!(bv(64, 0).not(), bv(64, u64::MAX));
        assert_eq!(bv(8, 0xf0).and(bv(8, 0x3c)), bv(8, 0x30));
        assert_eq!(bv(4, 0xf).and(bv(8, 0xff)), bv(4, 0xf));
    }

    #[test]
    fn extension() {
        assert_eq!(BitVec::byte(0xfe).sx(), -2);
        assert_eq!(BitVec::byte(0xfe).zx(), 0xfe);
        assert_eq!(bv(1, 1).sx(), -1);
        assert_eq!(bv(64, u64::MAX).sx(), -1);
        assert_eq!(bv(0, 0).sx(), 0);
    }

    #[test]
    fn equal_ignores_width_strict_does_not() {
        let mut a = Arena::with_capacity(32);
        let x = a.alloc_bitvec(bv(8, 1)).unwrap();
        let y = a.alloc_bitvec(bv(1, 1)).unwrap();
        assert_eq!(a.equal(x, y), Ok(Obj::TRUE));
        assert_eq!(a.equal_strict(x, y), Ok(Obj::FALSE));
        assert_eq!(a.equal_strict(y, Obj::TRUE), Ok(Obj::TRUE));
    }

    #[test]
    fn integer_prims() {
        let mut a = Arena::with_capacity(32);
        let two = a.alloc_int(2).unwrap();
        let three = a.alloc_int(3).unwrap();
        let five = a.addi(two, three).unwrap();
        assert_eq!(a.int(five), Ok(5));
        let m = a.subi(two, three).unwrap();
        assert_eq!(a.int(m), Ok(-1));
        let p = a.muli(two, three).unwrap();
        assert_eq!(a.int(p), Ok(6));
        assert_eq!(a.lti(two, three), Ok(Obj::TRUE));
        assert_eq!(a.lei(three, three), Ok(Obj::TRUE));
        assert_eq!(a.eqi(two, three), Ok(Obj::FALSE));
    }

    #[test]
    fn case_tag_and_decon() {
        let mut a = Arena::with_capacity(32);
        let i = a.alloc_int(9).unwrap();
        let t = a.alloc_tagged(ConId(4), i).unwrap();
        assert_eq!(a.case_tag(t), Ok(4));
        assert_eq!(a.case_tag(i), Ok(9));
        assert_eq!(a.case_tag(Obj::TRUE), Ok(1));
        assert_eq!(a.decon(t), Ok(i));
        assert_eq!(a.decon(i), Ok(i));
        assert_eq!(
            a.case_tag(Obj::NIL),
            Err(Fault::WrongKind {
                expected: Tag::Tagged,
                actual: Tag::Nil
            })
        );
    }

    #[test]
    fn truthiness_accepts_fresh_one_bit_vectors() {
        let mut a = Arena::with_capacity(32);
        let one = a.alloc_bitvec(BitVec::TRUE).unwrap();
        assert_eq!(a.is_true(one), Ok(true));
        assert_eq!(a.is_true(Obj::FALSE), Ok(false));
        assert_eq!(a.is_false(Obj::FALSE), Ok(true));
        assert_eq!(a.is_nil(Obj::NIL), Ok(true));
        assert_eq!(a.is_nil(one), Ok(false));
    }
}
