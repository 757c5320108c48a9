// Copyright 2026 the Decode Runtime Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bitstream primitives over the decode input.
//!
//! The decoder state is a record whose [`FieldId::BLOB`] field holds a [`Blob`]: the window of
//! the input that has not been consumed yet. Consuming advances the window and returns a pair
//! `(value, new_state)`; the old state stays valid, so a decoder can backtrack by keeping it.

use crate::bits::BitVec;
use crate::cps::Ctx;
use crate::fault::Fault;
use crate::value::{Blob, FieldId, Obj};

impl<'i> Ctx<'_, 'i> {
    /// Returns the input bytes a blob denotes.
    pub fn blob_bytes(&self, blob: Blob) -> Result<&'i [u8], Fault> {
        let start = blob.offset as usize;
        let end = start
            .checked_add(blob.len as usize)
            .ok_or(Fault::BlobOutOfRange)?;
        self.input.get(start..end).ok_or(Fault::BlobOutOfRange)
    }

    /// Builds the initial state `{blob: <whole input>}`.
    pub fn initial_state(&mut self) -> Result<Obj, Fault> {
        let len = u32::try_from(self.input.len()).map_err(|_| Fault::BlobOutOfRange)?;
        let blob = self.arena.alloc_blob(Blob { offset: 0, len })?;
        self.arena.record_build(&[(FieldId::BLOB, blob)])
    }

    /// Returns the unconsumed window of `state`.
    pub fn state_blob(&self, state: Obj) -> Result<Blob, Fault> {
        let blob = self.arena.record_lookup(state, FieldId::BLOB)?;
        self.arena.blob(blob)
    }

    /// Returns the number of unconsumed bytes in `state`.
    pub fn remaining(&self, state: Obj) -> Result<usize, Fault> {
        Ok(self.blob_bytes(self.state_blob(state)?)?.len())
    }

    fn with_blob(&mut self, state: Obj, blob: Blob) -> Result<Obj, Fault> {
        let b = self.arena.alloc_blob(blob)?;
        self.arena.record_update(state, FieldId::BLOB, b)
    }

    /// Reads `n` bytes little-endian and advances the window.
    fn consume_le(&mut self, state: Obj, n: u32) -> Result<Obj, Fault> {
        let blob = self.state_blob(state)?;
        let bytes = self.blob_bytes(blob)?;
        let Some(taken) = bytes.get(..n as usize) else {
            return Err(Fault::EndOfInput);
        };
        let bits = taken
            .iter()
            .rev()
            .fold(0_u64, |acc, b| (acc << 8) | u64::from(*b));
        let v = self.arena.alloc_bitvec(BitVec::new(8 * n, bits)?)?;
        let next = self.with_blob(
            state,
            Blob {
                offset: blob.offset + n,
                len: blob.len - n,
            },
        )?;
        self.arena.pair(v, next)
    }

    /// Moves the window back by `n` bytes.
    fn unconsume_n(&mut self, state: Obj, n: u32) -> Result<Obj, Fault> {
        let blob = self.state_blob(state)?;
        self.blob_bytes(blob)?;
        let Some(offset) = blob.offset.checked_sub(n) else {
            return Err(Fault::BlobUnderflow);
        };
        let len = blob.len.checked_add(n).ok_or(Fault::BlobOutOfRange)?;
        let next = self.with_blob(state, Blob { offset, len })?;
        self.arena.pair(Obj::NIL, next)
    }

    /// Consumes one byte: returns `(BitVec(8), new_state)`.
    ///
    /// Fails with [`Fault::EndOfInput`] when the window is empty.
    pub fn consume(&mut self, state: Obj) -> Result<Obj, Fault> {
        self.consume_le(state, 1)
    }

    /// Consumes two bytes as a little-endian `BitVec(16)`.
    pub fn consume16(&mut self, state: Obj) -> Result<Obj, Fault> {
        self.consume_le(state, 2)
    }

    /// Consumes four bytes as a little-endian `BitVec(32)`.
    pub fn consume32(&mut self, state: Obj) -> Result<Obj, Fault> {
        self.consume_le(state, 4)
    }

    /// Gives back one byte: returns `(Nil, new_state)`.
    ///
    /// The byte is not checked to have been consumed by this decode; only moving before the
    /// start of the input fails, with [`Fault::BlobUnderflow`].
    pub fn unconsume(&mut self, state: Obj) -> Result<Obj, Fault> {
        self.unconsume_n(state, 1)
    }

    /// Gives back two bytes.
    pub fn unconsume16(&mut self, state: Obj) -> Result<Obj, Fault> {
        self.unconsume_n(state, 2)
    }

    /// Gives back four bytes.
    pub fn unconsume32(&mut self, state: Obj) -> Result<Obj, Fault> {
        self.unconsume_n(state, 4)
    }
}
