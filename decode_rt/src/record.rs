// Copyright 2026 the Decode Runtime Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Persistent records.
//!
//! A record is an association array of `(FieldId, Obj)` pairs. Records are immutable: every
//! update allocates a fresh field array and a fresh header, so older versions stay valid for as
//! long as the arena epoch does.
//!
//! Lookup is a linear scan. Generated decoders use small records (a handful of fields), where a
//! scan over contiguous slots beats any indexed structure.

use crate::arena::{Arena, Slot, pos32, wrong_kind};
use crate::fault::Fault;
use crate::value::{FieldId, Obj, RecordView, Tag, Value};

/// Slots occupied by one field entry.
const FIELD_SLOTS: usize = 2;

impl Arena {
    fn record_view(&self, record: Obj) -> Result<RecordView, Fault> {
        match self.view(record)? {
            Value::Record(view) => Ok(view),
            v => Err(wrong_kind(Tag::Record, &v)),
        }
    }

    fn field_at(&self, view: RecordView, index: usize) -> Result<(FieldId, Obj), Fault> {
        let at = view.fields as usize + index * FIELD_SLOTS;
        Ok((FieldId(self.word32(at)?), self.obj_at(at + 1)?))
    }

    fn field_index(&self, view: RecordView, field: FieldId) -> Result<Option<usize>, Fault> {
        for i in 0..view.len() {
            if self.field_at(view, i)?.0 == field {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    fn alloc_record_header(&mut self, len: usize, fields: usize) -> Result<Obj, Fault> {
        self.alloc_object(
            Tag::Record,
            &[
                Slot::Word(len as u64),
                Slot::Word(u64::from(pos32(fields))),
            ],
        )
    }

    /// Builds a record from `fields`.
    ///
    /// Field ids must be distinct; this is checked in debug builds only.
    pub fn record_build(&mut self, fields: &[(FieldId, Obj)]) -> Result<Obj, Fault> {
        debug_assert!(
            fields
                .iter()
                .enumerate()
                .all(|(i, (f, _))| fields[..i].iter().all(|(g, _)| g != f)),
            "duplicate field in record literal"
        );
        let at = self.alloc(fields.len() * FIELD_SLOTS)?;
        for (i, (field, value)) in fields.iter().enumerate() {
            self.write(at + i * FIELD_SLOTS, Slot::Word(u64::from(field.0)));
            self.write(at + i * FIELD_SLOTS + 1, Slot::Ref(*value));
        }
        self.alloc_record_header(fields.len(), at)
    }

    /// Returns the value of `field` in `record`.
    pub fn record_lookup(&self, record: Obj, field: FieldId) -> Result<Obj, Fault> {
        let view = self.record_view(record)?;
        match self.field_index(view, field)? {
            Some(i) => Ok(self.field_at(view, i)?.1),
            None => Err(Fault::MissingField { field }),
        }
    }

    /// Returns a copy of `record` with `field` set to `value`.
    ///
    /// `record` itself is never modified.
    pub fn record_update(&mut self, record: Obj, field: FieldId, value: Obj) -> Result<Obj, Fault> {
        self.record_update_many(record, &[(field, value)])
    }

    /// Returns a copy of `record` with every `(field, value)` in `updates` applied in order.
    ///
    /// Existing fields are overwritten in place; new fields are appended. All updates share one
    /// copy of the field array.
    pub fn record_update_many(
        &mut self,
        record: Obj,
        updates: &[(FieldId, Obj)],
    ) -> Result<Obj, Fault> {
        let view = self.record_view(record)?;
        let mut appended = 0;
        for (i, (field, _)) in updates.iter().enumerate() {
            let repeated = updates[..i].iter().any(|(g, _)| g == field);
            if !repeated && self.field_index(view, *field)?.is_none() {
                appended += 1;
            }
        }
        let len = view.len() + appended;
        let at = self.alloc(len * FIELD_SLOTS)?;
        self.copy_slots(view.fields as usize, view.len() * FIELD_SLOTS, at);
        let mut filled = view.len();
        for (field, value) in updates {
            let mut slot = None;
            for i in 0..filled {
                if FieldId(self.word32(at + i * FIELD_SLOTS)?) == *field {
                    slot = Some(i);
                    break;
                }
            }
            let i = match slot {
                Some(i) => i,
                None => {
                    self.write(at + filled * FIELD_SLOTS, Slot::Word(u64::from(field.0)));
                    filled += 1;
                    filled - 1
                }
            };
            self.write(at + i * FIELD_SLOTS + 1, Slot::Ref(*value));
        }
        self.alloc_record_header(len, at)
    }

    /// Returns the number of fields in `record`.
    pub fn record_len(&self, record: Obj) -> Result<usize, Fault> {
        Ok(self.record_view(record)?.len())
    }

    /// Returns `true` if `record` has `field`.
    pub fn record_contains(&self, record: Obj, field: FieldId) -> Result<bool, Fault> {
        let view = self.record_view(record)?;
        Ok(self.field_index(view, field)?.is_some())
    }

    /// Iterates over the fields of `record` in storage order.
    pub fn record_fields(&self, record: Obj) -> Result<RecordFields<'_>, Fault> {
        Ok(RecordFields {
            arena: self,
            view: self.record_view(record)?,
            next: 0,
        })
    }

    /// Builds the tuple `{1: fst, 2: snd}`.
    pub fn pair(&mut self, fst: Obj, snd: Obj) -> Result<Obj, Fault> {
        self.record_build(&[(FieldId::FST, fst), (FieldId::SND, snd)])
    }

    /// Splits a tuple built by [`Arena::pair`].
    pub fn unpair(&self, pair: Obj) -> Result<(Obj, Obj), Fault> {
        Ok((
            self.record_lookup(pair, FieldId::FST)?,
            self.record_lookup(pair, FieldId::SND)?,
        ))
    }
}

/// Iterator over the `(field, value)` pairs of a record.
///
/// Yields `Err` once and stops if the field array is malformed.
#[derive(Debug)]
pub struct RecordFields<'a> {
    arena: &'a Arena,
    view: RecordView,
    next: usize,
}

impl Iterator for RecordFields<'_> {
    type Item = Result<(FieldId, Obj), Fault>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.view.len() {
            return None;
        }
        let item = self.arena.field_at(self.view, self.next);
        self.next = if item.is_ok() {
            self.next + 1
        } else {
            self.view.len()
        };
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.view.len() - self.next;
        (0, Some(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    const A: FieldId = FieldId(10);
    const B: FieldId = FieldId(11);
    const C: FieldId = FieldId(12);

    fn fields(a: &Arena, r: Obj) -> Vec<(FieldId, i64)> {
        a.record_fields(r)
            .unwrap()
            .map(|f| {
                let (k, v) = f.unwrap();
                (k, a.int(v).unwrap())
            })
            .collect()
    }

    #[test]
    fn lookup_finds_fields() {
        let mut a = Arena::with_capacity(64);
        let one = a.alloc_int(1).unwrap();
        let two = a.alloc_int(2).unwrap();
        let r = a.record_build(&[(A, one), (B, two)]).unwrap();
        assert_eq!(a.record_lookup(r, A), Ok(one));
        assert_eq!(a.record_lookup(r, B), Ok(two));
        assert_eq!(
            a.record_lookup(r, C),
            Err(Fault::MissingField { field: C })
        );
        assert_eq!(a.record_len(r), Ok(2));
        assert_eq!(a.record_contains(r, B), Ok(true));
        assert_eq!(a.record_contains(r, C), Ok(false));
    }

    #[test]
    fn update_overwrites_or_appends() {
        let mut a = Arena::with_capacity(64);
        let one = a.alloc_int(1).unwrap();
        let two = a.alloc_int(2).unwrap();
        let three = a.alloc_int(3).unwrap();
        let r = a.record_build(&[(A, one)]).unwrap();
        let r2 = a.record_update(r, A, two).unwrap();
        assert_eq!(fields(&a, r2), [(A, 2)]);
        let r3 = a.record_update(r2, B, three).unwrap();
        assert_eq!(fields(&a, r3), [(A, 2), (B, 3)]);
        assert_eq!(fields(&a, r), [(A, 1)]);
    }

    #[test]
    fn update_is_idempotent() {
        let mut a = Arena::with_capacity(64);
        let one = a.alloc_int(1).unwrap();
        let two = a.alloc_int(2).unwrap();
        let r = a.record_build(&[(A, one)]).unwrap();
        let once = a.record_update(r, B, two).unwrap();
        let twice = a.record_update(once, B, two).unwrap();
        assert_eq!(fields(&a, once), fields(&a, twice));
    }

    #[test]
    fn update_many_shares_one_copy() {
        let mut a = Arena::with_capacity(64);
        let one = a.alloc_int(1).unwrap();
        let two = a.alloc_int(2).unwrap();
        let three = a.alloc_int(3).unwrap();
        let r = a.record_build(&[(A, one)]).unwrap();
        let before = a.used();
        let r2 = a
            .record_update_many(r, &[(B, two), (A, three), (B, three)])
            .unwrap();
        assert_eq!(fields(&a, r2), [(A, 3), (B, 3)]);
        assert_eq!(a.used() - before, 2 * FIELD_SLOTS + 3);
    }

    #[test]
    fn empty_record() {
        let mut a = Arena::with_capacity(8);
        let r = a.record_build(&[]).unwrap();
        assert_eq!(a.record_len(r), Ok(0));
        assert_eq!(a.record_fields(r).unwrap().count(), 0);
        let r2 = a.record_update(r, A, Obj::NIL).unwrap();
        assert_eq!(a.record_lookup(r2, A), Ok(Obj::NIL));
    }

    #[test]
    fn pair_round_trips() {
        let mut a = Arena::with_capacity(16);
        let p = a.pair(Obj::TRUE, Obj::NIL).unwrap();
        assert_eq!(a.unpair(p), Ok((Obj::TRUE, Obj::NIL)));
        assert_eq!(
            a.unpair(Obj::NIL),
            Err(Fault::WrongKind {
                expected: Tag::Record,
                actual: Tag::Nil
            })
        );
    }
}
