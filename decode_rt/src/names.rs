// Copyright 2026 the Decode Runtime Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Symbol tables mapping field and constructor ids to names.
//!
//! Tables are produced alongside a generated decoder and are static data; the runtime only reads
//! them for diagnostics and pretty-printing.

use core::fmt;

use crate::value::{ConId, FieldId};

/// Name printed for ids outside a table.
pub const UNKNOWN: &str = "<unknown>";

/// Names the runtime itself reserves at the start of the field table.
pub const RESERVED_FIELDS: [&str; 3] = ["blob", "1", "2"];

/// Error looking up an id by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NamesError {
    /// No field with this name.
    MissingField(&'static str),
    /// No constructor with this name.
    MissingCon(&'static str),
}

impl fmt::Display for NamesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(name) => write!(f, "no field named '{name}'"),
            Self::MissingCon(name) => write!(f, "no constructor named '{name}'"),
        }
    }
}

impl core::error::Error for NamesError {}

/// Field and constructor name tables, indexed by id.
#[derive(Copy, Clone, Debug, Default)]
pub struct SymbolTable<'a> {
    fields: &'a [&'a str],
    cons: &'a [&'a str],
}

impl<'a> SymbolTable<'a> {
    /// Creates a table; `fields[i]` names `FieldId(i)` and `cons[i]` names `ConId(i)`.
    #[must_use]
    pub const fn new(fields: &'a [&'a str], cons: &'a [&'a str]) -> Self {
        Self { fields, cons }
    }

    /// Returns the name of `field` if the table has one.
    #[must_use]
    pub fn field(&self, field: FieldId) -> Option<&'a str> {
        self.fields.get(field.0 as usize).copied()
    }

    /// Returns the name of `con` if the table has one.
    #[must_use]
    pub fn con(&self, con: ConId) -> Option<&'a str> {
        self.cons.get(con.0 as usize).copied()
    }

    /// Returns the name of `field`, or [`UNKNOWN`].
    #[must_use]
    pub fn field_name(&self, field: FieldId) -> &'a str {
        self.field(field).unwrap_or(UNKNOWN)
    }

    /// Returns the name of `con`, or [`UNKNOWN`].
    #[must_use]
    pub fn con_name(&self, con: ConId) -> &'a str {
        self.con(con).unwrap_or(UNKNOWN)
    }

    /// Returns the id of the field called `name`.
    pub fn field_id(&self, name: &'static str) -> Result<FieldId, NamesError> {
        position(self.fields, name)
            .map(FieldId)
            .ok_or(NamesError::MissingField(name))
    }

    /// Returns the id of the constructor called `name`.
    pub fn con_id(&self, name: &'static str) -> Result<ConId, NamesError> {
        position(self.cons, name)
            .map(ConId)
            .ok_or(NamesError::MissingCon(name))
    }
}

fn position(table: &[&str], name: &str) -> Option<u32> {
    let i = table.iter().position(|n| *n == name)?;
    u32::try_from(i).ok()
}
