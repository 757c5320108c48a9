// Copyright 2026 the Decode Runtime Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `decode_rt`: the runtime that generated binary decoders run on.
//!
//! Decoders are produced by a compiler as sets of continuation-passing step functions. This crate
//! supplies everything they share:
//! - a tagged-value object model ([`value`]) stored in a bump arena ([`arena`]) that is reset
//!   wholesale between decodes;
//! - persistent records ([`record`]), bit-vectors and scalar primitives ([`bits`]), byte-stream
//!   access ([`stream`]) and ropes ([`rope`]);
//! - the calling convention and trampoline driver ([`cps`]) behind the [`runtime::Runtime`]
//!   entry points;
//! - structural dumps ([`print`]) and Intel-syntax rendering of decoded instructions
//!   ([`pretty`]).
//!
//! ## Example
//!
//! ```
//! use decode_rt::bits::BitVec;
//! use decode_rt::cps::{Ctx, Label, Step};
//! use decode_rt::fault::Fault;
//! use decode_rt::names::{RESERVED_FIELDS, SymbolTable};
//! use decode_rt::runtime::{Limits, Runtime};
//! use decode_rt::value::Obj;
//!
//! // (env, k, state): pass the first input byte to `k`.
//! fn first_byte(ctx: &mut Ctx<'_, '_>, _env: Obj, args: &[Obj]) -> Result<Step, Fault> {
//!     let &[k, state] = args else {
//!         return Err(ctx.arity_fault(args));
//!     };
//!     let pair = ctx.consume(state)?;
//!     let (byte, _) = ctx.arena().unpair(pair)?;
//!     Ok(Step::resume(k, byte))
//! }
//!
//! const FIRST_BYTE: Label = Label::new("first_byte", 3, first_byte);
//!
//! let mut rt = Runtime::new(SymbolTable::new(&RESERVED_FIELDS, &[]), Limits::default());
//! let out = rt.eval(FIRST_BYTE, &[0x4b])?;
//! assert_eq!(rt.arena().bitvec(out)?, BitVec::byte(0x4b));
//! assert_eq!(rt.dump(out).to_string(), "{tag=__BV,sz=8,vec=4b}");
//!
//! let err = rt.eval(FIRST_BYTE, &[]).unwrap_err();
//! assert_eq!(err.fault, Fault::EndOfInput);
//! # Ok::<(), Box<dyn core::error::Error>>(())
//! ```

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod arena;
pub mod bits;
pub mod cps;
pub mod fault;
pub mod names;
pub mod pretty;
pub mod print;
pub mod record;
pub mod rope;
pub mod runtime;
pub mod stream;
pub mod trace;
pub mod value;
