// Copyright 2026 the Decode Runtime Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hand-written decoders showing how generated code drives `decode_rt`.
//!
//! [`x86`] decodes a handful of 32-bit x86 instructions in continuation-passing style, the way a
//! decoder compiler would emit them, and renders them with the runtime's pretty-printer.

pub mod x86;
