// Copyright 2026 the Decode Runtime Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Profiling adapters for `decode_rt` (currently Tracy).
//!
//! This crate is `std`-only and keeps `decode_rt` itself free of profiling dependencies.
//! It listens for run and step events and emits matching profiling scopes.
//!
//! ## Backend
//! This crate currently supports the Tracy backend via `tracy-client`.
//!
//! ## Example
//! ```ignore
//! use decode_rt::trace::TraceSink;
//! use decode_rt_profiling::ProfilingTraceSink;
//!
//! let mut sink = ProfilingTraceSink::new();
//! let mask = sink.mask();
//! rt.eval_traced(DECODER, &input, mask, Some(&mut sink))?;
//! # Ok::<(), decode_rt::fault::FaultInfo>(())
//! ```

mod resolver;
mod sink;

pub use resolver::{DecoderScopedResolver, DefaultLabelResolver, LabelResolver};
pub use sink::ProfilingTraceSink;
