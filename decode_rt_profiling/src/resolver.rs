// Copyright 2026 the Decode Runtime Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use decode_rt::cps::Label;
use std::collections::HashMap;
use std::string::String;

/// Optional label resolver for profiling scopes.
///
/// Return `None` to fall back to the default name-based labels.
pub trait LabelResolver {
    /// Resolve a label for a whole-run scope.
    fn run_label(&mut self, _decoder: &Label) -> Option<String> {
        None
    }

    /// Resolve a label for a single-step scope.
    fn step_label(&mut self, _label: &Label) -> Option<String> {
        None
    }
}

/// Default resolver that keeps the step names as they are.
#[derive(Default, Debug)]
pub struct DefaultLabelResolver;

impl LabelResolver for DefaultLabelResolver {}

/// Resolver that qualifies step names with the decoder they run under.
///
/// Useful when several decoders share helper steps.
#[derive(Default, Debug)]
pub struct DecoderScopedResolver {
    decoder: Option<&'static str>,
    step_cache: HashMap<&'static str, String>,
}

impl LabelResolver for DecoderScopedResolver {
    fn run_label(&mut self, decoder: &Label) -> Option<String> {
        if self.decoder != Some(decoder.name()) {
            self.decoder = Some(decoder.name());
            self.step_cache.clear();
        }
        Some(format!("decode:{}", decoder.name()))
    }

    fn step_label(&mut self, label: &Label) -> Option<String> {
        let decoder = self.decoder?;
        if let Some(cached) = self.step_cache.get(label.name()) {
            return Some(cached.clone());
        }
        let resolved = format!("{decoder}/{}", label.name());
        self.step_cache.insert(label.name(), resolved.clone());
        Some(resolved)
    }
}

pub(crate) fn default_run_label(decoder: &Label) -> String {
    format!("run:{}", decoder.name())
}

pub(crate) fn default_step_label(label: &Label) -> String {
    format!("step:{}", label.name())
}
