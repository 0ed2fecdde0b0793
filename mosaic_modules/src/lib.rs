// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Built-in control modules: `blank`, `noop`, `none`, `ref`, and `pre`.
//!
//! These don't render anything interesting themselves; they exist to compose
//! and control other modules on a stream (clearing, doing nothing, opting
//! out, referencing another context by path, and hooking a context into the
//! pre-render pass).

pub mod blank;
pub mod noop;
pub mod none;
pub mod pre;
pub mod reference;

use mosaic_core::module::Registry;

/// Every built-in module, in registration order.
pub static BUILTINS: &[&dyn mosaic_core::module::Module] =
    &[&blank::BLANK, &noop::NOOP, &none::NONE, &reference::REF, &pre::PRE];

/// A registry over [`BUILTINS`].
#[must_use]
pub fn registry() -> Registry {
    Registry::new(BUILTINS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_is_reachable_by_name() {
        let registry = registry();
        for name in ["blank", "noop", "none", "ref", "pre"] {
            assert!(registry.lookup(name).is_some(), "missing built-in: {name}");
        }
    }
}
