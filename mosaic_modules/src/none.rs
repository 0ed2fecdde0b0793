// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The `none` built-in: a sentinel meaning "not configured".
//!
//! `setup` always answers [`SetupOutcome::Disabled`], regardless of what
//! settings are supplied. A module-selection slot defaulting to `none`
//! (e.g. the `pre` built-in's nested module) is how this codebase spells
//! "optional, currently turned off".

use std::sync::Arc;

use mosaic_core::context::ModuleContext;
use mosaic_core::error::Result;
use mosaic_core::module::{Module, ModuleFlags, SetupOutcome};
use mosaic_core::settings::Settings;
use mosaic_core::setup::BakedSetup;
use mosaic_core::stream::Stream;
use mosaic_core::time::Tick;

/// The `none` module: "Disabled (built-in)".
#[derive(Debug, Default)]
pub struct None;

/// The single static instance registered under the name `none`.
pub static NONE: None = None;

impl Module for None {
    fn name(&self) -> &'static str {
        "none"
    }

    fn description(&self) -> &'static str {
        "Disabled (built-in)"
    }

    fn author(&self) -> &'static str {
        "built-in"
    }

    fn flags(&self) -> ModuleFlags {
        ModuleFlags::BUILTIN
    }

    fn setup(&'static self, _settings: &Settings) -> Result<SetupOutcome> {
        Ok(SetupOutcome::Disabled)
    }

    fn create_context(
        &'static self,
        _setup: Arc<BakedSetup>,
        _stream: Option<Arc<Stream>>,
        _seed: u32,
        _ticks: Tick,
        _n_cpus: u32,
    ) -> Box<dyn ModuleContext> {
        unreachable!("none's setup never bakes, so create_context is never invoked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_core::settings::parse;

    #[test]
    fn setup_is_always_disabled() {
        assert!(matches!(NONE.setup(&parse("")).unwrap(), SetupOutcome::Disabled));
        assert!(matches!(NONE.setup(&parse("anything=goes")).unwrap(), SetupOutcome::Disabled));
    }
}
