// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The `noop` built-in: does nothing, every frame.

use std::sync::Arc;

use mosaic_core::context::ModuleContext;
use mosaic_core::error::Result;
use mosaic_core::module::{Module, ModuleFlags, SetupOutcome};
use mosaic_core::settings::Settings;
use mosaic_core::setup::BakedSetup;
use mosaic_core::stream::Stream;
use mosaic_core::time::Tick;

/// The `noop` module: "Nothing-doer (built-in)".
#[derive(Debug, Default)]
pub struct Noop;

/// The single static instance registered under the name `noop`.
pub static NOOP: Noop = Noop;

impl Module for Noop {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn description(&self) -> &'static str {
        "Nothing-doer (built-in)"
    }

    fn author(&self) -> &'static str {
        "built-in"
    }

    fn flags(&self) -> ModuleFlags {
        ModuleFlags::BUILTIN
    }

    fn setup(&'static self, _settings: &Settings) -> Result<SetupOutcome> {
        Ok(SetupOutcome::Baked(BakedSetup::new(String::new(), self, ())))
    }

    fn create_context(
        &'static self,
        setup: Arc<BakedSetup>,
        _stream: Option<Arc<Stream>>,
        _seed: u32,
        _ticks: Tick,
        _n_cpus: u32,
    ) -> Box<dyn ModuleContext> {
        Box::new(NoopContext { setup })
    }
}

struct NoopContext {
    setup: Arc<BakedSetup>,
}

impl ModuleContext for NoopContext {
    fn setup(&self) -> &Arc<BakedSetup> {
        &self.setup
    }

    fn destroy(self: Box<Self>, _stream: Option<&Stream>) {}
}
