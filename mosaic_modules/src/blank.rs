// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The `blank` built-in: clears its fragment every frame.

use std::sync::Arc;

use mosaic_core::context::{FramePlan, ModuleContext};
use mosaic_core::error::Result;
use mosaic_core::fragment::Fragment;
use mosaic_core::fragmenter;
use mosaic_core::module::{Module, ModuleFlags, SetupOutcome};
use mosaic_core::settings::Settings;
use mosaic_core::setup::{BakedSetup, Found, SettingSpec, get_and_describe_setting};
use mosaic_core::stream::Stream;
use mosaic_core::threads::ThreadPool;
use mosaic_core::time::Tick;

struct BlankSetup {
    /// Whether to also invalidate `fragment.cleared` in `prepare_frame`,
    /// ahead of `render_fragment` actually clearing the pixels, so a
    /// downstream sampler (e.g. a texture reader) can't observe a stale
    /// "already cleared" frame from before this context existed.
    force: bool,
}

/// The `blank` module: "Blanker (built-in)".
#[derive(Debug, Default)]
pub struct Blank;

/// The single static instance registered under the name `blank`.
pub static BLANK: Blank = Blank;

impl Module for Blank {
    fn name(&self) -> &'static str {
        "blank"
    }

    fn description(&self) -> &'static str {
        "Blanker (built-in)"
    }

    fn author(&self) -> &'static str {
        "built-in"
    }

    fn flags(&self) -> ModuleFlags {
        ModuleFlags::BUILTIN
    }

    fn setup(&'static self, settings: &Settings) -> Result<SetupOutcome> {
        let spec = SettingSpec {
            name: "Force clearing",
            key: Some("force"),
            preferred: Some("off"),
            values: &["off", "on"],
            ..SettingSpec::default()
        };

        match get_and_describe_setting(settings, &spec)? {
            Found::Missing(desc) => Ok(SetupOutcome::NeedsInput(desc)),
            Found::Setting(setting) => {
                let force = setting.value.as_deref().unwrap_or("off").eq_ignore_ascii_case("on");
                Ok(SetupOutcome::Baked(BakedSetup::new(String::new(), self, BlankSetup { force })))
            }
        }
    }

    fn create_context(
        &'static self,
        setup: Arc<BakedSetup>,
        _stream: Option<Arc<Stream>>,
        _seed: u32,
        _ticks: Tick,
        _n_cpus: u32,
    ) -> Box<dyn ModuleContext> {
        Box::new(BlankContext { setup })
    }
}

struct BlankContext {
    setup: Arc<BakedSetup>,
}

impl ModuleContext for BlankContext {
    fn setup(&self) -> &Arc<BakedSetup> {
        &self.setup
    }

    fn prepare_frame(&mut self, _stream: Option<&Stream>, _ticks: Tick, fragment: &mut Fragment) -> FramePlan {
        if self.setup.downcast::<BlankSetup>().is_some_and(|s| s.force) {
            fragment.cleared = false;
        }

        FramePlan {
            fragmenter: Some(fragmenter::fragmenter(fragmenter::slice_per_cpu)),
            cpu_affinity: false,
        }
    }

    fn render_fragment(&self, _stream: Option<&Stream>, _ticks: Tick, _cpu: u32, fragment: &mut Fragment) {
        fragment.clear();
    }

    fn destroy(self: Box<Self>, _stream: Option<&Stream>) {}
}
