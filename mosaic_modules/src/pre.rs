// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The `pre` built-in: wraps another module and registers its render cycle
//! as a standing pre-render hook on the stream, driven once per frame ahead
//! of the main render.

use std::sync::{Arc, Mutex};

use mosaic_core::context::{self, ModuleContext};
use mosaic_core::error::{Error, Result};
use mosaic_core::module::{Module, ModuleFlags, SetupOutcome};
use mosaic_core::settings::Settings;
use mosaic_core::setup::{self, BakedSetup, Found, SettingSpec, get_and_describe_setting, nested_settings};
use mosaic_core::stream::{ContextId, Stream};
use mosaic_core::threads::ThreadPool;
use mosaic_core::time::Tick;
use mosaic_core::fragment::Fragment;

const DEFAULT_MODULE: &str = "none";

struct PreSetup {
    /// The wrapped module's own baked setup, absent when it resolved to
    /// `none` (nothing to pre-render).
    module_setup: Option<Arc<BakedSetup>>,
}

/// The `pre` module: "Pre-render hook registration (built-in)".
#[derive(Debug, Default)]
pub struct Pre;

/// The single static instance registered under the name `pre`.
pub static PRE: Pre = Pre;

impl Module for Pre {
    fn name(&self) -> &'static str {
        "pre"
    }

    fn description(&self) -> &'static str {
        "Pre-render hook registration (built-in)"
    }

    fn author(&self) -> &'static str {
        "built-in"
    }

    fn flags(&self) -> ModuleFlags {
        ModuleFlags::BUILTIN
    }

    fn setup(&'static self, settings: &Settings) -> Result<SetupOutcome> {
        let outer_spec = SettingSpec {
            name: "Module to hook for pre-rendering",
            key: Some("module"),
            preferred: Some(DEFAULT_MODULE),
            as_nested_settings: true,
            as_label: true,
            ..SettingSpec::default()
        };

        let outer = match get_and_describe_setting(settings, &outer_spec)? {
            Found::Missing(desc) => return Ok(SetupOutcome::NeedsInput(desc)),
            Found::Setting(s) => s,
        };

        let nested = nested_settings(outer);

        let name_spec = SettingSpec {
            name: "Pre-rendering module name",
            key: None,
            preferred: Some(DEFAULT_MODULE),
            ..SettingSpec::default()
        };

        let chosen = match get_and_describe_setting(&nested, &name_spec)? {
            Found::Missing(desc) => return Ok(SetupOutcome::NeedsInput(desc)),
            Found::Setting(s) => s.key.clone(),
        };

        let module = crate::registry()
            .lookup(&chosen)
            .filter(|m| !m.flags().intersects(ModuleFlags::EXPERIMENTAL | ModuleFlags::HERMETIC))
            .ok_or_else(|| Error::NotFound(chosen.clone()))?;

        let module_setup = match module.setup(&nested)? {
            SetupOutcome::Baked(s) => Some(s),
            SetupOutcome::Disabled => None,
            SetupOutcome::NeedsInput(desc) => return Ok(SetupOutcome::NeedsInput(desc)),
        };

        Ok(SetupOutcome::Baked(BakedSetup::new(String::new(), self, PreSetup { module_setup })))
    }

    fn create_context(
        &'static self,
        setup: Arc<BakedSetup>,
        stream: Option<Arc<Stream>>,
        seed: u32,
        ticks: Tick,
        n_cpus: u32,
    ) -> Box<dyn ModuleContext> {
        let data = setup.downcast::<PreSetup>().expect("pre context always has PreSetup");

        let module_ctxt = data.module_setup.as_ref().map(|module_setup| {
            let mut child_seed = seed;
            let child_seed = setup::rand_r(&mut child_seed);
            let child = module_setup
                .creator
                .create_context(Arc::clone(module_setup), stream.clone(), child_seed, ticks, n_cpus);
            Arc::new(Mutex::new(child))
        });

        let context_id = stream.as_deref().map(|s| s.register_context(setup.path_hash));

        if let (Some(stream), Some(id), Some(module_ctxt)) = (stream.as_deref(), context_id, &module_ctxt) {
            let hook_ctxt = Arc::clone(module_ctxt);
            stream.add_pre_render_context(
                id,
                Arc::new(move |stream, ticks, pool, fragment| drive(&hook_ctxt, stream, ticks, pool, fragment)),
            );
        }

        Box::new(PreContext { setup, context_id, module_ctxt })
    }
}

fn drive(module_ctxt: &Mutex<Box<dyn ModuleContext>>, stream: Option<&Stream>, ticks: Tick, pool: Option<&ThreadPool>, fragment: &mut Fragment) {
    let mut guard = module_ctxt.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    context::render(&mut **guard, stream, ticks, pool, fragment);
}

struct PreContext {
    setup: Arc<BakedSetup>,
    context_id: Option<ContextId>,
    module_ctxt: Option<Arc<Mutex<Box<dyn ModuleContext>>>>,
}

impl ModuleContext for PreContext {
    fn setup(&self) -> &Arc<BakedSetup> {
        &self.setup
    }

    fn render_proxy(&mut self, stream: Option<&Stream>, ticks: Tick, pool: Option<&ThreadPool>, fragment: &mut Fragment) -> bool {
        if let Some(module_ctxt) = &self.module_ctxt {
            drive(module_ctxt, stream, ticks, pool, fragment);
        }
        true
    }

    fn destroy(self: Box<Self>, stream: Option<&Stream>) {
        if let (Some(stream), Some(id)) = (stream, self.context_id) {
            stream.unregister_context(id);
        }

        if let Some(module_ctxt) = self.module_ctxt {
            match Arc::try_unwrap(module_ctxt) {
                Ok(mutex) => mutex
                    .into_inner()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .destroy(stream),
                Err(_) => {
                    // Still referenced by a pre-render hook closure that
                    // outlives this call somehow; removing it above should
                    // have dropped the last other clone, so this shouldn't
                    // happen in practice.
                }
            }
        }
    }
}
