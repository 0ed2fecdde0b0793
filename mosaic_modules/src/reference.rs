// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The `ref` built-in: proxy-renders whatever context is registered at a
//! named path elsewhere on the same stream.
//!
//! Module file is named `reference` rather than `ref` since the latter is a
//! reserved keyword; the module itself is still registered and addressed as
//! `"ref"`.

use std::sync::Arc;

use mosaic_core::context::ModuleContext;
use mosaic_core::error::Result;
use mosaic_core::fragment::Fragment;
use mosaic_core::hash::jenkins_str;
use mosaic_core::module::{Module, ModuleFlags, SetupOutcome};
use mosaic_core::settings::Settings;
use mosaic_core::setup::{BakedSetup, Found, SettingSpec, get_and_describe_setting};
use mosaic_core::stream::{RenderHook, Stream};
use mosaic_core::threads::ThreadPool;
use mosaic_core::time::Tick;

struct ReferenceSetup {
    path: String,
    path_hash: u32,
}

/// The `ref` module: "Context referencer (built-in)".
#[derive(Debug, Default)]
pub struct Reference;

/// The single static instance registered under the name `ref`.
pub static REF: Reference = Reference;

impl Module for Reference {
    fn name(&self) -> &'static str {
        "ref"
    }

    fn description(&self) -> &'static str {
        "Context referencer (built-in)"
    }

    fn author(&self) -> &'static str {
        "built-in"
    }

    fn flags(&self) -> ModuleFlags {
        ModuleFlags::BUILTIN
    }

    fn setup(&'static self, settings: &Settings) -> Result<SetupOutcome> {
        let spec = SettingSpec {
            name: "Context path to reference",
            key: Some("path"),
            regex: Some("[a-zA-Z0-9/_]+"),
            preferred: Some(""),
            ..SettingSpec::default()
        };

        match get_and_describe_setting(settings, &spec)? {
            Found::Missing(desc) => Ok(SetupOutcome::NeedsInput(desc)),
            Found::Setting(setting) => {
                let path = setting.value.clone().unwrap_or_default();
                let path_hash = jenkins_str(&path);
                Ok(SetupOutcome::Baked(BakedSetup::new(
                    String::new(),
                    self,
                    ReferenceSetup { path, path_hash },
                )))
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
        Box::new(ReferenceContext { setup, resolved: None })
    }
}

struct ReferenceContext {
    setup: Arc<BakedSetup>,
    /// The referenced context's render entry point, cached once found so
    /// later frames don't repeat the stream lookup (mirrors caching the
    /// found context pointer on first success, not re-searching every
    /// frame).
    resolved: Option<RenderHook>,
}

impl ModuleContext for ReferenceContext {
    fn setup(&self) -> &Arc<BakedSetup> {
        &self.setup
    }

    fn render_proxy(&mut self, stream: Option<&Stream>, ticks: Tick, pool: Option<&ThreadPool>, fragment: &mut Fragment) -> bool {
        let data = self.setup.downcast::<ReferenceSetup>().expect("ref context always has ReferenceSetup");

        if self.resolved.is_none() {
            self.resolved = stream.and_then(|s| s.find_render_hooks(data.path_hash).into_iter().next());
        }

        match &self.resolved {
            Some(hook) => hook(stream, ticks, pool, fragment),
            None => draw_bad_path(fragment, &data.path),
        }

        true
    }

    fn destroy(self: Box<Self>, _stream: Option<&Stream>) {}
}

/// The referencing context's own path placeholder in the diagnostic row.
/// `ref` is one of the parameterless-path built-ins (DESIGN.md: every
/// built-in's `BakedSetup::new` call uses an empty-string placeholder
/// path), so there is no real path segment to print here.
const SELF_PATH_PLACEHOLDER: &str = "/...";

/// Clears `fragment` and writes a one-line diagnostic into its first row:
/// each character's ASCII code becomes that column's pixel value, clipped to
/// the fragment's width.
fn draw_bad_path(fragment: &mut Fragment, bad_path: &str) {
    fragment.clear();

    let message = format!("{SELF_PATH_PLACEHOLDER}: BAD PATH \"{bad_path}\"");
    for (col, ch) in message.chars().enumerate() {
        if !fragment.put_pixel_checked(col as u32, 0, ch as u32) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_core::context;
    use mosaic_core::settings::parse;
    use mosaic_core::time::Tick;

    fn bake(path: &str) -> Arc<BakedSetup> {
        match REF.setup(&parse(&format!("path={path}"))).expect("setup succeeds") {
            SetupOutcome::Baked(s) => s,
            _ => panic!("expected a baked setup"),
        }
    }

    #[test]
    fn missing_path_is_rejected_by_the_regex() {
        let err = REF.setup(&parse("path=bad path")).unwrap_err();
        assert!(matches!(err, mosaic_core::error::Error::InvalidSetting { .. }));
    }

    #[test]
    fn no_matching_context_draws_bad_path_diagnostic() {
        let stream = Stream::new();
        let setup = bake("/missing");
        let mut ctx = ReferenceContext { setup, resolved: None };
        let mut root = Fragment::new_root(64, 2);

        context::render(&mut ctx, Some(&stream), Tick::ZERO, None, &mut root);

        let expected = "/...: BAD PATH \"/missing\"";
        for (col, ch) in expected.chars().enumerate() {
            assert_eq!(root.get_pixel(col as u32, 0), ch as u32);
        }
    }

    #[test]
    fn matching_render_hook_is_invoked_and_cached() {
        let stream = Stream::new();
        let target = stream.register_context(jenkins_str("/found"));
        let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let calls_in_hook = Arc::clone(&calls);
        stream.set_render_hook(
            target,
            Arc::new(move |_stream, _ticks, _pool, fragment: &mut Fragment| {
                fragment.fill(0x00AB_CDEF);
                calls_in_hook.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }),
        );

        let setup = bake("/found");
        let mut ctx = ReferenceContext { setup, resolved: None };
        let mut root = Fragment::new_root(4, 4);

        context::render(&mut ctx, Some(&stream), Tick::ZERO, None, &mut root);
        context::render(&mut ctx, Some(&stream), Tick::ZERO, None, &mut root);

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert!(root.pixels().iter().all(|&p| p == 0x00AB_CDEF));
    }
}
