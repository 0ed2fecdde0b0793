// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`Module`] trait and the link-time registry of built-ins.
//!
//! A module is a stateless descriptor (name, description, author, flags)
//! plus three entry points: `setup` turns a settings string into a baked
//! setup, `create_context` turns a baked setup into a live
//! [`crate::context::ModuleContext`], and the render callbacks on that
//! context do the actual per-frame work. Modules never carry their own
//! mutable state — all of that lives in the context they create.

use std::sync::Arc;

use crate::context::ModuleContext;
use crate::error::Result;
use crate::settings::Settings;
use crate::setup::{BakedSetup, Found, SettingSpec};
use crate::stream::Stream;

bitflags::bitflags! {
    /// Capability/behavior flags a module advertises about itself.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ModuleFlags: u32 {
        /// Appropriate for use as an overlay atop another module's output.
        const OVERLAYABLE = 1 << 0;
        /// Doesn't work readily composed with other modules without manual
        /// settings (e.g. expects to own the whole frame).
        const HERMETIC = 1 << 1;
        /// Buggy or unfinished; excluded from "pick anything" selection by
        /// default.
        const EXPERIMENTAL = 1 << 2;
        /// Implements built-in plumbing (blank/noop/none/ref/pre) rather
        /// than a user-visible animation.
        const BUILTIN = 1 << 3;
    }
}

/// The outcome of a module's `setup` entry point: either a fully baked
/// setup, or a descriptor for the next setting the caller must supply.
pub enum SetupOutcome {
    /// Setup is complete.
    Baked(Arc<BakedSetup>),
    /// More input is needed; retry after supplying a setting matching this
    /// descriptor.
    NeedsInput(crate::setup::SettingDesc),
    /// Valid, but intentionally produces no setup at all — a sentinel for
    /// "not configured" (see the `none` built-in). Callers must not call
    /// `create_context` for a module that answered this.
    Disabled,
}

/// A module: the static descriptor plus its setup/context-creation entry
/// points.
///
/// Implementors are plain `static` values; a crate of built-ins exposes its
/// set as a `&'static [&'static dyn Module]` slice, which callers wrap in a
/// [`Registry`] to look up and filter.
pub trait Module: Send + Sync {
    /// Machine-readable, case-insensitively-unique name.
    fn name(&self) -> &'static str;

    /// One-line human description.
    fn description(&self) -> &'static str;

    /// Author attribution.
    fn author(&self) -> &'static str;

    /// Capability/behavior flags.
    fn flags(&self) -> ModuleFlags {
        ModuleFlags::empty()
    }

    /// Validates `settings` and, once everything required is present,
    /// bakes it into an immutable setup. Safe to call repeatedly as the
    /// tree is filled in from outside; see [`crate::setup`].
    fn setup(&'static self, settings: &Settings) -> Result<SetupOutcome>;

    /// Creates a live context from a previously baked setup.
    fn create_context(
        &'static self,
        setup: Arc<BakedSetup>,
        stream: Option<Arc<Stream>>,
        seed: u32,
        ticks: crate::time::Tick,
        n_cpus: u32,
    ) -> Box<dyn ModuleContext>;
}

impl std::fmt::Debug for dyn Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module").field("name", &self.name()).finish_non_exhaustive()
    }
}

/// A flat, link-time-fixed set of modules (typically a crate's entire
/// built-in or animation module list), queryable by name and filterable by
/// flags/exclusion list.
#[derive(Clone, Copy)]
pub struct Registry {
    modules: &'static [&'static dyn Module],
}

impl Registry {
    /// Wraps a static module slice as a registry.
    #[must_use]
    pub const fn new(modules: &'static [&'static dyn Module]) -> Self {
        Self { modules }
    }

    /// Looks up a module by case-insensitive name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&'static dyn Module> {
        self.modules.iter().find(|m| m.name().eq_ignore_ascii_case(name)).copied()
    }

    /// Every module whose flags don't intersect `flags_excluded` and whose
    /// name isn't in `exclusions`.
    #[must_use]
    pub fn list(&self, flags_excluded: ModuleFlags, exclusions: &[&str]) -> Vec<&'static dyn Module> {
        self.modules
            .iter()
            .copied()
            .filter(|m| !m.flags().intersects(flags_excluded))
            .filter(|m| !exclusions.iter().any(|excl| excl.eq_ignore_ascii_case(m.name())))
            .collect()
    }

    /// Resolves a module named by `name_key` in `settings` (defaulting to
    /// `preferred`), honoring `flags_excluded`/`exclusions`. Folds the
    /// common "setup a module by name" call site into one step.
    pub fn setup_full(
        &self,
        settings: &Settings,
        name_key: &str,
        preferred: &str,
        flags_excluded: ModuleFlags,
        exclusions: &[&str],
    ) -> Result<ModuleSelection> {
        let spec = SettingSpec {
            name: "Module",
            key: Some(name_key),
            preferred: Some(preferred),
            values: &[],
            ..SettingSpec::default()
        };

        match crate::setup::get_and_describe_setting(settings, &spec)? {
            Found::Missing(desc) => Ok(ModuleSelection::NeedsInput(desc)),
            Found::Setting(setting) => {
                let chosen = setting.value.as_deref().unwrap_or(preferred);

                if exclusions.iter().any(|e| e.eq_ignore_ascii_case(chosen)) {
                    return Err(crate::error::Error::NotFound(chosen.to_string()));
                }

                let module = self
                    .lookup(chosen)
                    .ok_or_else(|| crate::error::Error::NotFound(chosen.to_string()))?;

                if module.flags().intersects(flags_excluded) {
                    return Err(crate::error::Error::NotFound(chosen.to_string()));
                }

                Ok(ModuleSelection::Module(module))
            }
        }
    }
}

/// The outcome of [`setup_full`].
pub enum ModuleSelection {
    /// A module was resolved.
    Module(&'static dyn Module),
    /// The settings tree doesn't yet name a module; supply one matching
    /// this descriptor and retry.
    NeedsInput(crate::setup::SettingDesc),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_intersect_correctly() {
        let f = ModuleFlags::BUILTIN | ModuleFlags::HERMETIC;
        assert!(f.contains(ModuleFlags::BUILTIN));
        assert!(!f.contains(ModuleFlags::OVERLAYABLE));
    }

    struct Stub(&'static str, ModuleFlags);

    impl Module for Stub {
        fn name(&self) -> &'static str {
            self.0
        }
        fn description(&self) -> &'static str {
            "stub"
        }
        fn author(&self) -> &'static str {
            "test"
        }
        fn flags(&self) -> ModuleFlags {
            self.1
        }
        fn setup(&'static self, _settings: &Settings) -> Result<SetupOutcome> {
            unimplemented!("not exercised by registry tests")
        }
        fn create_context(
            &'static self,
            _setup: Arc<BakedSetup>,
            _stream: Option<Arc<Stream>>,
            _seed: u32,
            _ticks: crate::time::Tick,
            _n_cpus: u32,
        ) -> Box<dyn ModuleContext> {
            unimplemented!("not exercised by registry tests")
        }
    }

    static BLANK: Stub = Stub("blank", ModuleFlags::BUILTIN);
    static DEMO: Stub = Stub("demo", ModuleFlags::EXPERIMENTAL);
    static MODULES: &[&dyn Module] = &[&BLANK, &DEMO];

    #[test]
    fn lookup_is_case_insensitive() {
        let reg = Registry::new(MODULES);
        assert!(reg.lookup("BLANK").is_some());
        assert!(reg.lookup("missing").is_none());
    }

    #[test]
    fn list_filters_by_flags_and_exclusions() {
        let reg = Registry::new(MODULES);
        let included = reg.list(ModuleFlags::EXPERIMENTAL, &[]);
        assert_eq!(included.len(), 1);
        assert_eq!(included[0].name(), "blank");

        let excluded_by_name = reg.list(ModuleFlags::empty(), &["blank"]);
        assert_eq!(excluded_by_name.len(), 1);
        assert_eq!(excluded_by_name[0].name(), "demo");
    }
}
