// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The interactive, resumable settings-to-setup pipeline.
//!
//! A module's `setup` function walks its settings tree one
//! [`SettingSpec`] at a time via [`get_and_describe_setting`]: each call
//! either finds a matching, valid [`Setting`] or returns a [`SettingDesc`]
//! describing what must be supplied next. The whole function is safe to
//! call any number of times with the settings in any partially-filled
//! state — it always re-derives the same answer for the same tree
//! ([`Outcome::Done`] once every setting is present and valid). A final
//! pass with baking enabled produces an immutable, ref-counted
//! [`BakedSetup`].

use std::any::Any;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::hash::jenkins_str;
use crate::module::Module;
use crate::settings::{self, Setting, Settings};

/// A lightweight, owned snapshot of a [`Setting`] for error reporting —
/// detached from the tree's lifetime so it can travel inside [`Error`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettingRef {
    /// The offending entry's key.
    pub key: String,
    /// The offending entry's value, if present.
    pub value: Option<String>,
}

impl From<&Setting> for SettingRef {
    fn from(s: &Setting) -> Self {
        Self {
            key: s.key.clone(),
            value: s.value.clone(),
        }
    }
}

/// A schema for one setting: human name, key, optional validation regex, a
/// preferred/default value, an optional finite set of legal values (with
/// parallel annotations), and behavioral flags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettingDesc {
    /// Human-readable name, for prompting an interactive frontend.
    pub name: String,
    /// The settings-tree key this descriptor answers. `None` means the
    /// setting is addressed positionally rather than by key (a bare value).
    pub key: Option<String>,
    /// Optional validation regex source.
    pub regex: Option<String>,
    /// Preferred/default value, used when randomizing or when a caller
    /// wants a sensible one-shot default.
    pub preferred: Option<String>,
    /// A finite list of legal values, or empty for unconstrained.
    pub values: Vec<String>,
    /// Annotations parallel to `values` (same length when non-empty),
    /// e.g. human descriptions of each choice.
    pub annotations: Vec<Option<String>>,
    /// Whether the value should be parsed as a nested settings string.
    pub as_nested_settings: bool,
    /// Whether the value (verbatim) becomes the next context-path segment,
    /// rather than a synthesized `key=value`/positional segment.
    pub as_label: bool,
}

impl SettingDesc {
    /// Builds a [`SettingDesc`] describing a required `key` with no value
    /// constraints.
    #[must_use]
    pub fn keyed(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: Some(key.into()),
            ..Self::default()
        }
    }
}

/// The call-site template used to drive one [`get_and_describe_setting`]
/// step. Borrowed rather than owned since it's typically built inline at
/// each call site.
#[derive(Clone, Copy, Debug, Default)]
pub struct SettingSpec<'a> {
    /// Human-readable name.
    pub name: &'a str,
    /// The key this spec answers, or `None` for a positional bare value.
    pub key: Option<&'a str>,
    /// Optional validation regex source.
    pub regex: Option<&'a str>,
    /// Preferred/default value.
    pub preferred: Option<&'a str>,
    /// A finite list of legal values, or empty for unconstrained.
    pub values: &'a [&'a str],
    /// Whether the value should be parsed as nested settings.
    pub as_nested_settings: bool,
    /// Whether the value becomes the next path segment verbatim.
    pub as_label: bool,
}

impl SettingSpec<'_> {
    fn to_desc(self) -> SettingDesc {
        SettingDesc {
            name: self.name.to_string(),
            key: self.key.map(str::to_string),
            regex: self.regex.map(str::to_string),
            preferred: self.preferred.map(str::to_string),
            values: self.values.iter().map(|s| (*s).to_string()).collect(),
            annotations: Vec::new(),
            as_nested_settings: self.as_nested_settings,
            as_label: self.as_label,
        }
    }

    fn validate(&self, value: &str) -> bool {
        if !self.values.is_empty() && !self.values.iter().any(|v| v.eq_ignore_ascii_case(value)) {
            return false;
        }
        if let Some(pattern) = self.regex {
            match regex_lite_match(pattern, value) {
                Some(matched) => {
                    if !matched {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }
}

/// A minimal anchored-substring regex matcher covering the character-class
/// patterns built-in modules actually use (e.g. `[a-zA-Z0-9/_]+`), without
/// pulling in a full regex engine for one validation call per setting.
///
/// Returns `None` if the pattern isn't one of the supported shapes (treated
/// as "can't validate, reject defensively" by the caller).
fn regex_lite_match(pattern: &str, value: &str) -> Option<bool> {
    // Supported shape: `[<class>]+` where `<class>` is a run of literal
    // chars and `a-z`/`A-Z`/`0-9`-style ranges.
    let inner = pattern.strip_prefix('[')?.strip_suffix("]+")?;

    let mut ranges: Vec<(char, char)> = Vec::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if let Some(&next) = chars.peek() {
            if next == '-' {
                chars.next();
                if let Some(hi) = chars.next() {
                    ranges.push((c, hi));
                    continue;
                }
            }
        }
        ranges.push((c, c));
    }

    if value.is_empty() {
        return Some(false);
    }

    Some(value.chars().all(|c| ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi)))
}

/// The outcome of one [`get_and_describe_setting`] step.
pub enum Found<'s> {
    /// A valid, present setting was found.
    Setting(&'s Setting),
    /// No matching setting was present; the caller should supply one
    /// satisfying this descriptor and retry.
    Missing(SettingDesc),
}

/// Walks `settings` looking for the entry described by `spec`.
///
/// Returns `Ok(Found::Setting(_))` if present and valid, `Ok(Found::Missing(_))`
/// if absent, or `Err(Error::InvalidSetting)` if present but fails
/// validation (wrong value, unmatched regex).
///
/// This is the resumable primitive every built-in module's `setup`
/// function is built from: called repeatedly as settings are filled in
/// from outside, it always re-derives the same classification for the
/// same tree.
pub fn get_and_describe_setting<'s>(settings: &'s Settings, spec: &SettingSpec<'_>) -> Result<Found<'s>> {
    let found = match spec.key {
        Some(key) => settings.get(key),
        // A `None` key addresses the first bare (key-only) positional
        // entry in the tree — e.g. a module name given with no `key=`.
        None => settings.iter().find(|s| s.value.is_none()),
    };

    let Some(setting) = found else {
        return Ok(Found::Missing(spec.to_desc()));
    };

    if let Some(value) = &setting.value {
        if !spec.validate(value) {
            return Err(Error::invalid(setting.into(), spec.to_desc()));
        }
    }

    Ok(Found::Setting(setting))
}

/// Convenience over [`get_and_describe_setting`] for callers that only need
/// the value string (defaulting to `spec.preferred`, or `""` if both the
/// value and preferred are absent) — used by descriptors where a value is
/// required and an empty reading would be a developer error in `spec`
/// itself, not a recoverable setup error.
pub fn get_and_describe_value<'s>(
    settings: &'s Settings,
    spec: &SettingSpec<'_>,
) -> Result<Found<'s>> {
    get_and_describe_setting(settings, spec)
}

/// An immutable, validated, ref-counted setup object produced by a
/// module's `setup` function.
///
/// Carries the canonical `/`-separated context path (and its cached hash),
/// a back-reference to the module that created it, and the module's own
/// typed, baked settings payload. Multiple contexts may share one
/// `Arc<BakedSetup>`; Rust's own reference counting replaces the manual
/// refcount and destructor-on-zero dance a non-GC host language needs.
pub struct BakedSetup {
    /// Canonical, baked context path.
    pub path: String,
    /// Jenkins hash of `path`, cached at bake time.
    pub path_hash: u32,
    /// The module that produced this setup.
    pub creator: &'static dyn Module,
    data: Box<dyn Any + Send + Sync>,
}

impl BakedSetup {
    /// Bakes a new setup at `path`, owned by `creator`, carrying `data` as
    /// the module's typed configuration payload.
    #[must_use]
    pub fn new<T: Send + Sync + 'static>(path: String, creator: &'static dyn Module, data: T) -> Arc<Self> {
        let path_hash = jenkins_str(&path);
        Arc::new(Self {
            path,
            path_hash,
            creator,
            data: Box::new(data),
        })
    }

    /// Downcasts to the module-specific payload type.
    #[must_use]
    pub fn downcast<T: 'static>(&self) -> Option<&T> {
        self.data.downcast_ref()
    }
}

impl std::fmt::Debug for BakedSetup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BakedSetup")
            .field("path", &self.path)
            .field("path_hash", &self.path_hash)
            .field("creator", &self.creator.name())
            .finish_non_exhaustive()
    }
}

/// Synthesizes the next path segment for `setting`.
///
/// A setting marked `as_label` contributes its value verbatim. Otherwise a
/// `key=value` segment is synthesized for keyed settings, or a bare
/// positional index for key-only bare values.
#[must_use]
pub fn path_segment(setting: &Setting, index: usize, as_label: bool) -> String {
    if as_label {
        return setting.value.clone().unwrap_or_else(|| setting.key.clone());
    }

    match &setting.value {
        Some(v) => format!("{}={v}", setting.key),
        None => index.to_string(),
    }
}

/// Joins a parent path and a freshly synthesized segment with `/`.
#[must_use]
pub fn join_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() || parent == "/" {
        format!("/{segment}")
    } else {
        format!("{parent}/{segment}")
    }
}

/// A simple seeded linear-congruential generator standing in for libc's
/// `rand_r`, used to pick a value when a descriptor's `random` generator is
/// absent (falling back to a uniform pick from `values`, or `preferred`).
pub fn rand_r(seed: &mut u32) -> u32 {
    *seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
    (*seed >> 16) & 0x7fff
}

/// Parses `setting`'s value as a nested settings string, as indicated by a
/// descriptor's `as_nested_settings` flag.
///
/// Parsed fresh on every call rather than cached into `setting.nested`,
/// since `Module::setup` only ever sees `&Settings` — reparsing a handful of
/// short strings during interactive setup isn't worth threading mutability
/// through the whole pipeline for.
#[must_use]
pub fn nested_settings(setting: &Setting) -> Settings {
    settings::parse(setting.value.as_deref().unwrap_or(""))
}

/// Picks a value for `spec` the way an unattended ("randomize everything")
/// setup driver would: a descriptor-specific `random` hook always wins in
/// the original design; absent one, a uniform pick among `values`, falling
/// back to `preferred`, falling back to the empty string.
#[must_use]
pub fn randomize_value(spec: &SettingSpec<'_>, seed: &mut u32) -> String {
    if !spec.values.is_empty() {
        let idx = (rand_r(seed) as usize) % spec.values.len();
        return spec.values[idx].to_string();
    }
    spec.preferred.unwrap_or("").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::parse;

    #[test]
    fn missing_setting_yields_descriptor() {
        let settings = parse("");
        let spec = SettingSpec {
            name: "Force clearing",
            key: Some("force"),
            preferred: Some("off"),
            values: &["off", "on"],
            ..SettingSpec::default()
        };

        match get_and_describe_setting(&settings, &spec).expect("no validation error") {
            Found::Missing(desc) => {
                assert_eq!(desc.key.as_deref(), Some("force"));
                assert_eq!(desc.preferred.as_deref(), Some("off"));
            }
            Found::Setting(_) => panic!("expected Missing"),
        }
    }

    #[test]
    fn present_valid_setting_is_found() {
        let settings = parse("force=on");
        let spec = SettingSpec {
            name: "Force clearing",
            key: Some("force"),
            preferred: Some("off"),
            values: &["off", "on"],
            ..SettingSpec::default()
        };

        match get_and_describe_setting(&settings, &spec).expect("valid") {
            Found::Setting(s) => assert_eq!(s.value.as_deref(), Some("on")),
            Found::Missing(_) => panic!("expected Setting"),
        }
    }

    #[test]
    fn invalid_value_surfaces_einval_equivalent() {
        let settings = parse("force=maybe");
        let spec = SettingSpec {
            name: "Force clearing",
            key: Some("force"),
            preferred: Some("off"),
            values: &["off", "on"],
            ..SettingSpec::default()
        };

        let err = get_and_describe_setting(&settings, &spec).unwrap_err();
        assert!(matches!(err, Error::InvalidSetting { .. }));
    }

    #[test]
    fn regex_validates_path_like_values() {
        let settings = parse("path=foo/bar_1");
        let spec = SettingSpec {
            name: "Context path",
            key: Some("path"),
            regex: Some("[a-zA-Z0-9/_]+"),
            ..SettingSpec::default()
        };
        assert!(matches!(
            get_and_describe_setting(&settings, &spec).expect("valid"),
            Found::Setting(_)
        ));

        let bad = parse("path=foo bar");
        assert!(get_and_describe_setting(&bad, &spec).is_err());
    }

    #[test]
    fn path_segment_uses_label_verbatim() {
        let s = Setting::with_value("module", "compose");
        assert_eq!(path_segment(&s, 0, true), "compose");
    }

    #[test]
    fn path_segment_synthesizes_key_value_otherwise() {
        let s = Setting::with_value("force", "on");
        assert_eq!(path_segment(&s, 0, false), "force=on");
    }

    #[test]
    fn path_segment_falls_back_to_index_for_bare_values() {
        let s = Setting::key_only("blank");
        assert_eq!(path_segment(&s, 2, false), "2");
    }

    #[test]
    fn randomize_picks_uniformly_among_values() {
        let spec = SettingSpec {
            name: "x",
            values: &["off", "on"],
            ..SettingSpec::default()
        };
        let mut seed = 42;
        for _ in 0..10 {
            let v = randomize_value(&spec, &mut seed);
            assert!(v == "off" || v == "on");
        }
    }
}
