// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A Rocket-style timeline sequencer: an outer module wrapping another
//! module, advancing a row counter from frame ticks and hijacking that
//! module's float/double taps to drive them from keyframed [`track::Track`]s
//! instead.
//!
//! Unlike a plain wrapper (see `mosaic_modules`'s `pre`), this installs
//! itself as the stream's [`PipeHooks`] so every new float/double pipe
//! created anywhere under the sequenced module gets a sibling tap backed by
//! a track, named `{parent_path}:{tap_name}`.

pub mod editor;
pub mod track;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use mosaic_core::context::{self, ModuleContext};
use mosaic_core::error::{Error, Result};
use mosaic_core::module::{Module, ModuleFlags, ModuleSelection, SetupOutcome};
use mosaic_core::settings::Settings;
use mosaic_core::setup::{BakedSetup, Found, SettingSpec, get_and_describe_setting};
use mosaic_core::stream::{ContextId, PipeHooks, Stream, Tap, TapValue, hash_parent_path};
use mosaic_core::threads::ThreadPool;
use mosaic_core::time::Tick;
use mosaic_core::fragment::Fragment;

use track::Track;

struct RocketSetup {
    module_setup: Arc<BakedSetup>,
    rows_per_ms: f64,
    connect: Option<(String, u16)>,
}

/// The `rocket` module: "Rocket-style timeline sequencer".
#[derive(Debug, Default)]
pub struct RocketSequencer;

/// The single static instance registered under the name `rocket`.
pub static ROCKET: RocketSequencer = RocketSequencer;

impl Module for RocketSequencer {
    fn name(&self) -> &'static str {
        "rocket"
    }

    fn description(&self) -> &'static str {
        "Rocket-style timeline sequencer"
    }

    fn author(&self) -> &'static str {
        "built-in"
    }

    fn flags(&self) -> ModuleFlags {
        ModuleFlags::HERMETIC | ModuleFlags::EXPERIMENTAL
    }

    fn setup(&'static self, settings: &Settings) -> Result<SetupOutcome> {
        let selection = mosaic_modules::registry().setup_full(settings, "seq_module", "noop", ModuleFlags::empty(), &["rocket"])?;
        let module = match selection {
            ModuleSelection::NeedsInput(desc) => return Ok(SetupOutcome::NeedsInput(desc)),
            ModuleSelection::Module(m) => m,
        };

        let module_setup = match module.setup(&Settings::new())? {
            SetupOutcome::Baked(s) => s,
            SetupOutcome::Disabled => return Err(Error::NotFound(module.name().to_string())),
            SetupOutcome::NeedsInput(desc) => return Ok(SetupOutcome::NeedsInput(desc)),
        };

        let bpm_spec = SettingSpec { name: "Beats per minute", key: Some("bpm"), preferred: Some("125"), ..SettingSpec::default() };
        let bpm = match get_and_describe_setting(settings, &bpm_spec)? {
            Found::Missing(desc) => return Ok(SetupOutcome::NeedsInput(desc)),
            Found::Setting(s) => parse_u32(s.value.as_deref().unwrap_or("125"), s)?,
        };

        let rpb_spec = SettingSpec { name: "Rows per beat", key: Some("rpb"), preferred: Some("8"), ..SettingSpec::default() };
        let rpb = match get_and_describe_setting(settings, &rpb_spec)? {
            Found::Missing(desc) => return Ok(SetupOutcome::NeedsInput(desc)),
            Found::Setting(s) => parse_u32(s.value.as_deref().unwrap_or("8"), s)?,
        };

        let connect_spec = SettingSpec {
            name: "Editor connection toggle",
            key: Some("connect"),
            preferred: Some("off"),
            values: &["off", "on"],
            ..SettingSpec::default()
        };
        let connect_on = match get_and_describe_setting(settings, &connect_spec)? {
            Found::Missing(desc) => return Ok(SetupOutcome::NeedsInput(desc)),
            Found::Setting(s) => s.value.as_deref().unwrap_or("off").eq_ignore_ascii_case("on"),
        };

        let connect = if connect_on {
            let host_spec = SettingSpec { name: "Editor host", key: Some("host"), preferred: Some("localhost"), ..SettingSpec::default() };
            let host = match get_and_describe_setting(settings, &host_spec)? {
                Found::Missing(desc) => return Ok(SetupOutcome::NeedsInput(desc)),
                Found::Setting(s) => s.value.clone().unwrap_or_default(),
            };

            let port_spec = SettingSpec { name: "Editor port", key: Some("port"), preferred: Some("1338"), ..SettingSpec::default() };
            let port = match get_and_describe_setting(settings, &port_spec)? {
                Found::Missing(desc) => return Ok(SetupOutcome::NeedsInput(desc)),
                Found::Setting(s) => parse_u16(s.value.as_deref().unwrap_or("1338"), s)?,
            };

            Some((host, port))
        } else {
            None
        };

        let rows_per_ms = f64::from(bpm * rpb) / (60.0 * 1000.0);

        Ok(SetupOutcome::Baked(BakedSetup::new(
            String::new(),
            self,
            RocketSetup { module_setup, rows_per_ms, connect },
        )))
    }

    fn create_context(
        &'static self,
        setup: Arc<BakedSetup>,
        stream: Option<Arc<Stream>>,
        seed: u32,
        ticks: Tick,
        n_cpus: u32,
    ) -> Box<dyn ModuleContext> {
        let data = setup.downcast::<RocketSetup>().expect("rocket context always has RocketSetup");

        let module_ctxt = Arc::new(Mutex::new(data.module_setup.creator.create_context(
            Arc::clone(&data.module_setup),
            stream.clone(),
            seed,
            ticks,
            n_cpus,
        )));

        let context_id = stream.as_deref().map(|s| s.register_context(setup.path_hash));

        let tracks = Arc::new(Mutex::new(HashMap::new()));
        let hijacked = Arc::new(Mutex::new(Vec::new()));

        if let (Some(stream), Some(owner)) = (stream.as_deref(), context_id) {
            let hooks = Arc::new(SequencerHooks { owner, tracks: Arc::clone(&tracks), hijacked: Arc::clone(&hijacked) });
            stream.set_hooks(Some(hooks as Arc<dyn PipeHooks>));

            if let Some((host, port)) = &data.connect {
                editor::spawn_client(host.clone(), *port, Arc::clone(&tracks));
            }
        }

        Box::new(RocketContext {
            setup,
            context_id,
            module_ctxt,
            tracks,
            hijacked,
            row: Mutex::new(0.0),
            last_ticks: Mutex::new(ticks),
            paused: std::sync::atomic::AtomicBool::new(false),
        })
    }
}

fn parse_u32(value: &str, setting: &mosaic_core::settings::Setting) -> Result<u32> {
    value.parse().map_err(|_| {
        Error::invalid(
            mosaic_core::setup::SettingRef::from(setting),
            mosaic_core::setup::SettingDesc {
                name: "integer".to_string(),
                key: Some(setting.key.clone()),
                ..mosaic_core::setup::SettingDesc::default()
            },
        )
    })
}

fn parse_u16(value: &str, setting: &mosaic_core::settings::Setting) -> Result<u16> {
    value.parse().map_err(|_| {
        Error::invalid(
            mosaic_core::setup::SettingRef::from(setting),
            mosaic_core::setup::SettingDesc {
                name: "port".to_string(),
                key: Some(setting.key.clone()),
                ..mosaic_core::setup::SettingDesc::default()
            },
        )
    })
}

/// A pipe that the sequencer has inserted a track-backed sibling tap onto,
/// tracked so [`RocketContext::advance`] can promote/demote it as its track
/// gains or loses keys.
struct HijackedPipe {
    parent_path: String,
    parent_hash: u32,
    /// The tap that originally created the pipe, kept so it can be marked
    /// inactive to hand driving over to [`Self::mine`].
    original: Tap,
    /// Our own track-backed sibling tap.
    mine: Tap,
    track_key: String,
}

struct SequencerHooks {
    owner: ContextId,
    tracks: Arc<Mutex<HashMap<String, Track>>>,
    hijacked: Arc<Mutex<Vec<HijackedPipe>>>,
}

impl PipeHooks for SequencerHooks {
    fn on_pipe_created(&self, stream: &Stream, parent_path: &str, driving: &Tap) {
        let initial = match driving.get() {
            TapValue::Float(_) => TapValue::Float(0.0),
            TapValue::Double(_) => TapValue::Double(0.0),
            _ => return,
        };

        let track_key = format!("{parent_path}:{}", driving.name());
        self.tracks.lock().unwrap_or_else(std::sync::PoisonError::into_inner).entry(track_key.clone()).or_insert_with(Track::new);

        let mine = Tap::new(driving.name(), initial);
        let parent_hash = hash_parent_path(parent_path);
        stream.tap(self.owner, parent_path, parent_hash, &mine);

        self.hijacked.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(HijackedPipe {
            parent_path: parent_path.to_string(),
            parent_hash,
            original: driving.clone(),
            mine,
            track_key,
        });
    }
}

struct RocketContext {
    setup: Arc<BakedSetup>,
    context_id: Option<ContextId>,
    module_ctxt: Arc<Mutex<Box<dyn ModuleContext>>>,
    tracks: Arc<Mutex<HashMap<String, Track>>>,
    hijacked: Arc<Mutex<Vec<HijackedPipe>>>,
    row: Mutex<f64>,
    last_ticks: Mutex<Tick>,
    paused: std::sync::atomic::AtomicBool,
}

impl RocketContext {
    /// Advances the row counter by the elapsed ticks (a no-op while paused)
    /// and, for each hijacked pipe, promotes our track-backed tap to driver
    /// when its track has keys (sampling the current row into it) or hands
    /// driving back to the original tap when it doesn't.
    fn advance(&self, stream: Option<&Stream>, ticks: Tick) -> f64 {
        let mut last_ticks = self.last_ticks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let elapsed = ticks.since(*last_ticks);
        *last_ticks = ticks;

        let data = self.setup.downcast::<RocketSetup>().expect("rocket context always has RocketSetup");
        let mut row = self.row.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if !self.paused.load(std::sync::atomic::Ordering::Acquire) {
            *row += f64::from(elapsed) * data.rows_per_ms;
        }
        let row = *row;

        let Some(stream) = stream else { return row };

        let tracks = self.tracks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let hijacked = self.hijacked.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for pipe in hijacked.iter() {
            let Some(track) = tracks.get(&pipe.track_key) else { continue };

            if track.is_empty() {
                pipe.mine.set_inactive(true);
                continue;
            }

            pipe.original.set_inactive(true);
            pipe.mine.set_inactive(false);
            stream.tap(self.setup_owner(), &pipe.parent_path, pipe.parent_hash, &pipe.mine);

            let value = track.sample(row);
            let typed = match pipe.mine.get() {
                TapValue::Float(_) => TapValue::Float(value as f32),
                TapValue::Double(_) => TapValue::Double(value),
                other => other,
            };
            pipe.mine.set(typed);
        }

        row
    }

    fn setup_owner(&self) -> ContextId {
        self.context_id.expect("hijacked pipes only exist when a stream (and thus a context id) was present")
    }
}

impl ModuleContext for RocketContext {
    fn setup(&self) -> &Arc<BakedSetup> {
        &self.setup
    }

    fn render_proxy(&mut self, stream: Option<&Stream>, ticks: Tick, pool: Option<&ThreadPool>, fragment: &mut Fragment) -> bool {
        self.advance(stream, ticks);

        let mut guard = self.module_ctxt.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        context::render(&mut **guard, stream, ticks, pool, fragment);
        true
    }

    fn destroy(self: Box<Self>, stream: Option<&Stream>) {
        if let (Some(stream), Some(id)) = (stream, self.context_id) {
            stream.unregister_context(id);
        }

        match Arc::try_unwrap(self.module_ctxt) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(std::sync::PoisonError::into_inner).destroy(stream),
            Err(_) => {}
        }
    }
}
