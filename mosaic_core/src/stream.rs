// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Streams: a process-wide hash table of named, typed pipes that modules
//! tap to publish or consume values without knowing about each other.
//!
//! A tap binds a name to a typed value cell. Tapping the same
//! `(name, parent_path)` pair from two contexts joins them onto one pipe:
//! whichever tap arrives first becomes the *driving* tap (the one that
//! writes); later arrivals become passengers that read the driving tap's
//! value instead of writing their own. A driving tap can yield by marking
//! itself [`Tap::set_inactive`], letting the next passenger to tap the
//! pipe take over driving.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::fragment::Fragment;
use crate::hash::jenkins_str;
use crate::threads::ThreadPool;
use crate::time::Tick;

const BUCKET_COUNT: usize = 256;

/// A registered context's own render entry point, captured as a closure so
/// another context (a referencer, or a pre-rendering hook) can drive a full
/// frame through it without this module needing to hand out the context
/// itself — which would otherwise tangle with [`crate::context::ModuleContext::destroy`]'s
/// ownership of a plain `Box<dyn ModuleContext>`.
pub type RenderHook = Arc<dyn Fn(Option<&Stream>, Tick, Option<&ThreadPool>, &mut Fragment) + Send + Sync>;

/// The type tag of a [`TapValue`], used to assert a pipe's producer and
/// consumers agree on shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TapType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Float,
    Double,
    V2F,
    V3F,
    V4F,
    M4F,
    VoidP,
}

/// A dynamically-typed tap value.
#[derive(Clone, Debug, PartialEq)]
pub enum TapValue {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Float(f32),
    Double(f64),
    V2F([f32; 2]),
    V3F([f32; 3]),
    V4F([f32; 4]),
    M4F([f32; 16]),
    VoidP(usize),
}

impl TapValue {
    /// This value's type tag.
    #[must_use]
    pub fn tap_type(&self) -> TapType {
        match self {
            Self::I8(_) => TapType::I8,
            Self::I16(_) => TapType::I16,
            Self::I32(_) => TapType::I32,
            Self::I64(_) => TapType::I64,
            Self::U8(_) => TapType::U8,
            Self::U16(_) => TapType::U16,
            Self::U32(_) => TapType::U32,
            Self::U64(_) => TapType::U64,
            Self::Float(_) => TapType::Float,
            Self::Double(_) => TapType::Double,
            Self::V2F(_) => TapType::V2F,
            Self::V3F(_) => TapType::V3F,
            Self::V4F(_) => TapType::V4F,
            Self::M4F(_) => TapType::M4F,
            Self::VoidP(_) => TapType::VoidP,
        }
    }
}

struct TapInner {
    name: String,
    name_hash: u32,
    inactive: AtomicBool,
    storage: Mutex<Arc<Mutex<TapValue>>>,
}

/// A named, typed binding a module uses to publish or consume a value on a
/// [`Stream`].
///
/// Cheaply `Clone`-able (an `Arc` handle); two clones of the same `Tap`
/// share identity for the purposes of [`Stream::tap`]'s "are we still the
/// driver" check.
#[derive(Clone)]
pub struct Tap(Arc<TapInner>);

impl Tap {
    /// Creates a tap named `name` with its own private initial storage.
    #[must_use]
    pub fn new(name: impl Into<String>, initial: TapValue) -> Self {
        let name = name.into();
        let name_hash = jenkins_str(&name);
        Self(Arc::new(TapInner {
            name,
            name_hash,
            inactive: AtomicBool::new(false),
            storage: Mutex::new(Arc::new(Mutex::new(initial))),
        }))
    }

    /// The tap's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Whether this tap has marked itself inactive, yielding drive to
    /// whichever passenger taps the pipe next.
    #[must_use]
    pub fn is_inactive(&self) -> bool {
        self.0.inactive.load(Ordering::Acquire)
    }

    /// Marks/unmarks this tap inactive.
    pub fn set_inactive(&self, inactive: bool) {
        self.0.inactive.store(inactive, Ordering::Release);
    }

    /// Reads the tap's current value (its own storage if driving, or
    /// whatever it was last rewired to by [`Stream::tap`]).
    #[must_use]
    pub fn get(&self) -> TapValue {
        let storage = self.0.storage.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        storage.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    /// Writes a new value. Only meaningful when this tap is the pipe's
    /// driver; a passenger's write would be invisible to the driver.
    pub fn set(&self, value: TapValue) {
        let storage = self.0.storage.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *storage.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = value;
    }

    fn tap_type(&self) -> TapType {
        self.storage_handle()
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .tap_type()
    }

    fn storage_handle(&self) -> Arc<Mutex<TapValue>> {
        Arc::clone(&self.0.storage.lock().unwrap_or_else(std::sync::PoisonError::into_inner))
    }

    fn rewire_to(&self, other: &Tap) {
        *self.0.storage.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = other.storage_handle();
    }

    fn identity_eq(a: &Tap, b: &Tap) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    fn storage_eq(a: &Tap, b: &Tap) -> bool {
        Arc::ptr_eq(&a.storage_handle(), &b.storage_handle())
    }
}

impl std::fmt::Debug for Tap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tap")
            .field("name", &self.0.name)
            .field("inactive", &self.is_inactive())
            .finish_non_exhaustive()
    }
}

/// A generational handle identifying a registered module context on a
/// [`Stream`], used as a [`Tap`] pipe's owner so [`Stream::untap_owner`]
/// can find and remove all of a destroyed context's pipes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId {
    idx: u32,
    generation: u32,
}

impl std::fmt::Debug for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContextId({}@gen{})", self.idx, self.generation)
    }
}

struct Pipe {
    owner: ContextId,
    parent_path: String,
    driving: Tap,
    hash: u32,
}

/// Outcome of [`Stream::tap`]: whether the caller's tap ended up driving
/// the pipe, and a shared handle to the value cell to read from (and, if
/// driving, write to).
pub struct TapOutcome {
    /// Whether the caller's [`Tap`] is the pipe's current driver.
    pub driving: bool,
    /// The pipe's current value storage.
    pub value: Arc<Mutex<TapValue>>,
}

struct ContextSlot {
    generation: u32,
    path_hash: Option<u32>,
}

/// A stream: a hash table of pipes plus a small registry mapping context
/// paths to the [`ContextId`]s live on this stream.
pub struct Stream {
    buckets: Mutex<Vec<Vec<Pipe>>>,
    contexts: Mutex<Vec<ContextSlot>>,
    by_path_hash: Mutex<HashMap<u32, Vec<ContextId>>>,
    render_hooks: Mutex<HashMap<ContextId, RenderHook>>,
    pre_render: Mutex<Vec<(ContextId, RenderHook)>>,
    next_generation: AtomicU32,
    hooks: Mutex<Option<Arc<dyn PipeHooks>>>,
    generation: AtomicU64,
}

/// Extensibility point for a single `(hooks, context)` pair attached to a
/// stream — used by a timeline sequencer to intercept every newly-created
/// pipe and decide whether to hijack its driving tap.
pub trait PipeHooks: Send + Sync {
    /// Called immediately after a new pipe is created, before
    /// [`Stream::tap`] returns. `driving` is the tap that just became the
    /// pipe's driver.
    fn on_pipe_created(&self, stream: &Stream, parent_path: &str, driving: &Tap);
}

impl Default for Stream {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream").finish_non_exhaustive()
    }
}

impl Stream {
    /// A fresh, empty stream.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new((0..BUCKET_COUNT).map(|_| Vec::new()).collect()),
            contexts: Mutex::new(Vec::new()),
            by_path_hash: Mutex::new(HashMap::new()),
            render_hooks: Mutex::new(HashMap::new()),
            pre_render: Mutex::new(Vec::new()),
            next_generation: AtomicU32::new(1),
            hooks: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Installs the stream's single pipe-hook extensibility point,
    /// replacing any previously installed hooks.
    pub fn set_hooks(&self, hooks: Option<Arc<dyn PipeHooks>>) {
        *self.hooks.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = hooks;
    }

    /// Registers a new context at `path_hash`, returning its id.
    pub fn register_context(&self, path_hash: u32) -> ContextId {
        let mut contexts = self.contexts.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);

        let idx = if let Some(free) = contexts.iter().position(|slot| slot.path_hash.is_none()) {
            contexts[free] = ContextSlot { generation, path_hash: Some(path_hash) };
            free as u32
        } else {
            contexts.push(ContextSlot { generation, path_hash: Some(path_hash) });
            (contexts.len() - 1) as u32
        };

        let id = ContextId { idx, generation };
        self.by_path_hash
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(path_hash)
            .or_default()
            .push(id);

        id
    }

    /// Publishes `id`'s render entry point so [`Self::find_render_hooks`]
    /// can drive a full frame through it from elsewhere (a referencer or a
    /// pre-rendering hook context). Contexts that are never referenced
    /// don't need to call this.
    pub fn set_render_hook(&self, id: ContextId, hook: RenderHook) {
        self.render_hooks.lock().unwrap_or_else(std::sync::PoisonError::into_inner).insert(id, hook);
    }

    /// Every render hook registered for contexts live at `path_hash`.
    #[must_use]
    pub fn find_render_hooks(&self, path_hash: u32) -> Vec<RenderHook> {
        let ids = self.find_module_contexts(path_hash);
        let hooks = self.render_hooks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        ids.iter().filter_map(|id| hooks.get(id).cloned()).collect()
    }

    /// Registers `hook` to be driven once per frame, ahead of the main
    /// render, by whatever host loop drains [`Self::pre_render_hooks`].
    /// Used by the `pre` built-in to wrap a nested module's own render
    /// cycle as a standing pre-render step.
    pub fn add_pre_render_context(&self, id: ContextId, hook: RenderHook) {
        self.pre_render.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push((id, hook));
    }

    /// Unregisters a previously added pre-render hook.
    pub fn remove_pre_render_context(&self, id: ContextId) {
        self.pre_render
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .retain(|(existing, _)| *existing != id);
    }

    /// Every currently registered pre-render hook, in registration order.
    #[must_use]
    pub fn pre_render_hooks(&self) -> Vec<RenderHook> {
        self.pre_render
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(|(_, hook)| Arc::clone(hook))
            .collect()
    }

    /// Unregisters a context, freeing its slot for reuse and removing all
    /// of its pipes (see [`Self::untap_owner`]), render hook, and pre-render
    /// registration.
    pub fn unregister_context(&self, id: ContextId) {
        self.untap_owner(id);
        self.render_hooks.lock().unwrap_or_else(std::sync::PoisonError::into_inner).remove(&id);
        self.remove_pre_render_context(id);

        let mut contexts = self.contexts.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(slot) = contexts.get_mut(id.idx as usize) {
            if slot.generation == id.generation {
                if let Some(path_hash) = slot.path_hash.take() {
                    let mut by_path = self.by_path_hash.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                    if let Some(ids) = by_path.get_mut(&path_hash) {
                        ids.retain(|existing| *existing != id);
                    }
                }
            }
        }
    }

    /// Every live context id registered at `path_hash`.
    #[must_use]
    pub fn find_module_contexts(&self, path_hash: u32) -> Vec<ContextId> {
        self.by_path_hash
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&path_hash)
            .cloned()
            .unwrap_or_default()
    }

    /// Taps `candidate` onto the pipe named `(candidate.name(), parent_path)`.
    ///
    /// Creates the pipe (with `candidate` as driver) if this is the first
    /// tap; otherwise joins the existing pipe, becoming a passenger unless
    /// the existing driver is inactive, in which case `candidate` takes
    /// over driving. A type mismatch between an existing pipe's driver and
    /// `candidate` is a contract violation and panics, matching a
    /// programming error rather than a recoverable condition.
    pub fn tap(&self, owner: ContextId, parent_path: &str, parent_hash: u32, candidate: &Tap) -> TapOutcome {
        let hash = candidate.0.name_hash ^ parent_hash;
        let bucket_idx = (hash as usize) % BUCKET_COUNT;

        let outcome = {
            let mut buckets = self.buckets.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let bucket = &mut buckets[bucket_idx];

            let mut found = None;
            for pipe in bucket.iter_mut() {
                if pipe.hash != hash {
                    continue;
                }

                if Tap::identity_eq(&pipe.driving, candidate) {
                    found = Some(TapOutcome { driving: true, value: candidate.storage_handle() });
                    break;
                }

                if Tap::storage_eq(&pipe.driving, candidate)
                    || (pipe.driving.name() == candidate.name() && pipe.parent_path == parent_path)
                {
                    assert_eq!(
                        pipe.driving.tap_type(),
                        candidate.tap_type(),
                        "tap {:?} type mismatch joining existing pipe",
                        candidate.name(),
                    );

                    if pipe.driving.is_inactive() {
                        pipe.driving = candidate.clone();
                    } else {
                        candidate.rewire_to(&pipe.driving);
                    }

                    let driving = Tap::identity_eq(&pipe.driving, candidate);
                    found = Some(TapOutcome { driving, value: pipe.driving.storage_handle() });
                    break;
                }
            }

            match found {
                Some(outcome) => (outcome, false),
                None => {
                    bucket.push(Pipe {
                        owner,
                        parent_path: parent_path.to_string(),
                        driving: candidate.clone(),
                        hash,
                    });
                    (TapOutcome { driving: true, value: candidate.storage_handle() }, true)
                }
            }
        };

        let (outcome, newly_created) = outcome;
        if newly_created {
            if let Some(hooks) = self.hooks.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone() {
                hooks.on_pipe_created(self, parent_path, candidate);
            }
        }

        outcome
    }

    /// Removes every pipe owned by `owner`.
    pub fn untap_owner(&self, owner: ContextId) {
        let mut buckets = self.buckets.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for bucket in buckets.iter_mut() {
            bucket.retain(|pipe| pipe.owner != owner);
        }
    }

    /// Calls `f` with each pipe's parent path and driving tap, in bucket
    /// order, for introspection/debugging.
    pub fn for_each_pipe(&self, mut f: impl FnMut(&str, &Tap)) {
        let buckets = self.buckets.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for bucket in buckets.iter() {
            for pipe in bucket {
                f(&pipe.parent_path, &pipe.driving);
            }
        }
    }

    /// A monotonically increasing counter bumped once per frame, so hook
    /// implementations (e.g. a sequencer re-installing itself every frame)
    /// can tell frames apart without a separate channel.
    pub fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst)
    }
}

impl PartialEq for ContextId {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx && self.generation == other.generation
    }
}
impl Eq for ContextId {}

/// Convenience for building the `parent_hash` argument to [`Stream::tap`]
/// from a path string, matching how a pipe's hash folds in its parent
/// path's hash rather than the literal path.
#[must_use]
pub fn hash_parent_path(parent_path: &str) -> u32 {
    jenkins_str(parent_path)
}
