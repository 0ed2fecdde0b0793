// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core runtime for composing threaded procedural-animation modules into
//! frames.
//!
//! `mosaic_core` provides the foundational machinery a real-time visual host
//! needs to turn a tree of pluggable "modules" into rasterized frames:
//! interactively-buildable settings, a resumable setup pipeline, a fixed
//! worker pool that cooperatively rasterizes fragments, and a process-wide
//! stream of named, typed "taps" that lets independent contexts discover,
//! drive, and observe each other's parameters.
//!
//! # Architecture
//!
//! A frame is driven end to end by [`context::render`]:
//!
//! ```text
//!   Host ── acquire page ──► render(root, stream, ticks, &mut fragment)
//!                                  │
//!                    ┌─────────────┴──────────────┐
//!                    ▼                             │
//!          prepare_frame ──► FramePlan              │ (render_proxy may
//!                    │                              │  redirect entirely)
//!                    ▼                              │
//!         ThreadPool::submit(fragmenter) ───────────►┘
//!                    │
//!                    ▼
//!              finish_frame ──► page_put / page_flip
//! ```
//!
//! **[`fragment`]** — [`Fragment`](fragment::Fragment) views and the
//! [`Framebuffer`](fragment::Framebuffer) page-queue abstraction backends
//! implement.
//!
//! **[`fragmenter`]** — Built-in fragmenters (`slice_per_cpu`,
//! `slice_per_cpu_x16`, `tile64`) that carve a fragment into sub-regions for
//! the worker pool.
//!
//! **[`settings`]** — Ordered, nestable key/value [`Settings`](settings::Settings)
//! trees parsed from and serialized back to a flat string.
//!
//! **[`setup`]** — The interactively-resumable descriptor-driven pipeline
//! that turns a settings tree into an immutable [`BakedSetup`](setup::BakedSetup).
//!
//! **[`module`]** — The [`Module`](module::Module) trait (the runtime's
//! "vtable"), module flags, and the link-time [`registry`](module::registry).
//!
//! **[`context`]** — [`ModuleContext`](context::ModuleContext), context
//! creation/destruction, and the [`render`](context::render) dispatcher.
//!
//! **[`threads`]** — The fixed [`ThreadPool`](threads::ThreadPool) that
//! cooperatively rasterizes a frame's fragments.
//!
//! **[`stream`]** — [`Stream`](stream::Stream), [`Tap`](stream::Tap) and
//! [`Pipe`](stream::Pipe): the process-wide registry that joins tap
//! endpoints into driver/passenger pipes and indexes module contexts by
//! path.
//!
//! **[`hash`]** — The Jenkins one-at-a-time hash used for path and tap-name
//! hashing throughout the stream.
//!
//! **[`time`]** — [`Tick`](time::Tick), a monotonic millisecond timestamp.
//!
//! **[`cpu`]** — Logical CPU count discovery.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! frame-loop instrumentation, with a zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! **[`error`]** — [`Error`](error::Error), the POSIX-errno-flavored result
//! type returned by setup and registry operations.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): enables `Tracer` method bodies (one
//!   branch per call site).
//! - `trace-rich` (disabled by default, implies `trace`): gates per-fragment
//!   and per-pipe event payloads.
//!
//! # Divergence from a `no_std` layer-tree sibling
//!
//! Unlike a purely declarative scene graph, the subsystems here are
//! inherently multi-threaded (a condvar-synchronized worker pool) and
//! string-parsing heavy (the settings FSM), so this crate requires `std`
//! unconditionally rather than gating it behind a feature.

pub mod context;
pub mod cpu;
pub mod error;
pub mod fragment;
pub mod fragmenter;
pub mod hash;
pub mod module;
pub mod settings;
pub mod setup;
pub mod stream;
pub mod threads;
pub mod time;
pub mod trace;

pub use error::Error;
