// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, Chrome trace export, and stream dumps for
//! diagnostics.
//!
//! This crate provides [`TraceSink`](mosaic_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`] — human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`] — compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`] — writes Chrome Trace Event Format JSON from
//!   recorded bytes.
//!
//! It also provides [`pipes::dump_pipes`], a callback-free snapshot of a
//! stream's live pipes for one-shot inspection (the REPL/debugger case,
//! as opposed to the continuous [`TraceSink`](mosaic_core::trace::TraceSink)
//! instrumentation above).

pub mod chrome;
pub mod pipes;
pub mod pretty;
pub mod recorder;
