// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Instrumentation for the per-frame render dispatcher.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! [`crate::context::render`] calls at each stage. All method bodies default
//! to no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace`
//! feature is **off**, every `Tracer` method compiles to nothing (zero
//! overhead). When **on**, each method performs a single `Option` branch
//! before dispatching.
//!
//! [`FrameSummaryBuilder`] is a convenience helper that collects phase
//! timestamps during a frame and produces a [`FrameSummary`] at the end.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) — gates per-fragment dispatch events.

use crate::time::Tick;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of a frame is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// `ModuleContext::prepare_frame`.
    Prepare,
    /// The (possibly threaded) `render_fragment` span.
    Render,
    /// `ModuleContext::finish_frame`.
    Finish,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when [`crate::context::render`] begins a frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameBeginEvent {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// The tick the frame is being rendered at.
    pub ticks: Tick,
}

/// Marks the beginning of a frame phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Tick at the start of the phase.
    pub ticks: Tick,
}

/// Marks the end of a frame phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Tick at the end of the phase.
    pub ticks: Tick,
}

/// Emitted once per sub-fragment dispatched to a worker (requires
/// `trace-rich`).
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct FragmentDispatchEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which worker rendered this fragment.
    pub cpu: u32,
    /// The fragment's position in dispatch order.
    pub fragment_number: u32,
}

/// Per-frame timing summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Tick the frame was rendered at.
    pub ticks: Tick,
    /// `prepare_frame` duration in milliseconds (0 if not measured).
    pub prepare_ms: u32,
    /// `render_fragment` span duration in milliseconds (0 if not measured).
    pub render_ms: u32,
    /// `finish_frame` duration in milliseconds (0 if not measured).
    pub finish_ms: u32,
    /// Number of fragments rendered this frame (1 for an unthreaded frame).
    pub fragments_rendered: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the render dispatcher.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a frame begins.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called at the beginning of a frame phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a frame phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called once per dispatched fragment (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    fn on_fragment_dispatch(&mut self, e: &FragmentDispatchEvent) {
        _ = e;
    }

    /// Called with a per-frame timing summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FrameBeginEvent`].
    #[inline]
    pub fn frame_begin(&mut self, e: &FrameBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FragmentDispatchEvent`] (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn fragment_dispatch(&mut self, e: &FragmentDispatchEvent) {
        if let Some(s) = &mut self.sink {
            s.on_fragment_dispatch(e);
        }
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_frame_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase timestamps during a frame and produces a [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    frame_index: u64,
    ticks: Tick,
    phase_starts: [Option<Tick>; 3],
    phase_ends: [Option<Tick>; 3],
    fragments_rendered: u32,
}

impl FrameSummaryBuilder {
    /// Starts building a summary for the given frame.
    #[must_use]
    pub fn new(frame_index: u64, ticks: Tick) -> Self {
        Self {
            frame_index,
            ticks,
            phase_starts: [None; 3],
            phase_ends: [None; 3],
            fragments_rendered: 0,
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: Tick) {
        self.phase_starts[phase_index(phase)] = Some(t);
    }

    /// Records the end of a phase.
    pub fn phase_end(&mut self, phase: PhaseKind, t: Tick) {
        self.phase_ends[phase_index(phase)] = Some(t);
    }

    /// Counts one more rendered fragment.
    pub fn fragment_rendered(&mut self) {
        self.fragments_rendered += 1;
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        FrameSummary {
            frame_index: self.frame_index,
            ticks: self.ticks,
            prepare_ms: self.phase_duration(PhaseKind::Prepare),
            render_ms: self.phase_duration(PhaseKind::Render),
            finish_ms: self.phase_duration(PhaseKind::Finish),
            fragments_rendered: self.fragments_rendered,
        }
    }

    fn phase_duration(&self, phase: PhaseKind) -> u32 {
        let idx = phase_index(phase);
        match (self.phase_starts[idx], self.phase_ends[idx]) {
            (Some(start), Some(end)) => end.since(start),
            _ => 0,
        }
    }
}

/// Maps a [`PhaseKind`] to an array index.
const fn phase_index(phase: PhaseKind) -> usize {
    match phase {
        PhaseKind::Prepare => 0,
        PhaseKind::Render => 1,
        PhaseKind::Finish => 2,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_frame_begin(&FrameBeginEvent { frame_index: 0, ticks: Tick::ZERO });
        sink.on_phase_begin(&PhaseBeginEvent {
            frame_index: 0,
            phase: PhaseKind::Prepare,
            ticks: Tick::ZERO,
        });
        sink.on_frame_summary(&FrameSummary {
            frame_index: 0,
            ticks: Tick::ZERO,
            prepare_ms: 0,
            render_ms: 0,
            finish_ms: 0,
            fragments_rendered: 1,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.frame_begin(&FrameBeginEvent { frame_index: 0, ticks: Tick::ZERO });
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index: 0,
            phase: PhaseKind::Render,
            ticks: Tick::ZERO,
        });
    }

    #[test]
    fn summary_builder_computes_durations() {
        let mut builder = FrameSummaryBuilder::new(7, Tick(1_000));

        builder.phase_begin(PhaseKind::Prepare, Tick(1_000));
        builder.phase_end(PhaseKind::Prepare, Tick(1_002));
        builder.phase_begin(PhaseKind::Render, Tick(1_002));
        builder.fragment_rendered();
        builder.fragment_rendered();
        builder.fragment_rendered();
        builder.fragment_rendered();
        builder.phase_end(PhaseKind::Render, Tick(1_014));
        builder.phase_begin(PhaseKind::Finish, Tick(1_014));
        builder.phase_end(PhaseKind::Finish, Tick(1_015));

        let summary = builder.finish();
        assert_eq!(summary.frame_index, 7);
        assert_eq!(summary.prepare_ms, 2);
        assert_eq!(summary.render_ms, 12);
        assert_eq!(summary.finish_ms, 1);
        assert_eq!(summary.fragments_rendered, 4);
    }

    #[test]
    fn summary_builder_missing_phases_are_zero() {
        let builder = FrameSummaryBuilder::new(1, Tick::ZERO);
        let summary = builder.finish();
        assert_eq!(summary.prepare_ms, 0);
        assert_eq!(summary.render_ms, 0);
        assert_eq!(summary.finish_ms, 0);
        assert_eq!(summary.fragments_rendered, 0);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        struct RecordingSink {
            frames: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
                self.frames.push(e.frame_index);
            }
        }

        let mut sink = RecordingSink { frames: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.frame_begin(&FrameBeginEvent { frame_index: 9, ticks: Tick::ZERO });
        drop(tracer);
        assert_eq!(sink.frames, &[9]);
    }
}
