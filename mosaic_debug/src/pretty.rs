// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable one-line-per-event trace output.

use std::io::{self, Write};

use mosaic_core::trace::{
    FrameBeginEvent, FrameSummary, FragmentDispatchEvent, PhaseBeginEvent, PhaseEndEvent, TraceSink,
};

/// A [`TraceSink`] that writes one human-readable line per event to an
/// inner writer.
pub struct PrettyPrintSink<W: Write> {
    out: W,
}

impl<W: Write> PrettyPrintSink<W> {
    /// Wraps `out`, writing one line per received event.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consumes the sink and returns the inner writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, args: std::fmt::Arguments<'_>) {
        // A full disk or closed pipe shouldn't panic a diagnostics sink;
        // dropped lines here are no worse than a full trace buffer would be.
        let _ = writeln!(self.out, "{args}");
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.line(format_args!("frame {:>6} begin @ {}ms", e.frame_index, e.ticks.0));
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.line(format_args!(
            "frame {:>6} {:?} begin @ {}ms",
            e.frame_index, e.phase, e.ticks.0
        ));
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.line(format_args!(
            "frame {:>6} {:?} end   @ {}ms",
            e.frame_index, e.phase, e.ticks.0
        ));
    }

    fn on_fragment_dispatch(&mut self, e: &FragmentDispatchEvent) {
        self.line(format_args!(
            "frame {:>6} fragment #{} on cpu {}",
            e.frame_index, e.fragment_number, e.cpu
        ));
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.line(format_args!(
            "frame {:>6} summary: prepare={}ms render={}ms finish={}ms fragments={}",
            s.frame_index, s.prepare_ms, s.render_ms, s.finish_ms, s.fragments_rendered
        ));
    }
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

/// Writes a single [`FrameSummary`] as one line to `out`, without needing a
/// whole sink wired up — handy for an ad hoc print from inside a debugger
/// or a one-off diagnostic.
pub fn print_summary(out: &mut dyn Write, s: &FrameSummary) -> io::Result<()> {
    writeln!(
        out,
        "frame {} summary: prepare={}ms render={}ms finish={}ms fragments={}",
        s.frame_index, s.prepare_ms, s.render_ms, s.finish_ms, s.fragments_rendered
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_core::time::Tick;

    #[test]
    fn frame_begin_is_one_line() {
        let mut sink = PrettyPrintSink::new(Vec::new());
        sink.on_frame_begin(&FrameBeginEvent { frame_index: 3, ticks: Tick(120) });

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out.lines().count(), 1);
        assert!(out.contains("frame"));
        assert!(out.contains("120ms"));
    }

    #[test]
    fn summary_reports_all_phase_durations() {
        let mut sink = PrettyPrintSink::new(Vec::new());
        sink.on_frame_summary(&FrameSummary {
            frame_index: 1,
            ticks: Tick(0),
            prepare_ms: 2,
            render_ms: 10,
            finish_ms: 1,
            fragments_rendered: 4,
        });

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(out.contains("prepare=2ms"));
        assert!(out.contains("render=10ms"));
        assert!(out.contains("finish=1ms"));
        assert!(out.contains("fragments=4"));
    }

    #[test]
    fn print_summary_writes_without_a_sink() {
        let mut buf = Vec::new();
        print_summary(
            &mut buf,
            &FrameSummary {
                frame_index: 9,
                ticks: Tick(0),
                prepare_ms: 0,
                render_ms: 0,
                finish_ms: 0,
                fragments_rendered: 1,
            },
        )
        .unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("frame 9"));
    }
}
