// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].

use mosaic_core::time::Tick;
use mosaic_core::trace::{
    FrameBeginEvent, FrameSummary, FragmentDispatchEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME_BEGIN: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_FRAGMENT_DISPATCH: u8 = 4;
const TAG_FRAME_SUMMARY: u8 = 5;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_tick(&mut self, t: Tick) {
        self.write_u32(t.0);
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Prepare => 0,
            PhaseKind::Render => 1,
            PhaseKind::Finish => 2,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.write_u8(TAG_FRAME_BEGIN);
        self.write_u64(e.frame_index);
        self.write_tick(e.ticks);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_tick(e.ticks);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_tick(e.ticks);
    }

    fn on_fragment_dispatch(&mut self, e: &FragmentDispatchEvent) {
        self.write_u8(TAG_FRAGMENT_DISPATCH);
        self.write_u64(e.frame_index);
        self.write_u32(e.cpu);
        self.write_u32(e.fragment_number);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_tick(s.ticks);
        self.write_u32(s.prepare_ms);
        self.write_u32(s.render_ms);
        self.write_u32(s.finish_ms);
        self.write_u32(s.fragments_rendered);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Copy, Debug)]
pub enum RecordedEvent {
    /// A [`FrameBeginEvent`].
    FrameBegin(FrameBeginEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`FragmentDispatchEvent`].
    FragmentDispatch(FragmentDispatchEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
#[must_use]
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter { data: bytes, pos: 0 }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_tick(&mut self) -> Option<Tick> {
        Some(Tick(self.read_u32()?))
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        Some(match self.read_u8()? {
            0 => PhaseKind::Prepare,
            1 => PhaseKind::Render,
            _ => PhaseKind::Finish,
        })
    }

    fn decode_frame_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameBegin(FrameBeginEvent {
            frame_index: self.read_u64()?,
            ticks: self.read_tick()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            ticks: self.read_tick()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            ticks: self.read_tick()?,
        }))
    }

    fn decode_fragment_dispatch(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FragmentDispatch(FragmentDispatchEvent {
            frame_index: self.read_u64()?,
            cpu: self.read_u32()?,
            fragment_number: self.read_u32()?,
        }))
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame_index: self.read_u64()?,
            ticks: self.read_tick()?,
            prepare_ms: self.read_u32()?,
            render_ms: self.read_u32()?,
            finish_ms: self.read_u32()?,
            fragments_rendered: self.read_u32()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_FRAME_BEGIN => self.decode_frame_begin(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_FRAGMENT_DISPATCH => self.decode_fragment_dispatch(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_frame_begin() {
        let mut rec = RecorderSink::new();
        rec.on_frame_begin(&FrameBeginEvent { frame_index: 7, ticks: Tick(1_000) });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 1);
        match events[0] {
            RecordedEvent::FrameBegin(e) => {
                assert_eq!(e.frame_index, 7);
                assert_eq!(e.ticks, Tick(1_000));
            }
            other => panic!("expected FrameBegin, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_phase_events() {
        let mut rec = RecorderSink::new();
        rec.on_phase_begin(&PhaseBeginEvent { frame_index: 5, phase: PhaseKind::Render, ticks: Tick(2_000) });
        rec.on_phase_end(&PhaseEndEvent { frame_index: 5, phase: PhaseKind::Render, ticks: Tick(3_000) });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 2);
        match events[0] {
            RecordedEvent::PhaseBegin(e) => {
                assert_eq!(e.frame_index, 5);
                assert_eq!(e.phase, PhaseKind::Render);
                assert_eq!(e.ticks, Tick(2_000));
            }
            other => panic!("expected PhaseBegin, got {other:?}"),
        }
        match events[1] {
            RecordedEvent::PhaseEnd(e) => {
                assert_eq!(e.frame_index, 5);
                assert_eq!(e.ticks, Tick(3_000));
            }
            other => panic!("expected PhaseEnd, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_fragment_dispatch() {
        let mut rec = RecorderSink::new();
        rec.on_fragment_dispatch(&FragmentDispatchEvent { frame_index: 2, cpu: 3, fragment_number: 11 });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        match events[0] {
            RecordedEvent::FragmentDispatch(e) => {
                assert_eq!(e.cpu, 3);
                assert_eq!(e.fragment_number, 11);
            }
            other => panic!("expected FragmentDispatch, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_frame_summary() {
        let mut rec = RecorderSink::new();
        let orig = FrameSummary {
            frame_index: 9,
            ticks: Tick(500),
            prepare_ms: 2,
            render_ms: 10,
            finish_ms: 1,
            fragments_rendered: 4,
        };
        rec.on_frame_summary(&orig);

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        match events[0] {
            RecordedEvent::FrameSummary(s) => {
                assert_eq!(s.frame_index, orig.frame_index);
                assert_eq!(s.prepare_ms, orig.prepare_ms);
                assert_eq!(s.render_ms, orig.render_ms);
                assert_eq!(s.finish_ms, orig.finish_ms);
                assert_eq!(s.fragments_rendered, orig.fragments_rendered);
            }
            other => panic!("expected FrameSummary, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_multiple_events() {
        let mut rec = RecorderSink::new();
        rec.on_frame_begin(&FrameBeginEvent { frame_index: 1, ticks: Tick(0) });
        rec.on_phase_begin(&PhaseBeginEvent { frame_index: 1, phase: PhaseKind::Prepare, ticks: Tick(0) });
        rec.on_phase_end(&PhaseEndEvent { frame_index: 1, phase: PhaseKind::Prepare, ticks: Tick(1) });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], RecordedEvent::FrameBegin(_)));
        assert!(matches!(events[1], RecordedEvent::PhaseBegin(_)));
        assert!(matches!(events[2], RecordedEvent::PhaseEnd(_)));
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty());
    }

    #[test]
    fn truncated_buffer_stops_cleanly() {
        let mut rec = RecorderSink::new();
        rec.on_frame_summary(&FrameSummary {
            frame_index: 1,
            ticks: Tick(0),
            prepare_ms: 0,
            render_ms: 0,
            finish_ms: 0,
            fragments_rendered: 0,
        });
        let mut bytes = rec.into_bytes();
        bytes.truncate(bytes.len() - 2);

        let events: Vec<_> = decode(&bytes).collect();
        assert!(events.is_empty());
    }
}
