// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One-shot stream snapshots, for a REPL/debugger to inspect rather than
//! for continuous [`mosaic_core::trace::TraceSink`] instrumentation.

use std::io::{self, Write};

use mosaic_core::stream::{Stream, TapValue};

/// A single pipe's driving tap, snapshotted at call time.
#[derive(Clone, Debug, PartialEq)]
pub struct PipeSnapshot {
    /// The path the pipe's tap was taken under.
    pub parent_path: String,
    /// The driving tap's name.
    pub name: String,
    /// The driving tap's current value.
    pub value: TapValue,
}

/// Snapshots every pipe currently live on `stream`, in bucket order.
///
/// Values are read at the moment of the call; a concurrently running frame
/// may change them immediately after, so this is for inspection, not for
/// driving decisions.
#[must_use]
pub fn dump_pipes(stream: &Stream) -> Vec<PipeSnapshot> {
    let mut snapshot = Vec::new();
    stream.for_each_pipe(|parent_path, driving| {
        snapshot.push(PipeSnapshot {
            parent_path: parent_path.to_string(),
            name: driving.name().to_string(),
            value: driving.get(),
        });
    });
    snapshot
}

/// Writes [`dump_pipes`]'s snapshot as one line per pipe.
pub fn write_pipes(out: &mut dyn Write, stream: &Stream) -> io::Result<()> {
    for pipe in dump_pipes(stream) {
        writeln!(out, "{}:{} = {:?}", pipe.parent_path, pipe.name, pipe.value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_core::stream::Tap;

    #[test]
    fn dump_pipes_reports_every_driving_tap() {
        let stream = Stream::new();
        let owner = stream.register_context(1);
        let tap = Tap::new("speed", TapValue::Float(1.5));
        stream.tap(owner, "/seq", 1, &tap);

        let snapshot = dump_pipes(&stream);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].parent_path, "/seq");
        assert_eq!(snapshot[0].name, "speed");
        assert_eq!(snapshot[0].value, TapValue::Float(1.5));
    }

    #[test]
    fn dump_pipes_on_an_empty_stream_is_empty() {
        let stream = Stream::new();
        assert!(dump_pipes(&stream).is_empty());
    }

    #[test]
    fn write_pipes_writes_one_line_per_pipe() {
        let stream = Stream::new();
        let owner = stream.register_context(1);
        stream.tap(owner, "/a", 1, &Tap::new("x", TapValue::I32(3)));
        stream.tap(owner, "/b", 2, &Tap::new("y", TapValue::I32(4)));

        let mut out = Vec::new();
        write_pipes(&mut out, &stream).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
