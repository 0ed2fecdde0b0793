// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A minimal client for a line-oriented timeline-editing protocol, outside
//! the sequencing core proper: it only translates incoming lines into key
//! edits on the shared track store, reusing nothing from the render path.
//!
//! Wire format, one command per line, ASCII:
//! - `SET_KEY <track> <row> <value>` — upsert a keyframe
//! - `DEL_KEY <track> <row>` — remove a keyframe
//! - `PAUSE <0|1>` — currently unused by the client side; reserved for a
//!   future transport-level pause acknowledgement

use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use std::thread;

use crate::track::Track;

/// Connects to `host:port` on a background thread and applies every
/// incoming line to `tracks` until the connection closes. Connection
/// failures are logged and otherwise ignored — an editor session is a
/// convenience for live-tweaking a running instance, never required for
/// correct playback.
pub fn spawn_client(host: String, port: u16, tracks: Arc<Mutex<HashMap<String, Track>>>) {
    thread::spawn(move || match TcpStream::connect((host.as_str(), port)) {
        Ok(stream) => run(stream, &tracks),
        Err(err) => log::warn!("rocket editor connect to {host}:{port} failed: {err}"),
    });
}

fn run(stream: TcpStream, tracks: &Mutex<HashMap<String, Track>>) {
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let Ok(line) = line else { break };
        apply_line(&line, tracks);
    }
}

fn apply_line(line: &str, tracks: &Mutex<HashMap<String, Track>>) {
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("SET_KEY") => {
            let (Some(track), Some(row), Some(value)) = (parts.next(), parts.next(), parts.next()) else { return };
            let (Ok(row), Ok(value)) = (row.parse::<i32>(), value.parse::<f64>()) else { return };
            tracks
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .entry(track.to_string())
                .or_insert_with(Track::new)
                .set_key(row, value);
        }
        Some("DEL_KEY") => {
            let (Some(track), Some(row)) = (parts.next(), parts.next()) else { return };
            let Ok(row) = row.parse::<i32>() else { return };
            if let Some(track) = tracks.lock().unwrap_or_else(std::sync::PoisonError::into_inner).get_mut(track) {
                track.remove_key(row);
            }
        }
        _ => {}
    }
}
