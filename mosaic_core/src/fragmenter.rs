// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Built-in fragmenters: callbacks that carve a [`Fragment`] into dense,
//! non-overlapping sub-fragments for the worker pool to consume.
//!
//! A fragmenter is any `Fn(&Fragment, u32, u32) -> Option<Fragment>` taking
//! the parent fragment, the worker-pool width (`n_cpus`), and a dense
//! fragment `number` starting at 0; it returns `Some` while `number`
//! addresses a valid sub-fragment and `None` once the sequence is exhausted.

use std::sync::Arc;

use crate::fragment::Fragment;

/// A fragmenter callback, type-erased so [`crate::context::FramePlan`] can
/// carry any of the built-ins or a module-supplied one uniformly.
pub type Fragmenter = Arc<dyn Fn(&Fragment, u32, u32) -> Option<Fragment> + Send + Sync>;

/// Horizontal bands, one (or more, if `n_cpus` doesn't evenly divide the
/// height) per logical CPU. Any remainder rows are distributed one-per-band
/// to the first bands so coverage is exact with no overlap.
#[must_use]
pub fn slice_per_cpu(parent: &Fragment, n_cpus: u32, number: u32) -> Option<Fragment> {
    bands(parent, n_cpus.max(1), number)
}

/// Finer horizontal bands: 16x as many bands as [`slice_per_cpu`], for
/// load-balancing workloads whose per-row cost varies.
#[must_use]
pub fn slice_per_cpu_x16(parent: &Fragment, n_cpus: u32, number: u32) -> Option<Fragment> {
    bands(parent, n_cpus.max(1).saturating_mul(16), number)
}

fn bands(parent: &Fragment, n_bands: u32, number: u32) -> Option<Fragment> {
    if number >= n_bands || parent.height == 0 {
        return None;
    }

    let base = parent.height / n_bands;
    let remainder = parent.height % n_bands;

    // Bands [0, remainder) get one extra row so the whole height is
    // covered exactly.
    let height = if number < remainder { base + 1 } else { base };
    if height == 0 {
        return None;
    }

    let y_offset: u32 = (0..number)
        .map(|n| if n < remainder { base + 1 } else { base })
        .sum();

    Some(parent.sub(parent.x, parent.y + y_offset, parent.width, height, number))
}

/// Square `64x64` tiles in row-major order, clipped at the fragment's
/// right/bottom edges. `n_cpus` is unused — tile count is purely a function
/// of the parent's dimensions — but kept in the signature so all
/// fragmenters share one callback shape.
#[must_use]
pub fn tile64(parent: &Fragment, _n_cpus: u32, number: u32) -> Option<Fragment> {
    const TILE: u32 = 64;

    let cols = parent.width.div_ceil(TILE).max(1);
    let rows = parent.height.div_ceil(TILE).max(1);
    let total = cols * rows;

    if number >= total || parent.width == 0 || parent.height == 0 {
        return None;
    }

    let tile_row = number / cols;
    let tile_col = number % cols;

    let x = tile_col * TILE;
    let y = tile_row * TILE;
    let width = TILE.min(parent.width - x);
    let height = TILE.min(parent.height - y);

    Some(parent.sub(parent.x + x, parent.y + y, width, height, number))
}

/// Wraps a plain function pointer as a type-erased [`Fragmenter`].
#[must_use]
pub fn fragmenter(f: fn(&Fragment, u32, u32) -> Option<Fragment>) -> Fragmenter {
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_all(f: impl Fn(&Fragment, u32, u32) -> Option<Fragment>, parent: &Fragment, n_cpus: u32) -> Vec<Fragment> {
        let mut out = Vec::new();
        let mut n = 0;
        while let Some(frag) = f(parent, n_cpus, n) {
            out.push(frag);
            n += 1;
        }
        out
    }

    #[test]
    fn slice_per_cpu_800x600_n4_produces_four_equal_bands() {
        let parent = Fragment::new_root(800, 600);
        let bands = collect_all(slice_per_cpu, &parent, 4);

        assert_eq!(bands.len(), 4);
        let heights: Vec<u32> = bands.iter().map(|b| b.height).collect();
        assert_eq!(heights, vec![150, 150, 150, 150]);

        let y_offsets: Vec<u32> = bands.iter().map(|b| b.y).collect();
        assert_eq!(y_offsets, vec![0, 150, 300, 450]);
    }

    #[test]
    fn slice_per_cpu_coverage_is_exact_with_no_overlap() {
        let parent = Fragment::new_root(100, 97); // doesn't divide evenly by 4
        let bands = collect_all(slice_per_cpu, &parent, 4);

        let mut covered = vec![false; 97];
        for band in &bands {
            for row in band.y..band.y + band.height {
                assert!(!covered[row as usize], "row {row} covered twice");
                covered[row as usize] = true;
            }
            assert_eq!(band.width, 100);
        }
        assert!(covered.iter().all(|&c| c), "every row must be covered");
    }

    #[test]
    fn slice_per_cpu_x16_produces_sixteen_times_the_bands() {
        let parent = Fragment::new_root(64, 64);
        let bands = collect_all(slice_per_cpu_x16, &parent, 2);
        assert_eq!(bands.len(), 32);
    }

    #[test]
    fn tile64_covers_nonmultiple_dimensions_with_clipped_edge_tiles() {
        let parent = Fragment::new_root(130, 70);
        let tiles = collect_all(tile64, &parent, 1);

        // ceil(130/64) = 3 columns, ceil(70/64) = 2 rows
        assert_eq!(tiles.len(), 6);

        let mut covered = vec![vec![false; 130]; 70];
        for t in &tiles {
            for row in t.y..t.y + t.height {
                for col in t.x..t.x + t.width {
                    assert!(!covered[row as usize][col as usize], "pixel covered twice");
                    covered[row as usize][col as usize] = true;
                }
            }
        }
        assert!(covered.iter().all(|row| row.iter().all(|&c| c)));
    }

    #[test]
    fn fragment_numbers_are_dense_from_zero() {
        let parent = Fragment::new_root(800, 600);
        let bands = collect_all(slice_per_cpu, &parent, 4);
        let numbers: Vec<u32> = bands.iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec![0, 1, 2, 3]);
    }
}
