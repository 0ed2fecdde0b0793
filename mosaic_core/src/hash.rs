// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Jenkins one-at-a-time hash.
//!
//! Used to hash context paths and tap names throughout [`crate::stream`].
//! Hashes are computed once, at path/name initialization, and cached —
//! lookups never rehash.

/// Computes the Jenkins one-at-a-time hash of `bytes`.
///
/// See <https://en.wikipedia.org/wiki/Jenkins_hash_function>.
#[must_use]
pub fn jenkins(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0;

    for &b in bytes {
        hash = hash.wrapping_add(u32::from(b));
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }

    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash = hash.wrapping_add(hash << 15);

    hash
}

/// Convenience wrapper for hashing a `str`.
#[must_use]
pub fn jenkins_str(s: &str) -> u32 {
    jenkins(s.as_bytes())
}
