// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The worker-pool frame dispatcher: a fixed set of long-lived worker
//! threads, created once and reused across every subsequent frame.
//!
//! [`ThreadPool::submit`] slices `parent` with a [`Fragmenter`](crate::fragmenter::Fragmenter)
//! and calls `render` once per produced sub-fragment. With `cpu_affinity`
//! off, workers race a shared atomic cursor for the next fragment number
//! (a work-stealing fetch-and-add); with it on, each worker instead claims
//! a fixed `number % n_threads == worker_id` stripe, trading load balancing
//! for a fragment-number-to-worker mapping that's stable across frames.
//! `submit` is the barrier: it does not return until every fragment has
//! been rendered, so callers never need a separate "wait idle" step.
//!
//! Dispatching non-`'static` borrowed work onto threads that outlive any
//! single `submit` call needs the same lifetime-erasure every scoped
//! thread pool performs internally; rather than writing that `unsafe` code
//! in a crate whose lints deny it, the pool underneath is a [`rayon`]
//! `ThreadPool`, sized once at construction and reused identically to a
//! hand-rolled condvar-parked pool — `rayon`'s own workers park on a
//! condition variable when idle and wake on new scoped work.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::fragment::Fragment;
use crate::fragmenter::Fragmenter;

thread_local! {
    static ON_WORKER: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

/// A fixed-size pool of long-lived worker threads, created once and reused
/// to parallelize fragment rendering across every subsequent frame.
pub struct ThreadPool {
    inner: rayon::ThreadPool,
    n_threads: u32,
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool").field("n_threads", &self.n_threads).finish_non_exhaustive()
    }
}

impl ThreadPool {
    /// One worker per logical CPU ([`crate::cpu::count`]).
    #[must_use]
    pub fn new() -> Self {
        Self::with_threads(crate::cpu::count() as u32)
    }

    /// An explicit worker count, floored at 1. The workers are spawned once,
    /// here, and parked between frames for the life of this pool.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn the worker threads.
    #[must_use]
    pub fn with_threads(n_threads: u32) -> Self {
        let n_threads = n_threads.max(1);
        let inner = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads as usize)
            .thread_name(|i| format!("mosaic-worker-{i}"))
            .build()
            .expect("spawning the fixed-size worker pool");
        Self { inner, n_threads }
    }

    /// Number of workers this pool dispatches across.
    #[must_use]
    pub fn num_threads(&self) -> u32 {
        self.n_threads
    }

    /// Slices `parent` with `fragmenter` and renders every resulting
    /// sub-fragment via `render(fragment_number, sub_fragment)`, blocking
    /// until all are done.
    ///
    /// `cpu_affinity` selects the dispatch mode: with it `false`, workers
    /// race a shared atomic cursor for the next fragment number; with it
    /// `true`, each of the `n_threads` workers instead claims the fixed
    /// stripe `number % n_threads == worker_id`, so the same worker renders
    /// the same fragment numbers on every frame.
    ///
    /// If called from inside an already-running worker (a module rendering
    /// another module's output as a sub-render), fragments are instead
    /// produced and rendered serially on the calling thread — workers never
    /// recurse into their own pool, which would need more threads than
    /// exist to avoid deadlocking.
    pub fn submit(
        &self,
        parent: &Fragment,
        fragmenter: &Fragmenter,
        cpu_affinity: bool,
        render: impl Fn(u32, Fragment) + Send + Sync,
    ) {
        if ON_WORKER.with(std::cell::Cell::get) {
            let mut number = 0;
            while let Some(frag) = fragmenter(parent, self.n_threads, number) {
                render(number, frag);
                number += 1;
            }
            return;
        }

        let next_fragment = AtomicU32::new(0);
        let n_threads = self.n_threads;

        self.inner.scope(|scope| {
            for worker_id in 0..n_threads {
                scope.spawn(|_| {
                    ON_WORKER.with(|cell| cell.set(true));

                    if cpu_affinity {
                        let mut number = worker_id;
                        while let Some(frag) = fragmenter(parent, n_threads, number) {
                            render(number, frag);
                            number += n_threads;
                        }
                    } else {
                        loop {
                            let number = next_fragment.fetch_add(1, Ordering::SeqCst);
                            let Some(frag) = fragmenter(parent, n_threads, number) else {
                                break;
                            };
                            render(number, frag);
                        }
                    }

                    ON_WORKER.with(|cell| cell.set(false));
                });
            }
        });
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragmenter;
    use std::sync::atomic::AtomicU32 as AU32;
    use std::sync::Mutex;

    #[test]
    fn submits_a_frame_and_renders_every_fragment_exactly_once() {
        let pool = ThreadPool::with_threads(4);
        let parent = Fragment::new_root(100, 40);
        let seen = Mutex::new(vec![false; 4]);

        pool.submit(&parent, &fragmenter::fragmenter(fragmenter::slice_per_cpu), false, |num, _frag| {
            seen.lock().unwrap()[num as usize] = true;
        });

        assert!(seen.lock().unwrap().iter().all(|&s| s));
    }

    #[test]
    fn back_to_back_frames_each_complete_before_the_next_starts() {
        let pool = ThreadPool::with_threads(2);
        let parent = Fragment::new_root(64, 64);
        let counter = AU32::new(0);

        for _ in 0..5 {
            pool.submit(&parent, &fragmenter::fragmenter(fragmenter::slice_per_cpu), false, |_num, _frag| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn reentrant_submit_from_a_worker_runs_serially_without_deadlock() {
        let pool = ThreadPool::with_threads(2);
        let parent = Fragment::new_root(32, 32);
        let inner_count = Mutex::new(0u32);

        pool.submit(&parent, &fragmenter::fragmenter(fragmenter::slice_per_cpu), false, |_num, frag| {
            pool.submit(&frag, &fragmenter::fragmenter(fragmenter::tile64), false, |_n, _f| {
                *inner_count.lock().unwrap() += 1;
            });
        });

        assert!(*inner_count.lock().unwrap() > 0);
    }

    #[test]
    fn cpu_affinity_covers_every_fragment_exactly_once() {
        // 130x70 with 64px tiles: 3 columns x 2 rows = 6 fragments over 4 workers,
        // so at least one worker claims more than one stripe entry.
        let pool = ThreadPool::with_threads(4);
        let parent = Fragment::new_root(130, 70);
        let seen: Mutex<Vec<u32>> = Mutex::new(Vec::new());

        pool.submit(&parent, &fragmenter::fragmenter(fragmenter::tile64), true, |num, _frag| {
            seen.lock().unwrap().push(num);
        });

        let mut seen = seen.into_inner().unwrap();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn cpu_affinity_assigns_each_fragment_to_its_number_modulo_worker_stripe() {
        let pool = ThreadPool::with_threads(3);
        let parent = Fragment::new_root(130, 70);
        let owners: Mutex<Vec<(u32, u32)>> = Mutex::new(Vec::new());

        pool.submit(&parent, &fragmenter::fragmenter(fragmenter::tile64), true, |num, _frag| {
            owners.lock().unwrap().push((num, num % 3));
        });

        // Every rendered fragment's number belongs to the stripe its own
        // modulo identifies, which is the invariant `cpu_affinity` promises
        // regardless of which physical thread happened to run it.
        let owners = owners.into_inner().unwrap();
        assert_eq!(owners.len(), 6);
        for (num, stripe) in owners {
            assert_eq!(num % 3, stripe);
        }
    }
}
