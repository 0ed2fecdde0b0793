// Copyright 2026 the Mosaic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fragments, framebuffer pages, and the backend contract.
//!
//! A [`Fragment`] is a rectangular view of 32-bit packed pixels. The worker
//! pool ([`crate::threads`]) hands one fragment per sub-region to a render
//! callback; fragments are produced by a [`crate::fragmenter`].
//!
//! # Ownership model
//!
//! Unlike a host language with raw pointer aliasing, each [`Fragment`] here
//! owns a tightly packed private pixel buffer sized `width * height`, even
//! when it represents a sub-region of a larger frame. Workers therefore
//! never share mutable access to the same memory, and the borrow checker
//! proves the "every fragment is visited by exactly one worker" invariant
//! for free. After the worker-pool barrier completes, the dispatcher
//! [blits](Fragment::blit_from) each completed sub-fragment back into its
//! parent fragment's buffer at the sub-fragment's `(x, y)` offset. This
//! trades one extra memory copy per fragment for never needing `unsafe`.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

use crate::error::{Error, Result};

/// A rectangular view of 32-bit packed RGB pixels (`0x00RRGGBB`, alpha
/// ignored, native byte order).
///
/// Invariant: `pitch() == width + stride`, and the region
/// `(x..x+width, y..y+height)` lies entirely within `(frame_width,
/// frame_height)`.
#[derive(Clone, Debug)]
pub struct Fragment {
    buf: Vec<u32>,
    /// Absolute column offset of this fragment within the enclosing frame.
    pub x: u32,
    /// Absolute row offset of this fragment within the enclosing frame.
    pub y: u32,
    /// Width of this fragment's region, in pixels.
    pub width: u32,
    /// Height of this fragment's region, in pixels.
    pub height: u32,
    /// Width of the enclosing frame, in pixels.
    pub frame_width: u32,
    /// Height of the enclosing frame, in pixels.
    pub frame_height: u32,
    /// Padding pixels between this fragment's row end and the next row
    /// start *in the enclosing frame* (not in this fragment's own private
    /// buffer, which is always tightly packed).
    pub stride: u32,
    /// Sequential number assigned by the fragmenter that produced this
    /// fragment. Dense, starting at 0.
    pub number: u32,
    /// Set once the region has been fully written this frame.
    pub cleared: bool,
    /// An optional parallel fragment a renderer may sample rather than
    /// write, e.g. a pre-rendered texture supplying default content.
    pub texture: Option<Box<Fragment>>,
}

impl Fragment {
    /// Creates the whole-frame root fragment for a `width x height` frame.
    #[must_use]
    pub fn new_root(width: u32, height: u32) -> Self {
        Self {
            buf: vec![0; (width as usize) * (height as usize)],
            x: 0,
            y: 0,
            width,
            height,
            frame_width: width,
            frame_height: height,
            stride: 0,
            number: 0,
            cleared: false,
            texture: None,
        }
    }

    /// Creates a sub-fragment at `(x, y)` sized `width x height`, inheriting
    /// this fragment's frame dimensions. The sub-fragment owns a fresh,
    /// zeroed private buffer; it does not alias `self`.
    ///
    /// # Panics
    ///
    /// Panics if the requested region does not lie within the enclosing
    /// frame — a fragmenter producing an out-of-bounds sub-fragment is a
    /// program bug, not a recoverable condition.
    #[must_use]
    pub fn sub(&self, x: u32, y: u32, width: u32, height: u32, number: u32) -> Self {
        assert!(
            x + width <= self.frame_width && y + height <= self.frame_height,
            "sub-fragment ({x},{y},{width}x{height}) escapes frame {}x{}",
            self.frame_width,
            self.frame_height
        );

        Self {
            buf: vec![0; (width as usize) * (height as usize)],
            x,
            y,
            width,
            height,
            frame_width: self.frame_width,
            frame_height: self.frame_height,
            stride: self.frame_width - width,
            number,
            cleared: false,
            texture: None,
        }
    }

    /// The frame-relative row stride: padding pixels plus region width.
    #[inline]
    #[must_use]
    pub const fn pitch(&self) -> u32 {
        self.width + self.stride
    }

    /// Whether `(px, py)` (relative to this fragment's own origin) lies
    /// within its bounds.
    #[inline]
    #[must_use]
    pub const fn contains(&self, px: u32, py: u32) -> bool {
        px < self.width && py < self.height
    }

    #[inline]
    fn index(&self, px: u32, py: u32) -> usize {
        py as usize * self.width as usize + px as usize
    }

    /// Writes a pixel at fragment-relative `(px, py)` without bounds
    /// checking.
    ///
    /// # Panics
    ///
    /// Panics (via the underlying slice index) if out of bounds.
    #[inline]
    pub fn put_pixel_unchecked(&mut self, px: u32, py: u32, pixel: u32) {
        let i = self.index(px, py);
        self.buf[i] = pixel;
    }

    /// Writes a pixel at fragment-relative `(px, py)`, returning `false`
    /// without writing if out of bounds.
    #[inline]
    pub fn put_pixel_checked(&mut self, px: u32, py: u32, pixel: u32) -> bool {
        if !self.contains(px, py) {
            return false;
        }
        self.put_pixel_unchecked(px, py, pixel);
        true
    }

    /// Reads a pixel at fragment-relative `(px, py)`.
    ///
    /// # Panics
    ///
    /// Panics if out of bounds.
    #[inline]
    #[must_use]
    pub fn get_pixel(&self, px: u32, py: u32) -> u32 {
        self.buf[self.index(px, py)]
    }

    /// Fills the whole fragment with `pixel`.
    pub fn fill(&mut self, pixel: u32) {
        self.buf.fill(pixel);
    }

    /// Clears the fragment to black and marks it [`cleared`](Self::cleared).
    pub fn clear(&mut self) {
        self.fill(0);
        self.cleared = true;
    }

    /// Copies `sub`'s private buffer back into `self` at `sub`'s `(x, y)`
    /// offset (relative to `self`'s own origin).
    ///
    /// # Panics
    ///
    /// Panics if `sub` does not lie within `self`'s bounds.
    pub fn blit_from(&mut self, sub: &Self) {
        assert!(
            sub.x >= self.x
                && sub.y >= self.y
                && sub.x + sub.width <= self.x + self.width
                && sub.y + sub.height <= self.y + self.height,
            "blit source escapes destination fragment"
        );

        let ox = sub.x - self.x;
        let oy = sub.y - self.y;
        for row in 0..sub.height {
            for col in 0..sub.width {
                let pixel = sub.get_pixel(col, row);
                self.put_pixel_unchecked(ox + col, oy + row, pixel);
            }
        }
    }

    /// Raw pixel storage, row-major, tightly packed at `width` pixels per
    /// row. Exposed for backends that need to hand pixels to a display
    /// surface.
    #[must_use]
    pub fn pixels(&self) -> &[u32] {
        &self.buf
    }
}

/// One allocatable unit of framebuffer storage: a whole-frame [`Fragment`]
/// plus whatever identity a backend needs to present it.
#[derive(Debug)]
pub struct Page {
    /// The page's whole-frame pixel storage.
    pub fragment_buf: Vec<u32>,
    /// Width of the page, in pixels.
    pub width: u32,
    /// Height of the page, in pixels.
    pub height: u32,
    /// Backend-assigned sequence number, for diagnostics.
    pub id: u64,
}

impl Page {
    /// Allocates a zeroed page of the given size.
    #[must_use]
    pub fn new(width: u32, height: u32, id: u64) -> Self {
        Self {
            fragment_buf: vec![0; (width as usize) * (height as usize)],
            width,
            height,
            id,
        }
    }

    /// Builds the whole-page root [`Fragment`] a renderer writes into,
    /// seeded with this page's current pixel contents.
    #[must_use]
    pub fn as_fragment(&self) -> Fragment {
        let mut f = Fragment::new_root(self.width, self.height);
        f.buf.copy_from_slice(&self.fragment_buf);
        f
    }

    /// Commits a rendered root [`Fragment`] back into this page's storage.
    ///
    /// # Panics
    ///
    /// Panics if the fragment's dimensions don't match the page's.
    pub fn commit(&mut self, fragment: &Fragment) {
        assert_eq!(fragment.width, self.width);
        assert_eq!(fragment.height, self.height);
        self.fragment_buf.copy_from_slice(fragment.pixels());
    }
}

/// The capability interface a platform output implements.
///
/// Backends are otherwise opaque to the core: `setup`/`init`/`shutdown`
/// bracket the backend's lifetime, `acquire`/`release` make a page visible
/// or tear visibility down, and `page_alloc`/`page_free`/`page_flip` manage
/// individual pages. `page_flip` is expected to block until vsync — that
/// backpressure is what keeps the render pipeline at most one frame ahead
/// of the display.
pub trait Backend: Send {
    /// Brings the backend up (opens a device, creates a window, ...).
    fn init(&mut self) -> Result<()>;

    /// Tears the backend down. Must be safe to call after a failed `init`.
    fn shutdown(&mut self);

    /// Makes `page` the visible surface.
    fn acquire(&mut self, page: &Page) -> Result<()>;

    /// Hides whatever `acquire` made visible.
    fn release(&mut self);

    /// Allocates a new page of the given dimensions.
    fn page_alloc(&mut self, width: u32, height: u32) -> Result<Page>;

    /// Releases backend-side resources associated with `page`.
    fn page_free(&mut self, _page: Page) {}

    /// Submits `page` for display and blocks until the corresponding vsync.
    fn page_flip(&mut self, page: &Page) -> Result<()>;
}

/// An in-memory [`Backend`] that never actually presents anything — the
/// degenerate case used by tests and headless hosts. `page_flip` returns
/// immediately rather than waiting for vsync, so callers relying on its
/// backpressure in tests must drive the framebuffer's flipper explicitly.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    next_id: u64,
}

impl Backend for MemoryBackend {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&mut self) {}

    fn acquire(&mut self, _page: &Page) -> Result<()> {
        Ok(())
    }

    fn release(&mut self) {}

    fn page_alloc(&mut self, width: u32, height: u32) -> Result<Page> {
        let id = self.next_id;
        self.next_id += 1;
        Ok(Page::new(width, height, id))
    }

    fn page_flip(&mut self, _page: &Page) -> Result<()> {
        Ok(())
    }
}

struct Queues {
    inactive: Vec<Page>,
    ready: VecDeque<Page>,
    active: Option<Page>,
}

/// Manages `N >= 2` pages across three queues — active (being displayed),
/// ready (queued to display, FIFO) and inactive (available to render into,
/// LIFO) — plus the backend that presents them.
///
/// A renderer calls [`page_get`](Self::page_get) (blocking when no inactive
/// page exists) and [`page_put`](Self::page_put) to enqueue a rendered page
/// for display. A dedicated flipper drains the ready queue, submits each
/// page via the backend (which is expected to wait for vsync), and returns
/// the previously-active page to the inactive pool.
pub struct Framebuffer<B: Backend> {
    backend: Mutex<B>,
    queues: Mutex<Queues>,
    inactive_available: Condvar,
    width: u32,
    height: u32,
}

impl<B: Backend> Framebuffer<B> {
    /// Creates a framebuffer with `n_pages` pages (minimum 2) of the given
    /// dimensions, backed by `backend`.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`Backend::init`] or
    /// [`Backend::page_alloc`].
    pub fn new(mut backend: B, width: u32, height: u32, n_pages: usize) -> Result<Arc<Self>> {
        let n_pages = n_pages.max(2);
        backend.init()?;

        let mut inactive = Vec::with_capacity(n_pages);
        for _ in 0..n_pages {
            inactive.push(backend.page_alloc(width, height)?);
        }

        Ok(Arc::new(Self {
            backend: Mutex::new(backend),
            queues: Mutex::new(Queues {
                inactive,
                ready: VecDeque::new(),
                active: None,
            }),
            inactive_available: Condvar::new(),
            width,
            height,
        }))
    }

    /// This framebuffer's page width.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// This framebuffer's page height.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Pops the most recently freed inactive page (LIFO), blocking until
    /// one is available.
    #[must_use]
    pub fn page_get(&self) -> Page {
        let mut q = self.queues.lock().expect("queue mutex poisoned");
        loop {
            if let Some(page) = q.inactive.pop() {
                return page;
            }
            q = self
                .inactive_available
                .wait(q)
                .expect("queue mutex poisoned");
        }
    }

    /// Enqueues a rendered page for display (FIFO).
    pub fn page_put(&self, page: Page) {
        let mut q = self.queues.lock().expect("queue mutex poisoned");
        q.ready.push_back(page);
    }

    /// Drains at most one entry from the ready queue: submits it via the
    /// backend (acquiring it and flipping to it), and returns whatever was
    /// previously active to the inactive pool. Returns `true` if a page was
    /// processed.
    ///
    /// This is the "dedicated flipper role" from a single synchronous call,
    /// suitable for driving manually in tests or from a background thread
    /// via [`run_flipper`](Self::run_flipper).
    ///
    /// # Errors
    ///
    /// Propagates backend errors from `acquire`/`page_flip`. On error the
    /// page that failed to present is still returned to the inactive pool
    /// so the pipeline doesn't deadlock.
    pub fn drain_ready_once(&self) -> Result<bool> {
        let next = {
            let mut q = self.queues.lock().expect("queue mutex poisoned");
            match q.ready.pop_front() {
                Some(p) => p,
                None => return Ok(false),
            }
        };

        let flip_result = {
            let mut backend = self.backend.lock().expect("backend mutex poisoned");
            backend
                .acquire(&next)
                .and_then(|()| backend.page_flip(&next))
        };

        let mut q = self.queues.lock().expect("queue mutex poisoned");
        if let Some(prev_active) = q.active.replace(next) {
            q.inactive.push(prev_active);
            self.inactive_available.notify_one();
        }
        drop(q);

        flip_result.map(|()| true)
    }

    /// Runs [`drain_ready_once`](Self::drain_ready_once) in a loop until it
    /// returns [`Error::Closed`] or the framebuffer is dropped. Intended to
    /// run on its own thread, spawned by the host.
    pub fn run_flipper(self: &Arc<Self>) {
        loop {
            match self.drain_ready_once() {
                Ok(_) => std::thread::yield_now(),
                Err(Error::Closed) => return,
                Err(_) => std::thread::yield_now(),
            }
        }
    }

    /// Tears the backend down. The framebuffer must not be used afterward.
    pub fn shutdown(&self) {
        let mut q = self.queues.lock().expect("queue mutex poisoned");
        q.active = None;
        drop(q);
        self.backend.lock().expect("backend mutex poisoned").shutdown();
    }
}
