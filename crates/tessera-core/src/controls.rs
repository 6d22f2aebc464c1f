// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The contract between the control thread and the execution thread.
//!
//! Three commands — toggle pause, single-step, reset — plus a tick-rate
//! limiter and a one-way cancellation token. The execution thread suspends
//! only in [`Controls::wait_unpause`] and [`Controls::rate_limit`]; every
//! suspension observes cancellation.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Shared run-state flags, owned jointly by both threads through an `Arc`.
#[derive(Debug)]
pub struct Controls {
    paused: Mutex<bool>,
    unpaused: Condvar,
    next_frame: AtomicBool,
    reset: AtomicBool,
    cancelled: AtomicBool,
    tickrate: AtomicU32,
}

impl Controls {
    /// Creates an unpaused control block limited to `tickrate` ticks per
    /// second (0 = unlimited).
    #[must_use]
    pub fn new(tickrate: u32) -> Self {
        Self {
            paused: Mutex::new(false),
            unpaused: Condvar::new(),
            next_frame: AtomicBool::new(false),
            reset: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            tickrate: AtomicU32::new(tickrate),
        }
    }

    fn lock_paused(&self) -> MutexGuard<'_, bool> {
        self.paused.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Flips the pause flag and wakes the execution thread.
    pub fn toggle_pause(&self) {
        {
            let mut paused = self.lock_paused();
            *paused = !*paused;
        }
        self.unpaused.notify_one();
    }

    /// Requests a single tick: unpauses now, re-pauses after one tick.
    pub fn go_next(&self) {
        self.next_frame.store(true, Ordering::Release);
        {
            let mut paused = self.lock_paused();
            *paused = false;
        }
        self.unpaused.notify_one();
    }

    /// Asks the execution thread to rebuild the program and grid, pausing
    /// the run while it does.
    pub fn request_reset(&self) {
        {
            let mut paused = self.lock_paused();
            *paused = true;
        }
        self.reset.store(true, Ordering::Release);
        self.unpaused.notify_one();
    }

    /// Consumes a pending reset request; called from the execution thread.
    pub fn take_reset(&self) -> bool {
        self.reset.swap(false, Ordering::AcqRel)
    }

    /// `true` while the run is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        *self.lock_paused()
    }

    /// Sets the tick-rate bound (0 = unlimited).
    pub fn set_tickrate(&self, tickrate: u32) {
        self.tickrate.store(tickrate, Ordering::Relaxed);
    }

    /// The current tick-rate bound.
    #[must_use]
    pub fn tickrate(&self) -> u32 {
        self.tickrate.load(Ordering::Relaxed)
    }

    /// Raises the cancellation token and wakes every waiter.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.unpaused.notify_all();
    }

    /// `true` once [`Controls::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Blocks until the run is unpaused, a reset is pending, or the token
    /// is cancelled.
    ///
    /// A pending single-step re-pauses first, so the caller runs exactly
    /// one tick before blocking here again. A pending reset passes through
    /// even while paused — the execution thread owns the grid and must wake
    /// to rebuild it.
    pub fn wait_unpause(&self) {
        if self.next_frame.swap(false, Ordering::AcqRel) {
            let mut paused = self.lock_paused();
            *paused = true;
        }

        let mut paused = self.lock_paused();
        while *paused && !self.is_cancelled() && !self.reset.load(Ordering::Acquire) {
            paused = self
                .unpaused
                .wait(paused)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }

    /// Sleeps whatever remains of the tick period that began at `last_tick`.
    ///
    /// No-op when unlimited, when a single-step is pending, or when the
    /// tick already overran its period.
    pub fn rate_limit(&self, last_tick: Instant) {
        let tickrate = self.tickrate();
        if tickrate == 0 || self.next_frame.load(Ordering::Acquire) {
            return;
        }
        let period = Duration::from_secs(1) / tickrate;
        let elapsed = last_tick.elapsed();
        if elapsed < period {
            std::thread::sleep(period - elapsed);
        }
    }
}
