//! Thread affinity checks.
//!
//! Everything that touches a [`Scene`](crate::Scene) or a native table must run
//! on the thread that owns the view hierarchy. `Scene` itself is not `Send`, so
//! the compiler enforces that for views. Objects that are shared through
//! `Arc` (list engines reached from signal slots, for example) record a
//! [`ThreadAffinity`] on creation and verify it on every mutating entry point.
//!
//! ```
//! use horizon_trellis_core::thread_check::ThreadAffinity;
//!
//! struct Engine {
//!     affinity: ThreadAffinity,
//! }
//!
//! impl Engine {
//!     fn mutate(&self) {
//!         self.affinity.debug_assert_same_thread_with_msg("Engine::mutate");
//!     }
//! }
//!
//! let engine = Engine { affinity: ThreadAffinity::current() };
//! engine.mutate();
//! ```

use std::sync::OnceLock;
use std::thread::ThreadId;

static MAIN_THREAD_ID: OnceLock<ThreadId> = OnceLock::new();

/// Mark the calling thread as the host toolkit's main thread.
///
/// Hosts call this once at startup. Calling it again from the same thread is
/// harmless.
///
/// # Panics
///
/// Panics if a different thread was already registered.
pub fn set_main_thread() {
    let current = std::thread::current().id();
    if MAIN_THREAD_ID.set(current).is_err() && MAIN_THREAD_ID.get() != Some(&current) {
        panic!("set_main_thread() called from a second thread; the main thread is fixed once set");
    }
}

/// The registered main thread, if any.
#[inline]
pub fn main_thread_id() -> Option<ThreadId> {
    MAIN_THREAD_ID.get().copied()
}

/// Whether the calling thread is the main thread.
///
/// Before [`set_main_thread`] runs every thread counts as the main thread.
#[inline]
pub fn is_main_thread() -> bool {
    match MAIN_THREAD_ID.get() {
        Some(&main_id) => std::thread::current().id() == main_id,
        None => true,
    }
}

/// Records the thread an object was created on.
#[derive(Debug, Clone, Copy)]
pub struct ThreadAffinity {
    thread_id: ThreadId,
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current()
    }
}

impl ThreadAffinity {
    /// Create a new thread affinity tracker for the current thread.
    #[inline]
    pub fn current() -> Self {
        Self {
            thread_id: std::thread::current().id(),
        }
    }

    /// Get the thread ID this affinity is bound to.
    #[inline]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Check if the current thread matches this affinity.
    #[inline]
    pub fn is_same_thread(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Assert that we are on the same thread as the affinity.
    ///
    /// # Panics
    ///
    /// Panics with `msg` if called from a different thread.
    pub fn assert_same_thread_with_msg(&self, msg: &str) {
        if !self.is_same_thread() {
            self.panic_wrong_thread(msg);
        }
    }

    /// Debug-only version of [`assert_same_thread_with_msg`](Self::assert_same_thread_with_msg).
    #[inline]
    pub fn debug_assert_same_thread_with_msg(&self, msg: &str) {
        #[cfg(debug_assertions)]
        self.assert_same_thread_with_msg(msg);
        #[cfg(not(debug_assertions))]
        let _ = msg;
    }

    #[cold]
    #[inline(never)]
    fn panic_wrong_thread(&self, msg: &str) -> ! {
        let current = std::thread::current();
        let current_name = current.name().unwrap_or("<unnamed>");

        panic!(
            "thread affinity violation: {msg}\n\
             owner thread: {:?}\n\
             current thread: \"{current_name}\" ({:?})\n\
             view hierarchies and list engines must only be driven from the thread \
             that created them; post the work to that thread's main queue instead",
            self.thread_id,
            current.id()
        )
    }
}
