//! Thread affinity checks.
//!
//! A [`Palette`](crate::Palette) handle is `Send + Sync` so it can be stored
//! in shared application state, but it is driven from a single event-loop
//! thread. Every mutating operation debug-asserts that it runs on the thread
//! that created the palette.
//!
//! ```
//! use kit_cmd::affinity::ThreadAffinity;
//!
//! let affinity = ThreadAffinity::current();
//! assert!(affinity.is_same_thread());
//!
//! let other = std::thread::spawn(move || affinity.is_same_thread())
//!     .join()
//!     .unwrap();
//! assert!(!other);
//! ```

use std::thread::ThreadId;

/// Records the thread an object was created on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    thread_id: ThreadId,
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current()
    }
}

impl ThreadAffinity {
    /// Bind to the current thread.
    #[inline]
    pub fn current() -> Self {
        Self {
            thread_id: std::thread::current().id(),
        }
    }

    /// The bound thread.
    #[inline]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Returns `true` when called on the bound thread.
    #[inline]
    pub fn is_same_thread(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Panic unless called on the bound thread. Active in every build.
    ///
    /// # Panics
    ///
    /// Panics with `operation` in the message when called from another thread.
    pub fn assert_same_thread(&self, operation: &str) {
        if !self.is_same_thread() {
            self.panic_wrong_thread(operation);
        }
    }

    /// Debug-only variant of [`assert_same_thread`](Self::assert_same_thread).
    #[inline]
    pub fn debug_assert_same_thread(&self, operation: &str) {
        #[cfg(debug_assertions)]
        self.assert_same_thread(operation);
        #[cfg(not(debug_assertions))]
        let _ = operation;
    }

    #[cold]
    #[inline(never)]
    fn panic_wrong_thread(&self, operation: &str) -> ! {
        let current = std::thread::current();
        let current_name = current.name().unwrap_or("<unnamed>");

        panic!(
            "palette operation `{operation}` called off its event-loop thread\n\
             palette thread: {:?}\n\
             current thread: \"{current_name}\" ({:?})\n\
             drive the palette from the thread that created it and hand \
             results from worker threads back through the host's event loop",
            self.thread_id,
            current.id(),
        )
    }
}
