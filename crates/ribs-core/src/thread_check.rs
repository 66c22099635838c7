//! Coordinator thread checks.
//!
//! Tree mutation, routing and backstack intents belong to one coordinator
//! thread. [`RibContext`](crate::context::RibContext) captures a
//! [`ThreadAffinity`] when it is built and compares each mutating call against
//! it. A mismatch is handed to the context's
//! [`Configuration`](crate::config::Configuration) as an error rather than
//! asserted, so the configuration decides between panicking and logging.
//!
//! ```
//! use ribs_core::ThreadAffinity;
//!
//! let coordinator = ThreadAffinity::current();
//! assert!(coordinator.is_same_thread());
//!
//! let from_elsewhere = std::thread::spawn(move || coordinator.is_same_thread());
//! assert!(!from_elsewhere.join().unwrap());
//! ```

use std::thread::{self, ThreadId};

/// The thread a context was created on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    owner: ThreadId,
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current()
    }
}

impl ThreadAffinity {
    /// Pin to the calling thread.
    pub fn current() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    pub fn is_same_thread(&self) -> bool {
        self.owner == thread::current().id()
    }

    pub(crate) fn violation_message(&self, operation: &str) -> String {
        let caller = thread::current();
        format!(
            "Call must happen on the coordinator thread: `{operation}` called from \"{}\" ({:?}), coordinator is {:?}",
            caller.name().unwrap_or("<unnamed>"),
            caller.id(),
            self.owner
        )
    }
}
