#![forbid(unsafe_code)]

//! Single-use completion tokens for committed drags.
//!
//! Once a drag has been committed to a target, the source container's
//! `complete_drag_of_cell` receives a [`DoneHandle`] and may take as long as
//! it likes (persistence, animation, a confirmation dialog) before calling
//! [`DoneHandle::done`]. The coordinator keeps the matching
//! [`CompletionSource`] and observes fulfillment when it is polled.
//!
//! # Invariants
//!
//! 1. The first `done()` fulfills the token; every later call, from any clone
//!    on any thread, returns `false` and has no effect.
//! 2. The waker, if installed, runs at most once, on the first fulfillment.
//! 3. Dropping every handle without calling `done()` does **not** fulfill the
//!    token. The session stays in `Completing`; the drop and the coordinator's
//!    next poll each log a contract violation.
//!
//! # Example
//!
//! ```
//! use stackdrag_core::completion::CompletionSource;
//!
//! let source = CompletionSource::new();
//! let done = source.handle();
//!
//! std::thread::spawn(move || {
//!     // persist the move...
//!     done.done();
//! })
//! .join()
//! .unwrap();
//!
//! assert!(source.is_fulfilled());
//! ```


use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Waker = Box<dyn FnOnce() + Send>;

struct CompletionInner {
    fulfilled: AtomicBool,
    handles: AtomicUsize,
    waker: Mutex<Option<Waker>>,
}

/// The coordinator's side of a completion token.
pub struct CompletionSource {
    inner: Arc<CompletionInner>,
}

/// The collaborator's side: call [`done`](Self::done) exactly once on every
/// exit path, success or failure.
pub struct DoneHandle {
    inner: Arc<CompletionInner>,
}

impl fmt::Debug for CompletionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSource")
            .field("fulfilled", &self.is_fulfilled())
            .finish()
    }
}

impl fmt::Debug for DoneHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DoneHandle")
            .field("fulfilled", &self.inner.fulfilled.load(Ordering::Acquire))
            .finish()
    }
}

impl CompletionSource {
    /// Create an unfulfilled token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CompletionInner {
                fulfilled: AtomicBool::new(false),
                handles: AtomicUsize::new(0),
                waker: Mutex::new(None),
            }),
        }
    }

    /// Obtain a handle for the collaborator.
    #[must_use]
    pub fn handle(&self) -> DoneHandle {
        self.inner.handles.fetch_add(1, Ordering::AcqRel);
        DoneHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Install a callback run once on first fulfillment, typically to wake
    /// the host event loop so it calls `DragCoordinator::poll`.
    ///
    /// If the token is already fulfilled the callback runs immediately.
    pub fn set_waker(&self, waker: impl FnOnce() + Send + 'static) {
        let mut slot = self.inner.waker.lock().unwrap_or_else(|e| e.into_inner());
        if self.is_fulfilled() {
            drop(slot);
            waker();
            return;
        }
        *slot = Some(Box::new(waker));
    }

    /// Whether `done()` has been called.
    #[inline]
    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        self.inner.fulfilled.load(Ordering::Acquire)
    }

    /// Whether every handle has been dropped without fulfilling the token.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        !self.is_fulfilled() && self.inner.handles.load(Ordering::Acquire) == 0
    }
}

impl Default for CompletionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DoneHandle {
    /// Signal that the drag's side effects are finished.
    ///
    /// Returns `true` if this call fulfilled the token, `false` if it had
    /// already been fulfilled.
    pub fn done(&self) -> bool {
        if self.inner.fulfilled.swap(true, Ordering::AcqRel) {
            return false;
        }
        let waker = self
            .inner
            .waker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(waker) = waker {
            waker();
        }
        true
    }
}

impl Clone for DoneHandle {
    fn clone(&self) -> Self {
        self.inner.handles.fetch_add(1, Ordering::AcqRel);
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for DoneHandle {
    fn drop(&mut self) {
        let remaining = self.inner.handles.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining == 0 && !self.inner.fulfilled.load(Ordering::Acquire) {
            tracing::warn!("drag completion handle dropped without calling done(); session will stall");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::thread;

    #[test]
    fn starts_unfulfilled() {
        let source = CompletionSource::new();
        let _handle = source.handle();
        assert!(!source.is_fulfilled());
        assert!(!source.is_abandoned());
    }

    #[test]
    fn done_fulfills() {
        let source = CompletionSource::new();
        let handle = source.handle();
        assert!(handle.done());
        assert!(source.is_fulfilled());
    }

    #[test]
    fn second_done_is_noop() {
        let source = CompletionSource::new();
        let handle = source.handle();
        assert!(handle.done());
        assert!(!handle.done());
        assert!(!handle.clone().done());
        assert!(source.is_fulfilled());
    }

    #[test]
    fn waker_runs_once() {
        let source = CompletionSource::new();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);
        source.set_waker(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        let handle = source.handle();
        handle.done();
        handle.done();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn waker_set_after_fulfillment_runs_immediately() {
        let source = CompletionSource::new();
        source.handle().done();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = Arc::clone(&calls);
        source.set_waker(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_handles_abandons_without_fulfilling() {
        let source = CompletionSource::new();
        let handle = source.handle();
        let clone = handle.clone();
        drop(handle);
        assert!(!source.is_abandoned());
        drop(clone);
        assert!(source.is_abandoned());
        assert!(!source.is_fulfilled());
    }

    #[test]
    fn done_from_another_thread() {
        let source = CompletionSource::new();
        let handle = source.handle();
        thread::spawn(move || {
            handle.done();
        })
        .join()
        .unwrap();
        assert!(source.is_fulfilled());
        assert!(!source.is_abandoned());
    }

    #[test]
    fn racing_clones_fulfill_exactly_once() {
        let source = CompletionSource::new();
        let wins = Arc::new(AtomicU32::new(0));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let handle = source.handle();
                let wins = Arc::clone(&wins);
                thread::spawn(move || {
                    if handle.done() {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }
}
