//! Composable, one-way latching cancellation signals.
//!
//! A [`CancellationSignal`] fires at most once and remembers why it fired.
//! Signals form a tree: a [`LinkedSignal`] obtained from [`CancellationSignal::link`]
//! fires whenever its parent fires, but can also be fired on its own without
//! affecting the parent. This is how a stage derives a narrower signal (for
//! example one that also fires on a deadline) from the signal it was handed.
//!
//! The first cause always wins: once a signal has fired, later attempts to
//! fire it with a different reason are ignored.
//!
//! ```
//! use http_resilience_core::{CancelReason, CancellationSignal};
//!
//! let caller = CancellationSignal::new();
//! let derived = caller.link();
//!
//! derived.cancel_with(CancelReason::DeadlineExceeded);
//! assert!(!caller.is_cancelled());
//!
//! caller.cancel();
//! // The derived signal keeps its original reason.
//! assert_eq!(derived.reason(), Some(CancelReason::DeadlineExceeded));
//! ```

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::watch;

/// Why a [`CancellationSignal`] fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelReason {
    /// The caller that owns the call asked for it to stop.
    CallerRequested,
    /// A deadline enforced inside the pipeline elapsed.
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::CallerRequested => write!(f, "caller requested"),
            CancelReason::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

struct Inner {
    state: watch::Sender<Option<CancelReason>>,
    children: Mutex<Vec<Weak<Inner>>>,
}

impl Inner {
    fn new() -> Arc<Self> {
        let (state, _) = watch::channel(None);
        Arc::new(Self {
            state,
            children: Mutex::new(Vec::new()),
        })
    }

    fn reason(&self) -> Option<CancelReason> {
        *self.state.borrow()
    }

    fn fire(&self, reason: CancelReason) -> bool {
        let latched = self.state.send_if_modified(|state| {
            if state.is_none() {
                *state = Some(reason);
                true
            } else {
                false
            }
        });

        if latched {
            let children = std::mem::take(&mut *self.lock_children());
            for child in children.iter().filter_map(Weak::upgrade) {
                child.fire(reason);
            }
        }

        latched
    }

    fn lock_children(&self) -> std::sync::MutexGuard<'_, Vec<Weak<Inner>>> {
        self.children.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `child` so it fires together with `self`.
    ///
    /// The parent's state is read under the children lock, and `fire` latches
    /// the state before draining the list, so a child can never miss a
    /// parent that fires concurrently.
    fn attach(&self, child: &Arc<Inner>) {
        let mut children = self.lock_children();
        match self.reason() {
            Some(reason) => {
                drop(children);
                child.fire(reason);
            }
            None => {
                children.retain(|weak| weak.strong_count() > 0);
                children.push(Arc::downgrade(child));
            }
        }
    }

    fn detach(&self, child: &Arc<Inner>) {
        self.lock_children().retain(|weak| match weak.upgrade() {
            Some(existing) => !Arc::ptr_eq(&existing, child),
            None => false,
        });
    }
}

/// A cloneable handle to a one-way latching cancellation flag.
///
/// Clones share the same flag. Firing is cooperative: nothing is aborted
/// forcibly, holders are expected to observe the signal through
/// [`is_cancelled`](Self::is_cancelled) or [`cancelled`](Self::cancelled)
/// at their wait points.
#[derive(Clone)]
pub struct CancellationSignal {
    inner: Arc<Inner>,
}

impl CancellationSignal {
    /// Creates a signal that has not fired.
    pub fn new() -> Self {
        Self {
            inner: Inner::new(),
        }
    }

    /// Fires the signal on behalf of the caller.
    ///
    /// Returns `true` if this call latched the signal.
    pub fn cancel(&self) -> bool {
        self.cancel_with(CancelReason::CallerRequested)
    }

    /// Fires the signal with an explicit reason.
    ///
    /// Returns `true` if this call latched the signal, `false` if it had
    /// already fired (in which case the original reason is kept).
    pub fn cancel_with(&self, reason: CancelReason) -> bool {
        self.inner.fire(reason)
    }

    /// Returns `true` once the signal has fired.
    pub fn is_cancelled(&self) -> bool {
        self.inner.reason().is_some()
    }

    /// Returns the reason the signal fired with, if it has fired.
    pub fn reason(&self) -> Option<CancelReason> {
        self.inner.reason()
    }

    /// Waits until the signal fires and returns the reason.
    ///
    /// Resolves immediately if the signal has already fired.
    pub async fn cancelled(&self) -> CancelReason {
        let mut rx = self.inner.state.subscribe();
        loop {
            if let Some(reason) = *rx.borrow_and_update() {
                return reason;
            }
            // `self` keeps the sender alive, so `changed` cannot fail here.
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }

    /// Derives a child signal that fires whenever `self` fires.
    ///
    /// The child inherits the parent's reason. Firing the child does not
    /// affect the parent. The returned guard unregisters the child from the
    /// parent when dropped.
    pub fn link(&self) -> LinkedSignal {
        let child = CancellationSignal::new();
        self.inner.attach(&child.inner);
        LinkedSignal {
            parents: vec![Arc::clone(&self.inner)],
            signal: child,
        }
    }

    /// Builds a signal that fires as soon as any of `sources` fires,
    /// carrying the reason of the first one.
    pub fn any(sources: &[&CancellationSignal]) -> LinkedSignal {
        let child = CancellationSignal::new();
        for source in sources {
            source.inner.attach(&child.inner);
        }
        LinkedSignal {
            parents: sources.iter().map(|s| Arc::clone(&s.inner)).collect(),
            signal: child,
        }
    }

    /// Number of linked children still registered on this signal.
    ///
    /// Registrations are removed when a [`LinkedSignal`] is dropped or when
    /// this signal fires.
    pub fn linked_count(&self) -> usize {
        self.inner
            .lock_children()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationSignal")
            .field("reason", &self.reason())
            .finish()
    }
}

/// A child signal that stays attached to its parents for as long as it lives.
///
/// Dereferences to [`CancellationSignal`]; clone the inner signal with
/// [`signal`](Self::signal) to hand it to other code. Dropping the guard
/// detaches the child from its parents, while outstanding clones keep
/// working but no longer follow the parents.
pub struct LinkedSignal {
    parents: Vec<Arc<Inner>>,
    signal: CancellationSignal,
}

impl LinkedSignal {
    /// Returns a handle to the child signal.
    pub fn signal(&self) -> CancellationSignal {
        self.signal.clone()
    }
}

impl Deref for LinkedSignal {
    type Target = CancellationSignal;

    fn deref(&self) -> &Self::Target {
        &self.signal
    }
}

impl Drop for LinkedSignal {
    fn drop(&mut self) {
        for parent in &self.parents {
            parent.detach(&self.signal.inner);
        }
    }
}

impl fmt::Debug for LinkedSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkedSignal")
            .field("reason", &self.signal.reason())
            .field("parents", &self.parents.len())
            .finish()
    }
}
