//! Typed stage events and the listeners that observe them.
//!
//! Stages report what they did with each call (a retry scheduled, a deadline
//! hit) as values of their own event type. Listeners are registered on a
//! stage's config builder and run inline, on the task driving the call.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// An observation reported by a stage.
pub trait StageEvent: Send + Sync + fmt::Debug {
    /// Short label for the kind of event, such as `"retry"`.
    fn event_type(&self) -> &'static str;

    /// The instant the stage recorded the event.
    fn timestamp(&self) -> Instant;

    /// The configured name of the reporting stage.
    fn stage_name(&self) -> &str;
}

/// Receives events of type `E`.
pub trait EventListener<E: StageEvent>: Send + Sync {
    /// Handles one event.
    fn on_event(&self, event: &E);
}

type SharedListener<E> = Arc<dyn EventListener<E>>;

/// The listeners attached to one stage configuration.
///
/// Cloning is cheap: listeners are shared, not copied.
#[derive(Clone)]
pub struct EventListeners<E: StageEvent> {
    listeners: Vec<SharedListener<E>>,
}

impl<E: StageEvent> EventListeners<E> {
    /// No listeners.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Registers `listener`. Listeners run in registration order.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Hands `event` to each listener in turn.
    ///
    /// A listener that panics is skipped over: the panic is swallowed and
    /// later listeners still see the event.
    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));
        }
    }

    /// `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// How many listeners are registered.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: StageEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: StageEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// Adapts a closure into an [`EventListener`].
///
/// Stage builders use this for their `on_*` hooks, matching on the event
/// variant they care about.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _event: std::marker::PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _event: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: StageEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}
