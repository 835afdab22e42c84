//! Broadcast render tick and cancelation tokens.

use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::{Rc, Weak};

type Handler = Rc<dyn Fn()>;

#[derive(Default)]
struct SignalState {
    next_id: u64,
    handlers: Vec<(u64, Handler)>,
}

/// No-payload broadcast notification, fired by the host on every rendered frame (the "display link").
///
/// Any number of independent subscribers can [`observe`](Signal::observe) the signal. Handlers are invoked in
/// subscription order, but components must not rely on that.
///
/// Cloning the signal gives another handle to the same set of subscribers.
#[derive(Clone, Default)]
pub struct Signal {
    state: Rc<RefCell<SignalState>>,
}

impl Signal {
    /// Creates a signal without subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to the signal. The subscription lasts until the returned token is canceled or dropped.
    pub fn observe(&self, handler: impl Fn() + 'static) -> Cancelable {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            state.handlers.push((id, Rc::new(handler)));
            id
        };

        let state = Rc::downgrade(&self.state);
        Cancelable::new(move || remove_handler(&state, id))
    }

    /// Invokes every current subscriber.
    ///
    /// Subscribers added or removed by a handler take effect from the next emission.
    pub fn emit(&self) {
        let handlers: Vec<Handler> = self
            .state
            .borrow()
            .handlers
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in handlers {
            handler();
        }
    }

    /// Number of active subscriptions.
    pub fn subscribers_count(&self) -> usize {
        self.state.borrow().handlers.len()
    }
}

fn remove_handler(state: &Weak<RefCell<SignalState>>, id: u64) {
    if let Some(state) = state.upgrade() {
        state
            .borrow_mut()
            .handlers
            .retain(|(handler_id, _)| *handler_id != id);
    }
}

impl Debug for Signal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.subscribers_count())
            .finish()
    }
}

/// Token of a subscription or a pending asynchronous operation. The operation is canceled when the token is
/// canceled explicitly or dropped.
#[must_use = "the operation is canceled when the token is dropped"]
#[derive(Default)]
pub struct Cancelable {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Cancelable {
    /// Creates a token that runs `cancel` once.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Token that does nothing on cancelation. Used for operations that complete synchronously.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Cancels the operation. Repeated calls do nothing.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Returns true if the token was already canceled (or never had anything to cancel).
    pub fn is_canceled(&self) -> bool {
        self.cancel.is_none()
    }
}

impl Drop for Cancelable {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Debug for Cancelable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cancelable")
            .field("canceled", &self.is_canceled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn subscribers_are_notified_until_canceled() {
        let signal = Signal::new();
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));

        let first_clone = first.clone();
        let mut first_token = signal.observe(move || first_clone.set(first_clone.get() + 1));
        let second_clone = second.clone();
        let _second_token = signal.observe(move || second_clone.set(second_clone.get() + 1));

        signal.emit();
        first_token.cancel();
        signal.emit();

        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 2);
        assert_eq!(signal.subscribers_count(), 1);
    }

    #[test]
    fn dropping_token_unsubscribes() {
        let signal = Signal::new();
        let token = signal.observe(|| {});
        assert_eq!(signal.subscribers_count(), 1);
        drop(token);
        assert_eq!(signal.subscribers_count(), 0);
    }

    #[test]
    fn handler_can_unsubscribe_during_emit() {
        let signal = Signal::new();
        let token: Rc<RefCell<Option<Cancelable>>> = Rc::default();
        let calls = Rc::new(Cell::new(0));

        let token_clone = token.clone();
        let calls_clone = calls.clone();
        *token.borrow_mut() = Some(signal.observe(move || {
            calls_clone.set(calls_clone.get() + 1);
            token_clone.borrow_mut().take();
        }));

        signal.emit();
        signal.emit();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn token_outliving_signal_is_harmless() {
        let signal = Signal::new();
        let mut token = signal.observe(|| {});
        drop(signal);
        token.cancel();
        assert!(token.is_canceled());
    }
}
