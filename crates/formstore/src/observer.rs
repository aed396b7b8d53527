#![forbid(unsafe_code)]

//! Change notification for store observers.
//!
//! Observers register a callback with [`crate::FieldStore::subscribe`] and
//! receive every [`StoreEvent`] the store commits. This channel is separate
//! from the static dependency edges between fields: it is how the embedding
//! application reacts to changes (re-rendering, or writing another field).
//!
//! # Architecture
//!
//! Callbacks are stored as `Weak` references. The strong reference lives in
//! the [`Subscription`] guard returned to the caller, so dropping the guard
//! unsubscribes. Dead entries are pruned lazily on the next notification.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. A callback dropped before a notification starts is not called by it.
//! 3. No store borrow is held while callbacks run, so a callback may call
//!    back into the store.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::StoreError;

/// Who caused a selection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A `set_selection` call.
    User,
    /// The clearing step of a refresh.
    Refresh,
}

/// A committed selection change on an option-based field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    pub field_id: String,
    /// New selected option id, `None` when cleared.
    pub value: Option<String>,
    pub origin: ChangeOrigin,
}

/// Everything observers can see happen in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    SelectionChanged(SelectionChange),
    /// Only emitted when free-text notifications are enabled in the config.
    FreeTextChanged { field_id: String, value: String },
    RefreshStarted { field_id: String },
    RefreshApplied { field_id: String, option_count: usize },
    RefreshSkipped { field_id: String },
    RefreshFailed { field_id: String, error: StoreError },
}

impl StoreEvent {
    /// Field the event concerns.
    #[must_use]
    pub fn field_id(&self) -> &str {
        match self {
            Self::SelectionChanged(change) => &change.field_id,
            Self::FreeTextChanged { field_id, .. }
            | Self::RefreshStarted { field_id }
            | Self::RefreshApplied { field_id, .. }
            | Self::RefreshSkipped { field_id }
            | Self::RefreshFailed { field_id, .. } => field_id,
        }
    }
}

type Callback = dyn Fn(&StoreEvent);

/// RAII guard for an observer callback. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _callback: Rc<Callback>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Registration-ordered list of weakly held callbacks.
#[derive(Default)]
pub(crate) struct Observers {
    entries: RefCell<Vec<Weak<Callback>>>,
}

impl Observers {
    pub(crate) fn subscribe(&self, callback: impl Fn(&StoreEvent) + 'static) -> Subscription {
        let callback: Rc<Callback> = Rc::new(callback);
        self.entries.borrow_mut().push(Rc::downgrade(&callback));
        Subscription {
            _callback: callback,
        }
    }

    /// Deliver `event` to every live callback.
    pub(crate) fn notify(&self, event: &StoreEvent) {
        let live: Vec<Rc<Callback>> = {
            let mut entries = self.entries.borrow_mut();
            entries.retain(|weak| weak.strong_count() > 0);
            entries.iter().filter_map(Weak::upgrade).collect()
        };
        for callback in live {
            callback(event);
        }
    }

    pub(crate) fn notify_all(&self, events: impl IntoIterator<Item = StoreEvent>) {
        for event in events {
            self.notify(&event);
        }
    }

    /// Number of live subscriptions.
    pub(crate) fn len(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn started(id: &str) -> StoreEvent {
        StoreEvent::RefreshStarted {
            field_id: id.to_string(),
        }
    }

    #[test]
    fn notified_in_registration_order() {
        let observers = Observers::default();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l1 = Rc::clone(&log);
        let _s1 = observers.subscribe(move |e| l1.borrow_mut().push(format!("1:{}", e.field_id())));
        let l2 = Rc::clone(&log);
        let _s2 = observers.subscribe(move |e| l2.borrow_mut().push(format!("2:{}", e.field_id())));

        observers.notify(&started("a"));
        assert_eq!(*log.borrow(), ["1:a", "2:a"]);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let observers = Observers::default();
        let count = Rc::new(Cell::new(0u32));

        let c = Rc::clone(&count);
        let sub = observers.subscribe(move |_| c.set(c.get() + 1));
        observers.notify(&started("a"));
        assert_eq!(observers.len(), 1);

        drop(sub);
        observers.notify(&started("a"));
        assert_eq!(count.get(), 1);
        assert_eq!(observers.len(), 0);
    }

    #[test]
    fn callback_may_subscribe_during_notify() {
        let observers = Rc::new(Observers::default());
        let late = Rc::new(RefCell::new(Vec::new()));

        let obs = Rc::clone(&observers);
        let late_subs = Rc::clone(&late);
        let _sub = observers.subscribe(move |_| {
            late_subs.borrow_mut().push(obs.subscribe(|_| {}));
        });

        observers.notify(&started("a"));
        assert_eq!(late.borrow().len(), 1);
        assert_eq!(observers.len(), 2);
    }

    #[test]
    fn event_field_id() {
        let event = StoreEvent::SelectionChanged(SelectionChange {
            field_id: "statusId".into(),
            value: None,
            origin: ChangeOrigin::User,
        });
        assert_eq!(event.field_id(), "statusId");
    }
}
