//! Reactive state store for the palette.
//!
//! The [`Store`] is the single source of truth for the two pieces of mutable
//! palette state: the search text and the selected value. It combines a
//! change-detecting property with an ordered observer list:
//!
//! - Writing a value equal to the current one is a no-op and notifies nobody.
//!   This short-circuit is what stops derived recomputations that write back
//!   an unchanged value from looping forever.
//! - Every accepted write notifies all subscribers synchronously, in
//!   subscription order, before [`Store::set_field`] returns.
//! - A subscriber that writes a *different* value to the field that is
//!   currently notifying gets [`PaletteError::ReentrantMutation`], and the
//!   outermost write reports the same error once fan-out has finished.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use kit_cmd::store::{StateField, Store};
//!
//! let store = Arc::new(Store::new());
//! let id = store.subscribe(|change| {
//!     println!("{} is now {:?}", change.field, change.state.search);
//! });
//!
//! assert!(store.set_field(StateField::Search, "ech").unwrap());
//! // Same value: no notification.
//! assert!(!store.set_field(StateField::Search, "ech").unwrap());
//!
//! assert!(store.unsubscribe(id));
//! assert!(!store.unsubscribe(id));
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use slotmap::{SlotMap, new_key_type};

use crate::error::{PaletteError, Result};
use crate::logging::targets;

new_key_type! {
    /// Identifies a subscription on a [`Store`].
    ///
    /// Keys are generational: once unsubscribed, an id never matches a later
    /// subscription, so unsubscribing twice is always harmless.
    pub struct SubscriptionId;
}

/// Snapshot of the palette state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaletteState {
    /// Current search text.
    pub search: String,
    /// Value of the selected item, or empty when nothing is selected.
    pub value: String,
}

impl PaletteState {
    /// Read a field by key.
    pub fn field(&self, field: StateField) -> &str {
        match field {
            StateField::Search => &self.search,
            StateField::Value => &self.value,
        }
    }

    fn field_mut(&mut self, field: StateField) -> &mut String {
        match field {
            StateField::Search => &mut self.search,
            StateField::Value => &mut self.value,
        }
    }

    /// Returns `true` when an item is selected.
    pub fn has_selection(&self) -> bool {
        !self.value.is_empty()
    }
}

/// Keys of the fields held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    /// The search text.
    Search,
    /// The selected value.
    Value,
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search => write!(f, "search"),
            Self::Value => write!(f, "value"),
        }
    }
}

/// Notification delivered to subscribers after an accepted write.
#[derive(Debug, Clone)]
pub struct StateChange {
    /// The field that changed.
    pub field: StateField,
    /// The state right after the change was applied.
    pub state: PaletteState,
}

type Listener = Arc<dyn Fn(&StateChange) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    slots: SlotMap<SubscriptionId, Listener>,
    /// Subscription order; slot iteration order reuses freed slots.
    order: Vec<SubscriptionId>,
}

#[derive(Default)]
struct Notification {
    /// Fields whose subscribers are currently being notified.
    active: Vec<StateField>,
    /// First re-entrant write observed during the current fan-out.
    violation: Option<StateField>,
}

/// Holds [`PaletteState`] and fans out changes to subscribers.
pub struct Store {
    state: RwLock<PaletteState>,
    listeners: Mutex<Listeners>,
    notification: Mutex<Notification>,
}

impl Store {
    /// Create a store with empty search and no selection.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(PaletteState::default()),
            listeners: Mutex::new(Listeners::default()),
            notification: Mutex::new(Notification::default()),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> PaletteState {
        self.state.read().clone()
    }

    /// Current search text.
    pub fn search(&self) -> String {
        self.state.read().search.clone()
    }

    /// Current selected value.
    pub fn value(&self) -> String {
        self.state.read().value.clone()
    }

    /// Register a listener. Listeners run in subscription order.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock();
        let id = listeners.slots.insert(Arc::new(listener));
        listeners.order.push(id);
        tracing::trace!(target: targets::STORE, ?id, "subscribed");
        id
    }

    /// Register a listener that is removed when the returned guard drops.
    pub fn subscribe_scoped<F>(self: &Arc<Self>, listener: F) -> SubscriptionGuard
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let id = self.subscribe(listener);
        SubscriptionGuard {
            store: Arc::downgrade(self),
            id,
        }
    }

    /// Remove a listener.
    ///
    /// Returns `false` if the subscription was already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        if listeners.slots.remove(id).is_none() {
            return false;
        }
        listeners.order.retain(|&entry| entry != id);
        tracing::trace!(target: targets::STORE, ?id, "unsubscribed");
        true
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().slots.len()
    }

    /// Write a field.
    ///
    /// Returns `Ok(true)` if the value changed and subscribers were notified,
    /// `Ok(false)` if the value was equal to the current one.
    ///
    /// # Errors
    ///
    /// Returns [`PaletteError::ReentrantMutation`] when called from a
    /// subscriber with a different value for the field currently being
    /// notified, and from the outermost write once that has happened.
    #[tracing::instrument(skip(self, value), target = "kit_cmd::store", level = "trace")]
    pub fn set_field(&self, field: StateField, value: impl Into<String>) -> Result<bool> {
        let value = value.into();

        if self.state.read().field(field) == value {
            return Ok(false);
        }

        {
            let mut notification = self.notification.lock();
            if notification.active.contains(&field) {
                tracing::warn!(
                    target: targets::STORE,
                    %field,
                    "subscriber changed a field during its own notification"
                );
                notification.violation.get_or_insert(field);
                return Err(PaletteError::reentrant(field));
            }
            notification.active.push(field);
        }

        let state = {
            let mut state = self.state.write();
            *state.field_mut(field) = value;
            state.clone()
        };

        let listeners: Vec<Listener> = {
            let listeners = self.listeners.lock();
            listeners
                .order
                .iter()
                .filter_map(|id| listeners.slots.get(*id).cloned())
                .collect()
        };
        tracing::trace!(
            target: targets::STORE,
            %field,
            listener_count = listeners.len(),
            "notifying subscribers"
        );

        let change = StateChange { field, state };
        for listener in &listeners {
            listener(&change);
        }

        let violation = {
            let mut notification = self.notification.lock();
            notification.active.retain(|&active| active != field);
            if notification.active.is_empty() {
                notification.violation.take()
            } else {
                None
            }
        };

        match violation {
            Some(field) => Err(PaletteError::reentrant(field)),
            None => Ok(true),
        }
    }

    /// Shorthand for `set_field(StateField::Search, ..)`.
    pub fn set_search(&self, search: impl Into<String>) -> Result<bool> {
        self.set_field(StateField::Search, search)
    }

    /// Shorthand for `set_field(StateField::Value, ..)`.
    pub fn set_value(&self, value: impl Into<String>) -> Result<bool> {
        self.set_field(StateField::Value, value)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &*self.state.read())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Removes its subscription when dropped.
///
/// Created by [`Store::subscribe_scoped`] and
/// [`Palette::subscribe_scoped`](crate::Palette::subscribe_scoped).
#[must_use = "the subscription is removed as soon as the guard is dropped"]
pub struct SubscriptionGuard {
    store: Weak<Store>,
    id: SubscriptionId,
}

impl SubscriptionGuard {
    /// The id of the guarded subscription.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Keep the subscription alive for the rest of the store's lifetime.
    pub fn forget(self) -> SubscriptionId {
        let id = self.id;
        std::mem::forget(self);
        id
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.unsubscribe(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_equal_write_is_silent() {
        let store = Store::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        store.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(store.set_search("ech").unwrap());
        assert!(!store.set_search("ech").unwrap());
        assert!(!store.set_value("").unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_notifies_in_subscription_order() {
        let store = Store::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let log = log.clone();
            store.subscribe(move |change| {
                log.lock().push((name, change.field, change.state.value.clone()));
            });
        }

        store.set_value("bilibili").unwrap();

        let log = log.lock();
        assert_eq!(
            *log,
            vec![
                ("first", StateField::Value, "bilibili".to_string()),
                ("second", StateField::Value, "bilibili".to_string()),
                ("third", StateField::Value, "bilibili".to_string()),
            ]
        );
    }

    #[test]
    fn test_order_survives_slot_reuse() {
        let store = Store::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let subscribe = |name: &'static str| {
            let log = log.clone();
            store.subscribe(move |_| log.lock().push(name))
        };

        let a = subscribe("a");
        subscribe("b");
        store.unsubscribe(a);
        // Reuses the slot freed by `a` but must still run last.
        subscribe("c");

        store.set_search("x").unwrap();
        assert_eq!(*log.lock(), vec!["b", "c"]);
    }

    #[test]
    fn test_unsubscribe_twice() {
        let store = Store::new();
        let id = store.subscribe(|_| {});
        assert_eq!(store.subscriber_count(), 1);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_stale_id_does_not_remove_new_subscriber() {
        let store = Store::new();
        let old = store.subscribe(|_| {});
        store.unsubscribe(old);

        let _new = store.subscribe(|_| {});
        assert!(!store.unsubscribe(old));
        assert_eq!(store.subscriber_count(), 1);
    }

    #[test]
    fn test_scoped_subscription() {
        let store = Arc::new(Store::new());
        let calls = Arc::new(AtomicUsize::new(0));

        {
            let calls = calls.clone();
            let _guard = store.subscribe_scoped(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
            store.set_search("a").unwrap();
        }

        store.set_search("b").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_write_back_of_equal_value_is_allowed() {
        let store = Arc::new(Store::new());
        let weak = Arc::downgrade(&store);
        let inner_result = Arc::new(Mutex::new(None));
        let inner_clone = inner_result.clone();

        store.subscribe(move |change| {
            if let Some(store) = weak.upgrade() {
                let result = store.set_search(change.state.search.clone());
                *inner_clone.lock() = Some(result.is_ok());
            }
        });

        assert!(store.set_search("ech").unwrap());
        assert_eq!(*inner_result.lock(), Some(true));
    }

    #[test]
    fn test_reentrant_write_fails_fast() {
        let store = Arc::new(Store::new());
        let weak = Arc::downgrade(&store);
        let inner_error = Arc::new(AtomicUsize::new(0));
        let inner_clone = inner_error.clone();

        store.subscribe(move |change| {
            if change.field != StateField::Search {
                return;
            }
            if let Some(store) = weak.upgrade() {
                let next = format!("{}!", change.state.search);
                if let Err(err) = store.set_search(next) {
                    assert!(err.is_reentrant_mutation());
                    inner_clone.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        let err = store.set_search("a").unwrap_err();
        assert!(matches!(
            err,
            PaletteError::ReentrantMutation {
                field: StateField::Search
            }
        ));
        assert_eq!(inner_error.load(Ordering::SeqCst), 1);
        assert_eq!(store.search(), "a");

        // The store recovers: the next write is accepted normally apart from
        // the same subscriber misbehaving again.
        assert!(store.set_search("a").is_ok());
    }

    #[test]
    fn test_other_field_may_change_during_notification() {
        let store = Arc::new(Store::new());
        let weak = Arc::downgrade(&store);

        store.subscribe(move |change| {
            if change.field == StateField::Search
                && let Some(store) = weak.upgrade()
            {
                store.set_value("").unwrap();
                store.set_value(format!("first:{}", change.state.search)).unwrap();
            }
        });

        assert!(store.set_search("e").unwrap());
        assert_eq!(store.value(), "first:e");
    }
}
