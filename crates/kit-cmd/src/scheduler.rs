//! Keyed, coalescing effect queue.
//!
//! Effects are scheduled under a key and run at the next [`flush`]. Scheduling
//! again under a key that is still pending replaces the earlier effect, which
//! is then dropped without running; the key keeps its original place in the
//! queue. A burst of N registrations that each schedule "select the first
//! item" therefore costs one selection pass, run after the whole burst is
//! registered.
//!
//! The queue does not run itself. The host flushes it once per turn of its
//! event loop; a flush requester, when installed, is called whenever the
//! queue goes from empty to non-empty so the host knows a turn is needed.
//!
//! [`flush`]: EffectScheduler::flush

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::logging::targets;

/// A boxed effect closure, given the flush context when it runs.
type BoxedEffect<C> = Box<dyn FnOnce(&C) + Send + 'static>;

/// Callback asking the host to schedule a flush.
type FlushRequester = Arc<dyn Fn() + Send + Sync>;

/// Queue of effects keyed by `K`, run against a context `C`.
pub struct EffectScheduler<K, C> {
    pending: Mutex<IndexMap<K, BoxedEffect<C>>>,
    requester: Mutex<Option<FlushRequester>>,
}

impl<K, C> EffectScheduler<K, C>
where
    K: Clone + Eq + Hash + fmt::Debug,
{
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(IndexMap::new()),
            requester: Mutex::new(None),
        }
    }

    /// Install the callback used to request a flush from the host.
    pub fn set_flush_requester<F>(&self, requester: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.requester.lock() = Some(Arc::new(requester));
    }

    /// Schedule `effect` under `key` for the next flush.
    ///
    /// Returns `true` if a pending effect with the same key was replaced.
    pub fn schedule<F>(&self, key: K, effect: F) -> bool
    where
        F: FnOnce(&C) + Send + 'static,
    {
        let (replaced, was_empty) = {
            let mut pending = self.pending.lock();
            let was_empty = pending.is_empty();
            let replaced = pending.insert(key.clone(), Box::new(effect)).is_some();
            (replaced, was_empty)
        };

        if replaced {
            tracing::trace!(target: targets::SCHEDULER, ?key, "superseded pending effect");
        } else {
            tracing::trace!(target: targets::SCHEDULER, ?key, "scheduled effect");
        }

        if was_empty {
            let requester = self.requester.lock().clone();
            if let Some(requester) = requester {
                requester();
            }
        }
        replaced
    }

    /// Drop a pending effect without running it.
    ///
    /// Returns `true` if an effect was pending under `key`.
    pub fn cancel(&self, key: &K) -> bool {
        self.pending.lock().shift_remove(key).is_some()
    }

    /// Returns `true` if an effect is pending under `key`.
    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.lock().contains_key(key)
    }

    /// Returns `true` if any effect is pending.
    pub fn has_pending(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    /// Number of pending effects.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Run every pending effect in scheduling order.
    ///
    /// Effects scheduled while the flush runs are queued for the next flush.
    /// Returns the number of effects run.
    #[tracing::instrument(skip_all, target = "kit_cmd::scheduler", level = "trace")]
    pub fn flush(&self, context: &C) -> usize {
        let effects = std::mem::take(&mut *self.pending.lock());
        let count = effects.len();
        if count > 0 {
            tracing::trace!(target: targets::SCHEDULER, count, "flushing effects");
        }
        for (_, effect) in effects {
            effect(context);
        }
        count
    }
}

impl<K, C> Default for EffectScheduler<K, C>
where
    K: Clone + Eq + Hash + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, C> fmt::Debug for EffectScheduler<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = self.pending.lock();
        f.debug_struct("EffectScheduler")
            .field("pending", &pending.keys().collect::<Vec<_>>())
            .finish()
    }
}
