//! The palette engine.
//!
//! [`Palette`] owns one [`Store`], one [`Registry`] and one effect queue, and
//! keeps the selection invariant: the selected value is either empty or the
//! value of a visible, enabled item.
//!
//! Registration is cheap. Registering an item only schedules a selection pass
//! under [`EffectKey::RecoverSelection`]; a burst of registrations collapses
//! into a single pass that runs at the next [`Palette::flush`]. Every input
//! operation flushes first, so input always sees the whole burst. Changes
//! that affect the currently selected item (unregistering it, disabling it,
//! changing its value) recover the selection immediately instead.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::affinity::ThreadAffinity;
use crate::config::PaletteConfig;
use crate::error::{EntryKind, Result};
use crate::filter::{Filter, VisibleItem, VisibleSet};
use crate::keymap::{KeyInput, Keymap, PaletteCommand};
use crate::logging::{PaletteTreeDebug, targets};
use crate::navigator::{Direction, Navigator};
use crate::registry::{EntryToken, GroupId, GroupOptions, ItemId, ItemOptions, Registry};
use crate::scheduler::EffectScheduler;
use crate::store::{PaletteState, StateChange, Store, SubscriptionGuard, SubscriptionId};

/// Key under which a palette effect is scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EffectKey {
    /// Re-establish the selection against the current visible set.
    RecoverSelection,
    /// An effect scheduled by the host through [`Palette::schedule`].
    Custom(String),
}

struct PaletteInner {
    config: PaletteConfig,
    filter: Filter,
    navigator: Navigator,
    keymap: Keymap,
    store: Arc<Store>,
    registry: RwLock<Registry>,
    selected: Mutex<Option<ItemId>>,
    scheduler: EffectScheduler<EffectKey, Palette>,
    affinity: ThreadAffinity,
}

/// Handle to a command palette engine.
///
/// Cloning is cheap; clones drive the same engine.
#[derive(Clone)]
pub struct Palette {
    inner: Arc<PaletteInner>,
}

static_assertions::assert_impl_all!(Palette: Send, Sync, Clone);

impl Palette {
    /// Create a palette with the default configuration.
    pub fn new() -> Self {
        Self::with_config(PaletteConfig::default())
    }

    /// Create a palette.
    pub fn with_config(config: PaletteConfig) -> Self {
        tracing::debug!(target: targets::PALETTE, ?config, "creating palette");
        Self {
            inner: Arc::new(PaletteInner {
                filter: Filter::from_config(&config),
                navigator: Navigator::new(config.loop_selection),
                keymap: Keymap::new(config.group_jumps),
                config,
                store: Arc::new(Store::new()),
                registry: RwLock::new(Registry::new()),
                selected: Mutex::new(None),
                scheduler: EffectScheduler::new(),
                affinity: ThreadAffinity::current(),
            }),
        }
    }

    /// A weak handle that does not keep the engine alive.
    ///
    /// Listeners and effects that need to call back into the palette should
    /// capture this instead of a [`Palette`] clone.
    pub fn downgrade(&self) -> WeakPalette {
        WeakPalette {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// The configuration the palette was created with.
    pub fn config(&self) -> &PaletteConfig {
        &self.inner.config
    }

    /// Accessible label of the palette.
    pub fn label(&self) -> &str {
        &self.inner.config.label
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Snapshot of the current state.
    pub fn state(&self) -> PaletteState {
        self.inner.store.state()
    }

    /// Id of the selected item.
    pub fn selected_item(&self) -> Option<ItemId> {
        self.inner.selected.lock().clone()
    }

    /// Subscribe to state changes. Listeners run synchronously, in
    /// subscription order, after every accepted change.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.inner.store.subscribe(listener)
    }

    /// Subscribe for as long as the returned guard is alive.
    pub fn subscribe_scoped<F>(&self, listener: F) -> SubscriptionGuard
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.inner.store.subscribe_scoped(listener)
    }

    /// Remove a subscription. Returns `false` if it was already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.store.unsubscribe(id)
    }

    /// The items visible under the current search, in display order.
    pub fn compute_visible(&self) -> VisibleSet {
        let state = self.inner.store.state();
        self.inner
            .filter
            .compute_visible(&state, &self.inner.registry.read())
    }

    /// Render the visible set as a tree, for debug logging.
    pub fn debug_tree(&self) -> String {
        PaletteTreeDebug::new().format(&self.compute_visible(), self.selected_item().as_ref())
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Replace the search text.
    ///
    /// The selection is kept when the selected item is still visible and
    /// otherwise moves to the first visible item. Returns `Ok(false)` if the
    /// text did not change.
    ///
    /// # Errors
    ///
    /// Returns [`PaletteError::ReentrantMutation`](crate::PaletteError::ReentrantMutation)
    /// when called from a search listener with a different text. The outer
    /// call returns the same error, with its own text applied and the
    /// selection recovered against it.
    pub fn set_search(&self, search: impl Into<String>) -> Result<bool> {
        self.inner.affinity.debug_assert_same_thread("set_search");
        self.flush();

        let search = search.into();
        match self.inner.store.set_search(search.as_str()) {
            Ok(false) => Ok(false),
            Ok(true) => {
                self.recover_selection()?;
                Ok(true)
            }
            Err(error) => {
                // The outermost write applies the text before its listeners fail.
                if self.inner.store.search() == search
                    && let Err(recovery) = self.recover_selection()
                {
                    tracing::warn!(
                        target: targets::PALETTE,
                        error = %recovery,
                        "selection recovery failed"
                    );
                }
                Err(error)
            }
        }
    }

    /// Select the visible, enabled item whose value is `value`.
    ///
    /// An empty `value` clears the selection. Returns `Ok(false)` when no
    /// selectable item has that value or the selection did not change.
    pub fn set_selection(&self, value: &str) -> Result<bool> {
        self.inner.affinity.debug_assert_same_thread("set_selection");
        self.flush();

        if value.is_empty() {
            return self.apply_selection(None);
        }
        let visible = self.compute_visible();
        match visible.position_of_value(value) {
            Some(position) => self.apply_selection(Some(&visible.items()[position])),
            None => {
                tracing::debug!(target: targets::PALETTE, value, "no selectable item with value");
                Ok(false)
            }
        }
    }

    /// Move the selection cursor.
    ///
    /// Returns `Ok(true)` if the selection changed.
    #[tracing::instrument(skip(self), target = "kit_cmd::palette", level = "trace")]
    pub fn move_selection(&self, direction: Direction) -> Result<bool> {
        self.inner.affinity.debug_assert_same_thread("move_selection");
        self.flush();

        let visible = self.compute_visible();
        let current = self
            .selected_item()
            .and_then(|id| visible.position_of(&id));
        let target = self.inner.navigator.target(&visible, current, direction);
        tracing::trace!(
            target: targets::NAVIGATOR,
            %direction,
            ?current,
            ?target,
            "moving selection"
        );
        self.apply_selection(target.map(|position| &visible.items()[position]))
    }

    /// Handle a key press.
    ///
    /// Returns the command the key mapped to, or `None` when the palette
    /// ignored it and the host should handle it itself.
    pub fn handle_key(&self, input: impl Into<KeyInput>) -> Result<Option<PaletteCommand>> {
        let input = input.into();
        let Some(command) = self.inner.keymap.classify(&input) else {
            return Ok(None);
        };
        tracing::trace!(target: targets::PALETTE, ?input, ?command, "key press");

        match command {
            PaletteCommand::Move(direction) => {
                self.move_selection(direction)?;
            }
            PaletteCommand::Confirm => {
                self.confirm();
            }
        }
        Ok(Some(command))
    }

    /// Run the selected item's select callback.
    ///
    /// Returns `true` if a callback ran.
    pub fn confirm(&self) -> bool {
        self.inner.affinity.debug_assert_same_thread("confirm");
        self.flush();

        match self.selected_item() {
            Some(id) => self.invoke_on_select(&id),
            None => false,
        }
    }

    /// Run an item's select callback, as a pointer click does.
    ///
    /// Disabled and unknown items are ignored. Returns `true` if a callback
    /// ran.
    pub fn activate_item(&self, id: impl Into<ItemId>) -> bool {
        self.inner.affinity.debug_assert_same_thread("activate_item");
        self.flush();
        self.invoke_on_select(&id.into())
    }

    /// Move the selection to a hovered item.
    ///
    /// Ignored when pointer selection is disabled, or when the item is not
    /// visible and selectable. Returns `Ok(true)` if the selection changed.
    pub fn hover_item(&self, id: impl Into<ItemId>) -> Result<bool> {
        self.inner.affinity.debug_assert_same_thread("hover_item");
        if self.inner.config.disable_pointer_selection {
            return Ok(false);
        }
        self.flush();

        let id = id.into();
        let visible = self.compute_visible();
        match visible.position_of(&id) {
            Some(position) if visible.items()[position].is_selectable() => {
                self.apply_selection(Some(&visible.items()[position]))
            }
            _ => Ok(false),
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register an item.
    ///
    /// The item stays registered until the returned handle is dropped or
    /// [`unregister_item`](Self::unregister_item) is called.
    ///
    /// # Errors
    ///
    /// Returns [`PaletteError::DuplicateRegistration`](crate::PaletteError::DuplicateRegistration)
    /// if an item with the same id is registered.
    pub fn register_item(
        &self,
        id: impl Into<ItemId>,
        options: ItemOptions,
    ) -> Result<Registration> {
        self.inner.affinity.debug_assert_same_thread("register_item");
        let id = id.into();
        let token = self.inner.registry.write().register_item(id.clone(), options)?;
        self.schedule_recovery();
        Ok(Registration::new(self, RegisteredEntry::Item(id, token)))
    }

    /// Unregister an item. Returns `false` if it was not registered.
    pub fn unregister_item(&self, id: impl Into<ItemId>) -> bool {
        self.inner.affinity.debug_assert_same_thread("unregister_item");
        let id = id.into();
        if self.inner.registry.write().unregister_item(&id).is_none() {
            tracing::trace!(target: targets::PALETTE, %id, "ignoring unregister of unknown item");
            return false;
        }
        self.item_changed(&id);
        true
    }

    /// Register a group.
    ///
    /// # Errors
    ///
    /// Returns [`PaletteError::DuplicateRegistration`](crate::PaletteError::DuplicateRegistration)
    /// if a group with the same id is registered.
    pub fn register_group(
        &self,
        id: impl Into<GroupId>,
        options: GroupOptions,
    ) -> Result<Registration> {
        self.inner.affinity.debug_assert_same_thread("register_group");
        let id = id.into();
        let token = self.inner.registry.write().register_group(id.clone(), options)?;
        self.schedule_recovery();
        Ok(Registration::new(self, RegisteredEntry::Group(id, token)))
    }

    /// Unregister a group. Its items stay registered and become ungrouped.
    pub fn unregister_group(&self, id: impl Into<GroupId>) -> bool {
        self.inner.affinity.debug_assert_same_thread("unregister_group");
        let id = id.into();
        if self.inner.registry.write().unregister_group(&id).is_none() {
            tracing::trace!(target: targets::PALETTE, %id, "ignoring unregister of unknown group");
            return false;
        }
        self.groups_changed();
        true
    }

    /// Store an item's derived value. Unknown items are ignored.
    ///
    /// Returns `true` if the value changed.
    pub fn report_value(&self, id: impl Into<ItemId>, value: &str) -> bool {
        self.inner.affinity.debug_assert_same_thread("report_value");
        let id = id.into();
        let changed = self.inner.registry.write().report_value(&id, value);
        if changed {
            self.item_changed(&id);
        }
        changed
    }

    /// Derive an item's value from its rendered text content and store it.
    ///
    /// An explicit value given at registration takes precedence over
    /// `content`. Returns `true` if the value changed.
    pub fn report_content(&self, id: impl Into<ItemId>, content: &str) -> bool {
        self.inner.affinity.debug_assert_same_thread("report_content");
        let id = id.into();
        let changed = self.inner.registry.write().report_content(&id, content);
        if changed {
            self.item_changed(&id);
        }
        changed
    }

    /// Enable or disable an item. Returns `true` if the flag changed.
    pub fn set_item_disabled(&self, id: impl Into<ItemId>, disabled: bool) -> bool {
        self.inner.affinity.debug_assert_same_thread("set_item_disabled");
        let id = id.into();
        let changed = self.inner.registry.write().set_item_disabled(&id, disabled);
        if changed {
            self.item_changed(&id);
        }
        changed
    }

    /// Change a group's heading. Returns `true` if it changed.
    pub fn set_group_heading(&self, id: impl Into<GroupId>, heading: Option<String>) -> bool {
        self.inner.affinity.debug_assert_same_thread("set_group_heading");
        let changed = self
            .inner
            .registry
            .write()
            .set_group_heading(&id.into(), heading);
        if changed {
            self.groups_changed();
        }
        changed
    }

    /// Move a group to `position` among the registered groups.
    pub fn move_group(&self, id: impl Into<GroupId>, position: usize) -> bool {
        self.inner.affinity.debug_assert_same_thread("move_group");
        let changed = self.inner.registry.write().move_group(&id.into(), position);
        if changed {
            self.groups_changed();
        }
        changed
    }

    /// Number of registered items.
    pub fn item_count(&self) -> usize {
        self.inner.registry.read().item_count()
    }

    /// Number of registered groups.
    pub fn group_count(&self) -> usize {
        self.inner.registry.read().group_count()
    }

    // =========================================================================
    // Effects
    // =========================================================================

    /// Schedule a host effect for the next flush.
    ///
    /// Scheduling again under the same key replaces the pending effect.
    pub fn schedule<F>(&self, key: impl Into<String>, effect: F) -> bool
    where
        F: FnOnce(&Palette) + Send + 'static,
    {
        self.inner.scheduler.schedule(EffectKey::Custom(key.into()), effect)
    }

    /// Run all pending effects. Returns how many ran.
    pub fn flush(&self) -> usize {
        self.inner.affinity.debug_assert_same_thread("flush");
        self.inner.scheduler.flush(self)
    }

    /// Returns `true` if effects are waiting for a flush.
    pub fn has_pending_effects(&self) -> bool {
        self.inner.scheduler.has_pending()
    }

    /// Install the callback that asks the host to flush.
    ///
    /// It is called whenever the effect queue goes from empty to non-empty.
    /// The host is expected to call [`flush`](Self::flush) on its next
    /// event-loop turn, not from inside the callback.
    pub fn set_flush_requester<F>(&self, requester: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.scheduler.set_flush_requester(requester);
    }

    // =========================================================================
    // Selection maintenance
    // =========================================================================

    /// Unregister the entry a [`Registration`] was issued for, leaving any
    /// later registration of the same id in place.
    fn release(&self, entry: &RegisteredEntry) -> bool {
        self.inner.affinity.debug_assert_same_thread("release");
        match entry {
            RegisteredEntry::Item(id, token) => {
                if self.inner.registry.write().release_item(id, *token).is_none() {
                    return false;
                }
                self.item_changed(id);
            }
            RegisteredEntry::Group(id, token) => {
                if self.inner.registry.write().release_group(id, *token).is_none() {
                    return false;
                }
                self.groups_changed();
            }
        }
        true
    }

    fn schedule_recovery(&self) {
        self.inner
            .scheduler
            .schedule(EffectKey::RecoverSelection, |palette: &Palette| {
                if let Err(error) = palette.recover_selection() {
                    tracing::warn!(target: targets::PALETTE, %error, "selection recovery failed");
                }
            });
    }

    /// An item changed. Recover now if it is the selected one, else defer.
    fn item_changed(&self, id: &ItemId) {
        if self.inner.selected.lock().as_ref() == Some(id) {
            if let Err(error) = self.recover_selection() {
                tracing::warn!(target: targets::PALETTE, %error, "selection recovery failed");
            }
        } else {
            self.schedule_recovery();
        }
    }

    /// Group changes can hide any item through its heading.
    fn groups_changed(&self) {
        if let Err(error) = self.recover_selection() {
            tracing::warn!(target: targets::PALETTE, %error, "selection recovery failed");
        }
    }

    /// Keep the selection if it is still visible and selectable, otherwise
    /// select the first selectable visible item, or nothing.
    fn recover_selection(&self) -> Result<bool> {
        let visible = self.compute_visible();
        let current = self.selected_item();
        let kept = current
            .as_ref()
            .and_then(|id| visible.position_of(id))
            .filter(|&position| visible.items()[position].is_selectable());

        let target = match kept {
            Some(position) => Some(position),
            None => {
                let first = self.inner.navigator.first(&visible);
                tracing::debug!(
                    target: targets::NAVIGATOR,
                    previous = ?current,
                    recovered = ?first.map(|position| &visible.items()[position].id),
                    "recovering selection"
                );
                first
            }
        };
        self.apply_selection(target.map(|position| &visible.items()[position]))
    }

    fn apply_selection(&self, item: Option<&VisibleItem>) -> Result<bool> {
        let (id, value) = match item {
            Some(item) => (Some(item.id.clone()), item.value.clone()),
            None => (None, String::new()),
        };
        let previous = std::mem::replace(&mut *self.inner.selected.lock(), id.clone());
        match self.inner.store.set_value(value.as_str()) {
            Ok(value_changed) => Ok(previous != id || value_changed),
            Err(error) => {
                // A rejected write leaves the stored value alone, so the id
                // must follow it back.
                if self.inner.store.value() != value {
                    *self.inner.selected.lock() = previous;
                }
                Err(error)
            }
        }
    }

    fn invoke_on_select(&self, id: &ItemId) -> bool {
        let (callback, value) = {
            let registry = self.inner.registry.read();
            match registry.item(id) {
                Some(entry) if !entry.is_disabled() => {
                    (entry.on_select().cloned(), entry.value().to_owned())
                }
                _ => return false,
            }
        };
        match callback {
            Some(callback) => {
                tracing::debug!(target: targets::PALETTE, %id, value = %value, "item selected");
                callback(&value);
                true
            }
            None => false,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Palette")
            .field("config", &self.inner.config)
            .field("state", &self.inner.store.state())
            .field("selected", &*self.inner.selected.lock())
            .field("registry", &*self.inner.registry.read())
            .field("scheduler", &self.inner.scheduler)
            .finish()
    }
}

/// Weak handle to a [`Palette`].
#[derive(Clone, Default)]
pub struct WeakPalette {
    inner: Weak<PaletteInner>,
}

impl WeakPalette {
    /// The palette, if it is still alive.
    pub fn upgrade(&self) -> Option<Palette> {
        self.inner.upgrade().map(|inner| Palette { inner })
    }
}

impl fmt::Debug for WeakPalette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakPalette")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

#[derive(Debug, Clone)]
enum RegisteredEntry {
    Item(ItemId, EntryToken),
    Group(GroupId, EntryToken),
}

/// Keeps an item or group registered until dropped.
///
/// Unregistering through the handle is idempotent, and harmless once the
/// palette is gone. A handle only ever removes its own registration: once
/// the id has been unregistered and registered again, the old handle is
/// inert.
#[must_use = "the entry is unregistered as soon as the handle is dropped"]
pub struct Registration {
    palette: WeakPalette,
    entry: RegisteredEntry,
    active: AtomicBool,
}

impl Registration {
    fn new(palette: &Palette, entry: RegisteredEntry) -> Self {
        Self {
            palette: palette.downgrade(),
            entry,
            active: AtomicBool::new(true),
        }
    }

    /// Whether this registration is for an item or a group.
    pub fn kind(&self) -> EntryKind {
        match self.entry {
            RegisteredEntry::Item(..) => EntryKind::Item,
            RegisteredEntry::Group(..) => EntryKind::Group,
        }
    }

    /// The registered id.
    pub fn id(&self) -> &str {
        match &self.entry {
            RegisteredEntry::Item(id, _) => id.as_str(),
            RegisteredEntry::Group(id, _) => id.as_str(),
        }
    }

    /// Returns `true` until [`unregister`](Self::unregister) has been called.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Unregister the entry.
    ///
    /// Returns `true` if this call removed it; later calls return `false`.
    pub fn unregister(&self) -> bool {
        if !self.active.swap(false, Ordering::AcqRel) {
            return false;
        }
        match self.palette.upgrade() {
            Some(palette) => palette.release(&self.entry),
            None => false,
        }
    }

    /// Keep the entry registered after the handle is dropped.
    pub fn forget(self) {
        self.active.store(false, Ordering::Release);
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.unregister();
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("kind", &self.kind())
            .field("id", &self.id())
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn item(value: &str) -> ItemOptions {
        ItemOptions::new().with_value(value)
    }

    #[test]
    fn test_registration_burst_selects_once() {
        let palette = Palette::new();
        let notifications = Arc::new(AtomicUsize::new(0));
        let counter = notifications.clone();
        let _sub = palette.subscribe_scoped(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let handles: Vec<_> = (0..50)
            .map(|i| palette.register_item(format!("item-{i}"), item(&format!("v{i}"))).unwrap())
            .collect();
        assert_eq!(palette.state().value, "");
        assert!(palette.has_pending_effects());

        assert_eq!(palette.flush(), 1);
        assert_eq!(palette.state().value, "v0");
        assert_eq!(notifications.load(Ordering::SeqCst), 1);
        assert_eq!(handles.len(), 50);
    }

    #[test]
    fn test_input_flushes_pending_effects() {
        let palette = Palette::new();
        let _a = palette.register_item("a", item("alpha")).unwrap();
        let _b = palette.register_item("b", item("beta")).unwrap();

        // No explicit flush: the move sees both registrations.
        assert!(palette.move_selection(Direction::Next).unwrap());
        assert_eq!(palette.state().value, "beta");
        assert!(!palette.has_pending_effects());
    }

    #[test]
    fn test_dropping_registration_unregisters() {
        let palette = Palette::new();
        let handle = palette.register_item("a", item("alpha")).unwrap();
        assert_eq!(handle.kind(), EntryKind::Item);
        assert_eq!(handle.id(), "a");
        assert_eq!(palette.item_count(), 1);

        drop(handle);
        assert_eq!(palette.item_count(), 0);
    }

    #[test]
    fn test_registration_unregister_is_idempotent() {
        let palette = Palette::new();
        let group = palette.register_group("g", GroupOptions::new()).unwrap();
        assert_eq!(group.kind(), EntryKind::Group);

        assert!(group.unregister());
        assert!(!group.is_active());
        assert!(!group.unregister());
        assert_eq!(palette.group_count(), 0);
    }

    #[test]
    fn test_forgotten_registration_stays() {
        let palette = Palette::new();
        palette.register_item("a", item("alpha")).unwrap().forget();
        assert_eq!(palette.item_count(), 1);
    }

    #[test]
    fn test_registration_outlives_palette() {
        let palette = Palette::new();
        let handle = palette.register_item("a", item("alpha")).unwrap();
        drop(palette);
        assert!(!handle.unregister());
    }

    #[test]
    fn test_weak_palette() {
        let palette = Palette::new();
        let weak = palette.downgrade();
        assert!(weak.upgrade().is_some());
        drop(palette);
        assert!(weak.upgrade().is_none());
        assert!(WeakPalette::default().upgrade().is_none());
    }

    #[test]
    fn test_flush_requester() {
        let palette = Palette::new();
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = requests.clone();
        palette.set_flush_requester(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let _a = palette.register_item("a", item("alpha")).unwrap();
        let _b = palette.register_item("b", item("beta")).unwrap();
        assert_eq!(requests.load(Ordering::SeqCst), 1);
        palette.flush();
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_custom_effect_receives_palette() {
        let palette = Palette::new();
        let _a = palette.register_item("a", item("alpha")).unwrap();
        palette.schedule("clear", |palette: &Palette| {
            palette.set_search("zzz").unwrap();
        });
        palette.schedule("clear", |palette: &Palette| {
            palette.set_search("al").unwrap();
        });

        palette.flush();
        assert_eq!(palette.state().search, "al");
        assert_eq!(palette.state().value, "alpha");
    }

    #[test]
    fn test_selected_value_change_updates_state() {
        let palette = Palette::new();
        let _a = palette.register_item("a", ItemOptions::new()).unwrap();
        palette.flush();
        // No value yet: nothing selectable.
        assert_eq!(palette.selected_item(), None);

        assert!(palette.report_content("a", "  Alpha  "));
        palette.flush();
        assert_eq!(palette.state().value, "Alpha");

        assert!(palette.report_value("a", "Aleph"));
        assert_eq!(palette.state().value, "Aleph");
    }

    #[test]
    fn test_debug_tree() {
        let palette = Palette::new();
        let _a = palette.register_item("a", item("alpha")).unwrap();
        palette.flush();
        assert!(palette.debug_tree().contains("alpha <selected>"));
        assert!(format!("{palette:?}").contains("Palette"));
    }
}
