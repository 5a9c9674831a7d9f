//! Registry of mounted items and groups.
//!
//! The rendering layer registers an entry when it mounts and unregisters it
//! when it unmounts. The registry keeps:
//!
//! - every live item, in registration order, with its derived value,
//!   disabled flag and optional selection callback
//! - every live group, in declaration order, with its optional heading
//! - a group id to member ids mapping, in membership order
//!
//! Membership is tracked independently of group registration. Children
//! commonly mount before their parent, so an item may name a group that is
//! not registered yet; such an item counts as ungrouped until the group
//! appears. Unregistering a group keeps the membership, so its items fall
//! back to ungrouped and rejoin the group if it is registered again.
//!
//! Operations on unknown ids are tolerated no-ops: mount, unmount and value
//! reporting race each other in practice.

use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::error::{EntryKind, PaletteError, Result};
use crate::logging::targets;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Create an id from any string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&$name> for $name {
            fn from(id: &$name) -> Self {
                id.clone()
            }
        }
    };
}

define_id! {
    /// Stable identifier of a mounted item, unique among live items.
    ItemId
}

define_id! {
    /// Stable identifier of a mounted group, unique among live groups.
    GroupId
}

/// Identifies one registration of an id.
///
/// Tokens are never reused, so an id that is unregistered and registered
/// again gets a fresh token and a stale handle cannot remove the new entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryToken(u64);

/// Callback invoked with an item's value when the item is chosen.
pub type SelectCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Derive an item's value from its explicit value or its text content.
///
/// The explicit value wins when present; either source is trimmed.
pub fn derive_value(explicit: Option<&str>, content: &str) -> String {
    explicit.unwrap_or(content).trim().to_owned()
}

/// Options for registering an item.
#[derive(Clone, Default)]
pub struct ItemOptions {
    group: Option<GroupId>,
    value: Option<String>,
    disabled: bool,
    on_select: Option<SelectCallback>,
}

impl ItemOptions {
    /// Options for an ungrouped, enabled item without an explicit value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place the item in a group.
    pub fn in_group(mut self, group: impl Into<GroupId>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Give the item an explicit value that overrides its text content.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set whether the item is disabled.
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Set the callback invoked when the item is confirmed or clicked.
    pub fn on_select<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_select = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for ItemOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemOptions")
            .field("group", &self.group)
            .field("value", &self.value)
            .field("disabled", &self.disabled)
            .field("on_select", &self.on_select.is_some())
            .finish()
    }
}

/// A registered item.
#[derive(Clone)]
pub struct ItemEntry {
    id: ItemId,
    token: EntryToken,
    group: Option<GroupId>,
    explicit_value: Option<String>,
    value: String,
    disabled: bool,
    on_select: Option<SelectCallback>,
}

impl ItemEntry {
    fn new(id: ItemId, token: EntryToken, options: ItemOptions) -> Self {
        let explicit_value = options.value.map(|value| value.trim().to_owned());
        Self {
            id,
            token,
            group: options.group,
            value: explicit_value.clone().unwrap_or_default(),
            explicit_value,
            disabled: options.disabled,
            on_select: options.on_select,
        }
    }

    /// The item id.
    pub fn id(&self) -> &ItemId {
        &self.id
    }

    /// The token issued when the item was registered.
    pub fn token(&self) -> EntryToken {
        self.token
    }

    /// The group the item declared, whether or not it is registered.
    pub fn declared_group(&self) -> Option<&GroupId> {
        self.group.as_ref()
    }

    /// The explicit value override, if one was supplied.
    pub fn explicit_value(&self) -> Option<&str> {
        self.explicit_value.as_deref()
    }

    /// The derived value; empty until a value has been reported.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the item is disabled.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// The selection callback, if any.
    pub fn on_select(&self) -> Option<&SelectCallback> {
        self.on_select.as_ref()
    }
}

impl fmt::Debug for ItemEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemEntry")
            .field("id", &self.id)
            .field("group", &self.group)
            .field("value", &self.value)
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}

/// Options for registering a group.
#[derive(Debug, Clone, Default)]
pub struct GroupOptions {
    heading: Option<String>,
}

impl GroupOptions {
    /// Options for a group without a heading.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the heading label.
    pub fn with_heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = Some(heading.into());
        self
    }
}

/// A registered group.
#[derive(Debug, Clone)]
pub struct GroupEntry {
    id: GroupId,
    token: EntryToken,
    heading: Option<String>,
}

impl GroupEntry {
    /// The group id.
    pub fn id(&self) -> &GroupId {
        &self.id
    }

    /// The token issued when the group was registered.
    pub fn token(&self) -> EntryToken {
        self.token
    }

    /// The heading label, if any.
    pub fn heading(&self) -> Option<&str> {
        self.heading.as_deref()
    }
}

/// Tracks live items, groups and group membership.
#[derive(Debug, Default)]
pub struct Registry {
    items: IndexMap<ItemId, ItemEntry>,
    groups: IndexMap<GroupId, GroupEntry>,
    members: IndexMap<GroupId, IndexSet<ItemId>>,
    next_token: u64,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn issue_token(&mut self) -> EntryToken {
        self.next_token += 1;
        EntryToken(self.next_token)
    }

    /// Register an item, returning the token of this registration.
    ///
    /// # Errors
    ///
    /// Returns [`PaletteError::DuplicateRegistration`] if an item with the
    /// same id is already registered.
    pub fn register_item(&mut self, id: ItemId, options: ItemOptions) -> Result<EntryToken> {
        if self.items.contains_key(&id) {
            tracing::warn!(target: targets::REGISTRY, %id, "duplicate item registration");
            return Err(PaletteError::duplicate(EntryKind::Item, id.as_str()));
        }

        if let Some(group) = &options.group {
            self.members
                .entry(group.clone())
                .or_default()
                .insert(id.clone());
        }
        let token = self.issue_token();
        tracing::trace!(
            target: targets::REGISTRY,
            %id,
            ?token,
            group = ?options.group,
            disabled = options.disabled,
            "registered item"
        );
        self.items.insert(id.clone(), ItemEntry::new(id, token, options));
        Ok(token)
    }

    /// Unregister an item, returning its entry.
    ///
    /// Returns `None` if the item is unknown, which makes repeated calls
    /// harmless.
    pub fn unregister_item(&mut self, id: &ItemId) -> Option<ItemEntry> {
        let entry = self.items.shift_remove(id)?;
        if let Some(group) = &entry.group
            && let Some(members) = self.members.get_mut(group)
        {
            members.shift_remove(id);
            if members.is_empty() {
                self.members.shift_remove(group);
            }
        }
        tracing::trace!(target: targets::REGISTRY, %id, "unregistered item");
        Some(entry)
    }

    /// Unregister an item only if it is still the registration `token`
    /// was issued for.
    pub fn release_item(&mut self, id: &ItemId, token: EntryToken) -> Option<ItemEntry> {
        if self.items.get(id)?.token != token {
            tracing::trace!(target: targets::REGISTRY, %id, ?token, "ignoring stale item release");
            return None;
        }
        self.unregister_item(id)
    }

    /// Register a group. Groups are ordered by registration.
    ///
    /// # Errors
    ///
    /// Returns [`PaletteError::DuplicateRegistration`] if a group with the
    /// same id is already registered.
    pub fn register_group(&mut self, id: GroupId, options: GroupOptions) -> Result<EntryToken> {
        if self.groups.contains_key(&id) {
            tracing::warn!(target: targets::REGISTRY, %id, "duplicate group registration");
            return Err(PaletteError::duplicate(EntryKind::Group, id.as_str()));
        }
        let token = self.issue_token();
        tracing::trace!(
            target: targets::REGISTRY,
            %id,
            ?token,
            heading = ?options.heading,
            "registered group"
        );
        self.groups.insert(
            id.clone(),
            GroupEntry {
                id,
                token,
                heading: options.heading,
            },
        );
        Ok(token)
    }

    /// Unregister a group, returning its entry.
    ///
    /// Member items are left in place and resolve to ungrouped.
    pub fn unregister_group(&mut self, id: &GroupId) -> Option<GroupEntry> {
        let entry = self.groups.shift_remove(id)?;
        tracing::trace!(target: targets::REGISTRY, %id, "unregistered group");
        Some(entry)
    }

    /// Unregister a group only if it is still the registration `token` was
    /// issued for.
    pub fn release_group(&mut self, id: &GroupId, token: EntryToken) -> Option<GroupEntry> {
        if self.groups.get(id)?.token != token {
            tracing::trace!(target: targets::REGISTRY, %id, ?token, "ignoring stale group release");
            return None;
        }
        self.unregister_group(id)
    }

    /// Overwrite an item's derived value (trimmed).
    ///
    /// Returns `true` if the item exists and its value changed.
    pub fn report_value(&mut self, id: &ItemId, value: &str) -> bool {
        let Some(entry) = self.items.get_mut(id) else {
            tracing::trace!(target: targets::REGISTRY, %id, "value reported for unknown item");
            return false;
        };
        let value = value.trim();
        if entry.value == value {
            return false;
        }
        entry.value = value.to_owned();
        true
    }

    /// Derive an item's value from its text content and store it.
    ///
    /// The item's explicit value, when it has one, takes precedence over
    /// `content`. Returns `true` if the item exists and its value changed.
    pub fn report_content(&mut self, id: &ItemId, content: &str) -> bool {
        let value = match self.items.get(id) {
            Some(entry) => derive_value(entry.explicit_value.as_deref(), content),
            None => return false,
        };
        self.report_value(id, &value)
    }

    /// Update an item's disabled flag.
    ///
    /// Returns `true` if the item exists and the flag changed.
    pub fn set_item_disabled(&mut self, id: &ItemId, disabled: bool) -> bool {
        match self.items.get_mut(id) {
            Some(entry) if entry.disabled != disabled => {
                entry.disabled = disabled;
                true
            }
            _ => false,
        }
    }

    /// Update a group's heading label.
    ///
    /// Returns `true` if the group exists and the heading changed.
    pub fn set_group_heading(&mut self, id: &GroupId, heading: Option<String>) -> bool {
        match self.groups.get_mut(id) {
            Some(entry) if entry.heading != heading => {
                entry.heading = heading;
                true
            }
            _ => false,
        }
    }

    /// Move a group to `position` among the registered groups.
    ///
    /// Positions past the end move the group last. Returns `true` if the
    /// group exists and its position changed.
    pub fn move_group(&mut self, id: &GroupId, position: usize) -> bool {
        let Some(from) = self.groups.get_index_of(id) else {
            return false;
        };
        let to = position.min(self.groups.len() - 1);
        if from == to {
            return false;
        }
        self.groups.move_index(from, to);
        true
    }

    /// Look up an item.
    pub fn item(&self, id: &ItemId) -> Option<&ItemEntry> {
        self.items.get(id)
    }

    /// Look up a group.
    pub fn group(&self, id: &GroupId) -> Option<&GroupEntry> {
        self.groups.get(id)
    }

    /// Items in registration order.
    pub fn items(&self) -> impl Iterator<Item = &ItemEntry> {
        self.items.values()
    }

    /// Groups in declaration order.
    pub fn groups(&self) -> impl Iterator<Item = &GroupEntry> {
        self.groups.values()
    }

    /// Members of a group in membership order, registered or not.
    pub fn members(&self, group: &GroupId) -> impl Iterator<Item = &ItemEntry> {
        self.members
            .get(group)
            .into_iter()
            .flatten()
            .filter_map(|id| self.items.get(id))
    }

    /// The group an item belongs to, if that group is registered.
    ///
    /// Items whose declared group is not registered resolve to `None`.
    pub fn resolved_group(&self, item: &ItemEntry) -> Option<&GroupEntry> {
        item.group.as_ref().and_then(|group| self.groups.get(group))
    }

    /// Returns `true` if the item is registered.
    pub fn contains_item(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    /// Returns `true` if the group is registered.
    pub fn contains_group(&self, id: &GroupId) -> bool {
        self.groups.contains_key(id)
    }

    /// Number of registered items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Number of registered groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.groups.is_empty()
    }
}
