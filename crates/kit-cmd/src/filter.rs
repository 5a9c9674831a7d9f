//! Derivation of the visible item set from the search text.
//!
//! An item is visible when its derived value starts with the search text, or
//! when the heading of the group it belongs to does. This is plain prefix
//! containment, not fuzzy scoring. What an empty search shows is decided by
//! [`EmptySearchPolicy`].
//!
//! Output order is deterministic for a given registry and search:
//!
//! 1. ungrouped items (no group, or a group that is not registered), in
//!    registration order
//! 2. each registered group in declaration order, with its members in
//!    membership order
//!
//! Groups without visible members are dropped entirely, heading included.

use std::ops::Range;

use crate::config::{CaseSensitivity, EmptySearchPolicy, PaletteConfig};
use crate::logging::targets;
use crate::registry::{GroupId, ItemEntry, ItemId, Registry};
use crate::store::PaletteState;

/// An item that survived filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleItem {
    /// Item id.
    pub id: ItemId,
    /// Derived value at the time of filtering.
    pub value: String,
    /// Owning group, if it is registered and visible.
    pub group: Option<GroupId>,
    /// Whether the item is disabled.
    pub disabled: bool,
}

impl VisibleItem {
    fn from_entry(entry: &ItemEntry, group: Option<GroupId>) -> Self {
        Self {
            id: entry.id().clone(),
            value: entry.value().to_owned(),
            group,
            disabled: entry.is_disabled(),
        }
    }

    /// Whether the navigator may move the selection onto this item.
    ///
    /// Disabled items and items without a value are never selectable; an
    /// empty value is indistinguishable from "no selection".
    pub fn is_selectable(&self) -> bool {
        !self.disabled && !self.value.is_empty()
    }
}

/// A group with at least one visible member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleGroup {
    /// Group id.
    pub id: GroupId,
    /// Heading label.
    pub heading: Option<String>,
    range: Range<usize>,
}

impl VisibleGroup {
    /// Indices of the group's members in [`VisibleSet::items`].
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }
}

/// The ordered, grouped result of filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleSet {
    items: Vec<VisibleItem>,
    groups: Vec<VisibleGroup>,
}

impl VisibleSet {
    /// All visible items in display order.
    pub fn items(&self) -> &[VisibleItem] {
        &self.items
    }

    /// Visible groups in display order.
    pub fn groups(&self) -> &[VisibleGroup] {
        &self.groups
    }

    /// Visible ungrouped items, which precede every group.
    pub fn ungrouped(&self) -> &[VisibleItem] {
        let end = self.groups.first().map_or(self.items.len(), |g| g.range.start);
        &self.items[..end]
    }

    /// Members of a visible group.
    pub fn group_items(&self, group: &VisibleGroup) -> &[VisibleItem] {
        &self.items[group.range()]
    }

    /// Number of visible items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` when nothing is visible.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Values of the visible items, in display order.
    pub fn values(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.value.as_str()).collect()
    }

    /// Position of an item in display order.
    pub fn position_of(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }

    /// Position of the first selectable item with the given value.
    pub fn position_of_value(&self, value: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.is_selectable() && item.value == value)
    }

    /// Index into [`groups`](Self::groups) of the group containing the item
    /// at `position`, or `None` for ungrouped items.
    pub fn group_index_at(&self, position: usize) -> Option<usize> {
        self.groups
            .iter()
            .position(|group| group.range.contains(&position))
    }
}

/// Filters a registry against a search string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Filter {
    empty_search: EmptySearchPolicy,
    case_sensitivity: CaseSensitivity,
}

impl Filter {
    /// Create a filter.
    pub fn new(empty_search: EmptySearchPolicy, case_sensitivity: CaseSensitivity) -> Self {
        Self {
            empty_search,
            case_sensitivity,
        }
    }

    /// Create a filter from the matching settings of a palette configuration.
    pub fn from_config(config: &PaletteConfig) -> Self {
        Self::new(config.empty_search, config.case_sensitivity)
    }

    /// Whether an item with `value`, in a group headed `heading`, matches
    /// `search`.
    pub fn matches(&self, search: &str, value: &str, heading: Option<&str>) -> bool {
        if search.is_empty() {
            return self.empty_search == EmptySearchPolicy::ShowAll;
        }
        self.has_prefix(value, search) || heading.is_some_and(|h| self.has_prefix(h, search))
    }

    fn has_prefix(&self, text: &str, prefix: &str) -> bool {
        match self.case_sensitivity {
            CaseSensitivity::Sensitive => text.starts_with(prefix),
            CaseSensitivity::Insensitive => text.to_lowercase().starts_with(&prefix.to_lowercase()),
        }
    }

    /// Compute the visible set for a state snapshot.
    pub fn compute_visible(&self, state: &PaletteState, registry: &Registry) -> VisibleSet {
        let search = state.search.as_str();
        let mut items = Vec::new();

        for entry in registry.items() {
            if registry.resolved_group(entry).is_none() && self.matches(search, entry.value(), None)
            {
                items.push(VisibleItem::from_entry(entry, None));
            }
        }

        let mut groups = Vec::new();
        for group in registry.groups() {
            let start = items.len();
            for entry in registry.members(group.id()) {
                if self.matches(search, entry.value(), group.heading()) {
                    items.push(VisibleItem::from_entry(entry, Some(group.id().clone())));
                }
            }
            if items.len() > start {
                groups.push(VisibleGroup {
                    id: group.id().clone(),
                    heading: group.heading().map(str::to_owned),
                    range: start..items.len(),
                });
            }
        }

        tracing::trace!(
            target: targets::FILTER,
            search,
            visible = items.len(),
            groups = groups.len(),
            "computed visible set"
        );
        VisibleSet { items, groups }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{GroupOptions, ItemOptions};

    fn state(search: &str) -> PaletteState {
        PaletteState {
            search: search.to_owned(),
            value: String::new(),
        }
    }

    fn sample_registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register_group("files".into(), GroupOptions::new().with_heading("Files"))
            .unwrap();
        registry
            .register_group("web".into(), GroupOptions::new().with_heading("Web"))
            .unwrap();
        for (id, group) in [
            ("photo", "files"),
            ("conan", "files"),
            ("echarts", "web"),
            ("bilibili", "web"),
        ] {
            registry
                .register_item(id.into(), ItemOptions::new().in_group(group).with_value(id))
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_prefix_match() {
        let filter = Filter::default();
        let visible = filter.compute_visible(&state("ech"), &sample_registry());
        assert_eq!(visible.values(), vec!["echarts"]);
        assert_eq!(visible.groups().len(), 1);
        assert_eq!(visible.groups()[0].id.as_str(), "web");
    }

    #[test]
    fn test_prefix_not_substring() {
        let filter = Filter::default();
        let visible = filter.compute_visible(&state("charts"), &sample_registry());
        assert!(visible.is_empty());
        assert!(visible.groups().is_empty());
    }

    #[test]
    fn test_heading_match_shows_whole_group() {
        let filter = Filter::default();
        let visible = filter.compute_visible(&state("We"), &sample_registry());
        assert_eq!(visible.values(), vec!["echarts", "bilibili"]);
    }

    #[test]
    fn test_empty_search_policies() {
        let registry = sample_registry();

        let show_all = Filter::new(EmptySearchPolicy::ShowAll, CaseSensitivity::Sensitive);
        assert_eq!(show_all.compute_visible(&state(""), &registry).len(), 4);

        let show_none = Filter::new(EmptySearchPolicy::ShowNone, CaseSensitivity::Sensitive);
        let visible = show_none.compute_visible(&state(""), &registry);
        assert!(visible.is_empty());
        assert!(visible.groups().is_empty());
    }

    #[test]
    fn test_case_sensitivity() {
        let registry = sample_registry();

        let sensitive = Filter::default();
        assert!(sensitive.compute_visible(&state("ECH"), &registry).is_empty());

        let insensitive = Filter::new(EmptySearchPolicy::ShowAll, CaseSensitivity::Insensitive);
        assert_eq!(
            insensitive.compute_visible(&state("ECH"), &registry).values(),
            vec!["echarts"]
        );
    }

    #[test]
    fn test_ungrouped_items_come_first() {
        let mut registry = sample_registry();
        registry
            .register_item("calc".into(), ItemOptions::new().with_value("calculator"))
            .unwrap();
        registry
            .register_item("orphan".into(), ItemOptions::new().in_group("gone").with_value("cat"))
            .unwrap();

        let visible = Filter::default().compute_visible(&state(""), &registry);
        assert_eq!(
            visible.values(),
            vec!["calculator", "cat", "photo", "conan", "echarts", "bilibili"]
        );
        assert_eq!(visible.ungrouped().len(), 2);
        assert_eq!(visible.group_index_at(0), None);
        assert_eq!(visible.group_index_at(2), Some(0));
        assert_eq!(visible.group_index_at(5), Some(1));
    }

    #[test]
    fn test_group_order_follows_moves() {
        let mut registry = sample_registry();
        registry.move_group(&"web".into(), 0);

        let visible = Filter::default().compute_visible(&state(""), &registry);
        let groups: Vec<_> = visible.groups().iter().map(|g| g.id.as_str()).collect();
        assert_eq!(groups, vec!["web", "files"]);
        assert_eq!(visible.group_items(&visible.groups()[0]).len(), 2);
    }

    #[test]
    fn test_deterministic() {
        let registry = sample_registry();
        let filter = Filter::default();
        let first = filter.compute_visible(&state("c"), &registry);
        let second = filter.compute_visible(&state("c"), &registry);
        assert_eq!(first, second);
        assert_eq!(first.values(), vec!["conan"]);
    }

    #[test]
    fn test_selectable() {
        let mut registry = Registry::new();
        registry
            .register_item("a".into(), ItemOptions::new().with_value("a").disabled(true))
            .unwrap();
        registry.register_item("b".into(), ItemOptions::new()).unwrap();
        registry
            .register_item("c".into(), ItemOptions::new().with_value("c"))
            .unwrap();

        let visible = Filter::default().compute_visible(&state(""), &registry);
        let selectable: Vec<_> = visible.items().iter().map(VisibleItem::is_selectable).collect();
        assert_eq!(selectable, vec![false, false, true]);
        assert_eq!(visible.position_of_value("a"), None);
        assert_eq!(visible.position_of_value("c"), Some(2));
    }
}
