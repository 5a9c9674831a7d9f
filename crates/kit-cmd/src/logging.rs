//! Logging and debugging facilities for kit-cmd.
//!
//! This module provides:
//! - Target names for filtering the crate's `tracing` output by subsystem
//! - A tree view of the visible set for debug logging
//!
//! # Tracing Integration
//!
//! The engine only emits events; installing a subscriber is up to the host:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("kit_cmd::navigator=trace,kit_cmd::store=debug")
//!     .init();
//! ```
//!
//! # Debug Visualization
//!
//! ```
//! use kit_cmd::logging::{PaletteTreeDebug, TreeFormatOptions, TreeStyle};
//! use kit_cmd::{ItemOptions, Palette};
//!
//! let palette = Palette::new();
//! let _item = palette.register_item("calc", ItemOptions::new().with_value("calculator")).unwrap();
//! palette.flush();
//!
//! let debug = PaletteTreeDebug::with_options(TreeFormatOptions {
//!     style: TreeStyle::Ascii,
//!     ..Default::default()
//! });
//! let tree = debug.format(&palette.compute_visible(), palette.selected_item().as_ref());
//! assert!(tree.contains("calculator <selected>"));
//! ```

use std::fmt::{self, Write as _};

use crate::filter::{VisibleGroup, VisibleItem, VisibleSet};
use crate::registry::ItemId;

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// State store: writes, notifications, re-entrancy violations.
    pub const STORE: &str = "kit_cmd::store";
    /// Item and group registration.
    pub const REGISTRY: &str = "kit_cmd::registry";
    /// Visible set derivation.
    pub const FILTER: &str = "kit_cmd::filter";
    /// Selection movement and recovery.
    pub const NAVIGATOR: &str = "kit_cmd::navigator";
    /// Deferred effects.
    pub const SCHEDULER: &str = "kit_cmd::scheduler";
    /// Palette-level input handling.
    pub const PALETTE: &str = "kit_cmd::palette";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// One line per group.
    Compact,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show item and group ids next to values and headings.
    pub show_ids: bool,
    /// Whether to mark disabled items.
    pub show_disabled: bool,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: false,
            show_disabled: true,
        }
    }
}

impl TreeFormatOptions {
    /// Create options for detailed debugging output.
    pub fn detailed() -> Self {
        Self {
            show_ids: true,
            ..Default::default()
        }
    }

    /// Create options for minimal output.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_disabled: false,
            ..Default::default()
        }
    }
}

/// Renders a [`VisibleSet`] as a tree: groups as branches, items as leaves.
///
/// Ungrouped items come first at the top level. The selected item is marked
/// `<selected>`, disabled items `[disabled]`.
#[derive(Debug, Clone, Default)]
pub struct PaletteTreeDebug {
    options: TreeFormatOptions,
}

impl PaletteTreeDebug {
    /// Create a visualizer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a visualizer with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Lazily formatted view, for use in `tracing` fields or `format!`.
    pub fn display<'a>(
        &'a self,
        visible: &'a VisibleSet,
        selected: Option<&'a ItemId>,
    ) -> TreeDisplay<'a> {
        TreeDisplay {
            options: &self.options,
            visible,
            selected,
        }
    }

    /// Format the tree into a string.
    pub fn format(&self, visible: &VisibleSet, selected: Option<&ItemId>) -> String {
        self.display(visible, selected).to_string()
    }
}

/// A [`VisibleSet`] tree ready to be written with `Display`.
pub struct TreeDisplay<'a> {
    options: &'a TreeFormatOptions,
    visible: &'a VisibleSet,
    selected: Option<&'a ItemId>,
}

impl TreeDisplay<'_> {
    fn write_item(&self, f: &mut fmt::Formatter<'_>, item: &VisibleItem) -> fmt::Result {
        if item.value.is_empty() {
            f.write_str("(no value)")?;
        } else {
            f.write_str(&item.value)?;
        }
        if self.options.show_ids {
            write!(f, " [{}]", item.id)?;
        }
        if self.options.show_disabled && item.disabled {
            f.write_str(" [disabled]")?;
        }
        if self.selected == Some(&item.id) {
            f.write_str(" <selected>")?;
        }
        Ok(())
    }

    fn write_group_label(&self, f: &mut fmt::Formatter<'_>, group: &VisibleGroup) -> fmt::Result {
        match &group.heading {
            Some(heading) => {
                f.write_str(heading)?;
                if self.options.show_ids {
                    write!(f, " [{}]", group.id)?;
                }
                Ok(())
            }
            None => write!(f, "[{}]", group.id),
        }
    }

    fn write_compact(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ungrouped = self.visible.ungrouped();
        if !ungrouped.is_empty() {
            f.write_str("- ")?;
            self.write_item_list(f, ungrouped)?;
            f.write_char('\n')?;
        }
        for group in self.visible.groups() {
            self.write_group_label(f, group)?;
            f.write_str(": ")?;
            self.write_item_list(f, self.visible.group_items(group))?;
            f.write_char('\n')?;
        }
        Ok(())
    }

    fn write_item_list(&self, f: &mut fmt::Formatter<'_>, items: &[VisibleItem]) -> fmt::Result {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            self.write_item(f, item)?;
        }
        Ok(())
    }
}

impl fmt::Display for TreeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Visible items ({} items, {} groups):",
            self.visible.len(),
            self.visible.groups().len()
        )?;
        if self.visible.is_empty() {
            return writeln!(f, "  (empty)");
        }

        let (branch, corner) = match self.options.style {
            TreeStyle::Ascii => ("+-- ", "`-- "),
            TreeStyle::Unicode => ("\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} "),
            TreeStyle::Compact => return self.write_compact(f),
        };

        for item in self.visible.ungrouped() {
            self.write_item(f, item)?;
            f.write_char('\n')?;
        }
        for group in self.visible.groups() {
            self.write_group_label(f, group)?;
            f.write_char('\n')?;

            let members = self.visible.group_items(group);
            for (i, item) in members.iter().enumerate() {
                f.write_str(if i + 1 == members.len() { corner } else { branch })?;
                self.write_item(f, item)?;
                f.write_char('\n')?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use crate::registry::{GroupOptions, ItemOptions, Registry};
    use crate::store::PaletteState;

    fn sample() -> VisibleSet {
        let mut registry = Registry::new();
        registry
            .register_group("web".into(), GroupOptions::new().with_heading("Web"))
            .unwrap();
        registry
            .register_item("calc".into(), ItemOptions::new().with_value("calculator"))
            .unwrap();
        registry
            .register_item("echarts".into(), ItemOptions::new().in_group("web").with_value("echarts"))
            .unwrap();
        registry
            .register_item(
                "bilibili".into(),
                ItemOptions::new().in_group("web").with_value("bilibili").disabled(true),
            )
            .unwrap();
        Filter::default().compute_visible(&PaletteState::default(), &registry)
    }

    #[test]
    fn test_unicode_tree() {
        let selected = ItemId::new("echarts");
        let output = PaletteTreeDebug::new().format(&sample(), Some(&selected));

        assert_eq!(
            output,
            "Visible items (3 items, 1 groups):\n\
             calculator\n\
             Web\n\
             \u{251c}\u{2500}\u{2500} echarts <selected>\n\
             \u{2514}\u{2500}\u{2500} bilibili [disabled]\n"
        );
    }

    #[test]
    fn test_ascii_with_ids() {
        let debug = PaletteTreeDebug::with_options(TreeFormatOptions {
            style: TreeStyle::Ascii,
            ..TreeFormatOptions::detailed()
        });
        let output = debug.format(&sample(), None);

        assert!(output.contains("calculator [calc]\n"));
        assert!(output.contains("Web [web]\n"));
        assert!(output.contains("`-- bilibili [bilibili] [disabled]\n"));
        assert!(!output.contains("<selected>"));
    }

    #[test]
    fn test_compact_minimal() {
        let debug = PaletteTreeDebug::with_options(TreeFormatOptions {
            style: TreeStyle::Compact,
            ..TreeFormatOptions::minimal()
        });
        let output = debug.format(&sample(), None);

        assert!(output.contains("- calculator\n"));
        assert!(output.contains("Web: echarts, bilibili\n"));
        assert!(!output.contains("[disabled]"));
    }

    #[test]
    fn test_empty_set() {
        let output = PaletteTreeDebug::new().format(&VisibleSet::default(), None);
        assert!(output.contains("(empty)"));
    }
}
