//! Palette configuration.
//!
//! The configuration is fixed when a [`Palette`](crate::Palette) is created.
//! Build it with the chained `with_*` methods or parse it from TOML:
//!
//! ```
//! use kit_cmd::{EmptySearchPolicy, PaletteConfig};
//!
//! let config = PaletteConfig::from_toml_str(
//!     r#"
//!     loop = true
//!     empty_search = "show-none"
//!     label = "Command Menu"
//!     "#,
//! )
//! .unwrap();
//!
//! assert!(config.loop_selection);
//! assert_eq!(config.empty_search, EmptySearchPolicy::ShowNone);
//! assert_eq!(config, PaletteConfig::new()
//!     .with_loop(true)
//!     .with_empty_search(EmptySearchPolicy::ShowNone)
//!     .with_label("Command Menu"));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What an empty search string shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptySearchPolicy {
    /// Every registered item is visible while the search is empty.
    #[default]
    ShowAll,
    /// Nothing is visible until something is typed.
    ShowNone,
}

/// How the search text is compared against values and headings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaseSensitivity {
    /// "Ech" does not match "echarts".
    #[default]
    Sensitive,
    /// "Ech" matches "echarts".
    Insensitive,
}

/// Configuration of a palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaletteConfig {
    /// Wrap around at either end when moving to the next/previous item.
    #[serde(rename = "loop")]
    pub loop_selection: bool,
    /// Visibility policy while the search text is empty.
    pub empty_search: EmptySearchPolicy,
    /// Case handling of the prefix match.
    pub case_sensitivity: CaseSensitivity,
    /// Ignore pointer hover when updating the selection.
    pub disable_pointer_selection: bool,
    /// Map alt+arrow keys to group jumps.
    pub group_jumps: bool,
    /// Accessible label of the palette.
    pub label: String,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            loop_selection: false,
            empty_search: EmptySearchPolicy::ShowAll,
            case_sensitivity: CaseSensitivity::Sensitive,
            disable_pointer_selection: false,
            group_jumps: true,
            label: String::new(),
        }
    }
}

impl PaletteConfig {
    /// The default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PaletteError::Config`](crate::PaletteError::Config) on
    /// malformed TOML, unknown keys or wrongly typed values.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Set whether item navigation wraps.
    pub fn with_loop(mut self, enabled: bool) -> Self {
        self.loop_selection = enabled;
        self
    }

    /// Set the empty-search policy.
    pub fn with_empty_search(mut self, policy: EmptySearchPolicy) -> Self {
        self.empty_search = policy;
        self
    }

    /// Set the case sensitivity of matching.
    pub fn with_case_sensitivity(mut self, case_sensitivity: CaseSensitivity) -> Self {
        self.case_sensitivity = case_sensitivity;
        self
    }

    /// Set whether pointer hover is ignored.
    pub fn with_pointer_selection_disabled(mut self, disabled: bool) -> Self {
        self.disable_pointer_selection = disabled;
        self
    }

    /// Set whether alt+arrow jumps between groups.
    pub fn with_group_jumps(mut self, enabled: bool) -> Self {
        self.group_jumps = enabled;
        self
    }

    /// Set the accessible label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PaletteConfig::default();
        assert!(!config.loop_selection);
        assert_eq!(config.empty_search, EmptySearchPolicy::ShowAll);
        assert_eq!(config.case_sensitivity, CaseSensitivity::Sensitive);
        assert!(!config.disable_pointer_selection);
        assert!(config.group_jumps);
        assert!(config.label.is_empty());
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(PaletteConfig::from_toml_str("").unwrap(), PaletteConfig::default());
    }

    #[test]
    fn test_parse_all_fields() {
        let config = PaletteConfig::from_toml_str(
            r#"
            loop = true
            empty_search = "show-none"
            case_sensitivity = "insensitive"
            disable_pointer_selection = true
            group_jumps = false
            label = "Kit"
            "#,
        )
        .unwrap();

        assert_eq!(
            config,
            PaletteConfig::new()
                .with_loop(true)
                .with_empty_search(EmptySearchPolicy::ShowNone)
                .with_case_sensitivity(CaseSensitivity::Insensitive)
                .with_pointer_selection_disabled(true)
                .with_group_jumps(false)
                .with_label("Kit")
        );
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(PaletteConfig::from_toml_str("loop = \"yes\"").is_err());
        assert!(PaletteConfig::from_toml_str("empty_search = \"maybe\"").is_err());
        assert!(PaletteConfig::from_toml_str("looping = true").is_err());
    }

    #[test]
    fn test_round_trip_keeps_loop_key() {
        let text = toml::to_string(&PaletteConfig::new().with_loop(true)).unwrap();
        assert!(text.contains("loop = true"));
    }
}
