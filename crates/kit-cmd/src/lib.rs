//! Headless command palette engine.
//!
//! This crate holds everything a command menu needs except the rendering:
//!
//! - **State Store**: search text and selected value, with ordered change
//!   notification
//! - **Registry**: live items and groups as the rendering layer mounts and
//!   unmounts them
//! - **Filter**: the visible, grouped item set for the current search
//! - **Navigator**: keyboard-driven selection movement over the visible set
//! - **Effect Scheduler**: coalesced, deferred work run once per host tick
//!
//! The rendering layer registers entries, forwards input, and re-reads
//! [`Palette::state`] and [`Palette::compute_visible`] whenever a subscriber
//! fires.
//!
//! # Example
//!
//! ```
//! use kit_cmd::{Direction, GroupOptions, ItemOptions, Key, Palette, PaletteConfig};
//!
//! let palette = Palette::with_config(PaletteConfig::new().with_loop(true));
//!
//! let _web = palette.register_group("web", GroupOptions::new().with_heading("Web")).unwrap();
//! let _echarts = palette
//!     .register_item("echarts", ItemOptions::new().in_group("web").with_value("echarts"))
//!     .unwrap();
//! let _bilibili = palette
//!     .register_item("bilibili", ItemOptions::new().in_group("web").with_value("bilibili"))
//!     .unwrap();
//!
//! // Registrations are settled on the host's next tick.
//! palette.flush();
//! assert_eq!(palette.state().value, "echarts");
//!
//! palette.handle_key(Key::ArrowDown).unwrap();
//! assert_eq!(palette.state().value, "bilibili");
//! palette.move_selection(Direction::Next).unwrap();
//! assert_eq!(palette.state().value, "echarts");
//!
//! palette.set_search("bil").unwrap();
//! assert_eq!(palette.compute_visible().values(), vec!["bilibili"]);
//! assert_eq!(palette.state().value, "bilibili");
//! ```

pub mod affinity;
pub mod config;
pub mod error;
pub mod filter;
pub mod keymap;
pub mod logging;
pub mod navigator;
pub mod palette;
pub mod registry;
pub mod scheduler;
pub mod store;

pub use config::{CaseSensitivity, EmptySearchPolicy, PaletteConfig};
pub use error::{EntryKind, PaletteError, Result};
pub use filter::{Filter, VisibleGroup, VisibleItem, VisibleSet};
pub use keymap::{Key, KeyInput, KeyModifiers, Keymap, PaletteCommand};
pub use logging::{PaletteTreeDebug, TreeFormatOptions, TreeStyle};
pub use navigator::{Direction, Navigator};
pub use palette::{EffectKey, Palette, Registration, WeakPalette};
pub use registry::{EntryToken, GroupId, GroupOptions, ItemId, ItemOptions, SelectCallback};
pub use scheduler::EffectScheduler;
pub use store::{PaletteState, StateChange, StateField, SubscriptionGuard, SubscriptionId};
