//! Error types for the palette engine.

use std::fmt;

use crate::store::StateField;

/// Result type alias for palette operations.
pub type Result<T> = std::result::Result<T, PaletteError>;

/// The kind of registry entry an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A selectable item.
    Item,
    /// A group of items rendered under a heading.
    Group,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item => write!(f, "item"),
            Self::Group => write!(f, "group"),
        }
    }
}

/// Errors that can occur while driving a [`Palette`](crate::Palette).
///
/// Operations on unknown identifiers are deliberately absent from this list:
/// mount and unmount ordering in a rendering layer makes those races routine,
/// so they are tolerated as no-ops.
#[derive(Debug, thiserror::Error)]
pub enum PaletteError {
    /// An identifier was registered while a live entry with the same id exists.
    ///
    /// This points at a bug in the rendering layer's mounting logic.
    #[error("{kind} '{id}' is already registered")]
    DuplicateRegistration { kind: EntryKind, id: String },

    /// A subscriber tried to change a state field while that same field was
    /// still notifying its subscribers.
    #[error("re-entrant mutation of '{field}' during change notification")]
    ReentrantMutation { field: StateField },

    /// The palette configuration could not be parsed.
    #[error("invalid palette configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl PaletteError {
    /// Create a duplicate registration error.
    pub fn duplicate(kind: EntryKind, id: impl Into<String>) -> Self {
        Self::DuplicateRegistration {
            kind,
            id: id.into(),
        }
    }

    /// Create a re-entrant mutation error.
    pub fn reentrant(field: StateField) -> Self {
        Self::ReentrantMutation { field }
    }

    /// Returns `true` for errors caused by a duplicate registration.
    pub fn is_duplicate_registration(&self) -> bool {
        matches!(self, Self::DuplicateRegistration { .. })
    }

    /// Returns `true` for errors caused by a re-entrant state mutation.
    pub fn is_reentrant_mutation(&self) -> bool {
        matches!(self, Self::ReentrantMutation { .. })
    }
}
