//! Classification of raw key presses into palette commands.
//!
//! The rendering layer translates its native key events into a [`KeyInput`]
//! and hands it to [`Palette::handle_key`](crate::Palette::handle_key). Keys
//! that map to no command are left for the host to handle.
//!
//! | key                | command                  |
//! |--------------------|--------------------------|
//! | `ArrowDown`        | move to the next item    |
//! | `ArrowUp`          | move to the previous item|
//! | `Alt+ArrowDown`    | move to the next group   |
//! | `Alt+ArrowUp`      | move to the previous group |
//! | `Home` / `End`     | move to the first / last item |
//! | `Enter`            | confirm the selection    |
//!
//! `Enter` is ignored while an input method composition is in progress, which
//! browsers report either through `is_composing` or the legacy key code 229.

use crate::navigator::Direction;

/// Key code some platforms report for every key press during IME composition.
pub const IME_PROCESS_KEY_CODE: u32 = 229;

/// Keys the palette reacts to, plus a catch-all for everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    // Navigation
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    PageUp,
    PageDown,

    // Editing and control
    Enter,
    Escape,
    Tab,

    /// A printable character.
    Character(char),
    /// Any other key.
    Other,
}

/// Keyboard modifiers held during a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeyModifiers {
    /// The Shift key is held.
    pub shift: bool,
    /// The Control key is held.
    pub control: bool,
    /// The Alt key is held (Option on macOS).
    pub alt: bool,
    /// The Meta/Super key is held.
    pub meta: bool,
}

impl KeyModifiers {
    /// No modifiers pressed.
    pub const NONE: Self = Self {
        shift: false,
        control: false,
        alt: false,
        meta: false,
    };

    /// Alt modifier only.
    pub const ALT: Self = Self {
        shift: false,
        control: false,
        alt: true,
        meta: false,
    };

    /// Returns `true` if no modifier is held.
    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

/// A key press as seen by the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    /// The pressed key.
    pub key: Key,
    /// Modifiers held during the press.
    pub modifiers: KeyModifiers,
    /// An IME composition is in progress.
    pub is_composing: bool,
    /// The platform's legacy numeric key code, if it reports one.
    pub key_code: Option<u32>,
    /// The host already handled this press.
    pub default_prevented: bool,
}

impl KeyInput {
    /// A plain press of `key` with no modifiers.
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: KeyModifiers::NONE,
            is_composing: false,
            key_code: None,
            default_prevented: false,
        }
    }

    /// Set the held modifiers.
    pub fn with_modifiers(mut self, modifiers: KeyModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Mark whether an IME composition is in progress.
    pub fn composing(mut self, is_composing: bool) -> Self {
        self.is_composing = is_composing;
        self
    }

    /// Set the legacy key code.
    pub fn with_key_code(mut self, key_code: u32) -> Self {
        self.key_code = Some(key_code);
        self
    }

    /// Mark the press as already handled by the host.
    pub fn prevented(mut self, prevented: bool) -> Self {
        self.default_prevented = prevented;
        self
    }

    fn is_ime_composition(&self) -> bool {
        self.is_composing || self.key_code == Some(IME_PROCESS_KEY_CODE)
    }
}

impl From<Key> for KeyInput {
    fn from(key: Key) -> Self {
        Self::new(key)
    }
}

/// What a key press asks the palette to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteCommand {
    /// Move the selection.
    Move(Direction),
    /// Run the selected item's select callback.
    Confirm,
}

/// Maps key presses to [`PaletteCommand`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keymap {
    group_jumps: bool,
}

impl Default for Keymap {
    fn default() -> Self {
        Self { group_jumps: true }
    }
}

impl Keymap {
    /// Create a keymap. With `group_jumps`, alt+arrow moves between groups.
    pub fn new(group_jumps: bool) -> Self {
        Self { group_jumps }
    }

    /// The command for `input`, or `None` if the palette ignores it.
    pub fn classify(&self, input: &KeyInput) -> Option<PaletteCommand> {
        if input.default_prevented {
            return None;
        }

        let group_jump = self.group_jumps && input.modifiers.alt;
        match input.key {
            Key::ArrowDown if group_jump => Some(PaletteCommand::Move(Direction::NextGroup)),
            Key::ArrowDown => Some(PaletteCommand::Move(Direction::Next)),
            Key::ArrowUp if group_jump => Some(PaletteCommand::Move(Direction::PrevGroup)),
            Key::ArrowUp => Some(PaletteCommand::Move(Direction::Prev)),
            Key::Home => Some(PaletteCommand::Move(Direction::First)),
            Key::End => Some(PaletteCommand::Move(Direction::Last)),
            Key::Enter if input.is_ime_composition() => None,
            Key::Enter => Some(PaletteCommand::Confirm),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_keys() {
        let keymap = Keymap::default();
        let cases = [
            (Key::ArrowDown, Direction::Next),
            (Key::ArrowUp, Direction::Prev),
            (Key::Home, Direction::First),
            (Key::End, Direction::Last),
        ];
        for (key, direction) in cases {
            assert_eq!(
                keymap.classify(&key.into()),
                Some(PaletteCommand::Move(direction)),
                "{key:?}"
            );
        }
    }

    #[test]
    fn test_alt_arrows_jump_groups() {
        let keymap = Keymap::default();
        let down = KeyInput::new(Key::ArrowDown).with_modifiers(KeyModifiers::ALT);
        let up = KeyInput::new(Key::ArrowUp).with_modifiers(KeyModifiers::ALT);
        assert_eq!(keymap.classify(&down), Some(PaletteCommand::Move(Direction::NextGroup)));
        assert_eq!(keymap.classify(&up), Some(PaletteCommand::Move(Direction::PrevGroup)));

        let plain = Keymap::new(false);
        assert_eq!(plain.classify(&down), Some(PaletteCommand::Move(Direction::Next)));
    }

    #[test]
    fn test_enter_confirms() {
        let keymap = Keymap::default();
        assert_eq!(keymap.classify(&Key::Enter.into()), Some(PaletteCommand::Confirm));
    }

    #[test]
    fn test_enter_ignored_during_composition() {
        let keymap = Keymap::default();
        assert_eq!(keymap.classify(&KeyInput::new(Key::Enter).composing(true)), None);
        assert_eq!(
            keymap.classify(&KeyInput::new(Key::Enter).with_key_code(IME_PROCESS_KEY_CODE)),
            None
        );
        assert_eq!(
            keymap.classify(&KeyInput::new(Key::Enter).with_key_code(13)),
            Some(PaletteCommand::Confirm)
        );
    }

    #[test]
    fn test_unmapped_and_prevented() {
        let keymap = Keymap::default();
        assert_eq!(keymap.classify(&Key::Character('a').into()), None);
        assert_eq!(keymap.classify(&Key::Escape.into()), None);
        assert_eq!(keymap.classify(&KeyInput::new(Key::ArrowDown).prevented(true)), None);
    }

    #[test]
    fn test_modifiers() {
        assert!(KeyModifiers::NONE.is_empty());
        assert!(KeyModifiers::default().is_empty());
        assert!(!KeyModifiers::ALT.is_empty());
    }
}
