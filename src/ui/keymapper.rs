//! Key mapping for terminal input
//!
//! Converts key events to the byte sequences a Linux-style xterm sends to
//! the pty. Exactly one modifier branch applies per event, chosen in the
//! order Ctrl, Alt, plain; Ctrl and Alt are never combined.

use bitflags::bitflags;
use crossterm::event::{KeyCode, KeyEvent as CtKeyEvent, KeyModifiers};

bitflags! {
    /// Modifier keys
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
        const META  = 0b1000;
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= Modifiers::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        if mods.contains(KeyModifiers::META) {
            result |= Modifiers::META;
        }
        result
    }
}

/// Symbolic key identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// Printable key; the character travels in [`KeyEvent::ch`]
    Rune,
    Enter,
    /// Backspace reported as BS (0x08)
    Backspace,
    /// Backspace reported as DEL (0x7f)
    Backspace2,
    Tab,
    Escape,
    Up,
    Down,
    Right,
    Left,
    Home,
    End,
    PageUp,
    PageDown,
    Delete,
    Insert,
    F(u8),
    Unknown,
}

/// A single key press
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub ch: Option<char>,
    pub mods: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key, mods: Modifiers) -> Self {
        Self {
            key,
            ch: None,
            mods,
        }
    }

    pub fn rune(ch: char, mods: Modifiers) -> Self {
        Self {
            key: Key::Rune,
            ch: Some(ch),
            mods,
        }
    }
}

/// Undo crossterm's reading of legacy control bytes
///
/// Without the kitty protocol, NUL arrives as Ctrl+Space and 0x1c..=0x1f as
/// Ctrl+4..=7, following the xterm digit aliases. Map them back to the
/// punctuation the control byte belongs to.
fn control_alias(ch: char) -> char {
    match ch {
        ' ' | '2' => '@',
        '3' => '[',
        '4' => '\\',
        '5' => ']',
        '6' => '^',
        '7' => '_',
        '8' => '?',
        other => other,
    }
}

impl From<CtKeyEvent> for KeyEvent {
    fn from(event: CtKeyEvent) -> Self {
        let mods = Modifiers::from(event.modifiers);
        match event.code {
            KeyCode::Char(ch) if mods.contains(Modifiers::CTRL) => {
                KeyEvent::rune(control_alias(ch), mods)
            }
            KeyCode::Char(ch) => KeyEvent::rune(ch, mods),
            KeyCode::Enter => KeyEvent::new(Key::Enter, mods),
            KeyCode::Backspace => KeyEvent::new(Key::Backspace2, mods),
            KeyCode::Tab => KeyEvent::new(Key::Tab, mods),
            KeyCode::BackTab => KeyEvent::new(Key::Tab, mods | Modifiers::SHIFT),
            KeyCode::Esc => KeyEvent::new(Key::Escape, mods),
            KeyCode::Up => KeyEvent::new(Key::Up, mods),
            KeyCode::Down => KeyEvent::new(Key::Down, mods),
            KeyCode::Right => KeyEvent::new(Key::Right, mods),
            KeyCode::Left => KeyEvent::new(Key::Left, mods),
            KeyCode::Home => KeyEvent::new(Key::Home, mods),
            KeyCode::End => KeyEvent::new(Key::End, mods),
            KeyCode::PageUp => KeyEvent::new(Key::PageUp, mods),
            KeyCode::PageDown => KeyEvent::new(Key::PageDown, mods),
            KeyCode::Delete => KeyEvent::new(Key::Delete, mods),
            KeyCode::Insert => KeyEvent::new(Key::Insert, mods),
            KeyCode::F(n) => KeyEvent::new(Key::F(n), mods),
            _ => KeyEvent::new(Key::Unknown, mods),
        }
    }
}

/// Unmodified keys (VT220/xterm)
const KEY_MAP: &[(Key, &str)] = &[
    (Key::Enter, "\r"),
    (Key::Backspace, "\x7f"),
    (Key::Backspace2, "\x7f"),
    (Key::Tab, "\t"),
    (Key::Escape, "\x1b"),
    (Key::Down, "\x1b[B"),
    (Key::Up, "\x1b[A"),
    (Key::Right, "\x1b[C"),
    (Key::Left, "\x1b[D"),
    (Key::Home, "\x1b[1~"),
    (Key::End, "\x1b[4~"),
    (Key::PageUp, "\x1b[5~"),
    (Key::PageDown, "\x1b[6~"),
    (Key::Delete, "\x1b[3~"),
    (Key::Insert, "\x1b[2~"),
    (Key::F(1), "\x1bOP"),
    (Key::F(2), "\x1bOQ"),
    (Key::F(3), "\x1bOR"),
    (Key::F(4), "\x1bOS"),
    (Key::F(5), "\x1b[15~"),
    (Key::F(6), "\x1b[17~"),
    (Key::F(7), "\x1b[18~"),
    (Key::F(8), "\x1b[19~"),
    (Key::F(9), "\x1b[20~"),
    (Key::F(10), "\x1b[21~"),
    (Key::F(12), "\x1b[24~"),
];

const CTRL_KEY_MAP: &[(Key, &str)] = &[
    (Key::Up, "\x1b[1;5A"),
    (Key::Down, "\x1b[1;5B"),
    (Key::Right, "\x1b[1;5C"),
    (Key::Left, "\x1b[1;5D"),
];

/// Punctuation that produces C0 controls with Ctrl held
const CTRL_RUNE_MAP: &[(char, &str)] = &[
    ('@', "\x00"),
    ('`', "\x00"),
    ('[', "\x1b"),
    ('{', "\x1b"),
    ('\\', "\x1c"),
    ('|', "\x1c"),
    (']', "\x1d"),
    ('}', "\x1d"),
    ('^', "\x1e"),
    ('~', "\x1e"),
    ('_', "\x1f"),
    ('?', "\x7f"),
];

const ALT_KEY_MAP: &[(Key, &str)] = &[
    (Key::Up, "\x1b[1;3A"),
    (Key::Down, "\x1b[1;3B"),
    (Key::Right, "\x1b[1;3C"),
    (Key::Left, "\x1b[1;3D"),
];

fn lookup<K: PartialEq>(table: &[(K, &'static str)], needle: K) -> Option<&'static [u8]> {
    table
        .iter()
        .find(|(k, _)| *k == needle)
        .map(|(_, seq)| seq.as_bytes())
}

/// Key mapper for converting key events to bytes
pub struct KeyMapper;

impl KeyMapper {
    /// Encode a key event for the pty
    ///
    /// Total: keys with neither a mapping nor a character encode to an
    /// empty sequence.
    pub fn encode(event: &KeyEvent) -> Vec<u8> {
        if event.mods.contains(Modifiers::CTRL) {
            Self::ctrl_combination(event)
        } else if event.mods.contains(Modifiers::ALT) {
            Self::alt_combination(event)
        } else {
            Self::plain(event)
        }
    }

    fn ctrl_combination(event: &KeyEvent) -> Vec<u8> {
        if let Some(seq) = lookup(CTRL_KEY_MAP, event.key) {
            return seq.to_vec();
        }
        if let Some(seq) = event.ch.and_then(|ch| lookup(CTRL_RUNE_MAP, ch)) {
            return seq.to_vec();
        }
        if event.key == Key::Rune {
            if let Some(ch @ 'a'..='z') = event.ch {
                return vec![ch as u8 - b'a' + 1];
            }
        }
        Self::plain(event)
    }

    fn alt_combination(event: &KeyEvent) -> Vec<u8> {
        if let Some(seq) = lookup(ALT_KEY_MAP, event.key) {
            return seq.to_vec();
        }
        let mut bytes = vec![0x1B];
        bytes.extend(Self::plain(event));
        bytes
    }

    fn plain(event: &KeyEvent) -> Vec<u8> {
        if let Some(seq) = lookup(KEY_MAP, event.key) {
            return seq.to_vec();
        }
        match event.ch {
            Some(ch) => ch.to_string().into_bytes(),
            None => Vec::new(),
        }
    }
}
