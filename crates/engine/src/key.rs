//! Platform-independent key representation for the formula editor

/// A key press as seen by the editor. Hosts translate their native events into this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Printable character (never ' ', see `Space`)
    Char(char),
    Left,
    Right,
    Space,
    Enter,
    Backspace,
    Escape,
}

impl Key {
    /// Map a typed character to a key. Control characters have no mapping.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            ' ' => Some(Key::Space),
            '\r' | '\n' => Some(Key::Enter),
            '\u{8}' | '\u{7f}' => Some(Key::Backspace),
            '\u{1b}' => Some(Key::Escape),
            c if c.is_control() => None,
            c => Some(Key::Char(c)),
        }
    }

    /// Keys for every character of `text`, skipping unmapped ones.
    pub fn sequence(text: &str) -> Vec<Key> {
        text.chars().filter_map(Key::from_char).collect()
    }
}
