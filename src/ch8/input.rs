use crossterm::event::KeyCode as CrosstermKey;

use std::sync::atomic::{AtomicBool, Ordering};

pub const KEY_COUNT: usize = 16;

// hex key codes laid out the way the physical keypad arranges them
pub const KEYPAD_GRID: [[u8; 4]; 4] = [
    [0x1, 0x2, 0x3, 0xC],
    [0x4, 0x5, 0x6, 0xD],
    [0x7, 0x8, 0x9, 0xE],
    [0xA, 0x0, 0xB, 0xF],
];

/// Which keypad a key belongs to. Only the Chip8X has a second one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Pad {
    Primary,
    Secondary,
}

impl Pad {
    fn offset(self) -> usize {
        match self {
            Pad::Primary => 0,
            Pad::Secondary => KEY_COUNT,
        }
    }
}

/// Key states shared between the host input thread and the processor
#[derive(Debug)]
pub struct Keypad {
    keys: [AtomicBool; 2 * KEY_COUNT],
}

impl Default for Keypad {
    fn default() -> Self {
        Keypad {
            keys: std::array::from_fn(|_| AtomicBool::new(false)),
        }
    }
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_on(&self, pad: Pad, code: u8, down: bool) {
        self.keys[pad.offset() + (code & 0xF) as usize].store(down, Ordering::Release);
    }

    pub fn set(&self, code: u8, down: bool) {
        self.set_on(Pad::Primary, code, down);
    }

    pub fn press(&self, code: u8) {
        self.set(code, true);
    }

    pub fn release(&self, code: u8) {
        self.set(code, false);
    }

    pub fn is_down_on(&self, pad: Pad, code: u8) -> bool {
        self.keys[pad.offset() + (code & 0xF) as usize].load(Ordering::Acquire)
    }

    pub fn is_down(&self, code: u8) -> bool {
        self.is_down_on(Pad::Primary, code)
    }

    /// Lowest key code currently held on the primary keypad
    pub fn first_down(&self) -> Option<u8> {
        (0..KEY_COUNT as u8).find(|&code| self.is_down(code))
    }

    pub fn is_other_down(&self, code: u8) -> bool {
        (0..KEY_COUNT as u8).any(|other| other != code && self.is_down(other))
    }

    pub fn release_all(&self) {
        for key in self.keys.iter() {
            key.store(false, Ordering::Release);
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum KeyLayout {
    #[default]
    Qwerty,
    Azerty,
    Qwertz,
}

impl KeyLayout {
    fn primary_rows(self) -> [&'static str; 4] {
        match self {
            KeyLayout::Qwerty => ["1234", "qwer", "asdf", "zxcv"],
            KeyLayout::Azerty => ["1234", "azer", "qsdf", "wxcv"],
            KeyLayout::Qwertz => ["1234", "qwer", "asdf", "yxcv"],
        }
    }

    fn secondary_rows(self) -> [&'static str; 4] {
        match self {
            KeyLayout::Qwerty => ["7890", "uiop", "jkl;", "m,./"],
            KeyLayout::Azerty => ["7890", "uiop", "jklm", ",;:!"],
            KeyLayout::Qwertz => ["7890", "uiop", "jklö", "m,.-"],
        }
    }

    pub fn map_char(self, c: char) -> Option<(Pad, u8)> {
        let c = c.to_lowercase().next()?;
        let find = |rows: [&'static str; 4]| {
            rows.iter().enumerate().find_map(|(row, keys)| {
                keys.chars()
                    .position(|key| key == c)
                    .map(|col| KEYPAD_GRID[row][col])
            })
        };

        find(self.primary_rows())
            .map(|code| (Pad::Primary, code))
            .or_else(|| find(self.secondary_rows()).map(|code| (Pad::Secondary, code)))
    }

    pub fn map_key(self, key: CrosstermKey) -> Option<(Pad, u8)> {
        match key {
            CrosstermKey::Char(c) => self.map_char(c),
            _ => None,
        }
    }

    /// Host key bound to a primary keypad code
    pub fn key_for_code(self, code: u8) -> Option<char> {
        KEYPAD_GRID.iter().enumerate().find_map(|(row, codes)| {
            codes
                .iter()
                .position(|&c| c == code)
                .and_then(|col| self.primary_rows()[row].chars().nth(col))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qwerty_layout_matches_keypad_grid() {
        let layout = KeyLayout::Qwerty;
        assert_eq!(layout.map_char('1'), Some((Pad::Primary, 0x1)));
        assert_eq!(layout.map_char('4'), Some((Pad::Primary, 0xC)));
        assert_eq!(layout.map_char('X'), Some((Pad::Primary, 0x0)));
        assert_eq!(layout.map_char('v'), Some((Pad::Primary, 0xF)));
        assert_eq!(layout.map_char('k'), Some((Pad::Secondary, 0x8)));
        assert_eq!(layout.map_char('g'), None);
        assert_eq!(layout.key_for_code(0xA), Some('z'));
    }

    #[test]
    fn alternate_layouts_keep_positions() {
        assert_eq!(KeyLayout::Azerty.map_char('a'), Some((Pad::Primary, 0x4)));
        assert_eq!(KeyLayout::Azerty.map_char('w'), Some((Pad::Primary, 0xA)));
        assert_eq!(KeyLayout::Qwertz.map_char('y'), Some((Pad::Primary, 0xA)));
    }

    #[test]
    fn pads_are_independent() {
        let keypad = Keypad::new();
        keypad.set_on(Pad::Secondary, 0x3, true);
        assert!(!keypad.is_down(0x3));
        assert!(keypad.is_down_on(Pad::Secondary, 0x3));
        assert_eq!(keypad.first_down(), None);

        keypad.press(0xB);
        keypad.press(0x2);
        assert_eq!(keypad.first_down(), Some(0x2));

        keypad.release_all();
        assert_eq!(keypad.first_down(), None);
        assert!(!keypad.is_down_on(Pad::Secondary, 0x3));
    }
}
