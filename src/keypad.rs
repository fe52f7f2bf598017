use log::debug;

use crate::KEY_COUNT;

/// Host-side view of the 16 CHIP-8 keys.
pub trait KeySource: Send {
    /// Pressed state of every key, indexed by CHIP-8 key code.
    fn snapshot(&self) -> [bool; KEY_COUNT];
}

/// Lazily refreshed key state.
///
/// The host is only sampled from [`Keypad::refresh`], which the interpreter
/// calls for the key-testing instructions.
pub struct Keypad {
    source: Box<dyn KeySource>,
    state: [bool; KEY_COUNT],
}

impl Keypad {
    pub fn new(source: Box<dyn KeySource>) -> Self {
        Self {
            source,
            state: [false; KEY_COUNT],
        }
    }

    /// Samples the host, updates all 16 flags and returns the lowest key
    /// that went from released to pressed since the previous refresh.
    pub fn refresh(&mut self) -> Option<u8> {
        let current = self.source.snapshot();
        let pressed = (0..KEY_COUNT).find(|&key| current[key] && !self.state[key]);
        self.state = current;
        if let Some(key) = pressed {
            debug!("Key {key:X} pressed");
        }
        pressed.map(|key| key as u8)
    }

    /// State as of the last refresh. Only the low nibble of `key` is used.
    pub fn is_pressed(&self, key: u8) -> bool {
        self.state[(key & 0xF) as usize]
    }
}

impl std::fmt::Debug for Keypad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypad").field("state", &self.state).finish()
    }
}
