use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use winit::event::VirtualKeyCode;
use winit_input_helper::WinitInputHelper;

use crate::keypad::KeySource;
use crate::KEY_COUNT;

/// Generates a keymap from a mapping of QWERTY keys to CHIP-8 key codes,
/// represented as a [`HashMap`](std::collections::HashMap).
macro_rules! keymap {
    ($($keycode:ident => $mapping:literal),*) => {
        lazy_static::lazy_static! {
            /// A mapping of QWERTY key codes to the CHIP-8 key it represents.
            pub static ref KEYMAP: HashMap<VirtualKeyCode, u8> = {
                let mut m = HashMap::new();
                $(
                  m.insert(VirtualKeyCode::$keycode, $mapping);
                )*
                m
            };
        }
    };
}

keymap! {
    Key1 => 0x1,
    Key2 => 0x2,
    Key3 => 0x3,
    Key4 => 0xC,
    Q => 0x4,
    W => 0x5,
    E => 0x6,
    R => 0xD,
    A => 0x7,
    S => 0x8,
    D => 0x9,
    F => 0xE,
    Z => 0xA,
    X => 0x0,
    C => 0xB,
    V => 0xF
}

/// Held keys as a bitmask (bit `n` is CHIP-8 key `n`), written by the
/// window thread and read by the interpreter whenever it refreshes.
#[derive(Debug, Clone, Default)]
pub struct HostKeys {
    held: Arc<AtomicU16>,
}

impl HostKeys {
    pub fn new() -> Self {
        Default::default()
    }

    /// Records which mapped keys the window currently sees held.
    pub fn update(&self, input: &WinitInputHelper) {
        let held = KEYMAP
            .iter()
            .filter(|(&keycode, _)| input.key_held(keycode))
            .fold(0u16, |mask, (_, &key)| mask | 1 << key);
        self.store(held);
    }

    fn store(&self, held: u16) {
        self.held.store(held, Ordering::SeqCst);
    }
}

impl KeySource for HostKeys {
    fn snapshot(&self) -> [bool; KEY_COUNT] {
        let held = self.held.load(Ordering::SeqCst);
        let mut keys = [false; KEY_COUNT];
        for (key, pressed) in keys.iter_mut().enumerate() {
            *pressed = held & (1 << key) != 0;
        }
        keys
    }
}
