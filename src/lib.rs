use std::ops::{Deref, DerefMut};

pub mod audio;
pub mod cli;
pub mod clock;
pub mod config;
pub mod cpu;
pub mod display;
pub mod error;
pub mod font;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod keypad;
pub mod screen;
pub mod state;
pub mod timer;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use cpu::Cpu;
pub use error::{Error, Result};
pub use instruction::{Instruction, Op};
pub use interpreter::Interpreter;
pub use screen::{Frame, Screen};
pub use timer::{Buzzer, Timers};

pub const MEMORY_SIZE: usize = 4096;
pub const REGISTER_COUNT: usize = 16;
pub const STACK_SIZE: usize = 16;
pub const KEY_COUNT: usize = 16;

/// Addresses are 12 bits wide.
pub const ADDRESS_MASK: u16 = 0x0FFF;

/// Index of VF, the carry/borrow/collision flag.
pub const FLAG: usize = 0xF;

macro_rules! wrapper {
    ($($name:ident => $size:expr),*) => {
        $(
            #[derive(Debug, Clone, PartialEq)]
            pub struct $name([u8; $size]);

            impl Default for $name {
                fn default() -> Self {
                    Self([0; $size])
                }
            }

            impl Deref for $name {
                type Target = [u8; $size];

                fn deref(&self) -> &Self::Target {
                    &self.0
                }
            }

            impl DerefMut for $name {
                fn deref_mut(&mut self) -> &mut Self::Target {
                    &mut self.0
                }
            }
        )*
    };
}

wrapper! {
    Memory => MEMORY_SIZE,
    RegisterArray => REGISTER_COUNT
}

impl Memory {
    /// Reads with the address wrapped into the 4 KiB space.
    pub fn read(&self, addr: u16) -> u8 {
        self.0[addr as usize % MEMORY_SIZE]
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        self.0[addr as usize % MEMORY_SIZE] = value;
    }

    /// Big-endian instruction word at `addr`.
    pub fn word(&self, addr: u16) -> u16 {
        u16::from_be_bytes([self.read(addr), self.read(addr.wrapping_add(1))])
    }
}

pub(crate) mod bits {
    pub const fn set(n: u8, bits: u8) -> bool {
        (bits & (1 << n)) != 0
    }

    pub const fn recombine(upper: u8, lower: u8) -> u8 {
        (upper << 4) | lower
    }
}
