use log::info;

use crate::error::{Error, Result};
use crate::{font, Memory, RegisterArray, ADDRESS_MASK, MEMORY_SIZE, STACK_SIZE};

/// Registers, memory and call stack of one machine.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub i: u16,                   // Index register
    pub pc: u16,                  // Program counter
    pub sp: u8,                   // Stack pointer
    pub stack: [u16; STACK_SIZE], // Return addresses
    pub memory: Memory,
    pub registers: RegisterArray, // V0..=VF
}

impl Default for State {
    fn default() -> Self {
        Self {
            i: 0,
            pc: 0,
            sp: 0,
            stack: [0; STACK_SIZE],
            memory: Memory::default(),
            registers: RegisterArray::default(),
        }
    }
}

impl State {
    /// Fresh state with the font at `font_offset` and `rom` at `rom_offset`,
    /// ready to execute from `rom_offset`.
    pub fn load(rom: &[u8], rom_offset: u16, font_offset: u16) -> Result<Self> {
        let start = rom_offset as usize;
        if start + rom.len() > MEMORY_SIZE {
            return Err(Error::RomTooLarge {
                size: rom.len(),
                offset: rom_offset,
                capacity: MEMORY_SIZE,
            });
        }
        let glyphs = font_offset as usize;
        if glyphs + font::FONT.len() > MEMORY_SIZE {
            return Err(Error::InvalidConfig(format!(
                "font table at {font_offset:#05X} does not fit in memory"
            )));
        }

        let mut state = Self {
            pc: rom_offset,
            ..Self::default()
        };
        state.memory[start..start + rom.len()].copy_from_slice(rom);
        state.memory[glyphs..glyphs + font::FONT.len()].copy_from_slice(font::FONT);
        info!("Loaded ROM [size: {}] [offset: {rom_offset:#05X}]", rom.len());
        Ok(state)
    }

    /// Reads the word at PC and advances PC past it.
    pub fn fetch(&mut self) -> u16 {
        let word = self.memory.word(self.pc);
        self.pc = self.pc.wrapping_add(2) & ADDRESS_MASK;
        word
    }

    pub fn skip(&mut self) {
        self.pc = self.pc.wrapping_add(2) & ADDRESS_MASK;
    }

    pub fn push(&mut self, addr: u16) -> Result<()> {
        let slot = self
            .stack
            .get_mut(self.sp as usize)
            .ok_or(Error::StackOverflow { pc: self.pc })?;
        *slot = addr;
        self.sp += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16> {
        if self.sp == 0 {
            return Err(Error::StackUnderflow { pc: self.pc });
        }
        self.sp -= 1;
        Ok(self.stack[self.sp as usize])
    }
}
