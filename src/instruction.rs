use std::fmt;

use crate::bits;

/// A raw 16-bit instruction word split into its four nibbles.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    nibbles: [u8; 4],
}

impl From<u16> for Instruction {
    fn from(inst: u16) -> Self {
        let [hi, lo] = inst.to_be_bytes();
        Self {
            nibbles: [(hi & 0xF0) >> 4, hi & 0xF, (lo & 0xF0) >> 4, lo & 0xF],
        }
    }
}

impl Instruction {
    pub fn word(&self) -> u16 {
        let [a, b, c, d] = self.nibbles;
        u16::from_be_bytes([bits::recombine(a, b), bits::recombine(c, d)])
    }

    pub fn x(&self) -> usize {
        self.nibbles[1] as usize
    }

    pub fn y(&self) -> usize {
        self.nibbles[2] as usize
    }

    pub fn n(&self) -> u8 {
        self.nibbles[3]
    }

    pub fn kk(&self) -> u8 {
        bits::recombine(self.nibbles[2], self.nibbles[3])
    }

    pub fn nnn(&self) -> u16 {
        self.word() & crate::ADDRESS_MASK
    }

    /// Decodes the word, or `None` if no operation matches it.
    pub fn decode(&self) -> Option<Op> {
        let (x, y) = (self.x(), self.y());
        let op = match self.nibbles {
            [0, 0, 0xE, 0] => Op::Clear,
            [0, 0, 0xE, 0xE] => Op::Return,
            [1, ..] => Op::Jump(self.nnn()),
            [2, ..] => Op::Call(self.nnn()),
            [3, ..] => Op::SkipEqImm(x, self.kk()),
            [4, ..] => Op::SkipNeImm(x, self.kk()),
            [5, _, _, 0] => Op::SkipEqReg(x, y),
            [6, ..] => Op::LoadImm(x, self.kk()),
            [7, ..] => Op::AddImm(x, self.kk()),
            [8, _, _, 0] => Op::Load(x, y),
            [8, _, _, 1] => Op::Or(x, y),
            [8, _, _, 2] => Op::And(x, y),
            [8, _, _, 3] => Op::Xor(x, y),
            [8, _, _, 4] => Op::Add(x, y),
            [8, _, _, 5] => Op::Sub(x, y),
            [8, _, _, 6] => Op::ShiftRight(x, y),
            [8, _, _, 7] => Op::SubN(x, y),
            [8, _, _, 0xE] => Op::ShiftLeft(x, y),
            [9, _, _, 0] => Op::SkipNeReg(x, y),
            [0xA, ..] => Op::LoadIndex(self.nnn()),
            [0xB, ..] => Op::JumpOffset(self.nnn()),
            [0xC, ..] => Op::Random(x, self.kk()),
            [0xD, ..] => Op::Draw(x, y, self.n()),
            [0xE, _, 9, 0xE] => Op::SkipKey(x),
            [0xE, _, 0xA, 1] => Op::SkipNotKey(x),
            [0xF, _, 0, 7] => Op::ReadDelay(x),
            [0xF, _, 0, 0xA] => Op::WaitKey(x),
            [0xF, _, 1, 5] => Op::SetDelay(x),
            [0xF, _, 1, 8] => Op::SetSound(x),
            [0xF, _, 1, 0xE] => Op::AddIndex(x),
            [0xF, _, 2, 9] => Op::Glyph(x),
            [0xF, _, 3, 3] => Op::Decimal(x),
            [0xF, _, 5, 5] => Op::Store(x),
            [0xF, _, 6, 5] => Op::Restore(x),
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for nibble in self.nibbles.iter() {
            write!(f, "{:X}", nibble)?;
        }
        Ok(())
    }
}

/// A decoded operation. Register operands are indices `0..16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Clear,
    Return,
    Jump(u16),
    Call(u16),
    SkipEqImm(usize, u8),
    SkipNeImm(usize, u8),
    SkipEqReg(usize, usize),
    LoadImm(usize, u8),
    AddImm(usize, u8),
    Load(usize, usize),
    Or(usize, usize),
    And(usize, usize),
    Xor(usize, usize),
    Add(usize, usize),
    Sub(usize, usize),
    ShiftRight(usize, usize),
    SubN(usize, usize),
    ShiftLeft(usize, usize),
    SkipNeReg(usize, usize),
    LoadIndex(u16),
    JumpOffset(u16),
    Random(usize, u8),
    Draw(usize, usize, u8),
    SkipKey(usize),
    SkipNotKey(usize),
    ReadDelay(usize),
    WaitKey(usize),
    SetDelay(usize),
    SetSound(usize),
    AddIndex(usize),
    Glyph(usize),
    Decimal(usize),
    Store(usize),
    Restore(usize),
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Op::Clear => write!(f, "CLS"),
            Op::Return => write!(f, "RET"),
            Op::Jump(addr) => write!(f, "JP {addr:#05X}"),
            Op::Call(addr) => write!(f, "CALL {addr:#05X}"),
            Op::SkipEqImm(x, kk) => write!(f, "SE V{x:X}, {kk:#04X}"),
            Op::SkipNeImm(x, kk) => write!(f, "SNE V{x:X}, {kk:#04X}"),
            Op::SkipEqReg(x, y) => write!(f, "SE V{x:X}, V{y:X}"),
            Op::LoadImm(x, kk) => write!(f, "LD V{x:X}, {kk:#04X}"),
            Op::AddImm(x, kk) => write!(f, "ADD V{x:X}, {kk:#04X}"),
            Op::Load(x, y) => write!(f, "LD V{x:X}, V{y:X}"),
            Op::Or(x, y) => write!(f, "OR V{x:X}, V{y:X}"),
            Op::And(x, y) => write!(f, "AND V{x:X}, V{y:X}"),
            Op::Xor(x, y) => write!(f, "XOR V{x:X}, V{y:X}"),
            Op::Add(x, y) => write!(f, "ADD V{x:X}, V{y:X}"),
            Op::Sub(x, y) => write!(f, "SUB V{x:X}, V{y:X}"),
            Op::ShiftRight(x, y) => write!(f, "SHR V{x:X}, V{y:X}"),
            Op::SubN(x, y) => write!(f, "SUBN V{x:X}, V{y:X}"),
            Op::ShiftLeft(x, y) => write!(f, "SHL V{x:X}, V{y:X}"),
            Op::SkipNeReg(x, y) => write!(f, "SNE V{x:X}, V{y:X}"),
            Op::LoadIndex(addr) => write!(f, "LD I, {addr:#05X}"),
            Op::JumpOffset(addr) => write!(f, "JP V0, {addr:#05X}"),
            Op::Random(x, kk) => write!(f, "RND V{x:X}, {kk:#04X}"),
            Op::Draw(x, y, n) => write!(f, "DRW V{x:X}, V{y:X}, {n}"),
            Op::SkipKey(x) => write!(f, "SKP V{x:X}"),
            Op::SkipNotKey(x) => write!(f, "SKNP V{x:X}"),
            Op::ReadDelay(x) => write!(f, "LD V{x:X}, DT"),
            Op::WaitKey(x) => write!(f, "LD V{x:X}, K"),
            Op::SetDelay(x) => write!(f, "LD DT, V{x:X}"),
            Op::SetSound(x) => write!(f, "LD ST, V{x:X}"),
            Op::AddIndex(x) => write!(f, "ADD I, V{x:X}"),
            Op::Glyph(x) => write!(f, "LD F, V{x:X}"),
            Op::Decimal(x) => write!(f, "LD B, V{x:X}"),
            Op::Store(x) => write!(f, "LD [I], V{x:X}"),
            Op::Restore(x) => write!(f, "LD V{x:X}, [I]"),
        }
    }
}
