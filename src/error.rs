use std::io;
use std::path::PathBuf;

/// Everything that can go wrong while setting up or running the machine.
///
/// Only the setup variants (`RomTooLarge`, `RomUnreadable`, `InvalidConfig`,
/// `Clock`, `Window`, `Pixels`) are fatal; the rest are reported and the
/// machine keeps running.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("ROM is too large ({size} bytes at offset {offset:#05X}, memory holds {capacity} bytes)")]
    RomTooLarge {
        size: usize,
        offset: u16,
        capacity: usize,
    },

    #[error("unable to read ROM {}: {source}", .path.display())]
    RomUnreadable { path: PathBuf, source: io::Error },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown instruction {word:04X} at {addr:#05X}")]
    UnknownInstruction { word: u16, addr: u16 },

    #[error("call stack overflow at {pc:#05X}")]
    StackOverflow { pc: u16 },

    #[error("return with empty call stack at {pc:#05X}")]
    StackUnderflow { pc: u16 },

    #[error("dropped a CPU cycle that started before the previous one finished; CPU frequency may be too high")]
    Overrun,

    #[error("unable to start {name} clock: {source}")]
    Clock { name: String, source: io::Error },

    #[error("audio: {0}")]
    Audio(String),

    #[error("render: {0}")]
    Render(String),

    #[error(transparent)]
    Window(#[from] winit::error::OsError),

    #[error(transparent)]
    Pixels(#[from] pixels::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
