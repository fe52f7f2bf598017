use crate::error::{Error, Result};
use crate::{font, MEMORY_SIZE};

/// Machine and host settings, normally filled in from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Memory address the ROM image is copied to (and execution starts at).
    pub rom_offset: u16,
    /// Memory address the hex font glyphs are copied to.
    pub font_offset: u16,
    /// Instructions executed per second.
    pub cpu_frequency: u32,
    /// Cycles between forced presents when not rendering lazily.
    pub refresh_interval: u32,
    /// Present right after `00E0`/`DXYN` instead of every `refresh_interval` cycles.
    pub lazy_render: bool,
    /// `8XY6`/`8XYE` shift `Vx` in place instead of shifting `Vy` into `Vx`.
    pub new_shift: bool,
    /// Playback device index; `None` picks the host default.
    pub audio_device: Option<u32>,
    pub tone_frequency: f32,
    /// Window scale factor.
    pub scale: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rom_offset: 0x200,
            font_offset: 0x50,
            cpu_frequency: 200,
            refresh_interval: 20,
            lazy_render: false,
            new_shift: false,
            audio_device: None,
            tone_frequency: 440.0,
            scale: 10,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.cpu_frequency == 0 {
            return Err(invalid("CPU frequency must be at least 1 Hz"));
        }
        if self.refresh_interval == 0 {
            return Err(invalid("screen refresh interval 0 not allowed"));
        }
        if self.scale == 0 {
            return Err(invalid("window scale factor 0 not allowed"));
        }
        if self.font_offset as usize + font::FONT.len() > MEMORY_SIZE {
            return Err(invalid(format!(
                "font table at {:#05X} does not fit in memory",
                self.font_offset
            )));
        }
        if self.rom_offset as usize >= MEMORY_SIZE {
            return Err(invalid(format!(
                "ROM offset {:#05X} is outside memory",
                self.rom_offset
            )));
        }
        if !(self.tone_frequency > 0.0) {
            return Err(invalid("tone frequency must be positive"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::InvalidConfig(reason.into())
}
