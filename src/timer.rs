use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::error::Result;

/// Countdown clocks tick at this rate.
pub const TIMER_HZ: u32 = 60;

/// Audio collaborator driven by the sound countdown.
///
/// Both calls must be idempotent and callable from any thread.
pub trait Buzzer: Send + Sync {
    fn start_tone(&self) -> Result<()>;
    fn stop_tone(&self) -> Result<()>;
}

/// An 8-bit value counting down to zero, one step per 60 Hz tick.
#[derive(Debug, Default)]
pub struct Countdown {
    remaining: AtomicU8,
}

impl Countdown {
    /// Starts a fresh countdown from `value`, replacing any running one.
    pub fn arm(&self, value: u8) {
        self.remaining.store(value, Ordering::SeqCst);
    }

    pub fn value(&self) -> u8 {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Decrements unless already zero. Returns true when this tick
    /// brought the countdown to zero.
    pub fn tick(&self) -> bool {
        matches!(
            self.remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1)),
            Ok(1)
        )
    }
}

/// The delay countdown and the sound gate.
///
/// Shared between the CPU clock, which arms and reads them, and the 60 Hz
/// clock, which ticks them. Neither touches registers or memory.
///
/// Every change to the sound countdown and the buzzer call that follows it
/// happen under one lock, so the tone is playing iff the sound countdown
/// is non-zero.
pub struct Timers {
    delay: Countdown,
    sound: Countdown,
    buzzer: Box<dyn Buzzer>,
    gate: Mutex<()>,
}

impl Timers {
    pub fn new(buzzer: Box<dyn Buzzer>) -> Self {
        Self {
            delay: Countdown::default(),
            sound: Countdown::default(),
            buzzer,
            gate: Mutex::new(()),
        }
    }

    fn sound_gate(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn delay(&self) -> u8 {
        self.delay.value()
    }

    pub fn sound(&self) -> u8 {
        self.sound.value()
    }

    pub fn arm_delay(&self, value: u8) {
        self.delay.arm(value);
    }

    /// Arms the sound gate and switches the tone to match. The countdown
    /// stays armed even if the buzzer fails.
    pub fn arm_sound(&self, value: u8) -> Result<()> {
        let _gate = self.sound_gate();
        self.sound.arm(value);
        if value > 0 {
            self.buzzer.start_tone()
        } else {
            self.buzzer.stop_tone()
        }
    }

    /// One 60 Hz step of both countdowns.
    pub fn tick(&self) -> Result<()> {
        self.delay.tick();
        let _gate = self.sound_gate();
        if self.sound.tick() {
            debug!("Sound countdown expired");
            self.buzzer.stop_tone()?;
        }
        Ok(())
    }

    /// Zeroes both countdowns and silences the tone.
    pub fn disarm(&self) -> Result<()> {
        self.delay.arm(0);
        let _gate = self.sound_gate();
        self.sound.arm(0);
        self.buzzer.stop_tone()
    }
}

impl std::fmt::Debug for Timers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timers")
            .field("delay", &self.delay)
            .field("sound", &self.sound)
            .finish()
    }
}
