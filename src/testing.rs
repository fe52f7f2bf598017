//! In-memory collaborators for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::display::Renderer;
use crate::error::{Error, Result};
use crate::keypad::KeySource;
use crate::screen::Frame;
use crate::timer::Buzzer;
use crate::KEY_COUNT;

/// Key source whose pressed set is changed by the test.
#[derive(Clone, Default)]
pub struct ScriptedKeys(Arc<Mutex<[bool; KEY_COUNT]>>);

impl ScriptedKeys {
    pub fn set(&self, pressed: &[u8]) {
        let mut keys = self.0.lock().unwrap();
        *keys = [false; KEY_COUNT];
        for &key in pressed {
            keys[key as usize] = true;
        }
    }
}

impl KeySource for ScriptedKeys {
    fn snapshot(&self) -> [bool; KEY_COUNT] {
        *self.0.lock().unwrap()
    }
}

/// Renderer that keeps every presented frame.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    frames: Arc<Mutex<Vec<Frame>>>,
    clears: Arc<AtomicUsize>,
}

impl RecordingRenderer {
    pub fn presents(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> Option<Frame> {
        self.frames.lock().unwrap().last().copied()
    }
}

impl Renderer for RecordingRenderer {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.frames.lock().unwrap().push(*frame);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Buzzer that counts start/stop requests.
#[derive(Clone, Default)]
pub struct CountingBuzzer {
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
    playing: Arc<AtomicBool>,
    fail: bool,
}

impl CountingBuzzer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

impl Buzzer for CountingBuzzer {
    fn start_tone(&self) -> Result<()> {
        if self.fail {
            return Err(Error::Audio("device unavailable".into()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop_tone(&self) -> Result<()> {
        if self.fail {
            return Err(Error::Audio("device unavailable".into()));
        }
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
        Ok(())
    }
}
