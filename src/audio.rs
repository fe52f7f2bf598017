//! Audio backends for the sound countdown.
//!
//! With the `sdl-audio` feature the buzzer is a square wave played through
//! SDL2. Without it, tone changes are only logged.

use log::debug;

use crate::error::Result;
use crate::timer::Buzzer;

/// Buzzer that makes no sound.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Buzzer for Silent {
    fn start_tone(&self) -> Result<()> {
        debug!("Tone on");
        Ok(())
    }

    fn stop_tone(&self) -> Result<()> {
        debug!("Tone off");
        Ok(())
    }
}

#[cfg(feature = "sdl-audio")]
pub use self::sdl::{list_devices, SquareWaveOutput, ToneGate};

#[cfg(feature = "sdl-audio")]
mod sdl {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use log::info;
    use sdl2::audio::{AudioCallback, AudioDevice, AudioSpecDesired};

    use crate::error::{Error, Result};
    use crate::timer::Buzzer;

    const SAMPLE_RATE: i32 = 44_100;
    const VOLUME: f32 = 0.25;

    struct SquareWave {
        phase_inc: f32,
        phase: f32,
        gate: Arc<AtomicBool>,
    }

    impl AudioCallback for SquareWave {
        type Channel = f32;

        fn callback(&mut self, out: &mut [f32]) {
            if !self.gate.load(Ordering::Relaxed) {
                out.fill(0.0);
                return;
            }
            for sample in out.iter_mut() {
                *sample = if self.phase < 0.5 { VOLUME } else { -VOLUME };
                self.phase = (self.phase + self.phase_inc) % 1.0;
            }
        }
    }

    /// Switches the square wave on and off from any thread.
    #[derive(Debug, Clone)]
    pub struct ToneGate(Arc<AtomicBool>);

    impl Buzzer for ToneGate {
        fn start_tone(&self) -> Result<()> {
            self.0.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop_tone(&self) -> Result<()> {
            self.0.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    /// An open playback stream. Sound stops when this is dropped.
    pub struct SquareWaveOutput {
        _device: AudioDevice<SquareWave>,
        gate: ToneGate,
    }

    impl SquareWaveOutput {
        /// Opens playback device `device` (or the default) and starts the
        /// stream with the tone gated off.
        pub fn open(device: Option<u32>, tone_frequency: f32) -> Result<Self> {
            let sdl = sdl2::init().map_err(Error::Audio)?;
            let audio = sdl.audio().map_err(Error::Audio)?;
            let name = device
                .map(|index| audio.audio_playback_device_name(index))
                .transpose()
                .map_err(Error::Audio)?;

            let desired = AudioSpecDesired {
                freq: Some(SAMPLE_RATE),
                channels: Some(1),
                samples: None,
            };
            let gate = Arc::new(AtomicBool::new(false));
            let device = audio
                .open_playback(name.as_deref(), &desired, |spec| {
                    info!("Opened audio [device: {name:?}] [spec: {spec:?}]");
                    SquareWave {
                        phase_inc: tone_frequency / spec.freq as f32,
                        phase: 0.0,
                        gate: Arc::clone(&gate),
                    }
                })
                .map_err(Error::Audio)?;
            device.resume();

            Ok(Self {
                _device: device,
                gate: ToneGate(gate),
            })
        }

        pub fn gate(&self) -> ToneGate {
            self.gate.clone()
        }
    }

    /// Names of the playback devices, indexed as `--audio-device` expects.
    pub fn list_devices() -> Result<Vec<String>> {
        let sdl = sdl2::init().map_err(Error::Audio)?;
        let audio = sdl.audio().map_err(Error::Audio)?;
        let count = audio.num_audio_playback_devices().unwrap_or(0);
        (0..count)
            .map(|index| audio.audio_playback_device_name(index).map_err(Error::Audio))
            .collect()
    }
}

/// Names of the playback devices, indexed as `--audio-device` expects.
#[cfg(not(feature = "sdl-audio"))]
pub fn list_devices() -> Result<Vec<String>> {
    Ok(Vec::new())
}
