use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use winit::event::{Event, VirtualKeyCode};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit_input_helper::WinitInputHelper;

use crate::audio;
use crate::clock::Clock;
use crate::display::{Display, DisplayEvent, FrameSender};
use crate::error::{Error, Result};
use crate::input::HostKeys;
use crate::timer::{Buzzer, Timers, TIMER_HZ};
use crate::{Config, Cpu, Interpreter};

/// A CHIP-8 emulator.
///
/// Originally, 8XY6 and 8XYE shifted Vy and stored the result into Vx. Newer
/// interpreters ignore Vy and shift Vx in place; see `--new-shift`.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the ROM
    #[arg(required_unless_present = "list_audio_devices")]
    pub path: Option<PathBuf>,

    /// Memory offset the ROM is loaded at
    #[arg(short, long, default_value = "0x200", value_parser = parse_address)]
    pub rom_offset: u16,

    /// Memory offset the font sprites are loaded at
    #[arg(short, long, default_value = "0x50", value_parser = parse_address)]
    pub font_offset: u16,

    /// Window scale factor
    #[arg(short, long = "scale-factor", default_value_t = 10)]
    pub scale: u32,

    /// Instructions executed per second
    #[arg(short, long = "cpu-freq", default_value_t = 200)]
    pub cpu_frequency: u32,

    /// Cycles between screen refreshes
    #[arg(short = 'i', long = "ref-int", default_value_t = 20)]
    pub refresh_interval: u32,

    /// Shift Vx in place for 8XY6 and 8XYE
    #[arg(short, long)]
    pub new_shift: bool,

    /// Refresh the screen only on 00E0 and DXYN
    #[arg(short, long)]
    pub lazy_render: bool,

    /// Playback device index (see --list-audio-devices)
    #[arg(short, long)]
    pub audio_device: Option<u32>,

    /// Buzzer tone frequency in Hz
    #[arg(short, long = "tone-freq", default_value_t = 440.0)]
    pub tone_frequency: f32,

    /// Print the available playback devices and exit
    #[arg(long)]
    pub list_audio_devices: bool,

    /// Verbosity of debug logging
    #[arg(short, long, value_enum)]
    debug: Option<DebugMode>,
}

#[derive(Copy, Clone, ValueEnum)]
enum DebugMode {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl fmt::Display for DebugMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        })
    }
}

impl Cli {
    pub fn config(&self) -> Config {
        Config {
            rom_offset: self.rom_offset,
            font_offset: self.font_offset,
            cpu_frequency: self.cpu_frequency,
            refresh_interval: self.refresh_interval,
            lazy_render: self.lazy_render,
            new_shift: self.new_shift,
            audio_device: self.audio_device,
            tone_frequency: self.tone_frequency,
            scale: self.scale,
        }
    }
}

/// Accepts decimal or `0x`-prefixed hexadecimal.
fn parse_address(arg: &str) -> std::result::Result<u16, String> {
    let parsed = match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => arg.parse(),
    };
    parsed.map_err(|err| format!("invalid address {arg:?}: {err}"))
}

pub fn init() -> Cli {
    let cli = Cli::parse();
    std::env::set_var(
        "RUST_LOG",
        format!("caldera={}", cli.debug.unwrap_or(DebugMode::Warn)),
    );

    env_logger::init();

    cli
}

#[cfg(feature = "sdl-audio")]
type AudioOutput = audio::SquareWaveOutput;

#[cfg(not(feature = "sdl-audio"))]
type AudioOutput = ();

#[cfg(feature = "sdl-audio")]
fn open_audio(config: &Config) -> Result<(AudioOutput, Box<dyn Buzzer>)> {
    let output = audio::SquareWaveOutput::open(config.audio_device, config.tone_frequency)?;
    let gate = output.gate();
    Ok((output, Box::new(gate)))
}

#[cfg(not(feature = "sdl-audio"))]
fn open_audio(config: &Config) -> Result<(AudioOutput, Box<dyn Buzzer>)> {
    if config.audio_device.is_some() {
        warn!("Built without sdl-audio; ignoring the selected audio device");
    }
    Ok(((), Box::new(audio::Silent)))
}

/// The running machine and the clocks driving it.
struct Machine {
    cpu_clock: Option<Clock>,
    countdown_clock: Option<Clock>,
    timers: Arc<Timers>,
    cpu: Arc<Cpu>,
}

impl Machine {
    /// Starts the 60 Hz countdown clock and then the CPU clock.
    fn start(cpu: Arc<Cpu>, timers: Arc<Timers>, cpu_frequency: u32) -> Result<Self> {
        let countdown_clock = {
            let timers = Arc::clone(&timers);
            Clock::start("countdown", TIMER_HZ, move || {
                if let Err(err) = timers.tick() {
                    warn!("{err}");
                }
            })?
        };
        let cpu_clock = {
            let cpu = Arc::clone(&cpu);
            Clock::start("cpu", cpu_frequency, move || {
                if let Err(err) = cpu.cycle() {
                    warn!("{err}");
                }
            })?
        };
        Ok(Self {
            cpu_clock: Some(cpu_clock),
            countdown_clock: Some(countdown_clock),
            timers,
            cpu,
        })
    }

    /// Stops the CPU clock, then the countdown clock, then disarms both
    /// countdowns and silences the tone. Later calls only disarm again.
    fn shutdown(&mut self) {
        if let Some(clock) = self.cpu_clock.take() {
            clock.stop();
            info!("CPU stopped [overruns: {}]", self.cpu.overruns());
        }
        if let Some(clock) = self.countdown_clock.take() {
            clock.stop();
        }
        if let Err(err) = self.timers.disarm() {
            warn!("{err}");
        }
    }
}

fn list_audio_devices() -> Result<()> {
    let devices = audio::list_devices()?;
    if devices.is_empty() {
        println!("No audio output devices available");
    }
    for (index, name) in devices.iter().enumerate() {
        println!("{index:>3}  {name}");
    }
    Ok(())
}

/// Loads the ROM, opens the window and audio, starts the clocks and runs
/// the event loop until the user quits.
pub fn run(cli: Cli) -> Result<()> {
    if cli.list_audio_devices {
        return list_audio_devices();
    }

    let config = cli.config();
    config.validate()?;
    let path = cli
        .path
        .ok_or_else(|| Error::InvalidConfig("no ROM file given".into()))?;
    let rom = fs::read(&path).map_err(|source| Error::RomUnreadable {
        path: path.clone(),
        source,
    })?;

    let (audio_output, buzzer) = open_audio(&config)?;
    let timers = Arc::new(Timers::new(buzzer));

    let event_loop = EventLoopBuilder::<DisplayEvent>::with_user_event().build();
    let mut display = Display::new(&event_loop, config.scale)?;
    let keys = HostKeys::new();
    let interpreter = Interpreter::new(
        &config,
        &rom,
        Box::new(keys.clone()),
        Box::new(FrameSender::new(&event_loop)),
        Arc::clone(&timers),
    )?;
    let cpu = Arc::new(Cpu::new(interpreter));

    let mut machine = Machine::start(cpu, timers, config.cpu_frequency)?;
    info!("Running {}", path.display());

    // Held until the process exits; the event loop never returns.
    let _audio = audio_output;
    let mut input = WinitInputHelper::new();

    event_loop.run(move |event, _, control_flow| {
        let event = match event {
            Event::UserEvent(message) => {
                display.handle(message);
                return;
            }
            event => event,
        };

        if let Event::RedrawRequested(_) = event {
            if let Err(err) = display.render() {
                error!("{err}");
                machine.shutdown();
                *control_flow = ControlFlow::Exit;
                return;
            }
        }

        if input.update(&event) {
            if input.key_pressed(VirtualKeyCode::Escape) || input.quit() {
                machine.shutdown();
                *control_flow = ControlFlow::Exit;
                return;
            }

            keys.update(&input);

            if let Some(size) = input.window_resized() {
                if let Err(err) = display.resize(size.width, size.height) {
                    error!("{err}");
                    machine.shutdown();
                    *control_flow = ControlFlow::Exit;
                }
            }
        }
    })
}
