use clap::Parser;
use log::info;
use std::{
    fs,
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use caldera::Instruction;

/// Disassembles a CHIP-8 ROM, one instruction word per line.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The path to the ROM
    path: PathBuf,

    /// Write the listing here instead of stdout
    #[arg(short, long)]
    output_file: Option<PathBuf>,

    /// Address the ROM is loaded at
    #[arg(short, long, default_value_t = 0x200)]
    rom_offset: u16,
}

fn listing(rom: &[u8], rom_offset: u16, out: &mut impl Write) -> io::Result<()> {
    for (n, pair) in rom.chunks(2).enumerate() {
        let addr = rom_offset as usize + n * 2;
        let [hi, lo] = match *pair {
            [hi, lo] => [hi, lo],
            [odd] => {
                writeln!(out, "{addr:03X}  {odd:02X}    (odd trailing byte)")?;
                continue;
            }
            _ => continue,
        };
        let inst = Instruction::from(u16::from_be_bytes([hi, lo]));
        match inst.decode() {
            Some(op) => writeln!(out, "{addr:03X}  {inst:?}  {op}")?,
            None => writeln!(out, "{addr:03X}  {inst:?}  ???")?,
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::env::set_var("RUST_LOG", "info");
    env_logger::init();

    let cli = Cli::parse();
    let rom = fs::read(&cli.path)?;

    match &cli.output_file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }
            let mut out = BufWriter::new(fs::File::create(path)?);
            writeln!(out, "== {} ==", cli.path.display())?;
            listing(&rom, cli.rom_offset, &mut out)?;
            out.flush()?;
            info!("Wrote disassembled ROM to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            listing(&rom, cli.rom_offset, &mut out)?;
        }
    }

    Ok(())
}
