use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use chip::{
    chip8::ChipSet,
    definitions::cpu,
    resources::{Rom, RomArchive},
    timer::SystemClock,
    RunnerConfig,
};
use clap::Parser;
use parking_lot::Mutex;

mod terminal;

/// The terminal belongs to the surface, so the log always goes into a file.
const LOG_FILE: &str = "chip8-term.log";

use terminal::TerminalSurface;

#[derive(Parser, Debug)]
#[command(name = "chip8-term")]
#[command(about = "A CHIP-8 virtual machine running in the terminal, quit with Esc")]
struct Args {
    #[arg(
        long,
        default_value = "roms/pong.ch8",
        help = "ROM file to load, or the entry to extract with --archive"
    )]
    rom: String,

    #[arg(long, help = "Zip archive holding the ROM")]
    archive: Option<PathBuf>,

    #[arg(long, help = "Log the control flow of the chip")]
    debug: bool,

    #[arg(
        long,
        default_value_t = cpu::HERTZ,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Instructions per second"
    )]
    hz: u64,

    #[arg(long, default_value = LOG_FILE, help = "File the log is written to")]
    log_file: PathBuf,
}

fn setup_logger(args: &Args) -> anyhow::Result<()> {
    let level = if args.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let mut builder = env_logger::Builder::from_default_env();
    builder
        .filter_level(level)
        .target(log_target(&args.log_file)?)
        .try_init()?;
    Ok(())
}

fn log_target(path: &Path) -> anyhow::Result<env_logger::Target> {
    let file = File::create(path)
        .with_context(|| format!("Unable to create the log file {}", path.display()))?;
    Ok(env_logger::Target::Pipe(Box::new(file)))
}

fn load_rom(args: &Args) -> anyhow::Result<Rom> {
    match &args.archive {
        Some(path) => {
            let mut archive = RomArchive::from_file(path)
                .with_context(|| format!("Unable to open the archive {}", path.display()))?;
            archive.get_file_data(&args.rom).with_context(|| {
                format!(
                    "Unable to load '{}', the archive contains {:?}",
                    args.rom,
                    archive.file_names()
                )
            })
        }
        None => {
            Rom::from_file(&args.rom).with_context(|| format!("Unable to load '{}'", args.rom))
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    setup_logger(&args)?;

    let rom = load_rom(&args)?;
    let chip = Arc::new(Mutex::new(ChipSet::new(rom)));
    let config = RunnerConfig {
        cpu_hz: args.hz,
        ..RunnerConfig::default()
    };

    let res = {
        // the terminal is restored at the end of this block
        let mut surface = TerminalSurface::new().context("Unable to set up the terminal")?;
        chip::run(Arc::clone(&chip), &mut surface, SystemClock, &config)
    };

    if let Err(err) = res {
        log::debug!("{}", chip.lock());
        return Err(err).context("The emulation stopped");
    }
    Ok(())
}
