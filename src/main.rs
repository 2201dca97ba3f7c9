use clap::Parser;
use itertools::Itertools;
use std::{
    error::Error,
    io::{self, BufRead},
    path::PathBuf,
    process::ExitCode,
};
use tracing::subscriber::set_global_default;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};
use zpusim::{
    cpu::{Mode, Zpu},
    image::load_image,
    isa::Instruction,
    mem::{AddressSpace, ByteOrder, MemConfig, Region},
    parsing::{parse_number, parse_region},
};

const MIN_MEM_SIZE: u32 = 0x10000;
const DEFAULT_MEM_SIZE: u32 = 0x10000;

#[derive(Parser)]
#[command(version, about = "Cycle-stepped ZPU simulator")]
struct Cli {
    /// Raw program image, loaded verbatim at address 0
    file: PathBuf,

    /// Main memory size in bytes, ignored below 0x10000
    #[arg(long, value_parser = parse_number)]
    mem: Option<u32>,

    /// Number of stack words to print after every cycle
    #[arg(long, default_value_t = 0)]
    stack: usize,

    /// Run this many cycles instead of waiting for Enter between cycles
    #[arg(long)]
    cycles: Option<u64>,

    /// Print the word at this main memory address after every cycle
    #[arg(long, value_parser = parse_number)]
    peek: Option<u32>,

    /// Suppress per-cycle output (only together with --cycles)
    #[arg(long)]
    silent: bool,

    /// Store words little endian instead of big endian
    #[arg(long)]
    little_endian: bool,

    /// Stop on unmapped or misaligned accesses and unknown opcodes
    #[arg(long)]
    strict: bool,

    /// Extra zero-filled region as BASE:SIZE, may be repeated
    #[arg(long = "region", value_parser = parse_region)]
    regions: Vec<(u32, u32)>,

    /// Stop when a BREAKPOINT opcode executes
    #[arg(long)]
    stop_on_break: bool,
}

/// Driver settings after the command line has been validated
struct Settings {
    mem_size: u32,
    peek: Option<u32>,
    silent: bool,
    byte_order: ByteOrder,
}

impl From<&Cli> for Settings {
    fn from(cli: &Cli) -> Self {
        let mem_size = cli
            .mem
            .filter(|&size| size >= MIN_MEM_SIZE)
            .unwrap_or(DEFAULT_MEM_SIZE);
        Settings {
            mem_size,
            peek: cli.peek.filter(|&addr| addr < mem_size),
            silent: cli.cycles.is_some() && cli.silent,
            byte_order: if cli.little_endian {
                ByteOrder::Little
            } else {
                ByteOrder::Big
            },
        }
    }
}

fn setup_tracing() -> Result<(), Box<dyn Error>> {
    let fmt_layer = fmt::layer().with_target(false).with_writer(io::stderr);
    let sub = Registry::default()
        .with(EnvFilter::from_default_env())
        .with(fmt_layer);
    set_global_default(sub)?;
    Ok(())
}

fn banner(cli: &Cli, settings: &Settings) -> String {
    let endianness = match settings.byte_order {
        ByteOrder::Big => "big endian",
        ByteOrder::Little => "little endian",
    };
    let mut s = format!(
        "ZPUSIM: {} bit {} ZPU, {} bytes of mem",
        u32::BITS,
        endianness,
        settings.mem_size
    );
    if cli.stack > 0 {
        s.push_str(&format!(", printing upto {} deep in stack", cli.stack));
    }
    if let Some(addr) = settings.peek {
        s.push_str(&format!(", poking 0x{:08x}", addr));
    }
    s.push('.');
    s
}

fn build_zpu(cli: &Cli, settings: &Settings) -> Result<Zpu, Box<dyn Error>> {
    let mut regions = vec![load_image(&cli.file, settings.mem_size)?];
    regions.extend(cli.regions.iter().map(|&(base, size)| Region::new(base, size)));
    let config = MemConfig {
        byte_order: settings.byte_order,
        ..Default::default()
    };
    let mem = AddressSpace::with_config(regions, config)?;
    let mode = if cli.strict { Mode::Strict } else { Mode::Compat };
    Ok(Zpu::with_mode(mem, 0, settings.mem_size, mode))
}

fn print_after(zpu: &Zpu, cli: &Cli, settings: &Settings) {
    println!("pc_after      0x{:08x}    sp_after    {:08x} ", zpu.pc(), zpu.sp());
    if let Some(addr) = settings.peek {
        println!(
            "peek_after    0x{:08x} <= 0x{:08x}",
            addr,
            zpu.memory().read_word(addr)
        );
    }
    if cli.stack > 0 {
        println!("STACK LAYOUT (After execution):");
        let layout = zpu
            .stack(cli.stack)
            .map(|(addr, word)| format!("0x{:08x} <= 0x{:08x}", addr, word))
            .join("\n");
        if !layout.is_empty() {
            println!("{}", layout);
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let settings = Settings::from(cli);
    let mut zpu = build_zpu(cli, &settings)?;

    if !settings.silent {
        println!("{}", banner(cli, &settings));
    }

    let mut stdin = io::stdin().lock();
    let mut cycle: u64 = 1;
    loop {
        if !settings.silent {
            let opcode = zpu.memory().read_opcode_byte(zpu.pc());
            println!("cycle         {:>10}    opcode          0x{:02x}", cycle, opcode);
            println!("pc_before     0x{:08x}    sp_before   {:08x} ", zpu.pc(), zpu.sp());
        }
        let instr = zpu
            .step()
            .map_err(|fault| format!("cycle {}: {}", cycle, fault))?;
        if !settings.silent {
            print_after(&zpu, cli, &settings);
        }
        if cli.stop_on_break && instr == Instruction::Breakpoint {
            println!("breakpoint at 0x{:08x}", zpu.pc().wrapping_sub(1));
            break;
        }

        match cli.cycles {
            Some(max) => {
                if cycle >= max {
                    break;
                }
                if !settings.silent {
                    println!();
                }
            }
            None => {
                println!("Press enter for next cycle.");
                let mut line = String::new();
                if stdin.read_line(&mut line)? == 0 {
                    break;
                }
            }
        }
        cycle += 1;
    }
    Ok(())
}

fn main() -> ExitCode {
    if let Err(e) = setup_tracing() {
        eprintln!("zpusim: {}", e);
        return ExitCode::FAILURE;
    }
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("zpusim: {}", e);
            ExitCode::FAILURE
        }
    }
}
