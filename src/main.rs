use clap::Parser;
use rawcpuid::{Cpuid, CpuidDump, Platform};
use std::error;
use std::fs;
use std::io;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

type Result<T> = std::result::Result<T, Box<dyn error::Error>>;

/// Execute CPUID and print the raw registers.
#[derive(Parser, Debug)]
#[command(name = "rawcpuid")]
struct Opt {
    /// Replay an AIDA CPUID dump instead of querying the processor.
    /// Use `-` to read the dump from stdin.
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// The leaf to query, decimal or `0x` hex. Without a leaf, only
    /// the probe result is printed.
    #[arg(value_parser = parse_u32)]
    leaf: Option<u32>,

    /// The subleaf to query, decimal or `0x` hex.
    #[arg(value_parser = parse_u32, default_value = "0")]
    subleaf: u32,
}

fn parse_u32(input: &str) -> std::result::Result<u32, std::num::ParseIntError> {
    match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    }
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

fn run<P: Platform>(cpuid: &Cpuid<P>, opt: &Opt) -> Result<()> {
    let leaf = match opt.leaf {
        Some(leaf) => leaf,
        None => {
            let capability = cpuid.capability();
            println!("cpuid supported: {}", yes_no(capability.cpuid_supported()));
            if let Some(max_leaf) = capability.max_leaf() {
                println!("max leaf: {:#x}", max_leaf);
            }
            return Ok(());
        }
    };

    println!("{}", cpuid.execute(leaf, opt.subleaf)?);

    Ok(())
}

fn load_dump(path: &Path) -> Result<CpuidDump> {
    let input = if path.as_os_str() == "-" {
        let mut input = String::new();
        io::stdin().read_to_string(&mut input)?;
        input
    } else {
        fs::read_to_string(path)?
    };

    Ok(CpuidDump::from_str(&input)?)
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn run_host(opt: &Opt) -> Result<()> {
    run(rawcpuid::host(), opt)
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
fn run_host(_opt: &Opt) -> Result<()> {
    Err("no CPUID on this architecture, use --replay".into())
}

fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::parse();

    match &opt.replay {
        Some(path) => run(&Cpuid::initialize(load_dump(path)?), &opt),
        None => run_host(&opt),
    }
}
