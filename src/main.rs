use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;

use cachesim_snoop::coherence::{Bus, Report};
use cachesim_snoop::utils::read_trace;
use cachesim_snoop::{FilterSpec, Protocol, SystemSpec};

#[derive(Parser)]
#[command(name = "smp_cache", version, about = "Snooping-bus cache coherence simulator")]
struct Cli {
    /// Cache size in bytes
    cache_size: u64,
    /// Associativity (1 = direct-mapped)
    assoc: u64,
    /// Block size in bytes
    block_size: u64,
    /// Number of processors
    num_processors: usize,
    /// 0: MSI, 1: MSI BusUpgr, 2: MESI, 3: MESI with snoop filter
    protocol: Protocol,
    /// Trace file to replay
    trace_file: PathBuf,
    /// Snoop filter entries, in blocks
    #[arg(long, default_value_t = 16)]
    filter_entries: u64,
    /// Snoop filter associativity
    #[arg(long, default_value_t = 1)]
    filter_assoc: u64,
    /// Print the statistics as JSON instead of the text report
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    // logging
    let env = Env::default()
        .filter_or("CACHESIM_LOG", "warn")
        .write_style_or("CACHESIM_LOG_STYLE", "auto");
    env_logger::init_from_env(env);

    let cli = Cli::parse();
    let specs = SystemSpec {
        protocol: cli.protocol,
        num_procs: cli.num_processors,
        block_size: cli.block_size,
        cache_size: cli.cache_size,
        cache_assoc: cli.assoc,
        filter: FilterSpec { entries: cli.filter_entries, assoc: cli.filter_assoc },
    };

    let mut bus = Bus::new(specs).context("invalid cache configuration")?;
    let trace = read_trace(&cli.trace_file)
        .with_context(|| format!("cannot read trace file {:?}", cli.trace_file))?;

    let t0 = Instant::now();
    bus.run(trace).context("simulation failed")?;
    info!("execution time {:?}", t0.elapsed());

    if cli.json {
        let stats = bus.caches().iter().map(|c| c.stats()).collect::<Vec<_>>();
        let out = serde_json::json!({ "config": bus.specs(), "caches": stats });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("===== Coherence Simulator Configuration =====");
    println!("L1_SIZE: {}", cli.cache_size);
    println!("L1_ASSOC: {}", cli.assoc);
    println!("L1_BLOCKSIZE: {}", cli.block_size);
    println!("NUMBER OF PROCESSORS: {}", cli.num_processors);
    println!("COHERENCE PROTOCOL: {}", cli.protocol);
    println!("TRACE FILE: {}", cli.trace_file.display());
    for cache in bus.caches() {
        print!("{}", Report { id: cache.id, protocol: cache.protocol(), stats: cache.stats() });
    }
    Ok(())
}
