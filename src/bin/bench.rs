use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use bytesize::ByteSize;
use clap::{value_parser, Arg, ArgAction, Command};
use env_logger::Env;
use log::info;

use gem5_cosim::config::run_config::{BenchConfig, BenchSize, CacheClass, Isa, RunConfig};
use gem5_cosim::config::Layout;
use gem5_cosim::sim::Invocation;

fn main() -> Result<()> {
    let args = Command::new("gem5-bench")
        .version("0.1.0")
        .about("PARSEC region-of-interest run on the external gem5 binary")
        .arg(Arg::new("benchmark").long("benchmark").required(true))
        .arg(
            Arg::new("size")
                .long("size")
                .default_value("simsmall")
                .help("simsmall, simmedium or simlarge"),
        )
        .arg(Arg::new("base-dir").long("base-dir").default_value("."))
        .arg(Arg::new("gem5-binary").long("gem5-binary"))
        .arg(Arg::new("run-name").long("run-name"))
        .arg(
            Arg::new("num-cores")
                .long("num-cores")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("cores-per-cluster")
                .long("cores-per-cluster")
                .value_parser(value_parser!(usize)),
        )
        .arg(Arg::new("cache-class").long("cache-class"))
        .arg(Arg::new("mem-size").long("mem-size"))
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Print the assembled simulator command line and exit"),
        )
        .get_matches();

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut layout = Layout::new(args.get_one::<String>("base-dir").unwrap());
    if let Some(binary) = args.get_one::<String>("gem5-binary") {
        layout.gem5_binary = Some(PathBuf::from(binary));
    }

    // The PARSEC script drives the x86 board and obtains its own images.
    let mut config = RunConfig::new(Isa::X86, &layout);
    let program = args.get_one::<String>("benchmark").unwrap().clone();
    config.benchmark = Some(BenchConfig {
        program: program.clone(),
        size: BenchSize::from_name(args.get_one::<String>("size").unwrap())?,
    });
    if let Some(n) = args.get_one::<usize>("num-cores") {
        config.num_cores = *n;
    }
    if let Some(n) = args.get_one::<usize>("cores-per-cluster") {
        config.cores_per_cluster = *n;
    }
    if let Some(class) = args.get_one::<String>("cache-class") {
        config.cache_class = CacheClass::from_name(class)?;
    }
    if let Some(size) = args.get_one::<String>("mem-size") {
        config.mem_size =
            ByteSize::from_str(size).map_err(|e| anyhow!("bad mem-size {:?}: {}", size, e))?;
    }

    let run_name = match args.get_one::<String>("run-name") {
        Some(name) => name.clone(),
        None => format!("parsec-{}", program),
    };

    let invocation = Invocation::new(&config, &layout, &run_name)?;
    if args.get_flag("dry-run") {
        println!("{}", invocation.command_line().join(" "));
        return Ok(());
    }
    let output = invocation.run()?;
    info!("statistics expected at {}", output.stats_file.display());
    Ok(())
}
