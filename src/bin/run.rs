use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use bytesize::ByteSize;
use clap::{value_parser, Arg, ArgAction, Command};
use env_logger::Env;
use log::info;

use gem5_cosim::config::run_config::{CacheClass, CheckpointMode, CpuType, Isa, RunConfig};
use gem5_cosim::config::Layout;
use gem5_cosim::sim::Invocation;

fn main() -> Result<()> {
    let args = Command::new("gem5-run")
        .version("0.1.0")
        .about("Full-system Ubuntu run on the external gem5 binary")
        .arg(Arg::new("isa").long("isa").default_value("x86"))
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
        .arg(Arg::new("cpu-type").long("cpu-type"))
        .arg(Arg::new("mem-size").long("mem-size"))
        .arg(Arg::new("disk-image").long("disk-image"))
        .arg(Arg::new("kernel").long("kernel"))
        .arg(Arg::new("bootloader").long("bootloader"))
        .arg(
            Arg::new("save-checkpoint")
                .long("save-checkpoint")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("load-checkpoint")
                .long("load-checkpoint")
                .action(ArgAction::SetTrue),
        )
        .arg(Arg::new("checkpoint-path").long("checkpoint-path"))
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Print the assembled simulator command line and exit"),
        )
        .get_matches();

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let isa = Isa::from_name(args.get_one::<String>("isa").unwrap())?;
    let mut layout = Layout::new(args.get_one::<String>("base-dir").unwrap());
    if let Some(binary) = args.get_one::<String>("gem5-binary") {
        layout.gem5_binary = Some(PathBuf::from(binary));
    }

    let mut config = RunConfig::new(isa, &layout);
    if let Some(n) = args.get_one::<usize>("num-cores") {
        config.num_cores = *n;
    }
    if let Some(n) = args.get_one::<usize>("cores-per-cluster") {
        config.cores_per_cluster = *n;
    }
    if let Some(class) = args.get_one::<String>("cache-class") {
        config.cache_class = CacheClass::from_name(class)?;
    }
    if let Some(cpu) = args.get_one::<String>("cpu-type") {
        config.cpu_type = CpuType::from_name(cpu)?;
    }
    if let Some(size) = args.get_one::<String>("mem-size") {
        config.mem_size =
            ByteSize::from_str(size).map_err(|e| anyhow!("bad mem-size {:?}: {}", size, e))?;
    }
    if let Some(disk) = args.get_one::<String>("disk-image") {
        config.disk_image = PathBuf::from(disk);
    }
    if let Some(kernel) = args.get_one::<String>("kernel") {
        config.kernel = PathBuf::from(kernel);
    }
    if let Some(bootloader) = args.get_one::<String>("bootloader") {
        config.bootloader = Some(PathBuf::from(bootloader));
    }
    match (args.get_flag("save-checkpoint"), args.get_flag("load-checkpoint")) {
        (true, true) => anyhow::bail!("--save-checkpoint and --load-checkpoint are exclusive"),
        (true, false) => config.checkpoint = CheckpointMode::Save,
        (false, true) => config.checkpoint = CheckpointMode::Load,
        (false, false) => {}
    }
    if let Some(path) = args.get_one::<String>("checkpoint-path") {
        config.checkpoint_path = PathBuf::from(path);
    }

    let run_name = match args.get_one::<String>("run-name") {
        Some(name) => name.clone(),
        None => format!("{}-ubuntu", isa),
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
