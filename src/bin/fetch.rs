use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use env_logger::Env;
use log::info;

use gem5_cosim::config::run_config::Isa;
use gem5_cosim::config::Layout;
use gem5_cosim::resources;

fn main() -> Result<()> {
    let args = Command::new("gem5-fetch")
        .version("0.1.0")
        .about("Download kernel, bootloader and disk images into the images/ tree")
        .arg(Arg::new("isa").long("isa").default_value("x86"))
        .arg(Arg::new("base-dir").long("base-dir").default_value("."))
        .arg(
            Arg::new("force")
                .long("force")
                .action(ArgAction::SetTrue)
                .help("Re-download artifacts that are already present"),
        )
        .get_matches();

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let isa = Isa::from_name(args.get_one::<String>("isa").unwrap())?;
    let layout = Layout::new(args.get_one::<String>("base-dir").unwrap());
    resources::fetch(&layout, isa, args.get_flag("force"))?;
    info!("all {} artifacts in place under {}", isa, layout.base.display());
    Ok(())
}
