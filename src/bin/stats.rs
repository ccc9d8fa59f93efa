use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use env_logger::Env;
use log::warn;
use regex::Regex;

use gem5_cosim::stats::{plot, report, StatsFile};

fn main() -> Result<()> {
    let args = Command::new("gem5-stats")
        .version("0.1.0")
        .about("Summarize and plot a gem5 statistics dump")
        .arg(
            Arg::new("stats-path")
                .long("stats-path")
                .required(true)
                .help("Path to the JSON stats file of a finished run"),
        )
        .arg(
            Arg::new("plot-dir")
                .long("plot-dir")
                .default_value("./plots")
                .help("Directory for histogram PNGs"),
        )
        .arg(
            Arg::new("hist")
                .long("hist")
                .default_value(r"outTransLatHist\.SendReadNoSnp")
                .help("Regex selecting which latency histograms to plot"),
        )
        .arg(
            Arg::new("no-plots")
                .long("no-plots")
                .action(ArgAction::SetTrue)
                .help("Print the scalar summary only"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Emit the scalar summary as JSON instead of text"),
        )
        .get_matches();

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let stats_path = PathBuf::from(args.get_one::<String>("stats-path").unwrap());
    let stats = StatsFile::load(&stats_path)?;

    let summary = report::summarize(&stats)?;
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary);
    }

    if args.get_flag("no-plots") {
        return Ok(());
    }
    let pattern = args.get_one::<String>("hist").unwrap();
    let pattern = Regex::new(pattern).with_context(|| format!("bad --hist pattern {:?}", pattern))?;
    let plot_dir = Path::new(args.get_one::<String>("plot-dir").unwrap());

    let histograms = report::collect_histograms(&stats, &pattern)?;
    if histograms.is_empty() {
        warn!("no histogram matched {:?}", pattern.as_str());
        return Ok(());
    }
    for (component, dist) in &histograms {
        plot::plot_histogram(component, dist, plot_dir)?;
    }
    Ok(())
}
