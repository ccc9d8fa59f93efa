use anyhow::Result;
use clap::{value_parser, Arg, Command};
use env_logger::Env;

use gem5_cosim::term::TermClient;
use gem5_cosim::util::DEFAULT_TERM_PORT;

fn main() -> Result<()> {
    let args = Command::new("m5term")
        .version("0.1.0")
        .about("Attach to the serial console of a booted guest")
        .arg(Arg::new("host").long("host").default_value("127.0.0.1"))
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_parser(value_parser!(u16)),
        )
        .get_matches();

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let host = args.get_one::<String>("host").unwrap().clone();
    let port = *args.get_one::<u16>("port").unwrap_or(&DEFAULT_TERM_PORT);
    TermClient::new(host, port).connect_and_relay()
}
