//! `conduit` command line

use anyhow::{bail, Result};
use tracing_subscriber::EnvFilter;

mod gen;

const USAGE: &str = "\
conduit - component surface tooling

USAGE:
    conduit gen [PROJECT] [--src <dir>] [--out <file>] [--stdout]

COMMANDS:
    gen     Generate the sandbox declaration file for PROJECT (default: .)

ENVIRONMENT:
    CONDUIT_LOG    log filter, e.g. debug or conduit_etch=trace (default: info)
";

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_env("CONDUIT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        print!("{}", USAGE);
        return Ok(());
    };

    match command.as_str() {
        "gen" | "generate" => gen::run(rest),
        "--help" | "-h" | "help" => {
            print!("{}", USAGE);
            Ok(())
        }
        "--version" | "-V" => {
            println!("conduit {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }
}
