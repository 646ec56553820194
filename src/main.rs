mod affinity;
mod archive;
mod config;
mod content;
mod decode;
mod driver;
mod error;
mod hex;
mod lob;
mod lobfolder;
mod logger;
mod metadata;
mod stats;
mod types;
mod workspace;
mod xml;

use std::process;

use anyhow::Context;
use clap::{Arg, ArgAction, Command};

use config::{Mode, RunConfig};

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        eprintln!("{:#}", err);
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let matches = Command::new("siard2sql")
        .version("0.1")
        .author("Petr Nevyhoštěný")
        .about("Translates a SIARD archive into a self-contained SQLite SQL script")
        .arg(Arg::new("input").index(1).value_name("SIARD-INPUT"))
        .arg(Arg::new("output").index(2).value_name("SQL-OUTPUT"))
        .arg(
            Arg::new("schema_filter")
                .index(3)
                .value_name("SCHEMA-FILTER-REGEX"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("print a comment banner around each emitted statement"),
        )
        .get_matches();

    let input = matches.get_one::<String>("input").map(String::as_str);
    let output = matches.get_one::<String>("output").map(String::as_str);
    let schema_filter = matches
        .get_one::<String>("schema_filter")
        .map(String::as_str);
    let verbosity = matches.get_count("verbose");

    let config = RunConfig::from_args(input, output, schema_filter, verbosity)
        .context("invalid invocation")?;
    let translate = matches!(config.mode, Mode::Translate { .. });

    let stats = driver::run(&config).context("translation failed")?;
    if translate {
        eprintln!("{}", stats);
    }

    Ok(())
}
