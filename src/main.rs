//! Command-line entry point.

use anyhow::{bail, Context};
use clap::{crate_version, Arg, ArgGroup, Command};
use jackc::driver::{self, Mode, Options};

use log::LevelFilter;
use simple_logger::SimpleLogger;

use std::{path::Path, process, str::FromStr};

fn main() -> anyhow::Result<()> {
    let args = Command::new("jackc")
        .version(crate_version!())
        .about("Compiles Jack classes to VM code")
        .arg(
            Arg::new("tokenize")
                .short('t')
                .long("tokenize")
                .help("Write the token listing of each file"),
        )
        .arg(
            Arg::new("parse")
                .short('p')
                .long("parse")
                .help("Write the parse tree of each file"),
        )
        .arg(
            Arg::new("extended")
                .short('e')
                .long("extended-parse")
                .help("Write the parse tree with identifier details"),
        )
        .arg(
            Arg::new("compile")
                .short('c')
                .long("compile")
                .help("Write VM code (default)"),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .takes_value(true)
                .value_name("MODE")
                .possible_values(["tokenize", "parse", "extended-parse", "compile"])
                .help("Output mode"),
        )
        .group(ArgGroup::new("action").args(&["tokenize", "parse", "extended", "compile", "mode"]))
        .arg(
            Arg::new("keep-going")
                .short('k')
                .long("keep-going")
                .help("Keep compiling the remaining files after an error"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .takes_value(true)
                .value_name("DEST")
                .possible_values(["-"])
                .help("Output destination ('-' for stdout instead of files)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .multiple_occurrences(true)
                .help("Increase log verbosity"),
        )
        .arg(
            Arg::new("path")
                .required(true)
                .value_name("PATH")
                .help("A .jack file or a directory of them"),
        )
        .get_matches();

    let level = match args.occurrences_of("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    SimpleLogger::new()
        .with_level(level)
        .env()
        .init()
        .context("Failed to initialize logger")?;

    let mode = if args.is_present("tokenize") {
        Mode::Tokenize
    } else if args.is_present("parse") {
        Mode::Parse
    } else if args.is_present("extended") {
        Mode::ExtendedParse
    } else {
        match args.value_of("mode") {
            Some(mode) => match Mode::from_str(mode) {
                Ok(mode) => mode,
                Err(()) => bail!("Unknown mode: {}", mode),
            },

            None => Mode::Compile,
        }
    };

    let mut options = Options::empty();
    if args.is_present("keep-going") {
        options |= Options::KEEP_GOING;
    }

    if args.value_of("output") == Some("-") {
        options |= Options::STDOUT;
    }

    let path = match args.value_of("path") {
        Some(path) => Path::new(path),
        None => bail!("No input path"),
    };

    let report = driver::run(path, mode, options)
        .with_context(|| format!("Failed to {} {}", mode, path.display()))?;

    if report.is_success() {
        return Ok(());
    }

    eprint!("{}", report.diagnostics());
    process::exit(1);
}
