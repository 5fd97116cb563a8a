//! Command-line interface for hilex
//! This binary highlights source files with the bundled grammars (or grammar files given on
//! the command line) and reports language detection results.
//!
//! Usage:
//!   hilex highlight `<path>` [-l `<language>`] [-f `<format>`] [-g `<grammar>`]... [--lenient]
//!   hilex detect `<path>` [-g `<grammar>`]...                   - Rank the known languages
//!   hilex list-grammars [-g `<grammar>`]...                     - List the known languages
//!
//! Set `RUST_LOG` (e.g. `RUST_LOG=hilex=debug`) to see compile, registration and detection
//! logs on stderr.

use clap::{Arg, ArgAction, ArgMatches, Command};
use hilex::formats::FormatRegistry;
use hilex::{Error, Registry, TokenizeOptions};
use std::fmt::Display;
use std::process;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    init_tracing();

    let grammar_arg = || {
        Arg::new("grammar")
            .long("grammar")
            .short('g')
            .help("Additional grammar file (YAML or JSON); may be repeated")
            .action(ArgAction::Append)
    };

    let matches = Command::new("hilex")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A grammar-driven syntax highlighter")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("highlight")
                .about("Highlight a source file")
                .arg(
                    Arg::new("path")
                        .help("Path to the source file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("language")
                        .long("language")
                        .short('l')
                        .help("Language name or alias; detected when omitted"),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format (e.g., 'html', 'ansi', 'json', 'tokens')")
                        .default_value("ansi"),
                )
                .arg(grammar_arg())
                .arg(
                    Arg::new("lenient")
                        .long("lenient")
                        .help("Render the rest of the input as plain text after an illegal sequence")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("detect")
                .about("Detect the language of a source file")
                .arg(
                    Arg::new("path")
                        .help("Path to the source file")
                        .required(true)
                        .index(1),
                )
                .arg(grammar_arg()),
        )
        .subcommand(
            Command::new("list-grammars")
                .about("List available grammars")
                .arg(grammar_arg()),
        )
        .get_matches();

    let result = match matches.subcommand() {
        Some(("highlight", highlight_matches)) => handle_highlight_command(highlight_matches),
        Some(("detect", detect_matches)) => handle_detect_command(detect_matches),
        Some(("list-grammars", list_matches)) => handle_list_grammars_command(list_matches),
        _ => unreachable!(),
    };

    if let Err(e) = result {
        fail(e);
    }
}

fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .with(EnvFilter::from_default_env())
        .init();
}

fn fail(message: impl Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

fn string_arg<'m>(matches: &'m ArgMatches, name: &str) -> Option<&'m str> {
    matches.get_one::<String>(name).map(String::as_str)
}

/// The bundled grammars plus every `-g` file, in that order.
fn load_registry(matches: &ArgMatches) -> Result<Registry, Error> {
    let mut registry = Registry::with_builtins()?;
    if let Some(paths) = matches.get_many::<String>("grammar") {
        for path in paths {
            registry.load_path(path)?;
        }
    }
    Ok(registry)
}

fn read_source(matches: &ArgMatches) -> Result<String, Error> {
    let path = string_arg(matches, "path").unwrap_or_default();
    Ok(std::fs::read_to_string(path)?)
}

/// Handle the highlight command
fn handle_highlight_command(matches: &ArgMatches) -> Result<(), Error> {
    let registry = load_registry(matches)?;
    let source = read_source(matches)?;
    let format = string_arg(matches, "format").unwrap_or("ansi");

    let formats = FormatRegistry::with_defaults();
    if !formats.has(format) {
        fail(format!(
            "unknown format '{}' (available: {})",
            format,
            formats.list_formats().join(", ")
        ));
    }

    let grammar = match string_arg(matches, "language") {
        Some(language) => match registry.get(language) {
            Some(grammar) => grammar.clone(),
            None => fail(format!("unknown language '{}'", language)),
        },
        None => match registry.detect(&source) {
            Some(detection) => detection.best.grammar,
            None => fail("no grammar accepts this input"),
        },
    };

    let options = if matches.get_flag("lenient") {
        TokenizeOptions::lenient()
    } else {
        TokenizeOptions::default()
    };
    let tokenized = grammar.tokenize_with(&source, &options)?;
    if let Some(offset) = tokenized.illegal() {
        eprintln!(
            "Warning: illegal sequence for {} at offset {}; the rest is plain text",
            grammar.name(),
            offset
        );
    }

    match formats.render(&tokenized, &source, format) {
        Ok(output) => print!("{}", output),
        Err(e) => fail(e),
    }
    Ok(())
}

/// Handle the detect command
fn handle_detect_command(matches: &ArgMatches) -> Result<(), Error> {
    let registry = load_registry(matches)?;
    let source = read_source(matches)?;

    let Some(detection) = registry.detect(&source) else {
        fail("no grammar accepts this input");
    };

    println!("{}", detection.language());
    if let Some(second) = &detection.second_best {
        println!("runner-up: {}", second.grammar.name());
    }
    println!();
    for score in &detection.scores {
        println!("  {:<16} {}", score.grammar.name(), score.relevance);
    }
    Ok(())
}

/// Handle the list-grammars command
fn handle_list_grammars_command(matches: &ArgMatches) -> Result<(), Error> {
    let registry = load_registry(matches)?;
    println!("Available grammars:\n");
    for grammar in registry.grammars() {
        if grammar.aliases().is_empty() {
            println!("  {}", grammar.name());
        } else {
            println!("  {} ({})", grammar.name(), grammar.aliases().join(", "));
        }
    }
    Ok(())
}
