//! VDU Headless Runner
//!
//! Feeds a VDU byte stream from stdin or a file through a session with a
//! recording backend, then prints the final state.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use serde::Serialize;
use vdu_terminal::app::{Config, OutputFormat};
use vdu_terminal::backend::Call;
use vdu_terminal::core::Snapshot;
use vdu_terminal::{Outcome, Recorder, Session};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Serialize)]
struct Report<'a> {
    snapshot: Snapshot,
    commands: usize,
    errors: usize,
    /// Errors from bad opcodes or sub-commands, a subset of `errors`
    protocol_errors: usize,
    unsupported: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    calls: Option<&'a [Call]>,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut mode: Option<u8> = None;
    let mut input_file: Option<String> = None;
    let mut output_format: Option<OutputFormat> = None;
    let mut show_help = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-c" | "--config" => {
                i += 1;
                if i < args.len() {
                    config_path = Some(PathBuf::from(&args[i]));
                }
            },
            "-m" | "--mode" => {
                i += 1;
                if i < args.len() {
                    match args[i].parse() {
                        Ok(n) => mode = Some(n),
                        Err(_) => {
                            eprintln!("Invalid mode '{}'", args[i]);
                            return ExitCode::FAILURE;
                        },
                    }
                }
            },
            "-f" | "--file" => {
                i += 1;
                if i < args.len() {
                    input_file = Some(args[i].clone());
                }
            },
            "-j" | "--json" => {
                output_format = Some(OutputFormat::Json);
            },
            "-t" | "--text" => {
                output_format = Some(OutputFormat::Text);
            },
            "-h" | "--help" => {
                show_help = true;
            },
            _ => {
                // Treat as input file if no flag
                if input_file.is_none() && !args[i].starts_with('-') {
                    input_file = Some(args[i].clone());
                }
            },
        }
        i += 1;
    }

    if show_help {
        print_help();
        return ExitCode::SUCCESS;
    }

    let config = match &config_path {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            },
        },
        None => Config::load_or_default(),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mode = mode.unwrap_or(config.initial_mode);
    let output_format = output_format.unwrap_or(config.output_format);

    let mut session = match Session::with_mode(Recorder::new(), mode) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        },
    };

    let input_data = match &input_file {
        Some(path) => match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path, e);
                return ExitCode::FAILURE;
            },
        },
        None => {
            let mut data = Vec::new();
            if let Err(e) = io::stdin().read_to_end(&mut data) {
                eprintln!("Error reading stdin: {}", e);
                return ExitCode::FAILURE;
            }
            data
        },
    };

    let results = session.write(&input_data);
    let errors = results.iter().filter(|r| r.is_err()).count();
    let protocol_errors = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.is_protocol()))
        .count();
    let unsupported = results
        .iter()
        .filter(|r| matches!(r, Ok(Outcome::Unsupported(_))))
        .count();
    if !session.decoder().is_idle() {
        tracing::warn!(
            "Input ended inside a command ({} bytes buffered)",
            session.decoder().buffered()
        );
    }

    let report = Report {
        snapshot: session.snapshot(),
        commands: results.len(),
        errors,
        protocol_errors,
        unsupported,
        calls: config
            .include_calls
            .then(|| session.backend().calls.as_slice()),
    };

    match output_format {
        OutputFormat::Text => {
            print!("{}", report.snapshot.to_text());
            println!(
                "commands: {} ({} errors, {} protocol, {} unsupported)",
                report.commands, report.errors, report.protocol_errors, report.unsupported
            );
            if let Some(calls) = report.calls {
                println!("---");
                for call in calls {
                    println!("{:?}", call);
                }
                println!("---");
            }
        },
        OutputFormat::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing snapshot: {}", e);
                return ExitCode::FAILURE;
            },
        },
    }

    ExitCode::SUCCESS
}

fn print_help() {
    println!("VDU Headless Runner");
    println!();
    println!("Usage: vdu-headless [OPTIONS] [INPUT_FILE]");
    println!();
    println!("Options:");
    println!("  -m, --mode <N>       Initial screen mode (default: 0)");
    println!("  -f, --file <PATH>    Read input from file");
    println!("  -c, --config <PATH>  Load configuration from file");
    println!("  -j, --json           Output state as JSON");
    println!("  -t, --text           Output state as text (default)");
    println!("  -h, --help           Show this help message");
    println!();
    println!("If no input file is specified, reads from stdin.");
    println!();
    println!("Examples:");
    println!("  printf '\\x16\\x1c\\x19\\x04\\x40\\x01\\xf0\\x00' | vdu-headless --json");
    println!("  vdu-headless -m 12 stream.bin");
}
