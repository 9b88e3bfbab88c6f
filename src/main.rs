//! Command-line driver: reads a complete program from standard input,
//! writes the generated assembly to standard output (spec.md §6's host
//! driver contract — the shell script that invokes us expects exactly
//! this, then pipes our stdout to an assembler).

use clap::Parser as ClapParser;
use formc::compile_source;
use std::io::{self, Read, Write};
use std::process;

#[derive(ClapParser)]
#[command(name = "formc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile a small parenthesized functional dialect to 32-bit x86 assembly", long_about = None)]
struct Cli {
    /// Increase log verbosity (repeat for more: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut source = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut source) {
        eprintln!("formc: failed to read standard input: {}", e);
        process::exit(1);
    }

    match compile_source(&source) {
        Ok(assembly) => {
            if let Err(e) = io::stdout().write_all(assembly.as_bytes()) {
                eprintln!("formc: failed to write standard output: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("formc: {}", e);
            process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let default_directive = match verbose {
        0 => "formc=warn",
        1 => "formc=info",
        2 => "formc=debug",
        _ => "formc=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive)),
        )
        .with_writer(std::io::stderr)
        .init();
}
