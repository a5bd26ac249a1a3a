use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use spard::{Program, Transformer, Unmatched};
use tracing_subscriber::EnvFilter;

/// Transform text with a SPARD program.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Program file (JSON): grammar, transform rules and optional config
    program: PathBuf,
    /// Text to transform; read from stdin when neither this nor --file is given
    input: Option<String>,
    /// Read the input from a file instead
    #[arg(long, conflicts_with = "input")]
    file: Option<PathBuf>,
    /// Override what happens to input no rule matches
    #[arg(long, value_enum)]
    unmatched: Option<Mode>,
    /// Override the call-depth ceiling
    #[arg(long)]
    max_depth: Option<usize>,
    /// Log more (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Copy,
    Skip,
    Error,
}

impl From<Mode> for Unmatched {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Copy => Unmatched::Copy,
            Mode::Skip => Unmatched::Skip,
            Mode::Error => Unmatched::Error,
        }
    }
}

fn main() {
    // Parse CLI arguments.
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> spard::Result<()> {
    // Load the program.
    let mut program = Program::from_json(&std::fs::read_to_string(&args.program)?)?;
    if let Some(mode) = args.unmatched {
        program.config.unmatched = mode.into();
    }
    if let Some(depth) = args.max_depth {
        program.config.max_depth = depth;
    }

    // Read the input.
    let input = match (args.input, args.file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };

    // Transform and print.
    let output = Transformer::from_program(program).transform(&input)?;
    print!("{output}");
    Ok(())
}
