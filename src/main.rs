use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stk::vm::{LoopMode, Options};
use stk::{container, repl, Error};

#[derive(Parser, Debug)]
#[command(name = "stk", version, about = "A tiny stack language")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Abort a run after this many dispatched instructions
    #[arg(long, global = true, value_name = "N")]
    max_steps: Option<u64>,

    /// Pop a fresh while condition each time the body reaches `end`
    #[arg(long, global = true)]
    refresh_while: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a compiled .out file
    #[command(visible_alias = "e")]
    Execute {
        /// The file to execute
        input_file: PathBuf,
    },
    /// Compile a .stk source file
    #[command(visible_alias = "c")]
    Compile {
        /// The file to compile
        input_file: PathBuf,
        /// The output file path
        #[arg(short, long, default_value = "output.out")]
        output: PathBuf,
        /// Execute the compiled file
        #[arg(short, long)]
        run: bool,
    },
    /// Print the program in a compiled file as JSON
    #[command(visible_alias = "i")]
    Inspect {
        /// The compiled file
        input_file: PathBuf,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("STK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Error> {
    let options = Options {
        loop_mode: if cli.refresh_while { LoopMode::Refresh } else { LoopMode::Latched },
        max_steps: cli.max_steps,
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Some(Command::Execute { input_file }) => {
            stk::execute_file(&input_file, &mut out, options)?;
        }
        Some(Command::Compile { input_file, output, run }) => {
            stk::compile_file(&input_file, &output)?;
            info!(source = %input_file.display(), output = %output.display(), "compiled");
            if run {
                stk::execute_file(&output, &mut out, options)?;
            }
        }
        Some(Command::Inspect { input_file }) => {
            let program = container::load(&input_file)?;
            let json = serde_json::to_string_pretty(&program)?;
            writeln!(out, "{}", json)?;
        }
        None => {
            repl::exit_on_interrupt()?;
            repl::run(io::stdin().lock(), &mut out, io::stderr(), options)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
