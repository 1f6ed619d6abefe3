use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod asm;
mod driver;
mod jit;
mod labels;

#[derive(Parser)]
#[command(name = "mjit")]
#[command(about = "A MIPS-subset to x86-64 just-in-time compiler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a source file and execute it, printing every stage
    Run {
        /// The assembly file to compile and run
        file: PathBuf,
    },
    /// Parse a source file and print the instruction stream
    Parse {
        /// The assembly file to parse
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { file } => driver::run_file(&file),
        Commands::Parse { file } => driver::parse_file(&file),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
