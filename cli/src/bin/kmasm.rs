use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Assemble KM source into a KMv4 binary")]
struct Opts {
    /// Input assembly file
    #[arg(value_name = "INPUT")]
    input: PathBuf,
    /// Output binary file, written only when assembly succeeds
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,
    /// Raise log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(opts: &Opts) -> Result<()> {
    let program = kmvm_assembler::assemble_file(&opts.input, &opts.output)
        .with_context(|| format!("assembling {}", opts.input.display()))?;
    tracing::info!(
        output = %opts.output.display(),
        code_size = program.code_size(),
        digest = %program.digest_hex(),
        "assembled"
    );
    Ok(())
}

fn main() -> ExitCode {
    let opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(err) => return kmvm_cli::usage_exit(err),
    };
    kmvm_cli::init_logging(opts.verbose);

    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => kmvm_cli::report(&err, 1),
    }
}
