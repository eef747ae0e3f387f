use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Write an annotated hex listing of a KMv4 binary")]
struct Opts {
    /// Input binary file
    #[arg(value_name = "INPUT")]
    input: PathBuf,
    /// Output listing file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,
    /// Raise log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(opts: &Opts) -> Result<()> {
    let program = kmvm_cli::load_program(&opts.input)?;
    let text = kmvm_disassembler::listing(&program)
        .with_context(|| format!("listing {}", opts.input.display()))?;
    kmvm_cli::write_text(Some(&opts.output), &text)
        .with_context(|| format!("writing {}", opts.output.display()))?;
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
        Err(err) => kmvm_cli::report(&err, kmvm_cli::decode_exit_code(&err)),
    }
}
