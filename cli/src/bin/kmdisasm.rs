use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use kmvm_disassembler::{decode_all, disassemble};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// Re-assemblable source
    Text,
    /// Decoded instruction stream as JSON
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Disassemble a KMv4 binary")]
struct Opts {
    /// Input binary file
    #[arg(value_name = "INPUT")]
    input: PathBuf,
    /// Output file; stdout when omitted
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
    /// Raise log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(opts: &Opts) -> Result<()> {
    let program = kmvm_cli::load_program(&opts.input)?;
    let context = || format!("disassembling {}", opts.input.display());

    let text = match opts.format {
        Format::Text => disassemble(&program).with_context(context)?,
        Format::Json => {
            let decoded = decode_all(&program.code).with_context(context)?;
            let mut json = serde_json::to_string_pretty(&decoded)?;
            json.push('\n');
            json
        }
    };

    kmvm_cli::write_text(opts.output.as_deref(), &text).context("writing disassembly")?;
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
