use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use kmvm_runtime::{VMConfig, VM};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a KMv4 binary; `in`/`out` use stdin/stdout")]
struct Opts {
    /// Program to execute
    #[arg(value_name = "INPUT")]
    input: PathBuf,
    /// Data memory size in word cells
    #[arg(long)]
    memory_size: Option<usize>,
    /// Maximum operand stack depth
    #[arg(long)]
    stack_limit: Option<usize>,
    /// Log every executed instruction (needs -vvv or RUST_LOG=trace)
    #[arg(long)]
    trace: bool,
    /// Raise log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Opts {
    fn config(&self) -> VMConfig {
        let defaults = VMConfig::default();
        VMConfig {
            memory_size: self.memory_size.unwrap_or(defaults.memory_size),
            stack_limit: self.stack_limit.unwrap_or(defaults.stack_limit),
            trace: self.trace,
            record_outputs: false,
            ..defaults
        }
    }
}

fn run(opts: &Opts) -> Result<()> {
    let program = kmvm_cli::load_program(&opts.input)?;
    let stdin = std::io::stdin().lock();
    let stdout = std::io::stdout().lock();

    let vm = VM::new(program, opts.config(), stdin, stdout)?;
    let result = vm
        .run()
        .with_context(|| format!("running {}", opts.input.display()))?;
    tracing::info!(steps = result.steps, halt_reason = ?result.halt_reason, "finished");
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
        Err(err) => kmvm_cli::report(&err, kmvm_cli::run_exit_code(&err)),
    }
}
