use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use tf_checkpoint::inspect;

/// Prints the tensors stored in a checkpoint.
#[derive(Debug, Parser)]
#[command(name = "inspect_checkpoint", version)]
struct Cli {
    /// Checkpoint prefix, e.g. `tensorflow/simple/model-two-variables.ckpt`.
    prefix: PathBuf,

    /// Print only this tensor.
    #[arg(long, default_value = "")]
    tensor_name: String,

    /// Print the values of every tensor.
    #[arg(long)]
    all_tensors: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(&cli) {
        eprintln!("error: {:#}", error);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    init_tracing()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    inspect::print_tensors_in_checkpoint_file(&cli.prefix, &cli.tensor_name, cli.all_tensors, &mut out)
        .with_context(|| format!("failed to inspect {}", cli.prefix.display()))?;
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env("TF_CHECKPOINT_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {}", error))?;

    Ok(())
}
