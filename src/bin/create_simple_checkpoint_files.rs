use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;

use tf_checkpoint::inspect;
use tf_checkpoint::state;
use tf_checkpoint::{CheckpointReader, Saver, Variable};

const SIMPLE_PATH: &str = "tensorflow/simple";

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {:#}", error);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    init_tracing()?;
    let dir = Path::new(SIMPLE_PATH);
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    println!("Create simple checkpoint files ...");
    simple_two_variables(dir)?;
    simple_three_variables(dir)?;

    let state_file = state::state_path(dir);
    fs::remove_file(&state_file)
        .with_context(|| format!("failed to remove {}", state_file.display()))?;
    Ok(())
}

fn simple_two_variables(dir: &Path) -> anyhow::Result<()> {
    let mut v1 = Variable::zeros::<f32>("v1", &[3]);
    let mut v2 = Variable::zeros::<f32>("v2", &[5]);
    v1.update(|x: f32| x + 1.0)?;
    v2.update(|x: f32| x - 1.0)?;

    let mut saver = Saver::new();
    let save_path = saver
        .save(&[&v1, &v2], dir.join("model-two-variables.ckpt"))
        .context("failed to save two-variable checkpoint")?;
    dump_checkpoint_file(&save_path)
}

fn simple_three_variables(dir: &Path) -> anyhow::Result<()> {
    let mut v1 = Variable::zeros::<f32>("var1", &[5]);
    let mut v2 = Variable::zeros::<f32>("var2", &[5]);
    let mut v3 = Variable::zeros::<f32>("var3", &[5]);
    v1.update(|x: f32| x + 2.0)?;
    v2.update(|x: f32| x - 2.0)?;
    v3.assign(&Variable::zip_with(&v1, &v2, |a: f32, b| a * b)?)?;

    let mut saver = Saver::new();
    let save_path = saver
        .save(&[&v1, &v2, &v3], dir.join("model-three-variables.ckpt"))
        .context("failed to save three-variable checkpoint")?;
    dump_checkpoint_file(&save_path)
}

fn dump_checkpoint_file(file: &Path) -> anyhow::Result<()> {
    let reader = CheckpointReader::open(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "file: {}", file.display())?;
    writeln!(out, "shape_map: {}", inspect::format_shape_map(&reader))?;
    inspect::print_tensors(&reader, "", true, &mut out)?;
    writeln!(out, "\n")?;
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
