pub mod environment;
pub mod output;

use std::io;
use std::path::PathBuf;

use anyhow::Context;
use chime::{ParameterInput, SimSirModel};
use clap::Parser;
use log::info;

use environment::Environment;

/// Projects hospital admissions and census with the CHIME SIR model.
#[derive(Parser, Debug)]
#[command(name = "chime-projection", version)]
struct Args {
    /// TOML config with an [input] table of parameters. Without it a JSON
    /// run request is read from stdin.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the CSV tables and run.json; overrides the request's
    /// output section
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Write integer (floor) tables instead of raw values
    #[arg(long)]
    floor: bool,

    /// Log filter, e.g. `info` or `chime=debug`. RUST_LOG is applied on top.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .parse_filters(&args.log_level)
        .parse_default_env()
        .init();

    let mut env = match &args.config {
        Some(path) => Environment::from_toml_file(path)?,
        None => Environment::from_reader(io::stdin().lock())?,
    };
    if let Some(dir) = &args.output_dir {
        env.set_output_dir(dir);
    }
    let env = env.with_input_type::<ParameterInput>()?;

    let parameters = env
        .input
        .clone()
        .validate()
        .context("invalid model parameters")?;
    info!("Running projection {}", parameters.digest()?);

    let model = SimSirModel::new(&parameters).context("projection failed")?;

    output::write_outputs(&env, &model, args.floor)?;
    Ok(())
}
