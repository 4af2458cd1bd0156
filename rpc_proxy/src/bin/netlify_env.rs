use anyhow::Result;
use clap::Parser;
use ghostflow_rpc_proxy::env_export::{export_file, DEFAULT_INPUT, DEFAULT_OUTPUT};
use std::path::PathBuf;

/// Generates the proxy-mode deployment environment from the app's `.env.local`.
/// Import the result with `netlify env:import .env.netlify`.
#[derive(Parser)]
#[clap(name = "netlify-env")]
struct Args {
    #[clap(long, default_value = DEFAULT_INPUT)]
    input: PathBuf,

    #[clap(long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    export_file(&args.input, &args.output)?;

    println!(
        "Wrote {}. Run: netlify env:import {}",
        args.output.display(),
        args.output.display()
    );
    Ok(())
}
