mod advisor;
mod cli;
mod clock;
mod configuration;
mod editor;
mod extensions;
mod firmware;
mod ir;
mod learning;
mod mapping;
mod midi;
mod naming;
mod surface;

use clap::Parser;
use env_logger::Env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    cli::run(cli::Cli::parse()).await
}
