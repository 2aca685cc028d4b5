use agora_config::Configuration;
use clap::Parser;
use color_eyre::eyre;
use std::path::PathBuf;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Agora social network server
#[derive(Parser)]
#[command(about, author, version)]
struct Args {
    /// Path to the configuration file
    #[clap(long, short)]
    config: PathBuf,
}

async fn boot() -> eyre::Result<()> {
    let args = Args::parse();
    let config = Configuration::load(args.config).await?;
    agora_observability::initialise()?;

    let state = agora::initialise_state(&config).await?;
    let shutdown_signal = agora::signal::shutdown();

    agora::http::run(state, config.server, shutdown_signal).await
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(boot())
}
