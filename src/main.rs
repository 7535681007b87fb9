use clap::Parser;
use mimalloc::MiMalloc;
use tubewatch::cli::Cli;
use tubewatch::{load_config, run};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let loaded = load_config(&cli)?;
    let worker_threads = loaded.config.general.worker_threads;

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();

    if worker_threads > 0 {
        builder.worker_threads(worker_threads);
    }

    let runtime = builder.build()?;
    runtime.block_on(run(cli, loaded))
}
