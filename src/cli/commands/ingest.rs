use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

use crate::clients::youtube::YoutubeClient;
use crate::config::Config;
use crate::db::{self, KnownCollections};
use crate::domain::Keyword;
use crate::services::{Ingestor, VideoPersister};

pub async fn cmd_ingest(config: &Config, keyword: &str, once: bool) -> anyhow::Result<()> {
    config.validate_for_ingest()?;
    let keyword = Keyword::parse(keyword).context("Invalid search keyword")?;

    info!(
        keyword = %keyword,
        "tubewatch v{} starting ingestor",
        env!("CARGO_PKG_VERSION")
    );

    let store = db::connect(&config.database).await?;
    let youtube = Arc::new(YoutubeClient::new(&config.youtube)?);
    let persister = VideoPersister::new(store, Arc::new(KnownCollections::new()));

    let ingestor = Ingestor::new(
        youtube,
        persister,
        keyword,
        Duration::from_secs(config.ingestor.poll_interval_seconds),
    );

    if once {
        let fetched = ingestor.run_once().await;
        info!("Single poll complete, fetched {}", fetched);
        return Ok(());
    }

    tokio::select! {
        () = ingestor.run() => {}
        result = signal::ctrl_c() => match result {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!("Error listening for shutdown: {}", e),
        },
    }

    info!("Ingestor stopped");
    Ok(())
}
