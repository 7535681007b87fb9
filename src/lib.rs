pub mod api;
pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod db;
pub mod domain;
pub mod models;
pub mod services;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
pub use config::Config;

/// A config plus what happened while loading it.
///
/// Loading runs before the subscriber exists, so its diagnostics are held here
/// and logged by [`run`].
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    /// File the config came from, `None` for built-in defaults.
    pub source: Option<PathBuf>,
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    fn log(&self) {
        match &self.source {
            Some(path) => info!("Loaded config from: {}", path.display()),
            None => info!("No config file found, using defaults"),
        }
        for warning in &self.warnings {
            warn!("{}", warning);
        }
    }
}

/// Loads `.env`, then the config file (`--config` or the default search paths),
/// then environment overrides.
pub fn load_config(cli: &Cli) -> anyhow::Result<LoadedConfig> {
    let _ = dotenvy::dotenv();

    let source = cli.config.clone().or_else(Config::find_config_file);
    let mut config = match &source {
        Some(path) => Config::load_from_path(path)?,
        None => Config::default(),
    };
    let warnings = config.apply_env_overrides(|key| std::env::var(key).ok());

    Ok(LoadedConfig {
        config,
        source,
        warnings,
    })
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let (layer, task) = tracing_loki::builder()
            .label("app", "tubewatch")?
            .extra_field("pid", std::process::id().to_string())?
            .build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    Ok(())
}

fn init_metrics(config: &Config) -> anyhow::Result<Option<PrometheusHandle>> {
    if !config.observability.metrics_enabled {
        return Ok(None);
    }

    use metrics_exporter_prometheus::PrometheusBuilder;
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    info!("Prometheus metrics recorder initialized");
    Ok(Some(handle))
}

/// The ingestor has no router to hang `/metrics` on, so it only exports when a port is set.
fn init_ingest_metrics(config: &Config) -> anyhow::Result<()> {
    let observability = &config.observability;
    let Some(port) = observability.metrics_port.filter(|_| observability.metrics_enabled) else {
        return Ok(());
    };

    use metrics_exporter_prometheus::PrometheusBuilder;
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus exporter")?;
    info!("Prometheus exporter listening on port {}", port);
    Ok(())
}

pub async fn run(cli: Cli, loaded: LoadedConfig) -> anyhow::Result<()> {
    init_tracing(&loaded.config)?;
    loaded.log();
    let config = loaded.config;

    match cli.command {
        Commands::Ingest { keyword, once } => {
            init_ingest_metrics(&config)?;
            cli::cmd_ingest(&config, &keyword, once).await
        }

        Commands::Serve { port } => {
            let prometheus_handle = init_metrics(&config)?;
            cli::cmd_serve(config, port, prometheus_handle).await
        }

        Commands::Init => cli::cmd_init(),
    }
}
