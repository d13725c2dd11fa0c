use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rigwatch::config::Settings;
use rigwatch::{build_router, export, telemetry, AppState, Registry};
use rigwatch_adapters::HttpFetcher;
use rigwatch_poller::Poller;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "rigwatch")]
#[command(about = "Live health dashboard for machines exposing hardware-metrics endpoints")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to serve the API on (overrides config)
    #[arg(short, long)]
    listen: Option<String>,

    /// Path to the server registry JSON file (overrides config)
    #[arg(short, long)]
    registry: Option<PathBuf>,

    /// Keep polling all servers in the background, even with no viewers
    #[arg(short, long)]
    background: bool,

    /// Poll every server once, write the result as JSON to this file and exit
    #[arg(short, long)]
    export: Option<PathBuf>,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(listen) = &self.listen {
            settings.listen = listen.clone();
        }
        if let Some(registry) = &self.registry {
            settings.registry_path = registry.clone();
        }
        if self.background {
            settings.background_polling = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref()).context("loading configuration")?;
    args.apply(&mut settings);
    telemetry::init_tracing(&settings.log);

    let registry = Registry::open(&settings.registry_path).with_context(|| {
        format!("opening registry {}", settings.registry_path.display())
    })?;

    let fetcher = HttpFetcher::builder()
        .timeout(settings.fetch_timeout())
        .credential(settings.credential.clone())
        .build()
        .context("building HTTP client")?;

    let poller = Poller::builder(fetcher)
        .fetch_timeout(settings.fetch_timeout())
        .list_period(settings.list_period())
        .detail_period(settings.detail_period())
        .countdown_tick(settings.countdown_tick())
        .sources(registry.list())
        .build();

    // Handle export mode (non-interactive)
    if let Some(export_path) = args.export {
        let document = export::export_to_file(&poller, &export_path).await?;
        println!(
            "Exported {} servers to: {}",
            document["servers"].as_array().map_or(0, Vec::len),
            export_path.display()
        );
        return Ok(());
    }

    let _background = settings
        .background_polling
        .then(|| poller.subscribe(poller.list_config()));

    let app = build_router(AppState::new(Arc::new(registry), poller));
    let listener = tokio::net::TcpListener::bind(&settings.listen)
        .await
        .with_context(|| format!("binding {}", settings.listen))?;
    info!(addr = %listener.local_addr()?, background = settings.background_polling, "serving");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
