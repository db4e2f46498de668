use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use switch_scanner::{
    config::{Config, read_config_file},
    devices::DeviceRegistry,
    scanner::RoundScheduler,
    sinks::{GaugeExporter, SinkFanout, build_publisher, log_readings},
};
use tracing::{debug, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,

    /// Log every request and reading
    #[arg(short, long)]
    verbose: bool,
}

fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };
    let filter = filter::Targets::new().with_targets(vec![
        ("switch_scanner", level),
        ("scanner", level),
        ("tower_http", LevelFilter::INFO),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    info!("loading devices from configuration...");
    let config = read_config_file(&args.file)?;

    let registry = DeviceRegistry::from_configs(&config.devices, config.bridge.as_deref())
        .context("failed to build device registry")?;

    let exporter = Arc::new(GaugeExporter::new());
    serve_exporter(&config, &exporter, registry.len()).await?;

    let publisher_config = config.publisher.clone().unwrap_or_default();
    debug!("publishing readings via {publisher_config:?}");
    let (publisher, broadcast) = build_publisher(&publisher_config, config.poll_timeout())?;
    if let Some(broadcast) = &broadcast {
        info!("no broker configured, readings are logged");
        tokio::spawn(log_readings(broadcast.subscribe()));
    }

    let fanout = SinkFanout::new(publisher, exporter);
    let scheduler = RoundScheduler::new(
        registry,
        fanout,
        config.poll_interval(),
        config.poll_timeout(),
    );

    info!("scanning {} devices...", scheduler.device_count());
    scheduler.run().await;

    Ok(())
}

#[cfg(feature = "api")]
async fn serve_exporter(
    config: &Config,
    exporter: &Arc<GaugeExporter>,
    devices: usize,
) -> anyhow::Result<()> {
    use switch_scanner::api::{ExporterState, spawn_exporter_server};

    let bind_addr = config.exporter.clone().unwrap_or_default().bind_addr();
    spawn_exporter_server(bind_addr, ExporterState::new(exporter.clone(), devices))
        .await
        .context("failed to start exporter endpoint")?;
    Ok(())
}

#[cfg(not(feature = "api"))]
async fn serve_exporter(
    _config: &Config,
    _exporter: &Arc<GaugeExporter>,
    _devices: usize,
) -> anyhow::Result<()> {
    debug!("built without the api feature, exporter endpoint disabled");
    Ok(())
}
