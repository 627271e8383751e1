use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use cloudwatch_alarms::{
    AlarmsInput, BroadcastAccumulator,
    actors::{messages::AlarmMetricEvent, poller::PollerHandle},
    config::read_config_file,
};
use tokio::sync::broadcast;
use tracing::{debug, error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension)
    #[arg(short)]
    file: String,

    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new().with_targets(vec![
        ("cloudwatch_alarms", LevelFilter::TRACE),
        ("alarm_poller", LevelFilter::TRACE),
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
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;
    let interval = Duration::from_secs(config.interval);
    let input = Arc::new(AlarmsInput::from_config(&config)?);

    let (metric_tx, metric_rx) = broadcast::channel(1024);
    let printer = tokio::spawn(print_metrics(metric_rx));

    let accumulator = Arc::new(BroadcastAccumulator::new(metric_tx));
    let handle = PollerHandle::spawn(input, accumulator, interval);
    info!(
        "polling alarms in {} every {}s",
        handle.region,
        interval.as_secs()
    );

    if args.once {
        let report = handle.poll_now().await?;
        info!("poll finished: {} points, {} errors", report.points, report.errors);
    } else {
        tokio::signal::ctrl_c().await?;
        debug!("received ctrl-c");
    }

    handle.shutdown().await?;
    // the printer ends once every sender (held by the actor) is gone
    if let Err(e) = printer.await {
        error!("{e}");
    }

    Ok(())
}

/// Write every point as one JSON line to stdout
async fn print_metrics(mut metric_rx: broadcast::Receiver<AlarmMetricEvent>) {
    loop {
        match metric_rx.recv().await {
            Ok(event) => match serde_json::to_string(&event.point) {
                Ok(line) => println!("{line}"),
                Err(e) => error!("failed to serialize metric: {e}"),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("printer lagged, skipped {skipped} metrics");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
