use clap::Parser;
use mqtt_replay::config::Overrides;
use mqtt_replay::{Config, Replayer};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "mqtt-replay")]
#[command(about = "Replay CSV sensor logs as a live MQTT telemetry stream", long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", help = "Optional TOML config file")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "MQTT broker hostname or IP address")]
    broker: Option<String>,

    #[arg(short, long, help = "MQTT broker port (default: 1883)")]
    port: Option<u16>,

    #[arg(short, long, help = "MQTT topic to publish to")]
    topic: Option<String>,

    #[arg(short, long, help = "Path to the CSV file to replay")]
    file: Option<PathBuf>,

    #[arg(short, long, help = "Delay between messages in seconds (default: 1.0)")]
    interval: Option<f64>,

    #[arg(long, help = "MQTT username (optional)")]
    username: Option<String>,

    #[arg(long, help = "MQTT password (optional)")]
    password: Option<String>,

    #[arg(long, help = "Replay the file again from the top after the last row, until interrupted")]
    continuous: bool,

    #[arg(long, help = "Enable JSON output for logs")]
    json_logs: bool,

    #[arg(short, long, help = "Verbose logging")]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            broker_host: self.broker.clone(),
            broker_port: self.port,
            topic: self.topic.clone(),
            source_path: self.file.clone(),
            interval_secs: self.interval,
            username: self.username.clone(),
            password: self.password.clone(),
            continuous: self.continuous,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(args.json_logs, args.verbose);

    info!("Starting mqtt-replay");

    let config = match Config::load(args.config.as_deref(), args.overrides()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    info!(
        broker = %config.broker_addr(),
        topic = %config.replay.topic,
        source = %config.source.path.display(),
        interval_secs = config.replay.interval_secs,
        continuous = config.replay.continuous,
        "Configuration summary"
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping after the current row");
            signal_token.cancel();
        }
    });

    match Replayer::new(config).run(shutdown).await {
        Ok(summary) => {
            if summary.interrupted {
                info!(
                    "Publishing interrupted by user: {} messages published",
                    summary.messages_published
                );
            } else {
                info!(
                    "Successfully published {} messages",
                    summary.messages_published
                );
            }
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(e.exit_code());
        }
    }
}

fn init_logging(json: bool, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("mqtt_replay=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("mqtt_replay=info,warn"))
    };

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
