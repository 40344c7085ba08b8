use anyhow::anyhow;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use hedgewatch::{AppConfig, ControlIntent, HedgeWatch, OptionOp};

#[derive(Parser)]
#[command(name = "hedgewatch", about = "Polling console for the option-analytics backend")]
struct Cli {
    /// Directory holding default.toml / <env>.toml
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Override the backend base URL
    #[arg(long, env = "HEDGEWATCH_BASE_URL")]
    base_url: Option<String>,

    /// Override the option cycle cadence in seconds
    #[arg(long)]
    cadence: Option<u64>,

    /// Override the trade feed cadence in seconds
    #[arg(long)]
    trades_cadence: Option<u64>,

    /// Override the per-call timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the backend continuously and stream status updates
    Run,
    /// Issue a single toolbar control command
    Control {
        #[arg(value_enum)]
        intent: IntentArg,
    },
    /// Invoke a single option operation and print the outcome
    Query {
        #[arg(value_enum)]
        op: MetricArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum IntentArg {
    Play,
    Pause,
    Stop,
}

impl From<IntentArg> for ControlIntent {
    fn from(arg: IntentArg) -> Self {
        match arg {
            IntentArg::Play => ControlIntent::Play,
            IntentArg::Pause => ControlIntent::Pause,
            IntentArg::Stop => ControlIntent::Stop,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum MetricArg {
    Init,
    TotalPnl,
    TotalExposure,
    OptExposure,
    HedgePnl,
    OptionPnl,
    PushHedgeTrades,
}

impl From<MetricArg> for OptionOp {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Init => OptionOp::Init,
            MetricArg::TotalPnl => OptionOp::TotalPnl,
            MetricArg::TotalExposure => OptionOp::TotalExposure,
            MetricArg::OptExposure => OptionOp::OptExposure,
            MetricArg::HedgePnl => OptionOp::HedgePnl,
            MetricArg::OptionPnl => OptionOp::OptionPnl,
            MetricArg::PushHedgeTrades => OptionOp::PushHedgeTrades,
        }
    }
}

fn init_logging() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hedgewatch=debug"));

    // File logging is optional; preflight writability because the rolling
    // appender panics if it cannot create the initial file.
    let file_layer = std::env::var("HEDGEWATCH_LOG_DIR").ok().and_then(|log_dir| {
        if std::fs::create_dir_all(&log_dir).is_err() {
            eprintln!("Warning: could not create log directory {log_dir}, file logging disabled");
            return None;
        }
        let test_path = std::path::Path::new(&log_dir).join(".hedgewatch_write_test");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&test_path)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);
                let file_appender = tracing_appender::rolling::daily(&log_dir, "hedgewatch.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                // Keep the guard alive for the process lifetime.
                Box::leak(Box::new(guard));
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: could not write to log directory {log_dir} ({e}), file logging disabled"
                );
                None
            }
        }
    });

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load_from(&cli.config_dir)?;
    if let Some(base_url) = &cli.base_url {
        config.gateway.base_url = base_url.clone();
    }
    if let Some(cadence) = cli.cadence {
        config.poll.option_cadence_secs = cadence;
    }
    if let Some(cadence) = cli.trades_cadence {
        config.poll.trades_cadence_secs = cadence;
    }
    if let Some(timeout) = cli.timeout {
        config.gateway.request_timeout_secs = timeout;
    }
    config
        .validate()
        .map_err(|errors| anyhow!("invalid configuration:\n  {}", errors.join("\n  ")))?;
    Ok(config)
}

fn print_record(record: &hedgewatch::StatusRecord) {
    let prefix = if record.is_error { "ERROR " } else { "" };
    println!(
        "[{}] {}{}",
        record.timestamp.format("%H:%M:%S"),
        prefix,
        record.message
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let app = HedgeWatch::from_config(config)?;

    match cli.command {
        Command::Run => run(app).await,
        Command::Control { intent } => {
            app.dispatch_control(intent.into()).await?;
            print_record(&app.status().await);
            Ok(())
        }
        Command::Query { op } => {
            app.query_metric(op.into()).await;
            print_record(&app.status().await);
            Ok(())
        }
    }
}

async fn run(app: HedgeWatch) -> anyhow::Result<()> {
    let poll = app.config().poll.clone();
    info!(
        option_cadence_secs = poll.option_cadence_secs,
        trades_cadence_secs = poll.trades_cadence_secs,
        base_url = %app.config().gateway.base_url,
        "starting pollers"
    );

    // Prime the backend's option state before the cycles begin.
    app.init_options().await;
    print_record(&app.status().await);

    let mut updates = app.subscribe();
    app.start_polling(poll.option_cadence_secs)?;
    app.start_trade_feed(poll.trades_cadence_secs)?;

    loop {
        tokio::select! {
            changed = updates.recv() => match changed {
                Ok(record) => print_record(&record),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    info!(skipped, "status stream lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received");
                break;
            }
        }
    }

    app.shutdown();
    Ok(())
}
