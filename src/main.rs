//! camvisor - camera unit agent runtime
//!
//! Main entry point: builds the agent context, registers the device tasks and
//! runs until a termination signal or a console `quit`.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use camvisor::{
    AgentConfig, AgentContext, CaptureTask, ConnectionConfig, ConnectionManager, ConnectivityTask,
    ConsoleReceiver, ConsoleSender, SimulatedDevice, TaskIdentity, TaskRef,
};
use clap::{Parser, ValueEnum};
use tracing::{error, info};

/// Blocking stdin reads may keep the runtime alive this long after shutdown.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// camvisor - per-device agent runtime for embedded camera units
#[derive(Parser, Debug)]
#[command(name = "camvisor")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the broker config document (JSON with an "MQTT" section)
    #[arg(short, long, env = "CAMVISOR_CONFIG", default_value = "./config/MQTT.json")]
    config: PathBuf,

    /// Default log level; RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Do not start the interactive console sender
    #[arg(long)]
    no_console: bool,

    /// Do not start the broker connectivity task
    #[arg(long)]
    no_mqtt: bool,

    /// Capture pipelines to run (repeatable)
    #[arg(long, value_enum)]
    capture: Vec<CaptureKind>,

    /// Write the broker config (existing or default) to --config and exit
    #[arg(long)]
    init_config: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CaptureKind {
    Audio,
    Video,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = camvisor::logging::init(&cli.log_level) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    if cli.init_config {
        process::exit(init_config(&cli.config));
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to build async runtime");
            process::exit(1);
        }
    };

    let code = runtime.block_on(run(cli));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    process::exit(code);
}

fn init_config(path: &Path) -> i32 {
    let cfg = ConnectionConfig::load(path).unwrap_or_default();
    match cfg.save(path) {
        Ok(()) => {
            info!(path = %path.display(), "broker config written");
            0
        }
        Err(e) => {
            error!(code = e.code(), error = %e, "failed to write broker config");
            1
        }
    }
}

async fn run(cli: Cli) -> i32 {
    let config = AgentConfig {
        broker_config_path: cli.config.clone(),
        ..AgentConfig::default()
    };
    let ctx = AgentContext::new(config);

    for task in build_tasks(&ctx, &cli) {
        if let Err(e) = ctx.supervisor().add_task(task) {
            error!(error = %e, label = e.as_label(), "task registration failed");
            return 1;
        }
    }

    info!(config = %cli.config.display(), "agent starting");
    match ctx.run().await {
        Ok(()) => {
            info!("agent stopped");
            0
        }
        Err(e) => {
            error!(error = %e, label = e.as_label(), "agent stopped with error");
            1
        }
    }
}

fn build_tasks(ctx: &AgentContext, cli: &Cli) -> Vec<TaskRef> {
    let cfg = ctx.config();
    let mailbox = ctx.mailbox();
    let mut tasks: Vec<TaskRef> = vec![Arc::new(ConsoleReceiver::new(
        Arc::clone(mailbox),
        ctx.shutdown_flag().clone(),
    ))];

    if !cli.no_mqtt {
        let manager = ConnectionManager::mqtt(cfg.connect_timeout)
            .with_config_path(cfg.broker_config_path.clone());
        tasks.push(Arc::new(ConnectivityTask::new(
            Arc::new(manager),
            Arc::clone(mailbox),
            TaskIdentity::RECEIVER,
            cfg.connectivity_interval,
            cfg.reconnect,
        )));
    }

    let mut kinds = cli.capture.clone();
    kinds.sort_unstable();
    kinds.dedup();
    for kind in kinds {
        let task = match kind {
            CaptureKind::Audio => {
                CaptureTask::new(TaskIdentity::AUDIO, SimulatedDevice::audio(), cfg.capture_interval)
            }
            CaptureKind::Video => {
                CaptureTask::new(TaskIdentity::VIDEO, SimulatedDevice::video(), cfg.capture_interval)
            }
        };
        tasks.push(Arc::new(task));
    }

    if !cli.no_console {
        tasks.push(Arc::new(ConsoleSender::stdin(Arc::clone(mailbox))));
    }
    tasks
}
