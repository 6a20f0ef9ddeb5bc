//! memwatch command-line entry point
//!
//! Parses arguments into a `MonitorConfig`, picks the output sink,
//! wires termination signals to the monitor's idempotent `stop`, and
//! maps fatal startup errors to process exit codes.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use console::{style, Term};
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memwatch_monitor::disk::SystemDiskProbe;
use memwatch_monitor::{
    Monitor, MonitorConfig, MonitorError, OutputMode, OutputSink, SnapshotRequest, TargetSpec,
};

mod output;

use output::{HumanSink, JsonSink};

/// Delay before the snapshot requested with `--capture-snapshot` is
/// taken, giving the session time to settle.
const SNAPSHOT_DELAY: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "memwatch")]
#[command(version)]
#[command(about = "A lightweight CLI tool to watch the memory and CPU of a process")]
#[command(long_about = "
memwatch periodically samples memory and CPU usage of a target process --
itself, a spawned command, or an existing process by PID -- compares each
sample against a threshold, and tracks breaches over time.

Examples:
  memwatch                                   # Watch this tool's own memory
  memwatch node server.js                    # Spawn and watch a command
  memwatch --pid 12345                       # Watch an existing process
  memwatch --chart --interval 500 npm start  # Live ASCII chart
  memwatch --json --log-file memory.log npm start
  memwatch --capture-snapshot --label before-test node test.js
")]
struct Cli {
    /// Monitoring interval in milliseconds
    #[arg(short, long, value_name = "MS", default_value_t = 1000)]
    interval: u64,

    /// Memory threshold in megabytes
    #[arg(short, long, value_name = "MB", default_value_t = 100)]
    threshold: u64,

    /// File path to append session logs to
    #[arg(short, long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Output structured JSON records (one per line)
    #[arg(short, long)]
    json: bool,

    /// Capture a heap snapshot shortly after start
    #[arg(short = 's', long)]
    capture_snapshot: bool,

    /// Label for the snapshot file (use with --capture-snapshot)
    #[arg(long, value_name = "TEXT")]
    label: Option<String>,

    /// Monitor an existing process by PID
    #[arg(long, value_name = "PID", conflicts_with = "command")]
    pid: Option<u32>,

    /// Show a live ASCII chart of memory usage
    #[arg(short, long)]
    chart: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    quiet: bool,

    /// Command (and arguments) to spawn and monitor
    #[arg(value_name = "COMMAND", trailing_var_arg = true)]
    command: Vec<String>,
}

impl Cli {
    fn into_config(self) -> Result<MonitorConfig, MonitorError> {
        let threshold_bytes = self
            .threshold
            .checked_mul(1024 * 1024)
            .ok_or_else(|| MonitorError::Config("threshold in megabytes is too large".to_string()))?;

        let target = if let Some(pid) = self.pid {
            TargetSpec::ExternalPid { pid }
        } else if let Some((command, args)) = self.command.split_first() {
            TargetSpec::Child {
                command: command.clone(),
                args: args.to_vec(),
            }
        } else {
            TargetSpec::Own
        };

        Ok(MonitorConfig {
            interval: Duration::from_millis(self.interval),
            threshold_bytes,
            target,
            output: if self.json {
                OutputMode::Structured
            } else {
                OutputMode::Human
            },
            log_file: self.log_file,
            chart: self.chart,
            snapshot: if self.capture_snapshot {
                Some(SnapshotRequest {
                    label: self.label,
                    dir: None,
                })
            } else {
                None
            },
        })
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let colored = !cli.no_color && !cli.json && Term::stdout().features().colors_supported();
    let capture_snapshot = cli.capture_snapshot;
    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => exit_with(e, colored),
    };

    let sink: Box<dyn OutputSink> = if config.output == OutputMode::Structured {
        Box::new(JsonSink)
    } else {
        Box::new(HumanSink::new(colored))
    };

    let monitor = match Monitor::new(config, sink, Box::new(SystemDiskProbe)) {
        Ok(monitor) => monitor,
        Err(e) => exit_with(e, colored),
    };

    if let Err(e) = monitor.start().await {
        exit_with(e, colored);
    }

    if capture_snapshot {
        let snapshot_monitor = monitor.clone();
        tokio::spawn(async move {
            tokio::time::sleep(SNAPSHOT_DELAY).await;
            let _ = snapshot_monitor.capture_snapshot().await;
        });
    }

    if let Err(e) = run_until_shutdown(&monitor).await {
        exit_with(e, colored);
    }
}

/// Drive the session until the tick loop ends (stop or child exit),
/// reacting to termination and snapshot signals in the meantime.
async fn run_until_shutdown(monitor: &Monitor) -> memwatch_monitor::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigusr2 = signal(SignalKind::user_defined2())?;

    let waiter = monitor.clone();
    let mut done = tokio::spawn(async move { waiter.wait().await });

    loop {
        tokio::select! {
            _ = &mut done => break,
            _ = sigint.recv() => {
                // Break the in-place display before the summary line
                println!();
                info!("received SIGINT, stopping");
                monitor.stop().await;
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, stopping");
                monitor.stop().await;
            }
            _ = sigusr2.recv() => {
                let _ = monitor.capture_snapshot().await;
            }
        }
    }

    monitor.stop().await;
    Ok(())
}

fn init_logging(cli: &Cli) {
    let level = if cli.debug {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("memwatch={level},memwatch_monitor={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn exit_with(error: MonitorError, colored: bool) -> ! {
    if colored {
        eprintln!("{} {}", style("✗").red().bold(), style(&error).red());
    } else {
        eprintln!("✗ {error}");
    }
    process::exit(error.exit_code());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_watch_self() {
        let cli = Cli::try_parse_from(["memwatch"]).unwrap();
        let config = cli.into_config().unwrap();
        assert_eq!(config.target, TargetSpec::Own);
        assert_eq!(config.interval, Duration::from_millis(1000));
        assert_eq!(config.threshold_bytes, 100 * 1024 * 1024);
        assert_eq!(config.output, OutputMode::Human);
        assert!(config.snapshot.is_none());
    }

    #[test]
    fn trailing_command_becomes_child_target() {
        let cli =
            Cli::try_parse_from(["memwatch", "--interval", "500", "node", "server.js"]).unwrap();
        let config = cli.into_config().unwrap();
        assert_eq!(config.interval, Duration::from_millis(500));
        assert_eq!(
            config.target,
            TargetSpec::Child {
                command: "node".to_string(),
                args: vec!["server.js".to_string()],
            }
        );
    }

    #[test]
    fn pid_flag_becomes_external_target() {
        let cli = Cli::try_parse_from(["memwatch", "--pid", "4242", "--json"]).unwrap();
        let config = cli.into_config().unwrap();
        assert_eq!(config.target, TargetSpec::ExternalPid { pid: 4242 });
        assert_eq!(config.output, OutputMode::Structured);
    }

    #[test]
    fn pid_conflicts_with_command() {
        assert!(Cli::try_parse_from(["memwatch", "--pid", "1", "node"]).is_err());
    }

    #[test]
    fn snapshot_flag_carries_label() {
        let cli = Cli::try_parse_from([
            "memwatch",
            "--capture-snapshot",
            "--label",
            "before-test",
        ])
        .unwrap();
        let config = cli.into_config().unwrap();
        let snapshot = config.snapshot.unwrap();
        assert_eq!(snapshot.label.as_deref(), Some("before-test"));
    }

    #[test]
    fn non_numeric_interval_rejected() {
        assert!(Cli::try_parse_from(["memwatch", "--interval", "soon"]).is_err());
    }

    #[test]
    fn oversized_threshold_rejected() {
        let max = u64::MAX.to_string();
        let cli = Cli::try_parse_from(["memwatch", "--threshold", &max]).unwrap();
        let err = cli.into_config().unwrap_err();
        assert!(matches!(err, MonitorError::Config(_)));
        assert_eq!(err.exit_code(), 2);
    }
}
