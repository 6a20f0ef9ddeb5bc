//! The sampling scheduler: session lifecycle and the tick loop
//!
//! One `Monitor` owns one session. `start` resolves the target and
//! begins periodic ticking; `stop` is idempotent, terminal and safe to
//! trigger from a signal handler. Overlapping ticks are skipped, never
//! queued, so at most one sample is in flight per session.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::breach::BreachTracker;
use crate::chart::ChartBuffer;
use crate::config::{MonitorConfig, TargetSpec, MAX_CHART_POINTS};
use crate::disk::DiskProbe;
use crate::error::Result;
use crate::logfile::{LogFile, LogLevel};
use crate::output::OutputSink;
use crate::sample::{format_bytes, format_time, ChartPoint, Sample, SampleRecord};
use crate::snapshot::{write_snapshot, SnapshotRecord, SnapshotSession};
use crate::stats::StatCollector;
use crate::target::{self, ResolvedTarget, TargetEvent};

/// Session lifecycle: `Stopped` is terminal, there is no way back to
/// `Idle` or `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Running,
    Stopped,
}

/// Mutable state of one start-to-stop run
struct SessionState {
    status: SessionStatus,
    started_at: DateTime<Utc>,
    target: Option<ResolvedTarget>,
}

struct MonitorInner {
    config: MonitorConfig,
    state: Mutex<SessionState>,
    breach: BreachTracker,
    chart: Mutex<ChartBuffer>,
    collector: Mutex<StatCollector>,
    probe: Box<dyn DiskProbe>,
    sink: Box<dyn OutputSink>,
    log: Mutex<Option<LogFile>>,
    busy: AtomicBool,
    cancel: CancellationToken,
}

/// The resource-sampling monitor
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
    run_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Monitor {
    /// Build a monitor from validated configuration and its two
    /// collaborators. Opens the log sink if one is configured.
    pub fn new(
        config: MonitorConfig,
        sink: Box<dyn OutputSink>,
        probe: Box<dyn DiskProbe>,
    ) -> Result<Self> {
        config.validate()?;

        let log = match &config.log_file {
            Some(path) => Some(LogFile::open(path)?),
            None => None,
        };

        let threshold = config.threshold_bytes;
        Ok(Self {
            inner: Arc::new(MonitorInner {
                config,
                state: Mutex::new(SessionState {
                    status: SessionStatus::Idle,
                    started_at: Utc::now(),
                    target: None,
                }),
                breach: BreachTracker::new(threshold),
                chart: Mutex::new(ChartBuffer::new(MAX_CHART_POINTS)),
                collector: Mutex::new(StatCollector::new()),
                probe,
                sink,
                log: Mutex::new(log),
                busy: AtomicBool::new(false),
                cancel: CancellationToken::new(),
            }),
            run_handle: Arc::new(Mutex::new(None)),
        })
    }

    /// Resolve the target and begin periodic ticking.
    ///
    /// A no-op on a session that is already running or has been
    /// stopped. Target resolution failures are fatal and propagate.
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock().await;
            if state.status != SessionStatus::Idle {
                return Ok(());
            }
            // Claim the session before resolution awaits, so a second
            // start() is a no-op and a concurrent stop() has a single
            // transition to contend with.
            state.status = SessionStatus::Running;
            state.started_at = Utc::now();
        }

        let (events_tx, events_rx) = mpsc::channel(4);
        let resolved = {
            let mut collector = self.inner.collector.lock().await;
            target::resolve(&self.inner.config.target, &mut collector, events_tx).await
        };

        let target = match resolved {
            Ok(target) => target,
            Err(e) => {
                let mut state = self.inner.state.lock().await;
                state.status = SessionStatus::Stopped;
                return Err(e);
            }
        };

        let started_at = Utc::now();
        {
            let mut state = self.inner.state.lock().await;
            if state.status != SessionStatus::Running {
                // stop() landed while the target was resolving; the
                // session stays stopped and a just-spawned child must
                // not be orphaned.
                if target.is_child() {
                    target::terminate_child(target.pid());
                }
                return Ok(());
            }
            state.started_at = started_at;
            state.target = Some(target);
        }

        self.inner.log_startup(started_at, &target).await;

        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            inner.run(events_rx).await;
        });
        *self.run_handle.lock().await = Some(handle);

        Ok(())
    }

    /// Stop the session: cancel the timer, terminate a supervised
    /// child, write the duration summary and release the log sink.
    /// Idempotent; repeated calls (including from signal handlers) do
    /// nothing after the first.
    pub async fn stop(&self) {
        self.inner.stop().await;
    }

    /// Wait for the tick loop to terminate (stop call or child exit).
    pub async fn wait(&self) {
        let handle = self.run_handle.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Capture a heap snapshot of the monitoring process itself and
    /// persist it. Decoupled from the tick cycle and never fatal.
    pub async fn capture_snapshot(&self) -> Result<PathBuf> {
        self.inner.capture_snapshot().await
    }

    pub async fn status(&self) -> SessionStatus {
        self.inner.state.lock().await.status
    }

    pub fn breach_count(&self) -> u64 {
        self.inner.breach.count()
    }
}

impl MonitorInner {
    async fn run(self: Arc<Self>, mut events: mpsc::Receiver<TargetEvent>) {
        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut events_open = true;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = events.recv(), if events_open => {
                    match event {
                        Some(TargetEvent::ChildExited(reason)) => {
                            let message = format!("Child process exited with {reason}");
                            info!("{message}");
                            self.log(LogLevel::Info, &message).await;
                            self.sink.notify(&message);
                            break;
                        }
                        Some(TargetEvent::ChildError(detail)) => {
                            let message = format!("Child process error: {detail}");
                            error!("{message}");
                            self.log(LogLevel::Error, &message).await;
                            self.sink.notify(&message);
                            break;
                        }
                        None => events_open = false,
                    }
                }
                _ = interval.tick() => {
                    if self.busy.swap(true, Ordering::SeqCst) {
                        debug!("tick skipped: previous sample still in flight");
                        continue;
                    }
                    let inner = self.clone();
                    tokio::spawn(async move {
                        inner.tick().await;
                        inner.busy.store(false, Ordering::SeqCst);
                    });
                }
            }
        }

        self.stop().await;
    }

    /// One sampling cycle: collect, evaluate, chart, probe, emit.
    /// All failures in here are recoverable and absorbed.
    async fn tick(&self) {
        let target = {
            let state = self.state.lock().await;
            if state.status != SessionStatus::Running {
                return;
            }
            match state.target {
                Some(target) => target,
                None => return,
            }
        };

        let collected = {
            let mut collector = self.collector.lock().await;
            match target {
                ResolvedTarget::Own { pid } => collector.sample_own(pid),
                ResolvedTarget::Child { pid } | ResolvedTarget::External { pid } => {
                    collector.sample_pid(pid)
                }
            }
        };

        let (memory, cpu) = match collected {
            Ok(collected) => collected,
            Err(e) => {
                // Recoverable: no sample this tick, no breach, no chart
                // point; the next tick proceeds normally.
                error!("error checking memory: {e}");
                self.log(LogLevel::Error, &format!("Error checking memory: {e}"))
                    .await;
                return;
            }
        };

        let mut sample = Sample {
            timestamp: Utc::now(),
            pid: target.pid(),
            memory,
            cpu,
            disk: None,
        };

        let is_breach = self.breach.evaluate(&sample);

        let chart = if self.config.chart {
            let mut chart = self.chart.lock().await;
            chart.push(ChartPoint::from(&sample));
            chart.render(self.config.threshold_bytes)
        } else {
            None
        };

        match self.probe.probe() {
            Ok(disk) => sample.disk = Some(disk),
            Err(e) => {
                debug!("disk probe failed: {e}");
                self.log(LogLevel::Error, &e.to_string()).await;
            }
        }

        let record = SampleRecord::new(
            &sample,
            self.config.threshold_bytes,
            self.breach.count(),
            is_breach,
            self.config.target.mode_name(),
        );

        // Emit under the state lock so a concurrent stop() either
        // happens before (and suppresses) the emission or after it.
        let state = self.state.lock().await;
        if state.status != SessionStatus::Running {
            return;
        }
        if let Ok(json) = serde_json::to_string(&record) {
            self.log(LogLevel::Data, &json).await;
        }
        self.sink.emit(&record, chart.as_ref());
    }

    async fn stop(&self) {
        let (child_pid, started_at) = {
            let mut state = self.state.lock().await;
            match state.status {
                SessionStatus::Stopped => return,
                SessionStatus::Idle => {
                    state.status = SessionStatus::Stopped;
                    return;
                }
                SessionStatus::Running => {}
            }
            state.status = SessionStatus::Stopped;
            let child_pid = state.target.filter(|t| t.is_child()).map(|t| t.pid());
            (child_pid, state.started_at)
        };

        self.cancel.cancel();

        if let Some(pid) = child_pid {
            target::terminate_child(pid);
        }

        let elapsed = (Utc::now() - started_at).num_seconds().max(0);
        self.log(LogLevel::Info, &format!("Monitoring stopped after {elapsed}s"))
            .await;
        info!("monitoring stopped after {elapsed}s");

        // Release the log sink
        *self.log.lock().await = None;
    }

    async fn capture_snapshot(&self) -> Result<PathBuf> {
        let memory = {
            let mut collector = self.collector.lock().await;
            collector.own_memory(std::process::id())
        };

        let (started_at, target) = {
            let state = self.state.lock().await;
            (state.started_at, state.target)
        };

        let (child_command, target_pid) = match &self.config.target {
            TargetSpec::Own => (None, None),
            TargetSpec::Child { command, .. } => (Some(command.clone()), target.map(|t| t.pid())),
            TargetSpec::ExternalPid { pid } => (None, Some(*pid)),
        };

        let session = SnapshotSession {
            start_time: started_at.to_rfc3339(),
            breach_count: self.breach.count(),
            threshold: self.config.threshold_bytes,
            mode: self.config.target.mode_name().to_string(),
            child_command,
            target_pid,
        };

        let request = self.config.snapshot.clone().unwrap_or_default();
        let dir = request.dir.unwrap_or_else(|| PathBuf::from("."));
        let at = Utc::now();
        let record = SnapshotRecord::new(at, request.label.as_deref(), memory, session);

        match write_snapshot(&dir, at, request.label.as_deref(), &record) {
            Ok(path) => {
                let message = format!("Heap snapshot saved to {}", path.display());
                self.log(LogLevel::Info, &message).await;
                self.sink.notify(&message);
                Ok(path)
            }
            Err(e) => {
                self.log(LogLevel::Error, &e.to_string()).await;
                error!("{e}");
                Err(e)
            }
        }
    }

    async fn log_startup(&self, started_at: DateTime<Utc>, target: &ResolvedTarget) {
        let interval = self.config.interval.as_millis();
        self.log(
            LogLevel::Info,
            &format!("Memory monitoring started at {}", format_time(started_at)),
        )
        .await;
        self.log(
            LogLevel::Info,
            &format!("Threshold: {}", format_bytes(self.config.threshold_bytes)),
        )
        .await;
        self.log(LogLevel::Info, &format!("Interval: {interval}ms")).await;

        let mode_line = match &self.config.target {
            TargetSpec::Own => "Monitoring self (no command provided)".to_string(),
            TargetSpec::Child { command, args } => format!(
                "Monitoring child process: {} {}",
                command,
                args.join(" ")
            ),
            TargetSpec::ExternalPid { pid } => {
                format!("Monitoring existing process PID: {pid}")
            }
        };
        self.log(LogLevel::Info, &mode_line).await;

        info!(
            mode = self.config.target.mode_name(),
            pid = target.pid(),
            threshold_bytes = self.config.threshold_bytes,
            interval_ms = interval,
            "monitoring started"
        );
    }

    async fn log(&self, level: LogLevel, message: &str) {
        if let Some(log) = self.log.lock().await.as_mut() {
            log.write(level, message);
        }
    }
}
