//! # Engine
//!
//! Single actor task that owns the connection, the host session and the
//! flight monitor. Three sources are multiplexed with `select!`, so none of
//! them ever runs concurrently with another:
//!
//! - the retry timer, armed while disconnected
//! - host events, while connected
//! - caller commands from [`EngineHandle`]

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::connection::TelemetryConnection;
use crate::flight::FlightMonitor;
use crate::host::{HostEvent, SimConnector};
use crate::notify::{self, Notification, NotificationSink};
use crate::telemetry::TelemetrySample;

/// Depth of the command queue
const COMMAND_QUEUE_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Reconnect,
    Shutdown,
}

/// Caller-side handle to a running engine
#[derive(Debug)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    connected: watch::Receiver<bool>,
    task: Option<JoinHandle<()>>,
}

impl EngineHandle {
    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Force a connect attempt now, regardless of the retry timer
    pub async fn reconnect(&self) {
        if self.commands.send(Command::Reconnect).await.is_err() {
            debug!("Reconnect requested after shutdown");
        }
    }

    /// Stop the engine and wait for it to tear down. Safe to call twice.
    pub async fn shutdown(&mut self) {
        if self.commands.send(Command::Shutdown).await.is_err() {
            debug!("Shutdown requested, engine already stopped");
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Engine task ended abnormally: {}", e);
            }
        }
    }
}

/// The engine actor
pub struct Engine<C: SimConnector> {
    connection: TelemetryConnection<C>,
    monitor: FlightMonitor,
    sink: NotificationSink,
    retry_period: std::time::Duration,
    retry: Option<Interval>,
}

impl<C: SimConnector + 'static> Engine<C> {
    pub fn new(config: &Config, connector: C, sink: NotificationSink) -> Self {
        Self {
            connection: TelemetryConnection::new(
                connector,
                config.host.app_name.clone(),
                config.host.protocol_version,
                sink.clone(),
            ),
            monitor: FlightMonitor::new(&config.scoring),
            sink,
            retry_period: config.host.retry_interval(),
            retry: None,
        }
    }

    /// Start the engine on the current runtime.
    ///
    /// Returns the handle and the receiving end of the notification channel.
    pub fn spawn(config: &Config, connector: C) -> (EngineHandle, mpsc::Receiver<Notification>) {
        let (sink, notifications) = notify::channel(config.notifications.channel_capacity);
        let engine = Self::new(config, connector, sink);
        let connected = engine.connection.subscribe_status();
        let (commands, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);

        let task = tokio::spawn(engine.run(command_rx));
        (EngineHandle { commands, connected, task: Some(task) }, notifications)
    }

    /// Actor loop. Returns after a shutdown command or once every handle is gone.
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!("Engine started");
        self.connection.connect().await;
        self.sync_retry();

        loop {
            tokio::select! {
                _ = tick(&mut self.retry) => {
                    debug!("Retry tick");
                    self.connection.connect().await;
                }
                event = self.connection.next_event(), if self.connection.is_connected() => {
                    match event {
                        Ok(event) => self.on_event(event).await,
                        Err(e) => {
                            warn!("Host link error: {}", e);
                            self.connection.handle_disconnect().await;
                        }
                    }
                }
                command = commands.recv() => match command {
                    Some(Command::Reconnect) => {
                        info!("Reconnect requested");
                        self.connection.connect().await;
                    }
                    Some(Command::Shutdown) | None => break,
                },
            }
            self.sync_retry();
        }

        self.retry = None;
        self.connection.close().await;
        info!("Engine stopped ({} notifications dropped)", self.sink.dropped_count());
    }

    async fn on_event(&mut self, event: HostEvent) {
        if let Some(sample) = self.connection.handle_event(event).await {
            self.on_sample(&sample);
        }
    }

    fn on_sample(&mut self, sample: &TelemetrySample) {
        match self.monitor.process(sample, Utc::now()) {
            Ok(notifications) => {
                self.sink.publish(Notification::Telemetry(*sample));
                for notification in notifications {
                    self.sink.publish(notification);
                }
            }
            Err(e) => debug!("Dropping sample: {}", e),
        }
    }

    /// Start or stop the retry timer to match the connection
    fn sync_retry(&mut self) {
        match (self.connection.retry_armed(), self.retry.is_some()) {
            (true, false) => {
                self.monitor.reseed_ground();
                let mut retry = interval_at(Instant::now() + self.retry_period, self.retry_period);
                retry.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.retry = Some(retry);
                debug!("Retry timer armed ({:?})", self.retry_period);
            }
            (false, true) => {
                self.retry = None;
                debug!("Retry timer cleared");
            }
            _ => {}
        }
    }
}

/// Next tick of the retry timer, or never when it is not armed
async fn tick(retry: &mut Option<Interval>) {
    match retry {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
