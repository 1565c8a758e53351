//! # Telemetry Connection
//!
//! Owns the host session and its lifecycle:
//!
//! ```text
//! Disconnected --connect()--> Connecting --ok--> Connected
//!       ^                         |                  |
//!       +-------- failure --------+-- Quit / Close --+
//! ```
//!
//! Every failure lands in [`TelemetryConnection::handle_disconnect`], which
//! arms the retry flag. The engine owns the actual timer and calls
//! [`TelemetryConnection::connect`] on each tick while the flag is set.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{Result, ScorerError};
use crate::host::{HostEvent, SimConnector, SimHost};
use crate::link::protocol::{Period, SimObject};
use crate::notify::{Notification, NotificationSink};
use crate::telemetry::{
    decode_sample, TelemetrySample, TELEMETRY_DEFINITION_ID, TELEMETRY_FIELDS, TELEMETRY_REQUEST_ID,
};

/// Link state as seen by the rest of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Connection to the simulation host.
pub struct TelemetryConnection<C: SimConnector> {
    connector: C,
    app_name: String,
    protocol_version: u32,
    host: Option<Box<dyn SimHost>>,
    state: ConnectionState,
    attempts: u32,
    retry_armed: bool,
    sink: NotificationSink,
    status: watch::Sender<bool>,
    reported_status: Option<bool>,
    unavailable_reported: bool,
}

impl<C: SimConnector> TelemetryConnection<C> {
    pub fn new(
        connector: C,
        app_name: impl Into<String>,
        protocol_version: u32,
        sink: NotificationSink,
    ) -> Self {
        let (status, _) = watch::channel(false);
        Self {
            connector,
            app_name: app_name.into(),
            protocol_version,
            host: None,
            state: ConnectionState::Disconnected,
            attempts: 0,
            retry_armed: false,
            sink,
            status,
            reported_status: None,
            unavailable_reported: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Failed attempts since the last successful connect
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether the retry timer should be running
    pub fn retry_armed(&self) -> bool {
        self.retry_armed
    }

    /// Live view of [`Self::is_connected`] for other tasks
    pub fn subscribe_status(&self) -> watch::Receiver<bool> {
        self.status.subscribe()
    }

    /// Open a session, register the telemetry definition and subscribe.
    ///
    /// No-op when already connected. Failures are reported through the sink
    /// and end in [`Self::handle_disconnect`]; nothing is returned to the
    /// caller because nothing here is fatal.
    pub async fn connect(&mut self) {
        if self.is_connected() {
            return;
        }

        self.state = ConnectionState::Connecting;
        debug!("Connecting to simulator (attempt {})", self.attempts + 1);

        match open_session(&self.connector, &self.app_name, self.protocol_version).await {
            Ok((host, host_name)) => {
                self.host = Some(host);
                self.state = ConnectionState::Connected;
                self.attempts = 0;
                self.retry_armed = false;
                self.unavailable_reported = false;
                info!("Connected to {}, telemetry subscribed", host_name);
                self.report_status(true);
                self.sink.publish(Notification::ConnectionError { message: None });
            }
            Err(e) => {
                self.attempts += 1;
                self.report_failure(&e);
                self.handle_disconnect().await;
            }
        }
    }

    fn report_failure(&mut self, e: &ScorerError) {
        if e.is_host_unavailable() {
            if self.unavailable_reported {
                debug!("{} (attempt {})", e, self.attempts);
                return;
            }
            self.unavailable_reported = true;
        }

        warn!("Connect failed: {}", e);
        self.sink.publish(Notification::ConnectionError { message: Some(e.to_string()) });
    }

    /// Drop the session and arm the retry timer.
    ///
    /// Idempotent: a second call releases nothing and emits nothing.
    pub async fn handle_disconnect(&mut self) {
        if let Some(mut host) = self.host.take() {
            host.close().await;
            info!("Disconnected from simulator");
        }

        self.state = ConnectionState::Disconnected;
        self.retry_armed = true;
        self.report_status(false);
    }

    /// Dispatch one host event, returning the sample it carried, if any.
    pub async fn handle_event(&mut self, event: HostEvent) -> Option<TelemetrySample> {
        match event {
            HostEvent::Exception { code } => {
                warn!("Host exception {}", code);
                None
            }
            HostEvent::Quit | HostEvent::Close => {
                info!("Host ended the session ({:?})", event);
                self.handle_disconnect().await;
                None
            }
            HostEvent::Data { request_id, .. } if request_id != TELEMETRY_REQUEST_ID => {
                debug!("Ignoring data for request {}", request_id);
                None
            }
            HostEvent::Data { data, .. } => match decode_sample(&data) {
                Ok(sample) => Some(sample),
                Err(e) => {
                    debug!("Dropping sample: {}", e);
                    None
                }
            },
        }
    }

    /// Wait for the next host event. Pends forever while disconnected.
    pub async fn next_event(&mut self) -> Result<HostEvent> {
        match self.host.as_mut() {
            Some(host) => host.next_event().await,
            None => std::future::pending().await,
        }
    }

    /// Final teardown: close the host and stop retrying. Idempotent.
    pub async fn close(&mut self) {
        if let Some(mut host) = self.host.take() {
            host.close().await;
            info!("Closed simulator session");
        }
        self.state = ConnectionState::Disconnected;
        self.retry_armed = false;
        self.report_status(false);
    }

    fn report_status(&mut self, connected: bool) {
        if self.reported_status == Some(connected) {
            return;
        }
        self.reported_status = Some(connected);
        self.status.send_replace(connected);
        self.sink.publish(Notification::ConnectionStatus { connected });
    }
}

/// Open a session and subscribe to telemetry, closing the host again if
/// the subscription fails.
///
/// Takes the connector rather than `&TelemetryConnection`, which is not
/// `Sync` and must not be borrowed across an await.
async fn open_session<C: SimConnector>(
    connector: &C,
    app_name: &str,
    protocol_version: u32,
) -> Result<(Box<dyn SimHost>, String)> {
    let (mut host, host_name) = connector.open(app_name, protocol_version).await?;

    if let Err(e) = subscribe_telemetry(host.as_mut()).await {
        host.close().await;
        return Err(e);
    }

    Ok((host, host_name))
}

/// Register every telemetry field in order, then subscribe once per second.
async fn subscribe_telemetry(host: &mut dyn SimHost) -> Result<()> {
    for field in TELEMETRY_FIELDS.iter() {
        host.add_to_data_definition(TELEMETRY_DEFINITION_ID, field).await?;
    }
    host.request_data_on_sim_object(
        TELEMETRY_REQUEST_ID,
        TELEMETRY_DEFINITION_ID,
        SimObject::User,
        Period::Second,
    )
    .await
}
