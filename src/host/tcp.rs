//! TCP transport to the simulator bridge.
//!
//! The bridge process sits next to the simulator and speaks the framed link
//! protocol from [`crate::link`]. Opening a session is a TCP connect followed
//! by an `OPEN` / `OPEN_ACK` exchange, both bounded by the connect timeout.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use super::{HostEvent, SimConnector, SimHost};
use crate::error::{Result, ScorerError};
use crate::link::decoder::{decode_host_message, next_frame};
use crate::link::encoder::{encode_add_to_data_definition, encode_open, encode_request_data};
use crate::link::protocol::{DataField, HostMessage, Period, SimObject};

/// Receive buffer size
const READ_BUFFER_SIZE: usize = 4096;

/// Opens sessions over TCP
#[derive(Debug, Clone)]
pub struct TcpSimConnector {
    address: String,
    connect_timeout: Duration,
}

impl TcpSimConnector {
    pub fn new(address: impl Into<String>, connect_timeout: Duration) -> Self {
        Self { address: address.into(), connect_timeout }
    }

    async fn connect_stream(&self) -> Result<TcpStream> {
        match timeout(self.connect_timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(stream)) => {
                stream.set_nodelay(true)?;
                Ok(stream)
            }
            Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => {
                Err(ScorerError::HostUnavailable(self.address.clone()))
            }
            Ok(Err(e)) => Err(ScorerError::Connection(format!(
                "Failed to connect to {}: {}",
                self.address, e
            ))),
            Err(_) => Err(ScorerError::Connection(format!(
                "Timed out connecting to {}",
                self.address
            ))),
        }
    }
}

#[async_trait]
impl SimConnector for TcpSimConnector {
    async fn open(&self, app_name: &str, protocol_version: u32) -> Result<(Box<dyn SimHost>, String)> {
        let stream = self.connect_stream().await?;
        let mut host = TcpSimHost::new(stream);

        host.send(&encode_open(app_name, protocol_version)?).await?;

        let host_name = match timeout(self.connect_timeout, host.await_open_ack()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ScorerError::Connection(format!(
                    "No OPEN_ACK from {} within {:?}",
                    self.address, self.connect_timeout
                )))
            }
        };

        info!("Opened session with {} at {}", host_name, self.address);
        Ok((Box::new(host), host_name))
    }
}

/// One open TCP session with the bridge
#[derive(Debug)]
pub struct TcpSimHost {
    stream: TcpStream,
    buf: BytesMut,
    closed: bool,
}

impl TcpSimHost {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream, buf: BytesMut::with_capacity(READ_BUFFER_SIZE), closed: false }
    }

    async fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.stream.write_all(frame).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Next decodable host message, or `None` at end of stream.
    ///
    /// Cancel safe: partial frames stay in `buf` between calls.
    async fn read_message(&mut self) -> Result<Option<HostMessage>> {
        loop {
            while let Some(frame) = next_frame(&mut self.buf) {
                match decode_host_message(&frame) {
                    Ok(message) => return Ok(Some(message)),
                    Err(e) => debug!("Skipping host frame: {}", e),
                }
            }

            if self.closed {
                return Ok(None);
            }

            if self.stream.read_buf(&mut self.buf).await? == 0 {
                self.closed = true;
            }
        }
    }

    async fn await_open_ack(&mut self) -> Result<String> {
        loop {
            match self.read_message().await? {
                Some(HostMessage::OpenAck { host_name }) => return Ok(host_name),
                Some(HostMessage::Exception { code }) => {
                    return Err(ScorerError::Connection(format!("Host rejected OPEN (exception {})", code)))
                }
                Some(HostMessage::Quit) | None => {
                    return Err(ScorerError::Connection("Host closed the link during OPEN".to_string()))
                }
                Some(other) => debug!("Ignoring {:?} before OPEN_ACK", other),
            }
        }
    }
}

#[async_trait]
impl SimHost for TcpSimHost {
    async fn add_to_data_definition(&mut self, define_id: u32, field: &DataField) -> Result<()> {
        self.send(&encode_add_to_data_definition(define_id, field)?).await
    }

    async fn request_data_on_sim_object(
        &mut self,
        request_id: u32,
        define_id: u32,
        object: SimObject,
        period: Period,
    ) -> Result<()> {
        self.send(&encode_request_data(request_id, define_id, object, period)?).await
    }

    async fn next_event(&mut self) -> Result<HostEvent> {
        loop {
            let event = match self.read_message().await? {
                None => HostEvent::Close,
                Some(HostMessage::Quit) => HostEvent::Quit,
                Some(HostMessage::Exception { code }) => HostEvent::Exception { code },
                Some(HostMessage::SimObjectData { request_id, define_id, data }) => {
                    HostEvent::Data { request_id, define_id, data }
                }
                Some(HostMessage::OpenAck { .. }) => continue,
            };
            return Ok(event);
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!("Link shutdown: {}", e);
        }
        self.closed = true;
    }
}
