//! # Host Module
//!
//! Abstraction over the simulation host.
//!
//! A [`SimConnector`] opens a session and hands back an owned [`SimHost`].
//! The host is the only way to talk to the simulator: register data
//! definitions, subscribe to sim-object data, and pull the next pushed
//! [`HostEvent`]. Dropping or closing the host ends the session.

pub mod tcp;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::link::protocol::{DataField, Period, SimObject};

pub use tcp::{TcpSimConnector, TcpSimHost};

/// Everything the host can push at us
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// The host rejected one of our requests
    Exception { code: u32 },
    /// The simulator is shutting down
    Quit,
    /// The session was closed underneath us
    Close,
    /// One record for a data request
    Data { request_id: u32, define_id: u32, data: Bytes },
}

/// An open session with the simulation host
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SimHost: Send {
    /// Append one field to a data definition
    async fn add_to_data_definition(&mut self, define_id: u32, field: &DataField) -> Result<()>;

    /// Subscribe to records of a data definition
    async fn request_data_on_sim_object(
        &mut self,
        request_id: u32,
        define_id: u32,
        object: SimObject,
        period: Period,
    ) -> Result<()>;

    /// Wait for the next pushed event
    ///
    /// Must be cancel safe: the engine polls it inside `select!`.
    async fn next_event(&mut self) -> Result<HostEvent>;

    /// End the session. Calling it twice is harmless.
    async fn close(&mut self);
}

/// Opens sessions with the simulation host
#[async_trait]
pub trait SimConnector: Send + Sync {
    /// Open a session, returning the host and the name it reported
    ///
    /// # Errors
    ///
    /// `HostUnavailable` when the simulator is not running, any other
    /// variant for everything else
    async fn open(&self, app_name: &str, protocol_version: u32) -> Result<(Box<dyn SimHost>, String)>;
}
