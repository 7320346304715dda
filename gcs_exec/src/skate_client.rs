//! # Skate Client
//!
//! Networking abstraction used by the gcs to send steering demands to the
//! skate process.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::skate::{RcCommand, RcResponse},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct SkateClient {
    dems_socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum SkateClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("The client is not connected to the server")]
    NotConnected,

    #[error("Could not send demands to the server: {0}")]
    SendError(zmq::Error),

    #[error("Could not recieve a message from the server: {0}")]
    RecvError(zmq::Error),

    #[error("Could not serialize the demands: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not deserialize the response from the server: {0}")]
    DeserializeError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SkateClient {
    /// Create a new instance of the skate client.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, SkateClientError> {
        // Short timeouts: a missed demand is recoverable, a blocked control
        // loop is not
        let dems_socket_options = SocketOptions {
            connect_timeout: 1000,
            linger: 1,
            recv_timeout: 100,
            send_timeout: 10,
            req_correlate: true,
            req_relaxed: true,
            block_on_first_connect: false,
            ..Default::default()
        };

        let dems_socket = MonitoredSocket::new(
            ctx,
            zmq::REQ,
            dems_socket_options,
            &params.skate_dems_endpoint,
        )
        .map_err(SkateClientError::SocketError)?;

        Ok(Self { dems_socket })
    }

    /// Send a steering demand to the skate.
    ///
    /// Returns the skate's response, or an error if the demand could not be
    /// delivered. Delivery failure means the outcome is unknown; the caller
    /// logs it and does not retry.
    pub fn send_demands(&mut self, demands: &RcCommand) -> Result<RcResponse, SkateClientError> {
        if !self.dems_socket.connected() {
            return Err(SkateClientError::NotConnected);
        }

        let dems_str =
            serde_json::to_string(demands).map_err(SkateClientError::SerializationError)?;

        self.dems_socket
            .send(&dems_str, 0)
            .map_err(SkateClientError::SendError)?;

        let msg = self
            .dems_socket
            .recv_msg(0)
            .map_err(SkateClientError::RecvError)?;

        serde_json::from_str(msg.as_str().unwrap_or(""))
            .map_err(SkateClientError::DeserializeError)
    }
}
