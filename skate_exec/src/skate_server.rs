//! # Skate Server Module
//!
//! This module abstracts over the networking side of the skate executable.
//! The server accepts steering demands from the gcs client and acknowledges
//! each one, with a short receive timeout so the main loop can poll the kill
//! flag between requests.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::skate::{RcCommand, RcResponse},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};
use log::warn;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An abstraction over the networking part of the skate executable.
pub struct SkateServer {
    /// REP socket which accepts demands from the gcs
    dems_socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur in the [`SkateServer`]
#[derive(thiserror::Error, Debug)]
pub enum SkateServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send data to the client: {0}")]
    SendError(zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SkateServer {
    /// Create a new instance of the skate server.
    ///
    /// This function will not wait for a connection from the client before
    /// returning.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, SkateServerError> {
        let dems_socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            recv_timeout: 200,
            send_timeout: 10,
            ..Default::default()
        };

        let dems_socket = MonitoredSocket::new(
            ctx,
            zmq::REP,
            dems_socket_options,
            &params.skate_dems_endpoint,
        )
        .map_err(SkateServerError::SocketError)?;

        Ok(Self { dems_socket })
    }

    /// Retrieve a steering demand from the client.
    ///
    /// The caller MUST answer each returned demand with
    /// [`send_response`](SkateServer::send_response) before the next call.
    ///
    /// `None` is returned if no demand arrived within the receive timeout.
    /// A demand which cannot be parsed is answered `DemsInvalid` here to
    /// keep the request/reply pairing intact, and `None` is returned.
    pub fn get_demands(&mut self) -> Option<RcCommand> {
        let msg = match self.dems_socket.recv_msg(0) {
            Ok(m) => m,
            Err(_) => return None,
        };

        match serde_json::from_str(msg.as_str().unwrap_or("")) {
            Ok(d) => Some(d),
            Err(e) => {
                warn!("Could not deserialize demands: {}", e);
                if let Err(e) = self.send_response(&RcResponse::DemsInvalid) {
                    warn!("Could not reject the malformed demand: {}", e);
                }
                None
            }
        }
    }

    /// Send a response to the client based on the received demand.
    pub fn send_response(&mut self, response: &RcResponse) -> Result<(), SkateServerError> {
        let resp_str = serde_json::to_string(response)
            .expect("Response serialization failed. This should not happen");

        match self.dems_socket.send(&resp_str, 0) {
            Ok(_) => Ok(()),
            Err(e) => Err(SkateServerError::SendError(e)),
        }
    }
}
