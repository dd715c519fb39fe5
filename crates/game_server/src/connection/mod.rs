//! Connection management for client connections.
//!
//! This module handles the lifecycle of client connections: phases, outbound
//! sends, inbound framing and the live connection set.

pub mod framing;
pub mod manager;
pub mod phase;
pub mod session;

pub use framing::{FrameDecoder, InboundFrame};
pub use manager::ConnectionManager;
pub use phase::{Phase, PhaseSet};
pub use session::{AccountId, Connection};

use std::fmt;

/// Unique identifier of a client connection for the lifetime of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
