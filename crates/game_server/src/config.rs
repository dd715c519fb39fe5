//! Server configuration types and defaults.
//!
//! This module contains the server configuration structure and the default
//! values used to initialize the game server.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Configuration structure for the game server.
///
/// Contains the network settings, connection limits and the pacing of the
/// fixed-step simulation loop.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent connections allowed
    pub max_connections: usize,

    /// Outbound frames buffered per connection before sends start failing
    pub send_queue_capacity: usize,

    /// Fixed simulation step
    pub simulation_step: Duration,

    /// Largest amount of accumulated time processed in one catch-up burst
    pub max_backlog: Duration,

    /// Whether to set SO_REUSEPORT on the listening socket
    pub use_reuse_port: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 13001)),
            max_connections: 1000,
            send_queue_capacity: 256,
            simulation_step: Duration::from_millis(10),
            max_backlog: Duration::from_millis(500),
            use_reuse_port: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_run_at_one_hundred_hertz() {
        let config = ServerConfig::default();
        assert_eq!(config.simulation_step, Duration::from_millis(10));
        assert_eq!(config.max_backlog, Duration::from_millis(500));
        assert_eq!(config.bind_address.port(), 13001);
    }
}
