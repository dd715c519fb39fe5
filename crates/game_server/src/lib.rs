//! # Game Server - Network Core
//!
//! The network-facing core of a persistent-world game server. It owns client
//! connections, turns their byte streams into typed packets and hands those to
//! phase-gated async handlers, while a fixed-step loop advances the world.
//!
//! The core contains **no game logic**. Games supply:
//!
//! * a [`SchemaRegistry`](realm_codec::SchemaRegistry) describing their packets
//! * a [`DispatchTable`] with handlers and lifecycle hooks
//! * a [`World`] implementation advanced by the simulation loop
//!
//! ## Message Flow
//!
//! 1. Bytes arrive on a connection's receive task
//! 2. The first byte selects an inbound schema; the frame is read once all of
//!    its fixed-size body has arrived
//! 3. The decoded packet is routed to its handler if the connection's
//!    [`Phase`] allows it
//! 4. Handlers reply through [`Connection::send`] or broadcast through the
//!    [`ConnectionManager`]; a writer task per connection drains the queue
//!
//! ## Error Handling
//!
//! * Unknown tags and malformed frames close the offending connection
//! * Handler failures are logged; the connection stays open unless the
//!   handler returns [`HandlerError::Close`]
//! * Schema problems are fatal at startup
//!
//! ## Concurrency
//!
//! One task per connection receives and dispatches, one writes. Frames of one
//! connection are handled in order, one at a time. The simulation runs in its
//! own task. The live set is a `DashMap`.

pub use config::ServerConfig;
pub use connection::{AccountId, Connection, ConnectionId, ConnectionManager, Phase, PhaseSet};
pub use dispatch::{Dispatch, DispatchTable, HandlerResult, PacketContext};
pub use error::{HandlerError, ServerError, WorldError};
pub use server::{handle_connection, GameServer, ServerContext};
pub use simulation::{Accumulator, TickOutcome};
pub use world::{EntityId, World};

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod server;
pub mod simulation;
pub mod world;
