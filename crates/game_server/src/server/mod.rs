//! The server host, its shared context and the per-connection tasks.

pub mod context;
pub mod core;
pub mod handlers;

pub use context::ServerContext;
pub use self::core::GameServer;
pub use handlers::handle_connection;
