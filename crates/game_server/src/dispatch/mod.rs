//! Routing of decoded packets to async handlers.
//!
//! Handlers are registered per packet type together with the set of phases
//! they accept. The table also carries the connection lifecycle hooks:
//! new-connection filters, handshake-complete and close.

pub mod handler;
pub mod table;

pub use handler::{HandlerResult, PacketContext, PacketHandler, TypedPacketHandler};
pub use table::{Dispatch, DispatchTable};
