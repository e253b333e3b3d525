//! The peer sync boundary
//!
//! The wire message vocabulary, the reaction table that drives the
//! ledger from peer messages, and the async single-writer engine.
//! Transport mechanics (sockets, framing, peer discovery) live with an
//! external collaborator.

pub mod message;
pub mod node;
pub mod sync;

pub use message::{Message, ProtocolError};
pub use node::{Node, OUTBOUND_BUFFER};
pub use sync::{react, Reaction};
