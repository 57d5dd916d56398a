//! Connection and session bookkeeping
//!
//! The registry maps connection handles to authenticated players and to their
//! current matchmaking or room binding; the router dispatches inbound frames.

pub mod registry;
pub mod router;

pub use registry::{Binding, ConnectionRegistry};
pub use router::SessionRouter;
