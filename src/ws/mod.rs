//! WebSocket infrastructure for real-time prediction updates.
//!
//! Each dashboard connection subscribes to the private channel of the user
//! named by its token; the notifier publishes into that channel only.

mod handler;
pub mod registry;

pub use handler::ws_handler;
pub use registry::ChannelRegistry;
