//! Chrome DevTools Protocol (CDP) client.
//!
//! Connects to Chrome over WebSocket and speaks the CDP JSON-RPC protocol.
//! The controller only needs the Page, Runtime, Network, Emulation and
//! Input domains; everything selector- or DOM-tree-based is deliberately
//! absent because all interaction is coordinate-driven.

mod client;
mod error;
mod protocol;
mod session;

pub use client::CdpClient;
pub use error::CdpError;
pub use protocol::*;
pub use session::PageSession;
