//! WebSocket Server Module
//!
//! Streams tracker snapshots to connected demo clients.

pub mod server;

pub use server::WebSocketServer;