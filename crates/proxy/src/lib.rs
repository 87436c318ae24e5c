//! Round-robin reverse-proxy dispatch engine: takes the next backend from the
//! pool, rewrites the inbound request for it and streams the exchange both
//! ways.

pub mod dispatch;
pub mod handlers;
pub mod server;
pub mod timing;

pub use dispatch::{Dispatcher, ProxyBody};
