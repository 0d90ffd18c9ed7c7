//! Server layer: the listening socket, TLS context, process signals, and
//! the byte transport handed to each connection worker.

pub mod listener;
pub mod signals;
pub mod tls;
pub mod transport;
