//! HTTP protocol implementation.
//!
//! This layer turns bytes on a [`Transport`](crate::server::transport::Transport)
//! into exactly one response per connection:
//!
//! - **`parser`**: byte-at-a-time request parser (request line, query,
//!   fragment, version, headers; HTTP/0.9 simple requests)
//! - **`request`**: parsed request representation
//! - **`response`**: status codes and response representation
//! - **`writer`**: serializes and sends a response, absorbing short writes
//! - **`connection`**: the per-connection worker state machine
//!
//! # Connection State Machine
//!
//! ```text
//!        +-------------+
//!        |   Reading   |  <- parse the request off the wire
//!        +------+------+
//!               | parsed (or classified parse failure)
//!               v
//!        +-------------+
//!        | Processing  |  <- resolve status + cache entry
//!        +------+------+
//!               | response ready
//!               v
//!        +-------------+
//!        |   Writing   |  <- framed send to the client
//!        +------+------+
//!               v
//!        +-------------+
//!        |   Closed    |
//!        +-------------+
//! ```
//!
//! The served subset has no keep-alive: `Writing` always transitions to
//! `Closed`.

pub mod connection;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
