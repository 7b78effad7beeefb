//! rawbench - raw HTTP/1.1 benchmark server
//!
//! Incremental request parsing, a per-connection protocol state machine and
//! canned responses encoded straight into the output buffer.

pub mod config;
pub mod http;
pub mod server;
