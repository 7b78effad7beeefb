//! HTTP/1.1 request pipeline.
//!
//! This module turns a raw byte stream into canned responses with as little
//! copying and allocation as possible.
//!
//! # Architecture
//!
//! - **`cursor`**: consumed/examined watermarks over buffered input
//! - **`request`**: method, version and per-connection path storage
//! - **`parser`**: incremental request-line and header-block parsers
//! - **`context`**: the per-connection parse state machine
//! - **`response`**: route selection and the zero-copy response encoder
//! - **`date`**: the shared, periodically refreshed `Date` header
//! - **`writer`**: the connection output buffer
//! - **`connection`**: the read → parse → respond loop
//!
//! # Request State Machine
//!
//! Each connection tracks the request currently arriving:
//!
//! ```text
//!        ┌─────────────┐
//!   ┌───▶│  StartLine  │ ← Wait for a complete request line
//!   │    └──────┬──────┘
//!   │           │ Request line parsed (method + path stored)
//!   │           ▼
//!   │    ┌─────────────┐
//!   │    │   Headers   │ ← Consume header lines up to the blank line
//!   │    └──────┬──────┘
//!   │           │ Blank line consumed
//!   │           ▼
//!   │    ┌─────────────┐
//!   │    │    Body     │ ← Request ready: encode + flush the response
//!   │    └──────┬──────┘
//!   │           │ Response flushed
//!   └───────────┘ (same read cycle when more requests are buffered)
//! ```
//!
//! Malformed input or end-of-stream in the middle of a request closes the
//! connection without a response.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rawbench::http::connection::{Connection, ConnectionLimits};
//! use rawbench::http::date::DateCache;
//! use tokio::net::TcpListener;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     let dates = Arc::new(DateCache::new());
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let mut conn = Connection::new(
//!             socket,
//!             Arc::clone(&dates),
//!             shutdown_rx.clone(),
//!             ConnectionLimits::default(),
//!         );
//!         tokio::spawn(async move {
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod connection;
pub mod context;
pub mod cursor;
pub mod date;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
