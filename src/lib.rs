#![forbid(unsafe_code)]
#![warn(future_incompatible, nonstandard_style, rust_2018_idioms, unused)]
#![warn(
	deprecated_in_future,
	missing_debug_implementations,
	missing_docs,
	trivial_casts,
	trivial_numeric_casts,
	unused_crate_dependencies,
	unused_import_braces,
	unused_qualifications,
	unused_results
)]
#![warn(clippy::pedantic, clippy::cargo)]
// Disabled because we frequently mix u64 and usize, where the former is used for message body
// lengths and the latter for in-memory buffer sizes.
#![allow(clippy::cast_possible_truncation)]

//! Tick-driven HTTP/1.1 client pool
//!
//! This crate is a small HTTP/1.1 client for programs that already run a fixed-rate loop, such
//! as game servers, and want to make a handful of HTTP requests without threads or an async
//! runtime. Requests are submitted to a [`Pool`], which opens one non-blocking connection per
//! request. Nothing happens in the background: each call to [`Pool::advance`] polls a bounded
//! number of connections once, sending request bytes, receiving response bytes, and running the
//! continuation of every request that finished.
//!
//! The application builds the raw request bytes itself. Responses must be framed by a
//! `Content-Length` header and end with the server closing the connection; chunked encoding,
//! keep-alive, redirects and TLS are not supported.
//!
//! # Example
//! ```no_run
//! use std::time::Duration;
//!
//! let mut pool: tickhttp::Pool = tickhttp::Pool::new("example.com:80");
//! let request = tickhttp::Request::get(
//!		&b"GET / HTTP/1.1\r\nHost: example.com\r\nConnection: close\r\n\r\n"[..],
//! );
//! pool.submit(request, Vec::new(), |completion| {
//!		if completion.success() {
//!			println!("{:?}: {} bytes", completion.status(), completion.sink.len());
//!		} else {
//!			println!("failed: {:?}", completion.result);
//!		}
//! })
//! .unwrap();
//!
//! // The application's main loop.
//! while !pool.is_empty() {
//!		let _ = pool.advance();
//!		std::thread::sleep(Duration::from_millis(20));
//! }
//! ```

mod address;
mod connection;
#[cfg(feature = "detailed-errors")]
pub mod error;
#[cfg(not(feature = "detailed-errors"))]
mod error;
mod pool;
mod request;
mod response;
mod transport;
mod util;

pub use address::{ServerAddress, DEFAULT_PORT};
pub use pool::{Completion, Pool, PoolConfig, Rejected};
pub use request::{Method, Request};
pub use response::{HeaderMap, Response};
pub use transport::{Connect, TcpConnector, TcpTransport, Transport};
