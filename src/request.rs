use futures_io::AsyncWrite;
use std::io::Result;
use std::pin::Pin;
use std::task::{Context, Poll};

/// The method of a request.
///
/// The method is informational: it is reported back in the [`Completion`](crate::Completion) but
/// never changes how the response is parsed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
	/// `GET`.
	Get,

	/// `POST`.
	Post,
}

impl Method {
	/// Returns the method token as it appears on the request line.
	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
		}
	}
}

impl std::fmt::Display for Method {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A complete, serialized HTTP request waiting to be sent.
///
/// The application builds the request line, headers and body itself; `tickhttp` only transports
/// the bytes. Since connections are never reused, the request should normally carry
/// `Connection: close` so that the server ends the response by closing the socket.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Request {
	/// The request method.
	method: Method,

	/// The serialized request.
	bytes: Vec<u8>,

	/// How many bytes of `bytes` have been written to the transport so far.
	written: usize,
}

impl Request {
	/// Wraps a serialized request.
	///
	/// # Panics
	/// This function panics in a debug build if the request line does not start with the method
	/// token of `method`. This is a debug-build panic, not an error, because the application
	/// builds both and a mismatch is a bug in the application.
	#[must_use]
	pub fn new(method: Method, bytes: impl Into<Vec<u8>>) -> Self {
		let bytes = bytes.into();
		debug_assert_eq!(
			crate::util::request_method(&bytes),
			Some(method.as_str().as_bytes()),
			"Request line does not start with {method}"
		);
		Self {
			method,
			bytes,
			written: 0,
		}
	}

	/// Wraps a serialized `GET` request.
	#[must_use]
	pub fn get(bytes: impl Into<Vec<u8>>) -> Self {
		Self::new(Method::Get, bytes)
	}

	/// Wraps a serialized `POST` request.
	#[must_use]
	pub fn post(bytes: impl Into<Vec<u8>>) -> Self {
		Self::new(Method::Post, bytes)
	}

	/// Returns the request method.
	#[must_use]
	pub fn method(&self) -> Method {
		self.method
	}

	/// Returns the serialized request.
	#[must_use]
	pub fn as_bytes(&self) -> &[u8] {
		&self.bytes
	}

	/// Returns how many bytes are still to be sent.
	#[must_use]
	pub fn remaining(&self) -> usize {
		self.bytes.len() - self.written
	}

	/// Writes as much of the unsent request as the socket accepts without blocking.
	///
	/// Returns `Ready(Ok(()))` once every byte has been written, and `Pending` if the socket
	/// would block first; in that case calling again later resumes where this call stopped.
	///
	/// # Errors
	/// This function returns an error if writing to `socket` fails or `socket` accepts no bytes.
	pub(crate) fn poll_send<Socket: AsyncWrite + ?Sized>(
		&mut self,
		socket: Pin<&mut Socket>,
		cx: &mut Context<'_>,
	) -> Poll<Result<()>> {
		crate::util::io::poll_write_from(socket, cx, &self.bytes, &mut self.written)
	}
}
