use crate::error::InvalidData;
use crate::request::{Method, Request};
use crate::response::body::Body;
use crate::response::headers::{self, Head};
use crate::response::Response;
use crate::transport::Transport;
use futures_core::ready;
use futures_io::{AsyncRead as _, AsyncWrite as _};
use std::io::{ErrorKind, Result, Write};
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::trace;

/// Where a connection is in its single request/response exchange.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum State {
	/// The transport is still connecting.
	Connecting,

	/// The request is being written to the transport.
	Sending,

	/// The request has been sent; the response head has not fully arrived.
	AwaitingHead,

	/// The response head has been parsed; body bytes are streaming into the sink.
	StreamingBody,

	/// The whole response arrived.
	Succeeded,

	/// The exchange failed.
	Failed,
}

/// One HTTP request/response exchange over its own transport.
///
/// The `T` type parameter is the transport and the `W` type parameter is the application's
/// response sink.
#[derive(Debug)]
pub(crate) struct Connection<T: Transport, W: Write> {
	/// The transport, exclusively owned and closed when the connection is dropped.
	transport: T,

	/// The request, along with how much of it has been sent.
	request: Request,

	/// Received bytes that have not yet been recognized as a complete response head.
	head_buffer: Vec<u8>,

	/// How many bytes at the start of `head_buffer` are known not to end the head.
	searched: usize,

	/// The longest response head accepted.
	max_head_len: usize,

	/// The parsed response head, once it has arrived.
	head: Option<Response>,

	/// The application's sink.
	body: Body<W>,

	/// The current state.
	state: State,
}

impl<T: Transport, W: Write> Connection<T, W> {
	/// Constructs a new `Connection`.
	///
	/// The `transport` parameter is a transport that is connected or still connecting to the
	/// server. The `request` parameter is the request to send. The `sink` parameter receives the
	/// response body. The `max_head_len` parameter bounds how many bytes the response head may
	/// occupy.
	pub(crate) fn new(transport: T, request: Request, sink: W, max_head_len: usize) -> Self {
		Self {
			transport,
			request,
			head_buffer: Vec::new(),
			searched: 0,
			max_head_len,
			head: None,
			body: Body::new(sink),
			state: State::Connecting,
		}
	}

	/// Returns the current state.
	pub(crate) fn state(&self) -> State {
		self.state
	}

	/// Returns the method of the request.
	pub(crate) fn method(&self) -> Method {
		self.request.method()
	}

	/// Returns the response head, if it has arrived.
	pub(crate) fn head(&self) -> Option<&Response> {
		self.head.as_ref()
	}

	/// Advances the exchange as far as it can go without blocking, receiving at most once.
	///
	/// The `scratch` parameter is the buffer a single receive reads into; its length bounds how
	/// many bytes one poll can take off the wire.
	///
	/// Returns `Pending` while the exchange is still in progress, `Ready(Ok(()))` once the server
	/// has closed the connection after sending exactly the announced body, and `Ready(Err(_))` if
	/// the exchange failed. After returning `Ready`, the connection is finished; polling it again
	/// reports an error of kind [`NotConnected`](ErrorKind::NotConnected).
	///
	/// # Errors
	/// This function returns an error if connecting, sending, receiving or writing to the sink
	/// fails, if the server closes the connection before the whole response arrived, or, with
	/// kind [`InvalidData`](ErrorKind::InvalidData), if the response is invalid or unsupported.
	pub(crate) fn poll(&mut self, cx: &mut Context<'_>, scratch: &mut [u8]) -> Poll<Result<()>> {
		if matches!(self.state, State::Succeeded | State::Failed) {
			return Err(ErrorKind::NotConnected.into()).into();
		}
		let result = ready!(self.poll_exchange(cx, scratch));
		self.state = if result.is_ok() {
			State::Succeeded
		} else {
			State::Failed
		};
		result.into()
	}

	/// Runs the state machine of a connection that is not yet finished.
	fn poll_exchange(&mut self, cx: &mut Context<'_>, scratch: &mut [u8]) -> Poll<Result<()>> {
		if self.state == State::Connecting {
			ready!(self.transport.poll_connected(cx))?;
			self.state = State::Sending;
		}

		if self.state == State::Sending {
			ready!(self.request.poll_send(Pin::new(&mut self.transport), cx))?;
			ready!(Pin::new(&mut self.transport).poll_flush(cx))?;
			trace!(bytes = self.request.as_bytes().len(), "Request sent");
			self.state = State::AwaitingHead;
		}

		let bytes_read = ready!(Pin::new(&mut self.transport).poll_read(cx, scratch))?;
		trace!(bytes = bytes_read, state = ?self.state, "Received");
		if bytes_read == 0 {
			// The server closed the connection. That is how the response ends, so see whether it
			// ended in the right place.
			return match &self.head {
				None => Err(ErrorKind::UnexpectedEof.into()).into(),
				Some(head) => {
					trace!(
						received = self.body.received(),
						expected = head.content_length,
						"Server closed connection"
					);
					self.body.finish(head.content_length).into()
				}
			};
		}

		let data = &scratch[..bytes_read];
		if self.head.is_none() {
			self.receive_head(data)?;
		} else {
			self.body.write(data)?;
		}
		Poll::Pending
	}

	/// Accumulates bytes of the response head, parsing it once the blank line arrives.
	///
	/// Any bytes following the head are the start of the body and go to the sink.
	fn receive_head(&mut self, data: &[u8]) -> Result<()> {
		self.head_buffer.extend_from_slice(data);
		loop {
			let Some(head_len) = crate::util::head_length(&self.head_buffer, self.searched) else {
				if self.head_buffer.len() > self.max_head_len {
					return Err(InvalidData::ResponseHeadersTooLong.into());
				}
				self.searched = self.head_buffer.len();
				return Ok(());
			};
			if head_len > self.max_head_len {
				return Err(InvalidData::ResponseHeadersTooLong.into());
			}

			match headers::parse(&self.head_buffer[..head_len])? {
				Head::Interim(status) => {
					// An informational response. Discard it and wait for the real one, which may
					// already be in the buffer.
					trace!(status, "Skipped interim response");
					let _ = self.head_buffer.drain(..head_len);
					self.searched = 0;
				}
				Head::Final(response) => {
					self.body.write(&self.head_buffer[head_len..])?;
					self.head_buffer = Vec::new();
					self.head = Some(response);
					self.state = State::StreamingBody;
					return Ok(());
				}
			}
		}
	}

	/// Destroys the connection, returning the response head, if any, and the sink.
	pub(crate) fn into_parts(self) -> (Option<Response>, W) {
		(self.head, self.body.into_sink())
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::transport::script::Script;
	use std::task::Waker;

	const HELLO: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello";

	fn connection(script: Script) -> Connection<Script, Vec<u8>> {
		Connection::new(
			script,
			Request::get(&b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n"[..]),
			Vec::new(),
			16384,
		)
	}

	/// Polls until the connection finishes, returning its result and how many polls it took.
	fn drive(conn: &mut Connection<Script, Vec<u8>>, scratch: &mut [u8]) -> (Result<()>, usize) {
		let mut cx = Context::from_waker(Waker::noop());
		let mut polls = 0;
		loop {
			polls += 1;
			assert!(polls < 10_000, "connection never finished");
			if let Poll::Ready(result) = conn.poll(&mut cx, scratch) {
				return (result, polls);
			}
		}
	}

	/// Runs a whole exchange over a script with a 1024-byte scratch buffer.
	fn run(script: Script) -> (Result<()>, Option<Response>, Vec<u8>) {
		let mut conn = connection(script);
		let (result, _) = drive(&mut conn, &mut [0_u8; 1024]);
		let (head, body) = conn.into_parts();
		(result, head, body)
	}

	/// Tests a response whose head and body arrive in a single receive.
	#[test]
	fn test_single_read() {
		let script = Script::new().read(HELLO).eof();
		let log = script.log();
		let mut conn = connection(script);
		let (result, polls) = drive(&mut conn, &mut [0_u8; 1024]);
		result.unwrap();
		assert_eq!(polls, 2);
		assert_eq!(conn.state(), State::Succeeded);
		assert_eq!(conn.method(), Method::Get);
		assert_eq!(conn.head().unwrap().status, 200);
		let (head, body) = conn.into_parts();
		assert_eq!(head.unwrap().content_length, 5);
		assert_eq!(body, b"hello");
		let log = log.borrow();
		assert_eq!(log.sent, b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n");
		assert!(log.flushed);
	}

	/// Tests that the body is the same wherever the response is split between receives.
	#[test]
	fn test_split_anywhere() {
		for split in 1..HELLO.len() {
			let (result, head, body) = run(
				Script::new()
					.read(&HELLO[..split])
					.block()
					.read(&HELLO[split..])
					.eof(),
			);
			assert!(result.is_ok(), "split at {split} failed: {result:?}");
			assert_eq!(head.unwrap().status, 200);
			assert_eq!(body, b"hello", "split at {split}");
		}
	}

	/// Tests a response trickling in one byte per receive, with would-blocks in between.
	#[test]
	fn test_byte_at_a_time() {
		let mut script = Script::new();
		for b in HELLO {
			script = script.read(std::slice::from_ref(b)).block();
		}
		let (result, _, body) = run(script.eof());
		result.unwrap();
		assert_eq!(body, b"hello");
	}

	/// Tests a scratch buffer smaller than the head.
	#[test]
	fn test_small_scratch() {
		let mut conn = connection(Script::new().read(HELLO).eof());
		let (result, polls) = drive(&mut conn, &mut [0_u8; 4]);
		result.unwrap();
		assert_eq!(polls, HELLO.len().div_ceil(4) + 1);
		assert_eq!(conn.into_parts().1, b"hello");
	}

	/// Tests an empty body followed by an immediate close.
	#[test]
	fn test_empty_body() {
		let (result, head, body) =
			run(Script::new().read(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").eof());
		result.unwrap();
		assert_eq!(head.unwrap().content_length, 0);
		assert!(body.is_empty());
	}

	/// Tests the server closing the connection before the whole body arrived.
	#[test]
	fn test_truncated_body() {
		let (result, head, body) = run(
			Script::new()
				.read(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nhel")
				.read(b"lo")
				.eof(),
		);
		assert_eq!(result.unwrap_err().kind(), ErrorKind::UnexpectedEof);
		assert!(head.is_some());
		assert_eq!(body, b"hello");
	}

	/// Tests the server sending more than it announced.
	#[test]
	fn test_body_too_long() {
		let (result, _, _) = run(
			Script::new()
				.read(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhello")
				.eof(),
		);
		assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidData);
	}

	/// Tests a garbage status line.
	#[test]
	fn test_malformed_status_line() {
		let mut conn = connection(Script::new().read(b"GARBAGE\r\n\r\n"));
		let (result, polls) = drive(&mut conn, &mut [0_u8; 1024]);
		assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidData);
		assert_eq!(polls, 1);
		assert_eq!(conn.state(), State::Failed);
		assert!(conn.head().is_none());
	}

	/// Tests a response without a length.
	#[test]
	fn test_missing_content_length() {
		let (result, head, _) = run(Script::new().read(b"HTTP/1.1 200 OK\r\n\r\nbody").eof());
		assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidData);
		assert!(head.is_none());
	}

	/// Tests the server closing the connection before the head arrived.
	#[test]
	fn test_eof_in_head() {
		let (result, head, _) = run(Script::new().read(b"HTTP/1.1 200 OK\r\n").eof());
		assert_eq!(result.unwrap_err().kind(), ErrorKind::UnexpectedEof);
		assert!(head.is_none());
	}

	/// Tests a head that never ends.
	#[test]
	fn test_head_too_long() {
		let mut conn = Connection::new(
			Script::new()
				.read(b"HTTP/1.1 200 OK\r\n")
				.read(b"X-Filler: aaaaaaaaaaaaaaaaaaaaaaaa\r\n"),
			Request::get(&b"GET / HTTP/1.1\r\n\r\n"[..]),
			Vec::new(),
			32,
		);
		let (result, _) = drive(&mut conn, &mut [0_u8; 1024]);
		assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidData);
	}

	/// Tests that would-block is neither progress nor an error.
	#[test]
	fn test_would_block() {
		let script = Script::new().block().block();
		let log = script.log();
		let mut conn = connection(script);
		let mut cx = Context::from_waker(Waker::noop());
		let mut scratch = [0_u8; 1024];
		assert!(conn.poll(&mut cx, &mut scratch).is_pending());
		assert_eq!(conn.state(), State::AwaitingHead);
		assert!(conn.poll(&mut cx, &mut scratch).is_pending());
		assert_eq!(conn.state(), State::AwaitingHead);
		assert_eq!(log.borrow().reads, 2);
	}

	/// Tests a receive failure.
	#[test]
	fn test_receive_error() {
		let (result, _, body) = run(
			Script::new()
				.read(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhe")
				.fail(ErrorKind::ConnectionReset),
		);
		assert_eq!(result.unwrap_err().kind(), ErrorKind::ConnectionReset);
		assert_eq!(body, b"he");
	}

	/// Tests an informational response ahead of the real one.
	#[test]
	fn test_interim_response() {
		let (result, head, body) = run(
			Script::new()
				.read(b"HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 201 Created\r\n")
				.read(b"Content-Length: 2\r\n\r\nok")
				.eof(),
		);
		result.unwrap();
		assert_eq!(head.unwrap().status, 201);
		assert_eq!(body, b"ok");
	}

	/// Tests waiting for the connect to finish before sending.
	#[test]
	fn test_connect_pending() {
		let script = Script::new().connect_pending(2).read(HELLO).eof();
		let log = script.log();
		let mut conn = connection(script);
		let mut cx = Context::from_waker(Waker::noop());
		let mut scratch = [0_u8; 1024];
		assert!(conn.poll(&mut cx, &mut scratch).is_pending());
		assert!(conn.poll(&mut cx, &mut scratch).is_pending());
		assert_eq!(conn.state(), State::Connecting);
		assert!(log.borrow().sent.is_empty());
		let (result, _) = drive(&mut conn, &mut scratch);
		result.unwrap();
		assert!(!log.borrow().sent.is_empty());
	}

	/// Tests a connect that fails in the background.
	#[test]
	fn test_connect_error() {
		let (result, _, _) = run(
			Script::new()
				.connect_pending(1)
				.connect_error(ErrorKind::ConnectionRefused),
		);
		assert_eq!(result.unwrap_err().kind(), ErrorKind::ConnectionRefused);
	}

	/// Tests a request that goes out over several polls.
	#[test]
	fn test_send_resumed() {
		let script = Script::new().write_chunk(5).read(HELLO).eof();
		let log = script.log();
		let mut conn = connection(script);
		let mut cx = Context::from_waker(Waker::noop());
		let mut scratch = [0_u8; 1024];
		assert!(conn.poll(&mut cx, &mut scratch).is_pending());
		assert_eq!(conn.state(), State::Sending);
		assert_eq!(log.borrow().sent, b"GET /");
		let (result, _) = drive(&mut conn, &mut scratch);
		result.unwrap();
		let log = log.borrow();
		assert_eq!(log.sent, b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n");
		assert!(log.flushed);
	}

	/// Tests a send failure.
	#[test]
	fn test_send_error() {
		let mut conn = connection(Script::new().write_error(ErrorKind::BrokenPipe).read(HELLO));
		let (result, _) = drive(&mut conn, &mut [0_u8; 1024]);
		assert_eq!(result.unwrap_err().kind(), ErrorKind::BrokenPipe);
		assert_eq!(conn.state(), State::Failed);
	}

	/// Tests that a finished connection stays finished.
	#[test]
	fn test_poll_after_finish() {
		let mut conn = connection(Script::new().read(HELLO).eof());
		let mut scratch = [0_u8; 1024];
		drive(&mut conn, &mut scratch).0.unwrap();
		let mut cx = Context::from_waker(Waker::noop());
		match conn.poll(&mut cx, &mut scratch) {
			Poll::Ready(Err(e)) => assert_eq!(e.kind(), ErrorKind::NotConnected),
			other => panic!("Expected NotConnected, got {other:?}"),
		}
		assert_eq!(conn.state(), State::Succeeded);
	}
}
