use crate::address::ServerAddress;
use crate::connection::{Connection, State};
use crate::request::{Method, Request};
use crate::response::Response;
use crate::transport::{Connect, TcpConnector};
use std::collections::VecDeque;
use std::fmt::{Debug, Display, Formatter};
use std::io::{ErrorKind, Result, Write};
use std::task::{Context, Poll, Waker};
use tracing::{debug, warn};

/// Tuning knobs for a [`Pool`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolConfig {
	/// The most connections polled by one call to [`Pool::advance`].
	///
	/// Values below 1 are treated as 1.
	pub max_polls_per_tick: usize,

	/// The size of the buffer one receive reads into, which bounds how many bytes a connection
	/// takes off the wire per poll.
	///
	/// Values below 1 are treated as 1.
	pub recv_buffer_len: usize,

	/// The longest response head, in bytes, accepted before the exchange fails.
	pub max_head_len: usize,
}

impl Default for PoolConfig {
	fn default() -> Self {
		Self {
			max_polls_per_tick: 3,
			recv_buffer_len: 1024,
			max_head_len: 16 * 1024,
		}
	}
}

/// The outcome of a request, handed to its continuation.
///
/// The `W` type parameter is the application's response sink.
#[derive(Debug)]
pub struct Completion<W> {
	/// The method of the request.
	pub method: Method,

	/// The response head on success, or what went wrong.
	///
	/// See the [`error`](crate::error) module for how failures are reported.
	pub result: Result<Response>,

	/// The sink, holding the response body on success and whatever part of it arrived on
	/// failure.
	pub sink: W,
}

impl<W> Completion<W> {
	/// Returns whether the whole response arrived.
	#[must_use]
	pub fn success(&self) -> bool {
		self.result.is_ok()
	}

	/// Returns the status code, if the response head arrived.
	#[must_use]
	pub fn status(&self) -> Option<u16> {
		self.result.as_ref().ok().map(|r| r.status)
	}
}

/// A request the pool refused to take on.
///
/// No continuation runs for a rejected request; the sink is handed straight back.
pub struct Rejected<W> {
	/// Why the request was refused.
	pub error: std::io::Error,

	/// The sink that came with the request.
	pub sink: W,
}

impl<W> Debug for Rejected<W> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Rejected")
			.field("error", &self.error)
			.finish_non_exhaustive()
	}
}

impl<W> Display for Rejected<W> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "Request rejected: {}", self.error)
	}
}

impl<W> std::error::Error for Rejected<W> {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		Some(&self.error)
	}
}

/// A request's continuation.
type Continuation<W> = Box<dyn FnOnce(Completion<W>)>;

/// A live connection and the continuation waiting on it.
struct Entry<T: crate::Transport, W: Write> {
	connection: Connection<T, W>,
	on_complete: Continuation<W>,
}

/// A set of in-flight HTTP requests to one server, advanced on the application's schedule.
///
/// Every request runs over its own connection, which is closed once the response has arrived.
/// Nothing happens in the background: connections make progress only inside
/// [`advance`](Self::advance), which the application calls regularly (for example once per game
/// tick), and which polls a bounded number of connections per call.
///
/// The `W` type parameter is the response sink type and the `C` type parameter is the connector
/// used to open transports.
pub struct Pool<W: Write = Vec<u8>, C: Connect = TcpConnector> {
	/// Where every request goes.
	address: ServerAddress,

	/// Opens a transport per request.
	connector: C,

	/// Tuning knobs.
	config: PoolConfig,

	/// Live connections, in the order they will next be polled.
	live: VecDeque<Entry<C::Transport, W>>,

	/// The buffer every receive reads into.
	scratch: Box<[u8]>,
}

impl<W: Write> Pool<W, TcpConnector> {
	/// Constructs a pool of TCP connections to a `host[:port]` server with the default
	/// configuration.
	///
	/// The host is resolved once, here; see [`ServerAddress::resolve`].
	#[must_use]
	pub fn new(host_spec: &str) -> Self {
		Self::with_config(host_spec, PoolConfig::default())
	}

	/// Constructs a pool of TCP connections to a `host[:port]` server.
	///
	/// The host is resolved once, here; see [`ServerAddress::resolve`].
	#[must_use]
	pub fn with_config(host_spec: &str, config: PoolConfig) -> Self {
		Self::with_connector(ServerAddress::resolve(host_spec), TcpConnector, config)
	}
}

impl<W: Write, C: Connect> Pool<W, C> {
	/// Constructs a pool that opens its transports with a custom connector.
	#[must_use]
	pub fn with_connector(address: ServerAddress, connector: C, config: PoolConfig) -> Self {
		let scratch = vec![0_u8; config.recv_buffer_len.max(1)].into_boxed_slice();
		Self {
			address,
			connector,
			config,
			live: VecDeque::new(),
			scratch,
		}
	}

	/// Returns the server address.
	#[must_use]
	pub fn address(&self) -> &ServerAddress {
		&self.address
	}

	/// Returns the configuration.
	#[must_use]
	pub fn config(&self) -> &PoolConfig {
		&self.config
	}

	/// Returns the number of live connections.
	#[must_use]
	pub fn len(&self) -> usize {
		self.live.len()
	}

	/// Returns whether there are no live connections.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.live.is_empty()
	}

	/// Starts a request.
	///
	/// The `request` parameter is the serialized request. The `sink` parameter receives the
	/// response body. The `on_complete` parameter runs exactly once, from inside a later call to
	/// [`advance`](Self::advance), when the exchange succeeds or fails; any state the application
	/// needs at that point should be captured by it.
	///
	/// This function only opens the connection. The request itself is sent by later calls to
	/// [`advance`](Self::advance), so failures to send are reported to `on_complete`.
	///
	/// # Errors
	/// This function returns the sink along with an error if the server address is unresolved
	/// (kind [`AddrNotAvailable`](ErrorKind::AddrNotAvailable)) or if the connector fails. In that
	/// case nothing is registered and `on_complete` never runs.
	pub fn submit(
		&mut self,
		request: Request,
		sink: W,
		on_complete: impl FnOnce(Completion<W>) + 'static,
	) -> std::result::Result<(), Rejected<W>> {
		let Some(addr) = self.address.socket_addr() else {
			warn!(host = self.address.host(), "Request rejected, server address is unresolved");
			return Err(Rejected {
				error: ErrorKind::AddrNotAvailable.into(),
				sink,
			});
		};
		let transport = match self.connector.connect(addr) {
			Ok(transport) => transport,
			Err(error) => {
				warn!(%addr, %error, "Connect failed");
				return Err(Rejected { error, sink });
			}
		};
		debug!(%addr, method = %request.method(), live = self.live.len() + 1, "Request accepted");
		let connection = Connection::new(transport, request, sink, self.config.max_head_len);
		self.live.push_back(Entry {
			connection,
			on_complete: Box::new(on_complete),
		});
		Ok(())
	}

	/// Polls some of the live connections once each.
	///
	/// At most [`max_polls_per_tick`](PoolConfig::max_polls_per_tick) connections are polled,
	/// taken from the front of the queue; those still in progress go to the back. Every live
	/// connection is therefore polled at least once every `ceil(len / max_polls_per_tick)` calls.
	/// Connections that finished have their continuations run and are dropped.
	///
	/// Returns the number of connections that finished during this call.
	pub fn advance(&mut self) -> usize {
		let mut cx = Context::from_waker(Waker::noop());
		let budget = std::cmp::min(self.live.len(), self.config.max_polls_per_tick.max(1));
		let mut finished = 0;
		for _ in 0..budget {
			let Some(mut entry) = self.live.pop_front() else {
				break;
			};
			let stage = entry.connection.state();
			match entry.connection.poll(&mut cx, &mut self.scratch) {
				Poll::Pending => self.live.push_back(entry),
				Poll::Ready(result) => {
					finished += 1;
					self.complete(entry, stage, result);
				}
			}
		}
		finished
	}

	/// Reports a finished connection to its continuation.
	///
	/// The `stage` parameter is the state the connection was in when the final poll began.
	fn complete(&self, entry: Entry<C::Transport, W>, stage: State, result: Result<()>) {
		let Entry {
			connection,
			on_complete,
		} = entry;
		let method = connection.method();
		match &result {
			Ok(()) => debug!(
				host = self.address.host(),
				%method,
				status = connection.head().map_or(0, |h| h.status),
				"Received response"
			),
			Err(error) => warn!(
				host = self.address.host(),
				%method,
				?stage,
				%error,
				"Connection error"
			),
		}
		let (head, sink) = connection.into_parts();
		let result = result.and_then(|()| head.ok_or_else(|| ErrorKind::UnexpectedEof.into()));
		on_complete(Completion {
			method,
			result,
			sink,
		});
	}
}

impl<W: Write, C: Connect> Debug for Pool<W, C> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Pool")
			.field("address", &self.address)
			.field("config", &self.config)
			.field("live", &self.live.len())
			.finish_non_exhaustive()
	}
}

impl<W: Write, C: Connect> Drop for Pool<W, C> {
	fn drop(&mut self) {
		if !self.live.is_empty() {
			debug!(
				host = self.address.host(),
				abandoned = self.live.len(),
				"Pool dropped with requests in flight"
			);
		}
	}
}
