//! The byte streams connections run over.
//!
//! A [`Transport`] is a non-blocking byte stream. Whenever an operation cannot make progress
//! without blocking, it returns [`Poll::Pending`]; it does not arrange for the task to be woken,
//! because a [`Pool`](crate::Pool) is driven by its caller's tick loop rather than by readiness
//! events.

use futures_io::{AsyncRead, AsyncWrite};
use std::io::{ErrorKind, Read as _, Result, Write as _};
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A non-blocking byte stream to an HTTP server.
pub trait Transport: AsyncRead + AsyncWrite + Unpin {
	/// Checks whether the stream has finished connecting.
	///
	/// Returns `Ready(Ok(()))` once the stream is connected and usable, `Pending` while the
	/// connection attempt is still in progress, and `Ready(Err(_))` if the attempt failed.
	///
	/// The default implementation is for streams that are connected from the moment they exist.
	///
	/// # Errors
	/// This function returns an error if the connection attempt failed.
	fn poll_connected(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
		let _ = cx;
		Ok(()).into()
	}
}

/// Something that opens transports to a server address.
pub trait Connect {
	/// The type of transport opened.
	type Transport: Transport;

	/// Starts connecting to `addr`.
	///
	/// The returned transport may still be connecting; the connection checks
	/// [`poll_connected`](Transport::poll_connected) before sending.
	///
	/// # Errors
	/// This function returns an error if the socket cannot be created or the connection attempt
	/// fails immediately.
	fn connect(&self, addr: SocketAddr) -> Result<Self::Transport>;
}

/// Opens non-blocking TCP connections.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpConnector;

impl Connect for TcpConnector {
	type Transport = TcpTransport;

	fn connect(&self, addr: SocketAddr) -> Result<TcpTransport> {
		Ok(TcpTransport {
			stream: mio::net::TcpStream::connect(addr)?,
			connected: false,
		})
	}
}

/// A non-blocking TCP stream.
///
/// The connection attempt is started when the stream is created and completes in the
/// background; its outcome is picked up by [`poll_connected`](Transport::poll_connected).
#[derive(Debug)]
pub struct TcpTransport {
	/// The underlying socket.
	stream: mio::net::TcpStream,

	/// Whether the connection attempt is known to have succeeded.
	connected: bool,
}

impl Transport for TcpTransport {
	fn poll_connected(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
		if self.connected {
			return Ok(()).into();
		}
		if let Some(e) = self.stream.take_error()? {
			return Err(e).into();
		}
		match self.stream.peer_addr() {
			Ok(_) => {
				self.connected = true;
				Ok(()).into()
			}
			Err(e) if e.kind() == ErrorKind::NotConnected => Poll::Pending,
			Err(e) => Err(e).into(),
		}
	}
}

impl AsyncRead for TcpTransport {
	fn poll_read(
		self: Pin<&mut Self>,
		_cx: &mut Context<'_>,
		buf: &mut [u8],
	) -> Poll<Result<usize>> {
		non_blocking(self.get_mut().stream.read(buf))
	}
}

impl AsyncWrite for TcpTransport {
	fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize>> {
		non_blocking(self.get_mut().stream.write(buf))
	}

	fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
		non_blocking(self.get_mut().stream.flush())
	}

	fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
		non_blocking(self.get_mut().stream.shutdown(std::net::Shutdown::Write))
	}
}

/// Translates the result of a non-blocking socket call into a poll result.
///
/// Would-block and interrupted calls are `Pending`; everything else is ready.
fn non_blocking<T>(result: Result<T>) -> Poll<Result<T>> {
	match result {
		Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
			Poll::Pending
		}
		result => result.into(),
	}
}
