use std::net::{SocketAddr, ToSocketAddrs};
use tracing::warn;

/// The port used when a host specification does not name one.
pub const DEFAULT_PORT: u16 = 80;

/// The host looked up when the configured host does not resolve.
const FALLBACK_HOST: &str = "localhost";

/// The resolved address of the HTTP server a pool talks to.
///
/// The address is looked up exactly once, when the pool is constructed, and never changes
/// afterwards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerAddress {
	/// The host name as given, without the port.
	host: String,

	/// The resolved socket address, or `None` if neither the host nor the fallback resolved.
	addr: Option<SocketAddr>,
}

impl ServerAddress {
	/// Parses and resolves a `host[:port]` specification.
	///
	/// If the port is absent, port 80 is used. If the port is present but not a valid port
	/// number, a warning is logged and port 80 is used. If the host does not resolve, `localhost`
	/// is tried instead. IPv4 results are preferred over IPv6 ones.
	///
	/// Resolution failure is not an error: the returned address is simply unresolved, and every
	/// request submitted against it will be rejected.
	#[must_use]
	pub fn resolve(spec: &str) -> Self {
		let (host, port) = split_host_port(spec);
		let addr = lookup(host, port).or_else(|| {
			warn!(host, "Server host did not resolve, falling back to {FALLBACK_HOST}");
			lookup(FALLBACK_HOST, port)
		});
		if addr.is_none() {
			warn!(host, "Server address is unresolved, requests will be rejected");
		}
		Self {
			host: host.to_owned(),
			addr,
		}
	}

	/// Builds an address from an already-resolved socket address.
	///
	/// The host name is the textual form of the IP address.
	#[must_use]
	pub fn from_socket_addr(addr: SocketAddr) -> Self {
		Self {
			host: addr.ip().to_string(),
			addr: Some(addr),
		}
	}

	/// Builds an address whose lookup failed.
	#[cfg(test)]
	pub(crate) fn unresolved(host: &str) -> Self {
		Self {
			host: host.to_owned(),
			addr: None,
		}
	}

	/// Returns the host name as configured.
	#[must_use]
	pub fn host(&self) -> &str {
		&self.host
	}

	/// Returns the resolved socket address, if resolution succeeded.
	#[must_use]
	pub fn socket_addr(&self) -> Option<SocketAddr> {
		self.addr
	}
}

impl From<SocketAddr> for ServerAddress {
	fn from(addr: SocketAddr) -> Self {
		Self::from_socket_addr(addr)
	}
}

/// Splits `host[:port]` at the first colon.
fn split_host_port(spec: &str) -> (&str, u16) {
	match spec.split_once(':') {
		None => (spec, DEFAULT_PORT),
		Some((host, port)) => match port.parse::<u16>() {
			Ok(port) => (host, port),
			Err(e) => {
				warn!(port, error = %e, "Invalid server port, using {DEFAULT_PORT}");
				(host, DEFAULT_PORT)
			}
		},
	}
}

/// Looks up a host, preferring an IPv4 result.
fn lookup(host: &str, port: u16) -> Option<SocketAddr> {
	let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs().ok()?.collect();
	addrs
		.iter()
		.find(|a| a.is_ipv4())
		.or_else(|| addrs.first())
		.copied()
}

#[cfg(test)]
mod test {
	use super::*;
	use std::net::{IpAddr, Ipv4Addr};

	/// Tests splitting host specifications.
	#[test]
	fn test_split_host_port() {
		assert_eq!(split_host_port("example.com"), ("example.com", 80));
		assert_eq!(split_host_port("example.com:8080"), ("example.com", 8080));
		assert_eq!(split_host_port("127.0.0.1:1"), ("127.0.0.1", 1));

		// Garbage ports fall back to the default.
		assert_eq!(split_host_port("example.com:http"), ("example.com", 80));
		assert_eq!(split_host_port("example.com:70000"), ("example.com", 80));
	}

	/// Tests resolving a literal address, which needs no DNS.
	#[test]
	fn test_resolve_literal() {
		let addr = ServerAddress::resolve("127.0.0.1:8303");
		assert_eq!(addr.host(), "127.0.0.1");
		assert_eq!(
			addr.socket_addr(),
			Some(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8303))
		);
	}

	/// Tests that an unresolvable host falls back to localhost on the same port.
	#[test]
	fn test_resolve_fallback() {
		let addr = ServerAddress::resolve("no-such-host.invalid:8080");
		assert_eq!(addr.host(), "no-such-host.invalid");
		let resolved = addr.socket_addr().expect("localhost should resolve");
		assert!(resolved.ip().is_loopback());
		assert_eq!(resolved.port(), 8080);
	}
}
