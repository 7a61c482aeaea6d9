pub mod io;

/// The blank line that ends an HTTP response head.
pub const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Checks whether a byte is a `tchar` (token character).
pub fn is_tchar(b: u8) -> bool {
	b.is_ascii_alphanumeric()
		|| matches!(
			b,
			b'!' | b'#'
				| b'$' | b'%' | b'&'
				| b'\'' | b'*' | b'+'
				| b'-' | b'.' | b'^'
				| b'_' | b'`' | b'|'
				| b'~'
		)
}

/// Checks whether a byte string is a token.
pub fn is_token(name: &[u8]) -> bool {
	!name.is_empty() && name.iter().all(|&b| is_tchar(b))
}

/// Returns the method token at the start of a raw request, if the request line has one.
pub fn request_method(request: &[u8]) -> Option<&[u8]> {
	let end = request.iter().position(|&b| b == b' ')?;
	let method = &request[..end];
	is_token(method).then_some(method)
}

/// Scans the buffer for the end of the response head.
///
/// The `searched` parameter is how many bytes of `buffer` were already scanned by an earlier
/// call without finding a terminator; only the region that could hold a terminator ending in the
/// new bytes is examined again.
///
/// If the head is complete, returns `Some(n)` where `n` is the length of the head in bytes,
/// including the final CR LF CR LF. Otherwise returns `None`.
pub fn head_length(buffer: &[u8], searched: usize) -> Option<usize> {
	let start = searched.saturating_sub(HEAD_TERMINATOR.len() - 1);
	buffer[start..]
		.windows(HEAD_TERMINATOR.len())
		.position(|w| w == HEAD_TERMINATOR)
		.map(|pos| start + pos + HEAD_TERMINATOR.len())
}

#[cfg(test)]
mod test {
	use super::*;

	/// Tests the head_length function.
	#[test]
	fn test_head_length() {
		// Basic complete head.
		assert_eq!(head_length(b"H:V\r\nH:V\r\n\r\n", 0), Some(12));

		// Body bytes after the head do not count.
		assert_eq!(head_length(b"H:V\r\n\r\nbody", 0), Some(7));

		// Incomplete heads.
		assert_eq!(head_length(b"H:V\r\nH:V\r\n", 0), None);
		assert_eq!(head_length(b"H:V\r\nH:V\r\n\r", 0), None);
		assert_eq!(head_length(b"", 0), None);

		// Bare LFs do not terminate the head.
		assert_eq!(head_length(b"H:V\n\n", 0), None);
	}

	/// Tests that a terminator straddling two scans is still found.
	#[test]
	fn test_head_length_resumed() {
		let buffer = b"HTTP/1.1 200 OK\r\n\r\n";
		// Pretend everything up to and including the first CR was already scanned.
		assert_eq!(head_length(buffer, 16), Some(19));
		assert_eq!(head_length(buffer, 18), Some(19));
	}

	/// Tests the request_method function.
	#[test]
	fn test_request_method() {
		assert_eq!(
			request_method(b"GET / HTTP/1.1\r\n\r\n"),
			Some(&b"GET"[..])
		);
		assert_eq!(
			request_method(b"POST /x HTTP/1.1\r\n\r\n"),
			Some(&b"POST"[..])
		);
		assert_eq!(request_method(b"GET"), None);
		assert_eq!(request_method(b"G(T / HTTP/1.1"), None);
		assert_eq!(request_method(b" / HTTP/1.1"), None);
	}
}
