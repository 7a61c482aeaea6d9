use crate::error::{BadContentLength, InvalidData};
use crate::response::{HeaderMap, Response};
use std::io::Result;

/// The most header lines a response head may carry.
const MAX_HEADERS: usize = 64;

/// The outcome of parsing one complete response head.
#[derive(Debug, PartialEq)]
pub(crate) enum Head {
	/// An informational (1xx) response, which precedes the real one and carries no body.
	Interim(u16),

	/// The real response.
	Final(Response),
}

/// Parses one complete response head.
///
/// The `head` parameter is exactly the bytes of the head, from the start of the status line up to
/// and including the blank line that ends it. The parse never looks past those bytes.
///
/// # Errors
/// This function returns an error of kind [`InvalidData`](std::io::ErrorKind::InvalidData) under
/// the following conditions:
/// * if the status line or a header line is malformed, or there are too many header lines
/// * if the server sent a status code 101 Switching Protocols
/// * if a `Transfer-Encoding` header is present
/// * if multiple `Content-Length` headers are present
/// * if the value of the `Content-Length` header is not a nonnegative integer that fits in a `u64`
/// * if the `Content-Length` header is present in a 204 No Content response
/// * if the `Content-Length` header is absent from a response that may have a body
pub(crate) fn parse(head: &[u8]) -> Result<Head> {
	let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
	let mut resp = httparse::Response::new(&mut headers);
	match resp.parse(head).map_err(InvalidData::from)? {
		httparse::Status::Complete(n) if n == head.len() => (),
		_ => {
			// The caller found the blank line but httparse disagrees about where the head ends.
			// That should mean the newlines inside the head are malformed.
			return Err(InvalidData::from(httparse::Error::NewLine).into());
		}
	}
	let (Some(minor_version), Some(status)) = (resp.version, resp.code) else {
		return Err(InvalidData::from(httparse::Error::Status).into());
	};

	if status == 101 {
		// The server sent Switching Protocols, which we do not support.
		return Err(InvalidData::SwitchingProtocols.into());
	}
	if (100..=199).contains(&status) {
		return Ok(Head::Interim(status));
	}

	let mut map = HeaderMap::default();
	for header in resp.headers.iter() {
		let first = map.append(header.name, header.value);
		if !first && header.name.eq_ignore_ascii_case("content-length") {
			return Err(InvalidData::MultipleContentLengths.into());
		}
	}

	if map.contains("transfer-encoding") {
		return Err(InvalidData::TransferEncodingUnsupported.into());
	}
	let declared = get_content_length(&map)?;

	// Follow the rules to determine response body length.
	let content_length = match (status, declared) {
		// A server MUST NOT send a Content-Length header field in any response with a status code
		// of 204 (No Content).
		(204, Some(_)) => return Err(InvalidData::ContentLengthWithNoContent.into()),
		// 204 and 304 responses are always terminated by the first empty line after the header
		// fields, regardless of the header fields present.
		(204 | 304, _) => 0,
		(_, Some(n)) => n,
		// Reading until close is not supported, so the length must be declared.
		(_, None) => return Err(InvalidData::MissingContentLength.into()),
	};

	Ok(Head::Final(Response {
		minor_version,
		status,
		reason: resp.reason.unwrap_or_default().to_owned(),
		headers: map,
		content_length,
	}))
}

/// Decodes the `Content-Length` header, if any.
///
/// If the `Content-Length` header appears and contains a valid number, returns `Ok(Some(n))` where
/// `n` is that number. If there is no `Content-Length` header, returns `Ok(None)`.
///
/// # Errors
/// This function returns an error of kind [`InvalidData`](std::io::ErrorKind::InvalidData) if the
/// value of the `Content-Length` header is not a nonnegative integer or is too large to represent
/// in a `u64`.
fn get_content_length(headers: &HeaderMap) -> Result<Option<u64>> {
	match headers.get("content-length") {
		None => Ok(None),
		Some(value) => {
			let value = std::str::from_utf8(value).map_err(BadContentLength::NotUtf8)?;
			let value = value.trim().parse::<u64>().map_err(BadContentLength::NotU64)?;
			Ok(Some(value))
		}
	}
}
