pub(crate) mod body;
pub(crate) mod headers;

use std::collections::hash_map::{self, HashMap};

/// An HTTP status line and response headers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Response {
	/// The HTTP minor version number.
	///
	/// For example, for HTTP/1.0, this is zero; for HTTP/1.1, this is 1.
	pub minor_version: u8,

	/// The status code.
	pub status: u16,

	/// The reason phrase.
	pub reason: String,

	/// The response headers.
	pub headers: HeaderMap,

	/// The length of the response body in bytes.
	///
	/// This is the value of the `Content-Length` header, or zero for responses that cannot have
	/// a body.
	pub content_length: u64,
}

/// Response headers, keyed by lowercase header name.
///
/// A header that appears more than once has its values joined with `", "`, in the order they
/// were received.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HeaderMap {
	entries: HashMap<String, Vec<u8>>,
}

impl HeaderMap {
	/// Returns the value of a header, looked up case-insensitively.
	#[must_use]
	pub fn get(&self, name: &str) -> Option<&[u8]> {
		self.entries
			.get(&name.to_ascii_lowercase())
			.map(Vec::as_slice)
	}

	/// Returns whether a header is present, looked up case-insensitively.
	#[must_use]
	pub fn contains(&self, name: &str) -> bool {
		self.get(name).is_some()
	}

	/// Returns the number of distinct header names.
	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns whether there are no headers.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Iterates over the headers as lowercase name and value pairs, in no particular order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
		self.entries
			.iter()
			.map(|(name, value)| (name.as_str(), value.as_slice()))
	}

	/// Adds a header.
	///
	/// Returns `false` if a header of the same name was already present, in which case the new
	/// value was appended to the existing one.
	pub(crate) fn append(&mut self, name: &str, value: &[u8]) -> bool {
		match self.entries.entry(name.to_ascii_lowercase()) {
			hash_map::Entry::Vacant(e) => {
				let _ = e.insert(value.to_vec());
				true
			}
			hash_map::Entry::Occupied(mut e) => {
				let existing = e.get_mut();
				existing.extend_from_slice(b", ");
				existing.extend_from_slice(value);
				false
			}
		}
	}
}
