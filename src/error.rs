//! Errors that originate inside `tickhttp` or `httparse`.
//!
//! Every failed exchange is reported to its continuation as a [`std::io::Error`]. There are four
//! sources of failure: errors passed up from the underlying transport or from the caller's sink,
//! which pass through `tickhttp` completely unmodified; the server closing its socket before the
//! whole response arrived, which is reported as [`std::io::ErrorKind::UnexpectedEof`]; the pool's
//! server address being unresolvable, which is reported as
//! [`std::io::ErrorKind::AddrNotAvailable`]; and the server sending an invalid or unsupported
//! HTTP response, which is reported as [`std::io::ErrorKind::InvalidData`]. In the last case, if
//! the `detailed-errors` feature is enabled, the inner error of the [`std::io::Error`] is an
//! [`InvalidData`] instance, otherwise there is no source and this module is not exported.

use std::fmt::{Display, Formatter};

/// The ways in which a received `Content-Length` header can be invalid.
#[derive(Debug, PartialEq)]
pub enum BadContentLength {
	/// The header is not valid UTF-8.
	NotUtf8(std::str::Utf8Error),

	/// The header is not a nonnegative integer or does not fit into a `u64`.
	NotU64(<u64 as std::str::FromStr>::Err),
}

impl Display for BadContentLength {
	fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
		match self {
			Self::NotUtf8(inner) => inner.fmt(f),
			Self::NotU64(inner) => inner.fmt(f),
		}
	}
}

impl std::error::Error for BadContentLength {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::NotUtf8(inner) => Some(inner),
			Self::NotU64(inner) => Some(inner),
		}
	}
}

/// The type of nested error included in any error of kind
/// [`InvalidData`](std::io::ErrorKind::InvalidData) that originates within `tickhttp` itself.
///
/// Errors that pass through `tickhttp` but do not originate there, such as errors returned by the
/// transport or by the response sink, may be of kind
/// [`InvalidData`](std::io::ErrorKind::InvalidData) but not contain a nested error object of this
/// type.
///
/// If the `detailed-errors` feature is disabled, this type is not exported.
#[derive(Debug, PartialEq)]
pub enum InvalidData {
	/// The status line or a header line is malformed.
	ParseHeaders(httparse::Error),

	/// The response headers grew past the configured limit without a terminating blank line.
	ResponseHeadersTooLong,

	/// The server decided to switch protocols. This is not supported.
	SwitchingProtocols,

	/// The server sent a `Transfer-Encoding` header. Only `Content-Length` framing is supported.
	TransferEncodingUnsupported,

	/// The server sent neither a `Content-Length` header nor a status code that implies an empty
	/// body.
	MissingContentLength,

	/// The server sent multiple `Content-Length` headers.
	MultipleContentLengths,

	/// The server sent a `Content-Length` header with a 204 No Content status code.
	ContentLengthWithNoContent,

	/// The server sent an invalid `Content-Length` header.
	BadContentLength(BadContentLength),

	/// The server sent more body bytes than its `Content-Length` header announced.
	BodyTooLong,
}

impl Display for InvalidData {
	fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
		match self {
			Self::ParseHeaders(inner) => inner.fmt(f),
			Self::ResponseHeadersTooLong => write!(f, "Response headers too long"),
			Self::SwitchingProtocols => write!(f, "Unsupported 101 Switching Protocols received"),
			Self::TransferEncodingUnsupported => {
				write!(f, "Unsupported Transfer-Encoding received")
			}
			Self::MissingContentLength => write!(f, "No Content-Length header received"),
			Self::MultipleContentLengths => write!(f, "Multiple Content-Length headers received"),
			Self::ContentLengthWithNoContent => {
				write!(f, "Content-Length received in 204 No Content response")
			}
			Self::BadContentLength(inner) => {
				write!(f, "Invalid Content-Length header received: {inner}")
			}
			Self::BodyTooLong => write!(f, "Response body longer than Content-Length"),
		}
	}
}

impl std::error::Error for InvalidData {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::ParseHeaders(inner) => Some(inner),
			Self::BadContentLength(inner) => Some(inner),
			Self::ResponseHeadersTooLong
			| Self::SwitchingProtocols
			| Self::TransferEncodingUnsupported
			| Self::MissingContentLength
			| Self::MultipleContentLengths
			| Self::ContentLengthWithNoContent
			| Self::BodyTooLong => None,
		}
	}
}

impl From<httparse::Error> for InvalidData {
	fn from(inner: httparse::Error) -> Self {
		Self::ParseHeaders(inner)
	}
}

impl From<BadContentLength> for InvalidData {
	fn from(inner: BadContentLength) -> Self {
		Self::BadContentLength(inner)
	}
}

impl From<InvalidData> for std::io::Error {
	#[cfg(feature = "detailed-errors")]
	fn from(inner: InvalidData) -> Self {
		Self::new(std::io::ErrorKind::InvalidData, inner)
	}

	#[cfg(not(feature = "detailed-errors"))]
	fn from(_: InvalidData) -> Self {
		std::io::ErrorKind::InvalidData.into()
	}
}

impl From<BadContentLength> for std::io::Error {
	fn from(inner: BadContentLength) -> Self {
		Into::<InvalidData>::into(inner).into()
	}
}
