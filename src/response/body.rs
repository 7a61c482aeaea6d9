use crate::error::InvalidData;
use std::cmp::Ordering;
use std::io::{ErrorKind, Result, Write};

/// The application's response sink, together with a count of the body bytes written into it.
#[derive(Debug)]
pub(crate) struct Body<W: Write> {
	/// The application's sink.
	sink: W,

	/// How many body bytes have been written to the sink.
	received: u64,
}

impl<W: Write> Body<W> {
	/// Wraps a sink.
	pub(crate) fn new(sink: W) -> Self {
		Self { sink, received: 0 }
	}

	/// Appends body bytes to the sink.
	///
	/// # Errors
	/// This function returns an error if writing to the sink fails.
	pub(crate) fn write(&mut self, data: &[u8]) -> Result<()> {
		self.sink.write_all(data)?;
		self.received += data.len() as u64;
		Ok(())
	}

	/// Returns how many body bytes have been written.
	pub(crate) fn received(&self) -> u64 {
		self.received
	}

	/// Checks, once the server has closed the connection, that exactly `expected` bytes arrived,
	/// and flushes the sink.
	///
	/// # Errors
	/// This function returns an error of kind [`UnexpectedEof`](ErrorKind::UnexpectedEof) if
	/// fewer bytes arrived, an error of kind [`InvalidData`](ErrorKind::InvalidData) if more
	/// arrived, or the sink's error if flushing fails.
	pub(crate) fn finish(&mut self, expected: u64) -> Result<()> {
		match self.received.cmp(&expected) {
			Ordering::Less => Err(ErrorKind::UnexpectedEof.into()),
			Ordering::Greater => Err(InvalidData::BodyTooLong.into()),
			Ordering::Equal => self.sink.flush(),
		}
	}

	/// Gives the sink back to the application.
	pub(crate) fn into_sink(self) -> W {
		self.sink
	}
}
