use futures_core::ready;
use futures_io::AsyncWrite;
use std::io::{ErrorKind, Result};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Writes the unsent tail of a byte string to a writeable, resuming where an earlier call left
/// off.
///
/// The `written` parameter is how many bytes of `data` have already been written; it is advanced
/// as the writeable accepts more. This function performs repeated writes until the whole of
/// `data` has been written, the writeable would block, or an error occurs. On `Pending`, the
/// caller simply calls again later with the same `data` and `written`.
///
/// # Errors
/// This function returns an error if writing fails, or an error of kind
/// [`WriteZero`](ErrorKind::WriteZero) if the writeable accepts zero bytes of a nonempty write.
pub fn poll_write_from<W: AsyncWrite + ?Sized>(
	mut sink: Pin<&mut W>,
	cx: &mut Context<'_>,
	data: &[u8],
	written: &mut usize,
) -> Poll<Result<()>> {
	while *written < data.len() {
		let bytes_written = ready!(sink.as_mut().poll_write(cx, &data[*written..]))?;
		if bytes_written == 0 {
			return Err(ErrorKind::WriteZero.into()).into();
		}
		*written += bytes_written;
	}
	Ok(()).into()
}
