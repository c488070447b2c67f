// ABOUTME: Writer adapters for the packaging pipeline.
// ABOUTME: Cancellation checks, digest tee and a capped output buffer.

use sha2::{Digest, Sha256};
use std::io::{self, Write};

use crate::cancel::CancelSignal;

/// Marker carried inside the io::Error returned once cancellation is observed.
#[derive(Debug)]
pub(super) struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("write cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Marker carried inside the io::Error returned once the buffer is full.
#[derive(Debug)]
pub(super) struct LimitExceeded;

impl std::fmt::Display for LimitExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("output size limit exceeded")
    }
}

impl std::error::Error for LimitExceeded {}

pub(super) fn is_cancelled(err: &io::Error) -> bool {
    err.get_ref().is_some_and(|e| e.is::<Cancelled>())
}

pub(super) fn is_limit_exceeded(err: &io::Error) -> bool {
    err.get_ref().is_some_and(|e| e.is::<LimitExceeded>())
}

/// Refuses every write after the signal trips.
pub(super) struct CancelAwareWriter<W> {
    inner: W,
    cancel: CancelSignal,
}

impl<W: Write> CancelAwareWriter<W> {
    pub(super) fn new(inner: W, cancel: CancelSignal) -> Self {
        Self { inner, cancel }
    }

    pub(super) fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CancelAwareWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.cancel.is_cancelled() {
            return Err(io::Error::other(Cancelled));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Hashes everything that passes through to the inner writer.
pub(super) struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> HashingWriter<W> {
    pub(super) fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    pub(super) fn finish(self) -> (W, [u8; 32]) {
        (self.inner, self.hasher.finalize().into())
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// In-memory sink that fails as soon as its length would pass `limit`.
pub(super) struct CappedBuffer {
    buf: Vec<u8>,
    limit: usize,
}

impl CappedBuffer {
    pub(super) fn new(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            limit,
        }
    }

    pub(super) fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

impl Write for CappedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.buf.len() + buf.len() > self.limit {
            return Err(io::Error::other(LimitExceeded));
        }
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_aware_writer_stops_after_cancel() {
        let cancel = CancelSignal::new();
        let mut w = CancelAwareWriter::new(Vec::new(), cancel.clone());
        w.write_all(b"abc").unwrap();
        cancel.cancel();
        let err = w.write_all(b"def").unwrap_err();
        assert!(is_cancelled(&err));
        assert_eq!(w.into_inner(), b"abc");
    }

    #[test]
    fn hashing_writer_matches_direct_digest() {
        let mut w = HashingWriter::new(Vec::new());
        w.write_all(b"hello ").unwrap();
        w.write_all(b"world").unwrap();
        let (bytes, digest) = w.finish();
        assert_eq!(bytes, b"hello world");
        let expected: [u8; 32] = Sha256::digest(b"hello world").into();
        assert_eq!(digest, expected);
    }

    #[test]
    fn capped_buffer_rejects_overflow() {
        let mut buf = CappedBuffer::new(4);
        buf.write_all(b"1234").unwrap();
        let err = buf.write_all(b"5").unwrap_err();
        assert!(is_limit_exceeded(&err));
        assert!(!is_cancelled(&err));
        assert_eq!(buf.into_inner(), b"1234");
    }
}
