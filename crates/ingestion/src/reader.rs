//! Exact-length reads over a blocking byte stream

use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use contracts::StreamError;
use tracing::trace;

use crate::error::Result;

/// Pulls exact byte counts out of a stream that delivers arbitrary fragments.
///
/// Any failure is connection-fatal: the reader never retries beyond
/// `Interrupted`, and a short read leaves the stream position undefined.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    bytes_read: u64,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            bytes_read: 0,
        }
    }

    /// Read exactly `n` bytes
    ///
    /// # Errors
    /// `StreamError::ShortRead` if the peer closes, the read times out or the
    /// socket errors before `n` bytes are collected.
    pub fn read_exact(&mut self, n: usize) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(n);
        self.fill(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Fill `buf` completely
    pub fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        let expected = buf.len();
        let mut received = 0;

        while received < expected {
            match self.inner.read(&mut buf[received..]) {
                Ok(0) => {
                    return Err(StreamError::ShortRead {
                        expected,
                        received,
                        source: None,
                    });
                }
                Ok(k) => {
                    received += k;
                    self.bytes_read += k as u64;
                    trace!(chunk = k, received, expected, "partial read");
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(StreamError::ShortRead {
                        expected,
                        received,
                        source: Some(e),
                    });
                }
            }
        }

        Ok(())
    }

    /// Total bytes pulled from the stream so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::io;

    /// Serves `data` in random-sized fragments, with an occasional EINTR
    struct Fragmented {
        data: Vec<u8>,
        pos: usize,
        rng: StdRng,
        max_chunk: usize,
    }

    impl Fragmented {
        fn new(data: Vec<u8>, seed: u64, max_chunk: usize) -> Self {
            Self {
                data,
                pos: 0,
                rng: StdRng::seed_from_u64(seed),
                max_chunk,
            }
        }
    }

    impl Read for Fragmented {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.rng.random_bool(0.1) {
                return Err(io::Error::from(ErrorKind::Interrupted));
            }
            let remaining = self.data.len() - self.pos;
            if remaining == 0 {
                return Ok(0);
            }
            let chunk = self
                .rng
                .random_range(1..=self.max_chunk)
                .min(remaining)
                .min(buf.len());
            buf[..chunk].copy_from_slice(&self.data[self.pos..self.pos + chunk]);
            self.pos += chunk;
            Ok(chunk)
        }
    }

    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::from(ErrorKind::TimedOut))
        }
    }

    #[test]
    fn test_any_fragmentation_yields_exact_bytes() {
        let mut rng = StdRng::seed_from_u64(7);
        for seed in 0..64 {
            let len = rng.random_range(1..2048);
            let data: Vec<u8> = (0..len).map(|_| rng.random()).collect();
            let max_chunk = rng.random_range(1..=64);

            let mut reader = FrameReader::new(Fragmented::new(data.clone(), seed, max_chunk));
            let split = len / 3;
            let head = reader.read_exact(split).unwrap();
            let tail = reader.read_exact(len - split).unwrap();

            assert_eq!(&head[..], &data[..split]);
            assert_eq!(&tail[..], &data[split..]);
            assert_eq!(reader.bytes_read(), len as u64);
        }
    }

    #[test]
    fn test_early_close_is_short_read() {
        let data = vec![9u8; 50];
        let mut reader = FrameReader::new(Fragmented::new(data, 1, 7));
        match reader.read_exact(88) {
            Err(StreamError::ShortRead {
                expected,
                received,
                source,
            }) => {
                assert_eq!(expected, 88);
                assert_eq!(received, 50);
                assert!(source.is_none());
            }
            other => panic!("expected short read, got {other:?}"),
        }
    }

    #[test]
    fn test_io_error_is_short_read() {
        let mut reader = FrameReader::new(Failing);
        let err = reader.read_exact(4).unwrap_err();
        assert!(matches!(
            err,
            StreamError::ShortRead {
                received: 0,
                source: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_zero_length_read() {
        let mut reader = FrameReader::new(Failing);
        assert!(reader.read_exact(0).unwrap().is_empty());
    }
}
