//! Import sources that fail part-way through.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

/// Yields `head`, then fails every following read.
///
/// Stands in for a host file that becomes unreadable mid-import.
#[derive(Debug)]
pub struct BrokenSource {
    head: Vec<u8>,
    offset: usize,
}

impl BrokenSource {
    pub fn new(head: impl Into<Vec<u8>>) -> Self {
        Self {
            head: head.into(),
            offset: 0,
        }
    }
}

impl AsyncRead for BrokenSource {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let rest = &this.head[this.offset..];
        if rest.is_empty() {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "source went away",
            )));
        }
        let n = rest.len().min(buf.remaining());
        buf.put_slice(&rest[..n]);
        this.offset += n;
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn yields_head_then_fails() {
        let mut source = BrokenSource::new("abc");
        let mut buf = [0u8; 8];
        assert_eq!(source.read(&mut buf).await.unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
        let err = source.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
