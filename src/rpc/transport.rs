//! Content-Length framed transport
//!
//! ```text
//! Content-Length: 123\r\n
//! \r\n
//! <JSON payload>
//! ```

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

use crate::rpc::codec::CONTENT_LENGTH_HEADER;

/// Default bound on header lines per frame
pub const DEFAULT_MAX_HEADER_LINES: usize = 32;

/// Default bound on one header line in bytes, terminator included
pub const DEFAULT_MAX_HEADER_LINE_LENGTH: usize = 8 * 1024;

/// Default bound on a single body (64 MiB)
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderLimits {
    pub max_header_lines: usize,
    pub max_header_line_length: usize,
    pub max_content_length: usize,
}

impl Default for ReaderLimits {
    fn default() -> Self {
        Self {
            max_header_lines: DEFAULT_MAX_HEADER_LINES,
            max_header_line_length: DEFAULT_MAX_HEADER_LINE_LENGTH,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

/// One complete frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub content_length: usize,
    pub body: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("End of stream")]
    EndOfStream,

    #[error("Frame truncated: expected {expected} bytes, received {received}")]
    TruncatedFrame { expected: usize, received: usize },

    #[error("Header block of {lines} lines without Content-Length")]
    MissingContentLength { lines: usize },

    #[error("Invalid Content-Length: {0:?}")]
    InvalidContentLength(String),

    #[error("Header line exceeds {limit} bytes")]
    HeaderLineTooLong { limit: usize },

    #[error("Transport I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

pub struct FrameReader<R> {
    inner: R,
    limits: ReaderLimits,
    line: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    pub fn new(inner: R, limits: ReaderLimits) -> Self {
        Self {
            inner,
            limits,
            line: Vec::new(),
        }
    }

    /// Reads the next frame.
    ///
    /// Returns [`FrameError::EndOfStream`] only when the stream ends cleanly
    /// between frames.
    pub async fn next_frame(&mut self) -> Result<Frame, FrameError> {
        let content_length = self.read_header().await?;
        let body = self.read_body(content_length).await?;
        trace!(content_length, "Read frame");
        Ok(Frame {
            content_length,
            body,
        })
    }

    async fn read_header(&mut self) -> Result<usize, FrameError> {
        let mut content_length: Option<usize> = None;
        let mut invalid: Option<String> = None;
        // A parsed length above the limit; its body is still in the stream
        let mut oversized: Option<usize> = None;
        let mut lines = 0usize;
        let line_limit = self.limits.max_header_line_length;

        loop {
            self.line.clear();
            let read = (&mut self.inner)
                .take(line_limit as u64)
                .read_until(b'\n', &mut self.line)
                .await?;
            if read == line_limit && self.line.last() != Some(&b'\n') {
                warn!(limit = line_limit, "Header line exceeds length limit");
                return Err(FrameError::HeaderLineTooLong { limit: line_limit });
            }
            if read == 0 {
                if lines == 0 {
                    return Err(FrameError::EndOfStream);
                }
                return Err(FrameError::TruncatedFrame {
                    expected: content_length.unwrap_or(0),
                    received: 0,
                });
            }

            let line = String::from_utf8_lossy(&self.line)
                .trim_end_matches(['\r', '\n'])
                .to_string();

            if line.is_empty() {
                if let Some(value) = invalid {
                    if let Some(length) = oversized {
                        self.discard_body(length).await?;
                    }
                    return Err(FrameError::InvalidContentLength(value));
                }
                match content_length {
                    Some(length) => return Ok(length),
                    // Stray separator between frames
                    None if lines == 0 => continue,
                    None => return Err(FrameError::MissingContentLength { lines }),
                }
            }

            lines += 1;
            if let Some(value) = line.strip_prefix(CONTENT_LENGTH_HEADER) {
                let value = value.trim();
                match value.parse::<usize>() {
                    Ok(length) if length <= self.limits.max_content_length => {
                        content_length = Some(length);
                    }
                    Ok(length) => {
                        warn!(length, limit = self.limits.max_content_length, "Content-Length exceeds limit");
                        oversized = Some(length);
                        invalid = Some(value.to_string());
                    }
                    Err(_) => {
                        warn!(value, "Rejecting Content-Length header");
                        invalid = Some(value.to_string());
                    }
                }
            } else {
                debug!(header = %line, "Skipping non Content-Length header");
            }

            if lines > self.limits.max_header_lines {
                warn!(lines, "Header block exceeds line limit");
                return Err(FrameError::MissingContentLength { lines });
            }
        }
    }

    /// Skips the body of a rejected frame without buffering it.
    async fn discard_body(&mut self, content_length: usize) -> Result<(), FrameError> {
        let skipped = tokio::io::copy(
            &mut (&mut self.inner).take(content_length as u64),
            &mut tokio::io::sink(),
        )
        .await?;
        let received = usize::try_from(skipped).unwrap_or(usize::MAX);
        if received < content_length {
            return Err(FrameError::TruncatedFrame {
                expected: content_length,
                received,
            });
        }
        debug!(content_length, "Discarded oversized body");
        Ok(())
    }

    async fn read_body(&mut self, content_length: usize) -> Result<Vec<u8>, FrameError> {
        let mut body = vec![0u8; content_length];
        let mut received = 0;
        while received < content_length {
            let read = self.inner.read(&mut body[received..]).await?;
            if read == 0 {
                return Err(FrameError::TruncatedFrame {
                    expected: content_length,
                    received,
                });
            }
            received += read;
        }
        Ok(body)
    }
}

pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Writes an already framed message and flushes it.
    pub async fn write_frame(&mut self, framed: &[u8]) -> std::io::Result<()> {
        self.inner.write_all(framed).await?;
        self.inner.flush().await
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, BufReader, ReadBuf};

    fn reader(input: &[u8]) -> FrameReader<&[u8]> {
        FrameReader::new(input, ReaderLimits::default())
    }

    /// Hands out at most `chunk` bytes per read.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl AsyncRead for Trickle {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            let end = (self.pos + self.chunk)
                .min(self.data.len())
                .min(self.pos + buf.remaining());
            let start = self.pos;
            buf.put_slice(&self.data[start..end]);
            self.pos = end;
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn reads_single_frame() {
        let input = b"Content-Length: 53\r\n\r\n{\"jsonrpc\":\"2.0\",\"method\":\"his\",\"id\":1,\"params\":null}";
        let frame = reader(input).next_frame().await.unwrap();
        assert_eq!(frame.content_length, 53);
        assert_eq!(frame.body.len(), 53);
    }

    #[tokio::test]
    async fn clean_end_of_stream() {
        let err = reader(b"").next_frame().await.unwrap_err();
        assert!(matches!(err, FrameError::EndOfStream));
    }

    #[tokio::test]
    async fn skips_other_headers_before_content_length() {
        let input = b"X-Trace: abc\r\nContent-Type: application/vscode-jsonrpc; charset=utf-8\r\nContent-Length: 2\r\n\r\n{}";
        let frame = reader(input).next_frame().await.unwrap();
        assert_eq!(frame.body, b"{}");
    }

    #[tokio::test]
    async fn accepts_headers_after_content_length() {
        let input = b"Content-Length: 2\r\nContent-Type: application/json\r\n\r\n{}";
        let frame = reader(input).next_frame().await.unwrap();
        assert_eq!(frame.body, b"{}");
    }

    #[tokio::test]
    async fn reads_consecutive_frames() {
        let input = b"Content-Length: 2\r\n\r\n{}Content-Length: 4\r\n\r\nnull";
        let mut reader = reader(input);
        assert_eq!(reader.next_frame().await.unwrap().body, b"{}");
        assert_eq!(reader.next_frame().await.unwrap().body, b"null");
        assert!(matches!(
            reader.next_frame().await.unwrap_err(),
            FrameError::EndOfStream
        ));
    }

    #[tokio::test]
    async fn counts_body_in_bytes() {
        let body = "{\"v\":\"ü→✓\"}";
        let input = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
        let frame = reader(input.as_bytes()).next_frame().await.unwrap();
        assert_eq!(frame.body, body.as_bytes());
        assert!(frame.content_length > body.chars().count());
    }

    #[tokio::test]
    async fn short_reads_are_reassembled() {
        let input = b"Content-Length: 26\r\n\r\n{\"jsonrpc\":\"2.0\",\"id\":100}".to_vec();
        let trickle = Trickle {
            data: input,
            pos: 0,
            chunk: 3,
        };
        let mut reader = FrameReader::new(BufReader::new(trickle), ReaderLimits::default());
        let frame = reader.next_frame().await.unwrap();
        assert_eq!(frame.body, b"{\"jsonrpc\":\"2.0\",\"id\":100}");
    }

    #[tokio::test]
    async fn truncated_body_is_reported() {
        let err = reader(b"Content-Length: 10\r\n\r\n{}")
            .next_frame()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FrameError::TruncatedFrame {
                expected: 10,
                received: 2
            }
        ));
    }

    #[tokio::test]
    async fn end_of_stream_inside_header_is_truncation() {
        let err = reader(b"Content-Length: 10\r\n").next_frame().await.unwrap_err();
        assert!(matches!(err, FrameError::TruncatedFrame { .. }));
    }

    #[tokio::test]
    async fn missing_content_length_is_an_error_and_reader_recovers() {
        let input = b"Content-Type: text/plain\r\n\r\nContent-Length: 2\r\n\r\n{}";
        let mut reader = reader(input);
        assert!(matches!(
            reader.next_frame().await.unwrap_err(),
            FrameError::MissingContentLength { lines: 1 }
        ));
        assert_eq!(reader.next_frame().await.unwrap().body, b"{}");
    }

    #[tokio::test]
    async fn header_line_limit_prevents_endless_skipping() {
        let mut input = Vec::new();
        for i in 0..10 {
            input.extend_from_slice(format!("X-Noise-{}: 1\r\n", i).as_bytes());
        }
        let limits = ReaderLimits {
            max_header_lines: 4,
            ..ReaderLimits::default()
        };
        let err = FrameReader::new(input.as_slice(), limits)
            .next_frame()
            .await
            .unwrap_err();
        assert!(matches!(err, FrameError::MissingContentLength { lines: 5 }));
    }

    #[rstest]
    #[case("Content-Length: abc")]
    #[case("Content-Length: -4")]
    #[case("Content-Length:")]
    #[case("Content-Length: 99999999999999999999999")]
    #[tokio::test]
    async fn invalid_content_length_consumes_header(#[case] header: &str) {
        let input = format!("{}\r\n\r\nContent-Length: 2\r\n\r\n{{}}", header);
        let mut reader = reader(input.as_bytes());
        assert!(matches!(
            reader.next_frame().await.unwrap_err(),
            FrameError::InvalidContentLength(_)
        ));
        assert_eq!(reader.next_frame().await.unwrap().body, b"{}");
    }

    fn small_limits() -> ReaderLimits {
        ReaderLimits {
            max_content_length: 16,
            ..ReaderLimits::default()
        }
    }

    #[tokio::test]
    async fn oversized_body_is_skipped_and_next_frame_read() {
        let body = "{\"jsonrpc\":\"2.0\",\"method\":\"initialized\",\"params\":{}}";
        let input = format!(
            "Content-Length: {}\r\n\r\n{}Content-Length: 2\r\n\r\n{{}}",
            body.len(),
            body
        );
        let mut reader = FrameReader::new(input.as_bytes(), small_limits());

        let err = reader.next_frame().await.unwrap_err();
        assert!(matches!(err, FrameError::InvalidContentLength(value) if value == body.len().to_string()));
        assert_eq!(reader.next_frame().await.unwrap().body, b"{}");
        assert!(matches!(
            reader.next_frame().await.unwrap_err(),
            FrameError::EndOfStream
        ));
    }

    #[tokio::test]
    async fn oversized_body_cut_short_is_truncation() {
        let input = b"Content-Length: 40\r\n\r\n{\"partial\":";
        let err = FrameReader::new(input.as_slice(), small_limits())
            .next_frame()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FrameError::TruncatedFrame {
                expected: 40,
                received: 11
            }
        ));
    }

    #[tokio::test]
    async fn overlong_header_line_is_rejected() {
        let limits = ReaderLimits {
            max_header_line_length: 32,
            ..ReaderLimits::default()
        };
        let input = format!("X-Padding: {}", "a".repeat(1000));
        let err = FrameReader::new(input.as_bytes(), limits)
            .next_frame()
            .await
            .unwrap_err();
        assert!(matches!(err, FrameError::HeaderLineTooLong { limit: 32 }));
    }

    #[tokio::test]
    async fn header_line_at_limit_is_accepted() {
        // "Content-Length: 2\r\n" is exactly 19 bytes
        let limits = ReaderLimits {
            max_header_line_length: 19,
            ..ReaderLimits::default()
        };
        let frame = FrameReader::new(b"Content-Length: 2\r\n\r\n{}".as_slice(), limits)
            .next_frame()
            .await
            .unwrap();
        assert_eq!(frame.body, b"{}");
    }

    #[tokio::test]
    async fn writer_flushes_frames() {
        let mut writer = FrameWriter::new(Vec::new());
        writer.write_frame(b"Content-Length: 2\r\n\r\n{}").await.unwrap();
        assert_eq!(writer.into_inner(), b"Content-Length: 2\r\n\r\n{}");
    }
}
