//! The line transport: CRLF command framing, reply reading, body streaming.
//!
//! A thin duplex channel over any async stream, deliberately free of state
//! logic so alternate backends (an in-memory pipe, a wrapped socket) can be
//! substituted without touching the state machine above it.

use std::fmt::Write as _;
use std::time::Duration;

use arrayvec::ArrayString;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::command::Command;
use crate::error::TransportError;
use crate::response::{ReplyAccumulator, Response};

/// Initial size of the inbound read buffer.
const BUFFER_SIZE: usize = 8192;

/// Hard cap on reply accumulation to prevent unbounded growth (1MB).
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

#[derive(Debug)]
pub(crate) struct Transport<S> {
    stream: S,
    /// Inbound bytes not yet consumed as reply lines.
    read_buf: Vec<u8>,
    /// Amount of valid data in the read buffer.
    read_len: usize,
    /// Dot-stuffing scanner carried across body chunks.
    stuffer: DotStuffer,
    closed: bool,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Transport<S> {
    pub(crate) fn new(stream: S) -> Self {
        Self {
            stream,
            read_buf: vec![0u8; BUFFER_SIZE],
            read_len: 0,
            stuffer: DotStuffer::new(),
            closed: false,
        }
    }

    /// Write one command as a single CRLF-terminated line.
    pub(crate) async fn send_command(&mut self, command: &Command) -> Result<(), TransportError> {
        // Format to a stack-allocated buffer; a command line that overflows
        // it is oversized for the wire anyway.
        let mut line = ArrayString::<512>::new();
        write!(&mut line, "{command}\r\n")?;
        tracing::trace!(%command, "client line");
        self.stream.write_all(line.as_bytes()).await?;
        Ok(())
    }

    /// Read one complete reply, accumulating continuation lines and
    /// returning the final code. Each underlying read is bounded by
    /// `read_timeout`.
    pub(crate) async fn read_reply(
        &mut self,
        read_timeout: Duration,
    ) -> Result<Response, TransportError> {
        let mut reply = ReplyAccumulator::default();
        loop {
            let line = self.read_line(read_timeout).await?;
            tracing::trace!(line = %line, "server line");
            if let Some(response) = reply.push(&line)? {
                return Ok(response);
            }
        }
    }

    /// Reset the dot-stuffing scanner for a fresh body: the first byte of a
    /// body sits at the start of a line.
    pub(crate) fn begin_body(&mut self) {
        self.stuffer = DotStuffer::new();
    }

    /// Stream body bytes, doubling any line-leading period so the peer
    /// cannot see a premature end-of-body marker. Bare LF line endings are
    /// normalized to CRLF.
    pub(crate) async fn write_body(&mut self, chunk: &[u8]) -> Result<(), TransportError> {
        let mut wire = Vec::with_capacity(chunk.len() + 2);
        self.stuffer.feed(chunk, &mut wire);
        self.stream.write_all(&wire).await?;
        Ok(())
    }

    /// Close an unterminated last line and emit the end-of-data marker.
    pub(crate) async fn finish_body(&mut self) -> Result<(), TransportError> {
        let mut wire = Vec::with_capacity(5);
        self.stuffer.finish(&mut wire);
        self.stream.write_all(&wire).await?;
        Ok(())
    }

    /// Shut the stream down. Idempotent and best-effort; the session calls
    /// this on every exit path.
    pub(crate) async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let _ = self.stream.shutdown().await;
        }
    }

    async fn read_line(&mut self, read_timeout: Duration) -> Result<String, TransportError> {
        loop {
            if let Some(newline) = self.read_buf[..self.read_len]
                .iter()
                .position(|byte| *byte == b'\n')
            {
                let mut end = newline;
                if end > 0 && self.read_buf[end - 1] == b'\r' {
                    end -= 1;
                }
                let line = std::str::from_utf8(&self.read_buf[..end])
                    .map_err(|_| {
                        TransportError::Malformed("reply line is not valid UTF-8".to_string())
                    })?
                    .to_owned();

                self.read_buf.copy_within(newline + 1..self.read_len, 0);
                self.read_len -= newline + 1;
                return Ok(line);
            }

            if self.read_len == self.read_buf.len() {
                let new_size = self.read_buf.len() * 2;
                if new_size > MAX_BUFFER_SIZE {
                    return Err(TransportError::Malformed(format!(
                        "reply line exceeds {MAX_BUFFER_SIZE} bytes"
                    )));
                }
                self.read_buf.resize(new_size, 0);
            }

            let read = timeout(
                read_timeout,
                self.stream.read(&mut self.read_buf[self.read_len..]),
            )
            .await
            .map_err(|_| TransportError::TimedOut)??;
            if read == 0 {
                return Err(TransportError::Closed);
            }
            self.read_len += read;
        }
    }
}

/// Incremental dot-stuffing scanner for the body phase.
///
/// Tracks line edges across arbitrarily-split chunks: a `.` at the start of
/// a line is doubled on the wire, a bare LF becomes CRLF, and `finish`
/// closes an open line before the `.` terminator so the marker always sits
/// on a line of its own.
#[derive(Debug)]
struct DotStuffer {
    at_line_start: bool,
    last_was_cr: bool,
}

impl DotStuffer {
    const fn new() -> Self {
        Self {
            at_line_start: true,
            last_was_cr: false,
        }
    }

    fn feed(&mut self, chunk: &[u8], wire: &mut Vec<u8>) {
        for &byte in chunk {
            match byte {
                b'\n' => {
                    if !self.last_was_cr {
                        wire.push(b'\r');
                    }
                    wire.push(b'\n');
                    self.at_line_start = true;
                    self.last_was_cr = false;
                }
                b'\r' => {
                    wire.push(b'\r');
                    self.at_line_start = false;
                    self.last_was_cr = true;
                }
                byte => {
                    if self.at_line_start && byte == b'.' {
                        wire.push(b'.');
                    }
                    wire.push(byte);
                    self.at_line_start = false;
                    self.last_was_cr = false;
                }
            }
        }
    }

    fn finish(&mut self, wire: &mut Vec<u8>) {
        if !self.at_line_start {
            if self.last_was_cr {
                wire.push(b'\n');
            } else {
                wire.extend_from_slice(b"\r\n");
            }
        }
        wire.extend_from_slice(b".\r\n");
        self.at_line_start = true;
        self.last_was_cr = false;
    }
}
