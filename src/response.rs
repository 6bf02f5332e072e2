//! Server reply parsing and classification.

use crate::error::TransportError;

/// A single line of a server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseLine {
    /// The 3-digit status code (e.g. 220, 250, 550).
    pub code: u16,
    /// Whether this is the last line of a multi-line reply (a space after
    /// the code; a dash signals continuation).
    pub is_last: bool,
    /// The message text following the separator.
    pub message: String,
}

/// A complete server reply, possibly accumulated from continuation lines.
///
/// Ephemeral: produced for every command exchange, classified, and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The status code of the final reply line.
    pub code: u16,
    /// All message lines of the reply.
    pub lines: Vec<String>,
}

impl Response {
    #[must_use]
    pub const fn new(code: u16, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// The reply text as a single string, lines joined by newlines.
    #[must_use]
    pub fn message(&self) -> String {
        self.lines.join("\n")
    }

    /// `true` for the success class (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code >= 200 && self.code < 300
    }

    /// `true` for the intermediate class (3xx) — the server promises to
    /// accept more rather than confirming receipt.
    #[must_use]
    pub const fn is_intermediate(&self) -> bool {
        self.code >= 300 && self.code < 400
    }

    /// `true` for a temporary failure (4xx).
    #[must_use]
    pub const fn is_temporary_error(&self) -> bool {
        self.code >= 400 && self.code < 500
    }

    /// `true` for a permanent failure (5xx).
    #[must_use]
    pub const fn is_permanent_error(&self) -> bool {
        self.code >= 500 && self.code < 600
    }

    /// `true` for any failure class (4xx or 5xx).
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.is_temporary_error() || self.is_permanent_error()
    }

    /// Parses one raw reply line.
    ///
    /// # Errors
    ///
    /// [`TransportError::Malformed`] if the line has no parseable leading
    /// code — a transport failure, distinct from a valid non-success code.
    pub fn parse_line(line: &str) -> Result<ResponseLine, TransportError> {
        let bytes = line.as_bytes();
        if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
            return Err(TransportError::Malformed(format!(
                "no status code in {line:?}"
            )));
        }

        // The leading three bytes are ASCII digits, so these slices are
        // always on character boundaries.
        let code = line[..3]
            .parse::<u16>()
            .map_err(|_| TransportError::Malformed(format!("invalid status code in {line:?}")))?;

        let is_last = match bytes.get(3) {
            Some(b' ') | None => true,
            Some(b'-') => false,
            Some(c) => {
                return Err(TransportError::Malformed(format!(
                    "invalid separator {:?} in {line:?}",
                    char::from(*c)
                )));
            }
        };

        let message = if line.len() > 4 {
            line[4..].to_string()
        } else {
            String::new()
        };

        Ok(ResponseLine {
            code,
            is_last,
            message,
        })
    }
}

/// Accumulates continuation lines until the final line of a reply arrives.
/// Only the final line's code is reported to the caller.
#[derive(Debug, Default)]
pub(crate) struct ReplyAccumulator {
    lines: Vec<String>,
}

impl ReplyAccumulator {
    /// Feed one raw reply line; returns the completed reply once the final
    /// line (space separator) is seen.
    pub(crate) fn push(&mut self, raw: &str) -> Result<Option<Response>, TransportError> {
        let line = Response::parse_line(raw)?;
        self.lines.push(line.message);
        if line.is_last {
            Ok(Some(Response::new(line.code, std::mem::take(&mut self.lines))))
        } else {
            Ok(None)
        }
    }
}
