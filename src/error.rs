//! Error types for the session driver.
//!
//! Four distinct failure kinds, reported synchronously to the call that
//! triggered them: connection establishment, call sequencing, protocol
//! rejections, and transport failures. None are retried internally.

use std::io;

use thiserror::Error;

use crate::state::State;

/// Errors raised while establishing a session.
///
/// All of these are fatal to the connection attempt; no usable session
/// exists afterwards.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The socket could not be opened, or failed during the handshake.
    #[error("transport failure during session setup: {0}")]
    Transport(#[from] TransportError),

    /// The server's greeting was not a success reply.
    #[error("server rejected the session: {code} {text}")]
    Greeting { code: u16, text: String },

    /// The server refused the identification command.
    #[error("server rejected identification: {code} {text}")]
    Identification { code: u16, text: String },
}

impl From<io::Error> for ConnectionError {
    fn from(err: io::Error) -> Self {
        Self::Transport(TransportError::Io(err))
    }
}

/// A transition was invoked outside its legal source state, or violated a
/// cardinality rule (a second sender, a recipient before any sender).
///
/// Raised before any bytes are written; the session state is unchanged.
#[derive(Debug, Error)]
#[error("{attempted} is not legal in the {state} state")]
pub struct SequencingError {
    /// The command or phase that was attempted.
    pub attempted: &'static str,
    /// The state the session was in at the time.
    pub state: State,
}

/// The server answered a command with a reply outside the required class.
///
/// Carries the offending code and text verbatim for diagnostics. The session
/// has moved to its failed state and the connection has been closed.
#[derive(Debug, Error)]
#[error("unexpected reply: {code} {text}")]
pub struct ProtocolError {
    /// The 3-digit status code the server sent.
    pub code: u16,
    /// The reply text, continuation lines joined with newlines.
    pub text: String,
}

/// Read/write failure at the socket layer.
///
/// Distinguished from [`ProtocolError`]: the remote end is no longer
/// reachable, rather than merely objecting to a command.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error during a read or write.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Connection closed by the peer mid-session.
    #[error("Connection closed by peer")]
    Closed,

    /// The read timeout expired while waiting for a reply.
    #[error("Timed out waiting for a reply")]
    TimedOut,

    /// A reply line with no parseable leading status code.
    #[error("Malformed reply: {0}")]
    Malformed(String),

    /// A command did not fit the line buffer.
    #[error("Command formatting error: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Any failure a session operation can report.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Sequencing(#[from] SequencingError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Specialized `Result` type for session operations.
pub type Result<T, E = Error> = anyhow::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequencing_error_display() {
        let err = SequencingError {
            attempted: "RCPT TO",
            state: State::Greeted,
        };
        assert_eq!(err.to_string(), "RCPT TO is not legal in the greeted state");
    }

    #[test]
    fn protocol_error_display() {
        let err = ProtocolError {
            code: 550,
            text: "no such user".to_string(),
        };
        assert_eq!(err.to_string(), "unexpected reply: 550 no such user");
    }

    #[test]
    fn transport_error_display() {
        assert_eq!(
            TransportError::Closed.to_string(),
            "Connection closed by peer"
        );
        assert_eq!(
            TransportError::TimedOut.to_string(),
            "Timed out waiting for a reply"
        );
    }

    #[test]
    fn io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "connection reset");
        let err: TransportError = io_err.into();
        assert!(matches!(err, TransportError::Io(_)));

        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let err: ConnectionError = io_err.into();
        assert!(matches!(
            err,
            ConnectionError::Transport(TransportError::Io(_))
        ));
    }

    #[test]
    fn errors_unify() {
        let err: Error = SequencingError {
            attempted: "DATA",
            state: State::Failed,
        }
        .into();
        assert!(matches!(err, Error::Sequencing(_)));

        let err: Error = TransportError::Closed.into();
        assert!(matches!(err, Error::Transport(_)));
    }
}
