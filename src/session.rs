//! The session state machine: one connection, one message.
//!
//! A [`Session`] owns its connection exclusively, advances through the
//! required command ordering one blocking write-then-read exchange at a
//! time, and closes the connection exactly once on every exit path. It is
//! not safe for concurrent use; send concurrent messages with one session
//! (and connection) each.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::command::Command;
use crate::error::{ConnectionError, Error, ProtocolError, Result, SequencingError, TransportError};
use crate::response::Response;
use crate::state::State;
use crate::timeouts::Timeouts;
use crate::transport::Transport;

/// Connect to a relay with the default identification and timeouts.
///
/// Hostname resolution is the caller's concern; pass the resolved (or
/// resolvable) host in.
///
/// # Errors
///
/// [`ConnectionError`] if the socket cannot be opened or the server rejects
/// the greeting or identification exchange.
pub async fn connect(host: &str, port: u16) -> Result<Session<TcpStream>, ConnectionError> {
    Connector::new().connect(host, port).await
}

/// Configuration for establishing sessions.
///
/// The identification string sent with the hello command and the per-phase
/// read timeouts live here; everything else about a session is driven by
/// its transition methods.
#[derive(Debug, Clone)]
pub struct Connector {
    local_id: String,
    timeouts: Timeouts,
}

impl Default for Connector {
    fn default() -> Self {
        Self {
            local_id: "localhost".to_string(),
            timeouts: Timeouts::default(),
        }
    }
}

impl Connector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The name this client identifies itself with. Defaults to
    /// `localhost`; production callers should pass their resolved host
    /// name.
    #[must_use]
    pub fn local_id(mut self, id: impl Into<String>) -> Self {
        self.local_id = id.into();
        self
    }

    #[must_use]
    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Open a TCP connection and perform the session handshake.
    ///
    /// # Errors
    ///
    /// [`ConnectionError`] if the socket cannot be opened within the
    /// connect timeout, or the handshake fails.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn connect(
        &self,
        host: &str,
        port: u16,
    ) -> Result<Session<TcpStream>, ConnectionError> {
        let stream = match timeout(
            self.timeouts.connect_timeout(),
            TcpStream::connect((host, port)),
        )
        .await
        {
            Ok(stream) => stream.map_err(TransportError::Io)?,
            Err(_) => return Err(ConnectionError::Transport(TransportError::TimedOut)),
        };
        self.handshake(stream).await
    }

    /// Perform the greeting and identification exchanges over an
    /// already-open stream.
    ///
    /// This is the substitution point for alternate transport backends: an
    /// in-memory pipe for tests, or a wrapped socket.
    ///
    /// # Errors
    ///
    /// [`ConnectionError`] if either exchange fails; the stream is shut
    /// down before returning.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn handshake<S>(&self, stream: S) -> Result<Session<S>, ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut transport = Transport::new(stream);

        let greeting = match transport.read_reply(self.timeouts.greeting_timeout()).await {
            Ok(reply) => reply,
            Err(err) => {
                transport.close().await;
                return Err(err.into());
            }
        };
        if !greeting.is_success() {
            transport.close().await;
            return Err(ConnectionError::Greeting {
                code: greeting.code,
                text: greeting.message(),
            });
        }

        let hello = Command::Helo(self.local_id.clone());
        if let Err(err) = transport.send_command(&hello).await {
            transport.close().await;
            return Err(err.into());
        }
        let reply = match transport.read_reply(self.timeouts.greeting_timeout()).await {
            Ok(reply) => reply,
            Err(err) => {
                transport.close().await;
                return Err(err.into());
            }
        };
        if !reply.is_success() {
            transport.close().await;
            return Err(ConnectionError::Identification {
                code: reply.code,
                text: reply.message(),
            });
        }

        tracing::debug!(greeting = greeting.code, hello = reply.code, "session established");

        Ok(Session {
            transport,
            state: State::Greeted,
            timeouts: self.timeouts.clone(),
            sender: None,
            to: Vec::new(),
            cc: Vec::new(),
            accepted_recipients: 0,
            headers: Vec::new(),
        })
    }
}

/// One protocol conversation bound to one connection, from greeting to
/// closure.
#[derive(Debug)]
pub struct Session<S> {
    transport: Transport<S>,
    state: State,
    timeouts: Timeouts,
    sender: Option<String>,
    to: Vec<String>,
    cc: Vec<String>,
    accepted_recipients: usize,
    headers: Vec<(String, String)>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    /// The session's current position in the command ordering.
    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// Declare the envelope sender. Legal exactly once, immediately after
    /// the handshake.
    ///
    /// # Errors
    ///
    /// [`SequencingError`] if a sender is already set or the session is
    /// past that point; [`ProtocolError`]/[`TransportError`] if the
    /// exchange fails.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn from(&mut self, address: &str) -> Result<()> {
        self.check(self.state.can_declare_sender(), "MAIL FROM")?;
        let reply = self
            .exchange(Command::MailFrom(address.to_owned()), self.timeouts.command_timeout())
            .await?;
        self.require_success(reply).await?;
        self.sender = Some(address.to_owned());
        self.state = State::SenderSet;
        Ok(())
    }

    /// Declare one recipient. Repeatable; each call is an independent
    /// exchange, and the failure of any one fails the whole session.
    ///
    /// # Errors
    ///
    /// [`SequencingError`] before any sender is set;
    /// [`ProtocolError`]/[`TransportError`] if the exchange fails.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn to(&mut self, address: &str) -> Result<()> {
        self.rcpt(address).await?;
        self.to.push(address.to_owned());
        Ok(())
    }

    /// Declare a carbon-copy recipient: same exchange as [`to`](Self::to),
    /// recorded under the `Cc` header instead.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn cc(&mut self, address: &str) -> Result<()> {
        self.rcpt(address).await?;
        self.cc.push(address.to_owned());
        Ok(())
    }

    /// Declare a blind recipient: declared on the wire, never written into
    /// a header.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn bcc(&mut self, address: &str) -> Result<()> {
        self.rcpt(address).await
    }

    /// Record a header for the data phase. Pure local state, no exchange;
    /// headers recorded after data-mode entry are never transmitted.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_owned(), value.to_owned()));
    }

    /// Record the `Subject` header.
    pub fn set_subject(&mut self, subject: &str) {
        self.set_header("Subject", subject);
    }

    /// Enter data mode. Requires at least one accepted recipient and the
    /// server's *intermediate* go-ahead — the server promises to accept the
    /// body; nothing is committed yet. Writes the header block and returns
    /// the body sink.
    ///
    /// # Errors
    ///
    /// [`SequencingError`] without an accepted recipient;
    /// [`ProtocolError`] if the reply is outside the intermediate class
    /// (no body bytes are sent); [`TransportError`] on I/O failure.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn data(&mut self) -> Result<BodyWriter<'_, S>> {
        self.check(self.state.can_enter_data(), "DATA")?;
        let reply = self
            .exchange(Command::Data, self.timeouts.data_timeout())
            .await?;
        if !reply.is_intermediate() {
            return Err(self
                .fail(ProtocolError {
                    code: reply.code,
                    text: reply.message(),
                })
                .await);
        }
        self.state = State::DataMode;
        tracing::debug!(recipients = self.accepted_recipients, "entering data mode");

        self.transport.begin_body();
        let header_block = self.header_block();
        if let Err(err) = self.transport.write_body(header_block.as_bytes()).await {
            return Err(self.fail(err).await);
        }

        Ok(BodyWriter { session: self })
    }

    /// Terminate the body, confirm the commit, and close the connection.
    ///
    /// The end-of-data reply is where the server actually commits the
    /// message and must be a success; the quit exchange after it is
    /// best-effort cleanup, and closure is not gated on it. The connection
    /// is closed on every exit path.
    ///
    /// # Errors
    ///
    /// [`SequencingError`] outside data mode; [`ProtocolError`] if the
    /// commit is refused; [`TransportError`] on I/O failure.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn send_and_close(&mut self) -> Result<()> {
        self.check(self.state.can_finish(), "end-of-data")?;

        if let Err(err) = self.transport.finish_body().await {
            return Err(self.fail(err).await);
        }
        let commit = match self.transport.read_reply(self.timeouts.data_timeout()).await {
            Ok(reply) => reply,
            Err(err) => return Err(self.fail(err).await),
        };
        if !commit.is_success() {
            return Err(self
                .fail(ProtocolError {
                    code: commit.code,
                    text: commit.message(),
                })
                .await);
        }
        tracing::debug!(code = commit.code, "message committed");

        if self.transport.send_command(&Command::Quit).await.is_ok() {
            let _ = self.transport.read_reply(self.timeouts.quit_timeout()).await;
        }
        self.transport.close().await;
        self.state = State::Sent;
        Ok(())
    }

    /// Abandon the session: best-effort quit, then close. Legal from any
    /// state.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn abort(mut self) {
        if !self.state.is_terminal()
            && self.transport.send_command(&Command::Quit).await.is_ok()
        {
            let _ = self.transport.read_reply(self.timeouts.quit_timeout()).await;
        }
        self.transport.close().await;
    }

    async fn rcpt(&mut self, address: &str) -> Result<()> {
        self.check(self.state.can_add_recipient(), "RCPT TO")?;
        let reply = self
            .exchange(Command::RcptTo(address.to_owned()), self.timeouts.command_timeout())
            .await?;
        self.require_success(reply).await?;
        self.accepted_recipients += 1;
        self.state = State::RecipientSet;
        Ok(())
    }

    /// Guard a transition: sequencing violations are raised before any
    /// bytes are written and leave the session state unchanged.
    fn check(&self, legal: bool, attempted: &'static str) -> Result<(), SequencingError> {
        if legal {
            Ok(())
        } else {
            Err(SequencingError {
                attempted,
                state: self.state,
            })
        }
    }

    /// One write-then-read exchange. Transport failures fail the session.
    async fn exchange(
        &mut self,
        command: Command,
        read_timeout: std::time::Duration,
    ) -> Result<Response> {
        if let Err(err) = self.transport.send_command(&command).await {
            return Err(self.fail(err).await);
        }
        match self.transport.read_reply(read_timeout).await {
            Ok(reply) => Ok(reply),
            Err(err) => Err(self.fail(err).await),
        }
    }

    async fn require_success(&mut self, reply: Response) -> Result<Response> {
        if reply.is_success() {
            Ok(reply)
        } else {
            Err(self
                .fail(ProtocolError {
                    code: reply.code,
                    text: reply.message(),
                })
                .await)
        }
    }

    /// Move to the terminal failed state and release the connection.
    async fn fail(&mut self, err: impl Into<Error>) -> Error {
        self.state = State::Failed;
        self.transport.close().await;
        err.into()
    }

    /// The header block written at data-phase entry: `From`, `To` and `Cc`
    /// derived from the envelope unless the caller already set them, then
    /// all recorded headers in insertion order, then the separating blank
    /// line.
    fn header_block(&self) -> String {
        let mut block = String::new();
        if !self.has_header("From") {
            if let Some(sender) = &self.sender {
                block.push_str(&format!("From: {sender}\r\n"));
            }
        }
        if !self.has_header("To") && !self.to.is_empty() {
            block.push_str(&format!("To: {}\r\n", self.to.join(", ")));
        }
        if !self.has_header("Cc") && !self.cc.is_empty() {
            block.push_str(&format!("Cc: {}\r\n", self.cc.join(", ")));
        }
        for (name, value) in &self.headers {
            block.push_str(&format!("{name}: {value}\r\n"));
        }
        block.push_str("\r\n");
        block
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers
            .iter()
            .any(|(header, _)| header.eq_ignore_ascii_case(name))
    }
}

/// Write sink for the message body.
///
/// Bytes are forwarded verbatim; the escaping of line-leading periods (and
/// the normalization of bare LF line endings) happens at the transport
/// level and is never caller-visible. Drop the writer and call
/// [`Session::send_and_close`] to terminate the body.
#[derive(Debug)]
pub struct BodyWriter<'a, S> {
    session: &'a mut Session<S>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> BodyWriter<'_, S> {
    /// Stream a chunk of body bytes.
    ///
    /// # Errors
    ///
    /// [`TransportError`] on I/O failure (the session moves to its failed
    /// state); [`SequencingError`] if the session already failed mid-body.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.session.check(self.session.state.can_finish(), "body write")?;
        if let Err(err) = self.session.transport.write_body(chunk).await {
            return Err(self.session.fail(err).await);
        }
        Ok(())
    }

    /// Write one body line; the line terminator is supplied.
    ///
    /// # Errors
    ///
    /// As [`write`](Self::write).
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        self.write(line.as_bytes()).await?;
        self.write(b"\r\n").await
    }
}
