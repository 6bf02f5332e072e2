//! A single-shot SMTP submission client.
//!
//! One [`Session`] drives one message over one connection: connect, declare
//! the sender and recipients, stream the body, commit, close. The session
//! enforces the server's required command ordering and turns any deviation
//! — an unexpected reply class, a premature disconnect — into a typed
//! error. It performs no retries, no pooling, no TLS and no authentication;
//! retry policy belongs to the caller.
//!
//! # Examples
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = missive::connect("mail.example.com", 25).await?;
//! session.from("sender@example.com").await?;
//! session.to("recipient@example.com").await?;
//! session.set_subject("Greetings");
//! let mut body = session.data().await?;
//! body.write_line("Hello from missive.").await?;
//! session.send_and_close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configured connection
//!
//! ```no_run
//! use missive::{Connector, Timeouts};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Connector::new()
//!     .local_id("client.example.com")
//!     .timeouts(Timeouts {
//!         command_secs: 10,
//!         ..Timeouts::default()
//!     })
//!     .connect("mail.example.com", 587)
//!     .await?;
//! session.from("sender@example.com").await?;
//! session.to("one@example.com").await?;
//! session.cc("two@example.com").await?;
//! session.bcc("archive@example.com").await?;
//! let mut body = session.data().await?;
//! body.write(b"A body streamed in chunks.").await?;
//! session.send_and_close().await?;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod error;
pub mod response;
pub mod session;
pub mod state;
pub mod timeouts;

mod transport;

pub use command::Command;
pub use error::{
    ConnectionError, Error, ProtocolError, Result, SequencingError, TransportError,
};
pub use response::{Response, ResponseLine};
pub use session::{connect, BodyWriter, Connector, Session};
pub use state::State;
pub use timeouts::Timeouts;
