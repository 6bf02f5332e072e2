//! Outbound commands and their wire rendering.
//!
//! Each command occupies a fixed position in the session ordering; the
//! ordering itself is enforced by [`State`](crate::state::State), not here.
//! Commands are stateless and constructed per transition.

use core::fmt::{self, Display, Formatter};

/// A command the client can issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Identify the client to the relay.
    Helo(String),
    /// Declare the envelope sender.
    MailFrom(String),
    /// Declare one envelope recipient.
    RcptTo(String),
    /// Ask to enter data mode.
    Data,
    /// End the session.
    Quit,
}

impl Display for Command {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Helo(id) => fmt.write_fmt(format_args!("HELO {id}")),
            Self::MailFrom(addr) => {
                fmt.write_fmt(format_args!("MAIL FROM:<{}>", bare_address(addr)))
            }
            Self::RcptTo(addr) => fmt.write_fmt(format_args!("RCPT TO:<{}>", bare_address(addr))),
            Self::Data => fmt.write_str("DATA"),
            Self::Quit => fmt.write_str("QUIT"),
        }
    }
}

/// Reduce a possibly phrase-decorated address (`Ada L. <ada@example.com>`)
/// to its bare route form for the envelope. The decorated form is what goes
/// into message headers; the envelope only ever carries the route.
pub(crate) fn bare_address(addr: &str) -> &str {
    match (addr.find('<'), addr.rfind('>')) {
        (Some(start), Some(end)) if start < end => &addr[start + 1..end],
        _ => addr.trim(),
    }
}
