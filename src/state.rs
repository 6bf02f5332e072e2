//! Client-side session states and their legality rules.

use core::fmt::{self, Display, Formatter};

/// Where a session currently stands in the required command ordering.
///
/// States advance strictly forward; [`Sent`](State::Sent) and
/// [`Failed`](State::Failed) are terminal and accept no further transitions.
/// The pre-greeting connected state is transient inside the connect
/// handshake and never observable on a constructed session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum State {
    /// Greeting and identification accepted; no envelope yet.
    #[default]
    Greeted,
    /// Envelope sender accepted by the server.
    SenderSet,
    /// At least one recipient accepted by the server.
    RecipientSet,
    /// DATA accepted; body bytes may flow.
    DataMode,
    /// End-of-data committed and the connection closed.
    Sent,
    /// An exchange failed; the connection is closed.
    Failed,
}

impl State {
    /// The sender may be declared exactly once, immediately after the
    /// handshake.
    #[must_use]
    pub const fn can_declare_sender(self) -> bool {
        matches!(self, Self::Greeted)
    }

    /// Recipients may be added once a sender is set, repeatedly.
    #[must_use]
    pub const fn can_add_recipient(self) -> bool {
        matches!(self, Self::SenderSet | Self::RecipientSet)
    }

    /// Data mode requires at least one accepted recipient.
    #[must_use]
    pub const fn can_enter_data(self) -> bool {
        matches!(self, Self::RecipientSet)
    }

    /// The end-of-data marker is only legal while in data mode.
    #[must_use]
    pub const fn can_finish(self) -> bool {
        matches!(self, Self::DataMode)
    }

    /// Terminal states accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }
}

impl Display for State {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        fmt.write_str(match self {
            Self::Greeted => "greeted",
            Self::SenderSet => "sender-set",
            Self::RecipientSet => "recipient-set",
            Self::DataMode => "data-mode",
            Self::Sent => "sent",
            Self::Failed => "failed",
        })
    }
}
