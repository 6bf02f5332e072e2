//! Read-timeout configuration for session exchanges.
//!
//! Every transition is a blocking write-then-read exchange; these bound the
//! read half so a silent peer surfaces as a transport failure instead of a
//! hang. Expiry is reported through the same error kind family as a closed
//! connection.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-phase read timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeouts {
    /// Timeout for establishing the TCP connection.
    ///
    /// Default: 30 seconds
    #[serde(default = "defaults::connect_secs")]
    pub connect_secs: u64,

    /// Timeout for the greeting and identification replies.
    ///
    /// Default: 30 seconds
    #[serde(default = "defaults::greeting_secs")]
    pub greeting_secs: u64,

    /// Timeout for envelope command replies (MAIL FROM, RCPT TO).
    ///
    /// Default: 30 seconds
    #[serde(default = "defaults::command_secs")]
    pub command_secs: u64,

    /// Timeout for the data-mode go-ahead and the end-of-data commit.
    ///
    /// Default: 120 seconds (2 minutes)
    #[serde(default = "defaults::data_secs")]
    pub data_secs: u64,

    /// Timeout for the QUIT reply. Expiry here never fails the send;
    /// closure is best-effort cleanup.
    ///
    /// Default: 10 seconds
    #[serde(default = "defaults::quit_secs")]
    pub quit_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_secs: defaults::connect_secs(),
            greeting_secs: defaults::greeting_secs(),
            command_secs: defaults::command_secs(),
            data_secs: defaults::data_secs(),
            quit_secs: defaults::quit_secs(),
        }
    }
}

impl Timeouts {
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    #[must_use]
    pub const fn greeting_timeout(&self) -> Duration {
        Duration::from_secs(self.greeting_secs)
    }

    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    #[must_use]
    pub const fn data_timeout(&self) -> Duration {
        Duration::from_secs(self.data_secs)
    }

    #[must_use]
    pub const fn quit_timeout(&self) -> Duration {
        Duration::from_secs(self.quit_secs)
    }
}

/// Default timeout values.
mod defaults {
    pub const fn connect_secs() -> u64 {
        30
    }
    pub const fn greeting_secs() -> u64 {
        30
    }
    pub const fn command_secs() -> u64 {
        30
    }
    pub const fn data_secs() -> u64 {
        120 // 2 minutes
    }
    pub const fn quit_secs() -> u64 {
        10
    }
}
