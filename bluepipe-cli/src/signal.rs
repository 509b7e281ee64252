//! Termination signal handling
//!
//! Resolves once SIGTERM or SIGINT arrives (Ctrl-C on non-unix platforms),
//! so the caller can kill its tracked instances before exiting.

use std::io;

/// A termination signal that was received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    name: &'static str,
    number: i32,
}

impl Signal {
    pub const INT: Signal = Signal {
        name: "SIGINT",
        number: 2,
    };

    pub const TERM: Signal = Signal {
        name: "SIGTERM",
        number: 15,
    };

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn number(&self) -> i32 {
        self.number
    }

    /// Conventional process exit code after being terminated by this signal
    pub fn exit_code(&self) -> u8 {
        (128 + self.number) as u8
    }
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
pub async fn termination() -> io::Result<Signal> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => Ok(Signal::TERM),
        _ = sigint.recv() => Ok(Signal::INT),
    }
}

/// Wait for Ctrl-C
#[cfg(not(unix))]
pub async fn termination() -> io::Result<Signal> {
    tokio::signal::ctrl_c().await?;
    Ok(Signal::INT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Signal::INT.exit_code(), 130);
        assert_eq!(Signal::TERM.exit_code(), 143);
        assert_eq!(Signal::TERM.name(), "SIGTERM");
    }
}
