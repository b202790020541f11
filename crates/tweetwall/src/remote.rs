//! Mapping of remote-control commands onto a running engine.
//!
//! The transport (MQTT or anything else) lives outside this crate; it only
//! has to turn a received payload into a [`RemoteCommand`].

use crate::engine::{EngineHandle, EngineStatus};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// A command received over the remote-control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    /// Halt the step loop.
    Stop,
    /// Start the sequence over at its first step.
    Restart,
    /// Report the engine status.
    Info,
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RemoteCommand::Stop => "stop",
            RemoteCommand::Restart => "restart",
            RemoteCommand::Info => "info",
        };
        write!(f, "{}", label)
    }
}

/// The payload did not name a known command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown remote command '{0}'")]
pub struct UnknownCommand(pub String);

impl FromStr for RemoteCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stop" => Ok(RemoteCommand::Stop),
            "restart" => Ok(RemoteCommand::Restart),
            "info" => Ok(RemoteCommand::Info),
            _ => Err(UnknownCommand(s.trim().to_string())),
        }
    }
}

impl EngineHandle {
    /// Applies a remote command and returns the resulting status.
    pub fn handle_command(&self, command: RemoteCommand) -> EngineStatus {
        info!("Remote command: {}", command);
        match command {
            RemoteCommand::Stop => self.stop(),
            RemoteCommand::Restart => self.restart(),
            RemoteCommand::Info => {}
        }
        self.status()
    }
}
