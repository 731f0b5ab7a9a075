use crate::events::{AppEvent, PointerKind};
use slotbay::SlotIndex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One line of the control socket protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Pointer(PointerKind, SlotIndex),
    Status,
    Reload,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("'{0}' needs a slot number")]
    MissingSlot(PointerKind),
    #[error("'{0}' is not a slot number")]
    BadSlot(String),
    #[error("slot {slot} does not exist ({count} slots)")]
    NoSuchSlot { slot: SlotIndex, count: usize },
    #[error("unexpected '{0}'")]
    Trailing(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(CommandError::Empty)?;

        let command = match verb.to_ascii_lowercase().as_str() {
            "status" => Command::Status,
            "reload" => Command::Reload,
            other => {
                let kind = PointerKind::from_str(other)
                    .map_err(|_| CommandError::Unknown(verb.to_string()))?;
                let slot = words.next().ok_or(CommandError::MissingSlot(kind))?;
                let slot = slot
                    .parse::<usize>()
                    .map_err(|_| CommandError::BadSlot(slot.to_string()))?;
                Command::Pointer(kind, SlotIndex::new(slot))
            }
        };

        match words.next() {
            Some(extra) => Err(CommandError::Trailing(extra.to_string())),
            None => Ok(command),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Pointer(kind, slot) => write!(f, "{kind} {slot}"),
            Command::Status => f.write_str("status"),
            Command::Reload => f.write_str("reload"),
        }
    }
}

impl Command {
    /// Turns a parsed line into a deck event, rejecting slots the deck does
    /// not have. `Status` is answered by the server and has no event.
    pub fn into_event(self, slot_count: usize) -> Result<Option<AppEvent>, CommandError> {
        match self {
            Command::Pointer(_, slot) if *slot >= slot_count => Err(CommandError::NoSuchSlot {
                slot,
                count: slot_count,
            }),
            Command::Pointer(kind, slot) => Ok(Some(AppEvent::Pointer(kind, slot))),
            Command::Reload => Ok(Some(AppEvent::ConfigReload)),
            Command::Status => Ok(None),
        }
    }
}
