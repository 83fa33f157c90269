//! Trigger Adapters
//!
//! TigerStyle: Turn a host event into a [`RenameRequest`]. Activation and
//! dispatch belong to the host; the adapters only extract.

pub mod autonomous;
pub mod command;

pub use autonomous::{ActionParams, ActivationMode, AutonomousTrigger};
pub use command::CommandTrigger;

use crate::pipeline::RenameRequest;

/// Anything that can produce a rename request
pub trait Trigger {
    fn extract(&self) -> RenameRequest;
}

/// Reason text, defaulted when absent or blank
pub(crate) fn reason_or_default(reason: Option<&str>) -> String {
    reason
        .filter(|r| !r.trim().is_empty())
        .unwrap_or(crate::REASON_DEFAULT)
        .to_string()
}
