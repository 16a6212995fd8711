//! dpctl: the control console for the dataplane daemon.
//!
//! The grammar engine lives in `dpctl-shell`; this crate supplies what is
//! specific to the daemon: the variable types, the command set, the
//! control-plane client seam and the terminal plumbing.

pub mod commands;
pub mod control;
pub mod line_editor;
pub mod terminal;
pub mod types;

pub use commands::{command_table, prompt, Console, BANNER};
pub use control::{ControlError, ControlPlane, OfflineControlPlane};
pub use types::StandardTypes;
