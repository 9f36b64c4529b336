//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod computers;
pub mod config_cmd;
pub mod laps;
pub mod users;

use adcon_core::Console;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a console-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, console: &Console, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Computers(args) => computers::handle(console, args, global).await,
        Command::Laps(args) => laps::handle(console, args, global).await,
        Command::Users(args) => users::handle(console, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
