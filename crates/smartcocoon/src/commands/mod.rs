//! Command dispatch: bridges CLI args -> client/coordinator -> output formatting.

pub mod config_cmd;
pub mod fans;
pub mod setup;
pub mod systems;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a service-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Setup => setup::handle_setup(global).await,
        Command::Login => setup::handle_login(global).await,
        Command::Systems(args) => systems::handle(args, global).await,
        Command::Fans(args) => fans::handle(args, global).await,
        Command::Watch(args) => watch::handle(args, global).await,
        Command::Config(args) => config_cmd::handle(&args, global),
        // Completions are handled before dispatch
        Command::Completions(_) => unreachable!(),
    }
}
