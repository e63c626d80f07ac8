//! System command handlers.

use tabled::Tabled;

use smartcocoon_api::System;

use crate::cli::{GlobalOpts, SystemsArgs, SystemsCommand};
use crate::error::CliError;
use crate::output;

use super::util::Session;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SystemRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Rooms")]
    rooms: usize,
    #[tabled(rename = "Fans")]
    fans: usize,
}

impl From<&System> for SystemRow {
    fn from(s: &System) -> Self {
        Self {
            id: output::opt(s.id()),
            name: s.name_location(),
            rooms: s.rooms().len(),
            fans: s.fans().len(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: SystemsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        SystemsCommand::List => {
            let mut session = Session::open(global).await?;
            let result = session.systems().await.map(|systems| {
                let out = output::render_list(global.output, &systems, |s| SystemRow::from(s), |s| {
                    output::opt(s.id())
                });
                output::print_output(&out, global.quiet);
            });
            session.finish(result).await
        }
    }
}
