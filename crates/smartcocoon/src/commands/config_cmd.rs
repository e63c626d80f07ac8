//! Config subcommand handlers.

use smartcocoon_config::{Config, config_path, load_config_or_default};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "<redacted>";

/// Copy of the config with secrets masked.
fn redacted(mut cfg: Config) -> Config {
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some(REDACTED.into());
        }
        if profile.access_token.is_some() {
            profile.access_token = Some(REDACTED.into());
        }
    }
    cfg
}

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = redacted(load_config_or_default());
            let out = output::render_single(
                global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("<unrenderable: {e}>")),
                |c| c.profiles.keys().cloned().collect::<Vec<_>>().join("\n"),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
        ConfigCommand::Path => {
            output::print_output(&config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}
