//! Config subcommand handlers.

use panelwatch_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::load_config;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = load_config(global)?.redacted();
            let toml = cfg.to_toml()?;
            let rendered = output::render_single(&global.output, &cfg, |_: &Config| toml.clone())?;
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            let path = global
                .config
                .clone()
                .unwrap_or_else(panelwatch_config::config_path);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }
    }
}
