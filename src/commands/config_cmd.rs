use anyhow::Result;

use crate::cli::ConfigCommand;
use crate::config;

/// One-shot `confab config <show|list|set>` without entering a session.
pub fn handle_config(command: ConfigCommand) -> Result<()> {
    let path = config::config_path()?;
    let mut cfg = config::load_or_default(&path);
    match command {
        ConfigCommand::Show => {
            print!("{}", toml::to_string_pretty(&cfg)?);
            println!("Config path: {}", path.display());
        }
        ConfigCommand::List => {
            for (key, value) in cfg.list() {
                println!("{key} = {value}");
            }
        }
        ConfigCommand::Set { key, value } => {
            config::set_and_save(&mut cfg, &path, &key, &value)?;
            println!("Configuration updated: {key}");
        }
    }
    Ok(())
}
