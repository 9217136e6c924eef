use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "confab", version, about = "Interactive terminal AI assistant for your workspace")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage settings without starting a session
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the stored settings and where they live
    Show,
    /// List settings as key = value lines
    List,
    /// Set one setting and persist it
    Set {
        /// One of: apiKey, baseUrl, model, debug
        key: String,
        value: String,
    },
}
