//! Configuration commands.

use clap::Subcommand;
use dayplan_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the path of the configuration file
    Path,
    /// Write the current configuration (creating the file with defaults)
    Init,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
        ConfigAction::Init => {
            let config = Config::load()?;
            config.save()?;
            println!("Configuration written to {}", Config::path()?.display());
        }
    }
    Ok(())
}
