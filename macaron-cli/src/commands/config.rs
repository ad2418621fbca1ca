//! `config` command: inspect and edit the configuration file.

use clap::Subcommand;
use macaron::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print a value
    Get {
        /// Key as section.key (e.g. download.fetcher)
        key: String,
    },

    /// Change a value
    Set {
        /// Key as section.key (e.g. download.fetcher)
        key: String,

        /// New value; empty clears optional paths
        value: String,
    },

    /// Print every setting
    List,

    /// Print the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => run_get(&key),
        ConfigCommands::Set { key, value } => run_set(&key, &value),
        ConfigCommands::List => run_list(),
        ConfigCommands::Path => run_path(),
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'macaron config list' to see available keys.",
            key
        ))
    })
}

fn run_get(key: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let config = ConfigFile::load()?;

    println!("{}", display_value(&config_key.get(&config)));
    Ok(())
}

fn run_set(key: &str, value: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;

    let mut config = ConfigFile::load()?;
    config_key.set(&mut config, value)?;
    config.save()?;

    println!(
        "Set {} = {}",
        config_key.name(),
        display_value(&config_key.get(&config))
    );
    Ok(())
}

fn run_list() -> Result<(), CliError> {
    let config = ConfigFile::load()?;

    println!("{}", render_settings(&config));
    Ok(())
}

fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path().display());
    Ok(())
}

fn display_value(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}

/// Render every key grouped by section.
fn render_settings(config: &ConfigFile) -> String {
    let mut lines = Vec::new();
    let mut current_section = "";

    for key in ConfigKey::all() {
        let section = key.section();
        if section != current_section {
            if !current_section.is_empty() {
                lines.push(String::new());
            }
            lines.push(format!("[{}]", section));
            current_section = section;
        }

        lines.push(format!(
            "  {} = {}",
            key.key_name(),
            display_value(&key.get(config))
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_key_message() {
        let err = parse_key("download.speed").unwrap_err();
        assert!(err.to_string().contains("macaron config list"));
    }

    #[test]
    fn test_render_settings_groups_sections() {
        let rendered = render_settings(&ConfigFile::default());

        let headers: Vec<_> = rendered
            .lines()
            .filter(|line| line.starts_with('['))
            .collect();
        assert_eq!(headers, vec!["[catalog]", "[download]", "[logging]"]);
        assert!(rendered.contains("  output_dir = (not set)"));
        assert!(rendered.contains("  fetcher = curl"));
    }
}
