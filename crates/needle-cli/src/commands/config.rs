//! Config command implementation.

use crate::cli::ConfigArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use std::path::Path;

/// Execute the config command.
///
/// Prints the effective configuration as TOML; with `--write`, also saves
/// it to `target` (or the default config path).
pub fn execute_config(
    args: ConfigArgs,
    config: &Config,
    target: Option<&Path>,
    formatter: &Formatter,
) -> Result<()> {
    println!("{}", config.to_toml()?);

    if args.write {
        let path = match target {
            Some(path) => path.to_path_buf(),
            None => Config::path()?,
        };
        config.save_to(&path)?;
        println!(
            "{}",
            formatter.success(&format!("Configuration saved to {}", path.display()))
        );
    }

    Ok(())
}
