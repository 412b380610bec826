//! Config command handlers

use crate::cli::ConfigInitArgs;
use anyhow::{bail, Context};
use std::fs;

const EXAMPLE_CONFIG: &str = include_str!("../../regis.example.toml");

/// Handle `regis config init` command
pub fn handle_config_init(args: &ConfigInitArgs) -> anyhow::Result<()> {
    if args.output.exists() && !args.force {
        bail!(
            "File already exists: {}. Use --force to overwrite.",
            args.output.display()
        );
    }

    fs::write(&args.output, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!("✓ Configuration file created: {}", args.output.display());
    println!("  Add your API keys to .env, then run `regis serve`.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegisConfig;

    #[test]
    fn test_config_init_creates_loadable_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output_path = temp_dir.path().join("regis.toml");

        let args = ConfigInitArgs {
            output: output_path.clone(),
            force: false,
        };

        handle_config_init(&args).unwrap();

        let config = RegisConfig::load(Some(&output_path)).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_init_no_overwrite() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output_path = temp_dir.path().join("regis.toml");
        std::fs::write(&output_path, "existing").unwrap();

        let args = ConfigInitArgs {
            output: output_path.clone(),
            force: false,
        };

        let err = handle_config_init(&args).unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert_eq!(std::fs::read_to_string(&output_path).unwrap(), "existing");
    }

    #[test]
    fn test_config_init_force_overwrites() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output_path = temp_dir.path().join("regis.toml");
        std::fs::write(&output_path, "old content").unwrap();

        let args = ConfigInitArgs {
            output: output_path.clone(),
            force: true,
        };

        handle_config_init(&args).unwrap();
        let content = std::fs::read_to_string(&output_path).unwrap();
        assert!(content.contains("[server]"));
    }
}
