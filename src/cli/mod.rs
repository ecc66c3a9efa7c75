//! CLI module for av-converter
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::utils::logging::LogLevel;

pub mod args;
pub mod commands;
pub mod render;

pub use args::{ComponentAction, ComponentArgs, ConvertArgs, ProfileArgs};

/// Batch video converter
///
/// Tries the hardware encoder first and falls back to a downloadable
/// software converter for legacy formats.
#[derive(Parser, Debug)]
#[command(name = "av-converter")]
#[command(about = "Convert legacy camera videos with hardware encoding and software fallback")]
#[command(version)]
pub struct Cli {
    /// Configuration file
    #[arg(long, env = "AVCONV_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Machine-readable output
    #[arg(long, global = true)]
    pub json: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert videos into the media library
    Convert(ConvertArgs),
    /// Show the active conversion profile
    Profile(ProfileArgs),
    /// Manage the legacy converter component
    Component(ComponentArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::native_ffmpeg::HardwareEncoder;

    #[test]
    fn test_parse_convert() {
        let cli = Cli::parse_from([
            "av-converter",
            "--log-level",
            "debug",
            "convert",
            "a.avi",
            "clips/",
            "--hw-encoder",
            "qsv",
            "--yes",
        ]);
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        match cli.command {
            Commands::Convert(args) => {
                assert_eq!(args.inputs.len(), 2);
                assert_eq!(args.hw_encoder, Some(HardwareEncoder::Qsv));
                assert!(args.yes);
                assert!(!args.no_download);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_yes_conflicts_with_no_download() {
        let result = Cli::try_parse_from(["av-converter", "convert", "a.avi", "--yes", "--no-download"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_component_status() {
        let cli = Cli::parse_from(["av-converter", "--json", "component", "status"]);
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Component(ComponentArgs {
                action: ComponentAction::Status
            })
        ));
    }
}
