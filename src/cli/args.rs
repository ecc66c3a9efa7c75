//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::adapters::native_ffmpeg::HardwareEncoder;

/// Arguments for the convert command
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input files or directories (directories are expanded recursively)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Conversion profile preset
    #[arg(long)]
    pub preset: Option<String>,

    /// Hardware encoder family for the native path
    #[arg(long)]
    pub hw_encoder: Option<HardwareEncoder>,

    /// Download the legacy converter without asking
    #[arg(long, conflicts_with = "no_download")]
    pub yes: bool,

    /// Never download the legacy converter
    #[arg(long)]
    pub no_download: bool,
}

/// Arguments for the profile command
#[derive(Args, Debug)]
pub struct ProfileArgs {
    /// Conversion profile preset
    #[arg(long)]
    pub preset: Option<String>,

    /// Input used in the printed legacy command
    #[arg(long, default_value = "input.avi")]
    pub input: PathBuf,
}

/// Legacy component actions
#[derive(Subcommand, Debug)]
pub enum ComponentAction {
    /// Show whether the legacy converter is installed
    Status,
    /// Install the legacy converter
    Install,
}

/// Arguments for the component command
#[derive(Args, Debug)]
pub struct ComponentArgs {
    #[command(subcommand)]
    pub action: ComponentAction,
}
