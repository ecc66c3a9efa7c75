//! Command implementations

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::app::component_gate::ComponentGate;
use crate::app::container::{component_binary, AppContainer};
use crate::app::convert_interactor::DOWNLOAD_FAILED_MESSAGE;
use crate::app::publisher::{StateObserver, StatePublisher};
use crate::cli::args::{ComponentAction, ComponentArgs, ConvertArgs, ProfileArgs};
use crate::cli::render::{ConsoleRenderer, JsonRenderer};
use crate::domain::model::{ConversionProfile, PresentationState, SourceRef};
use crate::engine::LegacyCommand;
use crate::utils::format_file_size;

fn renderer(json: bool) -> Arc<dyn StateObserver> {
    if json {
        JsonRenderer::stdout()
    } else {
        ConsoleRenderer::stdout()
    }
}

/// Files named on the command line; directories contribute their files in path order
pub fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<SourceRef>> {
    let mut sources = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut files = Vec::new();
            for entry in WalkDir::new(input).follow_links(true) {
                let entry = entry
                    .with_context(|| format!("Failed to read directory {}", input.display()))?;
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
            files.sort();
            info!("Expanded {} into {} file(s)", input.display(), files.len());
            sources.extend(files.iter().map(|path| SourceRef::from_path(path)));
        } else {
            sources.push(SourceRef::from_path(input));
        }
    }
    Ok(sources)
}

/// Ask on the terminal whether to download the legacy converter
async fn ask_for_download(reason: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || -> std::io::Result<bool> {
        let mut stderr = std::io::stderr();
        write!(stderr, "{} [y/N] ", reason)?;
        stderr.flush()?;
        let mut answer = String::new();
        std::io::stdin().lock().read_line(&mut answer)?;
        let answer = answer.trim().to_ascii_lowercase();
        Ok(answer == "y" || answer == "yes")
    })
    .await
    .context("Prompt task failed")?
    .context("Failed to read answer")
}

/// Execute the convert command
pub async fn convert(container: &dyn AppContainer, args: ConvertArgs, json: bool) -> Result<()> {
    let sources = expand_inputs(&args.inputs)?;
    if sources.is_empty() {
        return Err(anyhow::anyhow!("No input files found"));
    }
    info!(
        "Converting {} file(s) with profile {}",
        sources.len(),
        container.profile().name
    );

    let mut interactor = container.convert_interactor();
    interactor.add_observer(renderer(json));

    let canceller = interactor.cancel_handle();
    // Every Ctrl-C cancels, including one pressed at the download prompt
    let interrupt = tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling batch");
            canceller.cancel();
        }
    });

    let mut state = interactor.submit(sources).await;
    let result = loop {
        match state {
            PresentationState::LegacyFormatDetected { reason } => {
                let download = if args.yes {
                    true
                } else if args.no_download {
                    false
                } else {
                    ask_for_download(reason).await?
                };
                state = if download {
                    interactor.confirm_legacy_download().await
                } else {
                    interactor.dismiss_legacy();
                    break Err(anyhow::anyhow!("Legacy converter download declined"));
                };
            }
            PresentationState::Success { count } => {
                info!("Converted {} file(s)", count);
                break Ok(());
            }
            PresentationState::Error { message } => break Err(anyhow::anyhow!(message)),
            PresentationState::Idle => break Err(anyhow::anyhow!("Conversion cancelled")),
            other => {
                break Err(anyhow::anyhow!(
                    "Conversion stopped in unexpected state: {}",
                    other.label()
                ))
            }
        }
    };

    interrupt.abort();
    result
}

fn print_profile(profile: &ConversionProfile, command: &str) {
    println!("Conversion Profile");
    println!("==================");
    println!("Name: {}", profile.name);
    println!("Video: {} @ {} bps ({:?})", profile.video_codec.mime_type(), profile.video_bitrate, profile.bitrate_mode);
    println!(
        "Encoder: profile {}, level {}, keyframe every {}s",
        profile.encoder_profile.as_str(),
        profile.encoder_level.as_str(),
        profile.keyframe_interval
    );
    match profile.crf {
        Some(crf) => println!("Quality: CRF {} ({} preset)", crf, profile.encoder_preset.as_str()),
        None => println!("Quality: bitrate driven ({} preset)", profile.encoder_preset.as_str()),
    }
    if let Some(resolution) = profile.target_resolution {
        println!("Resolution: {}x{}", resolution.width, resolution.height);
    }
    println!("Audio: {} @ {} bps", profile.audio_codec.mime_type(), profile.audio_bitrate);
    println!(
        "Output: Movies/{}/{}<timestamp>.{}",
        profile.output_directory, profile.filename_prefix, profile.file_extension
    );
    println!();
    println!("Legacy command:");
    println!("  ffmpeg {}", command);
}

/// Execute the profile command
pub fn profile(container: &dyn AppContainer, args: ProfileArgs, json: bool) -> Result<()> {
    let profile = container.profile();
    let output = PathBuf::from(format!(
        "{}output.{}",
        profile.temp_filename_prefix, profile.file_extension
    ));
    let command = LegacyCommand::new(profile, &args.input, &output).build();

    if json {
        let document = json!({
            "profile": profile,
            "legacy_command": command,
        });
        let text = serde_json::to_string_pretty(&document)
            .context("Failed to serialize profile to JSON")?;
        println!("{}", text);
    } else {
        print_profile(profile, &command);
    }
    Ok(())
}

fn installed_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}

/// Execute the component command
pub async fn component(container: &dyn AppContainer, args: ComponentArgs, json: bool) -> Result<()> {
    let config = container.config();
    let component_id = config.legacy.component_id.clone();
    let installer = container.installer();
    let component_dir = config.paths.components_dir.join(&component_id);

    match args.action {
        ComponentAction::Status => {
            let installed = installer.is_installed(&component_id);
            if json {
                let document = json!({
                    "component": component_id,
                    "installed": installed,
                    "path": component_dir,
                    "ffmpeg": component_binary(config, "ffmpeg"),
                });
                println!("{}", document);
            } else if installed {
                println!(
                    "{}: installed at {} ({})",
                    component_id,
                    component_dir.display(),
                    format_file_size(installed_size(&component_dir))
                );
            } else {
                println!("{}: not installed", component_id);
            }
            Ok(())
        }
        ComponentAction::Install => {
            let publisher = StatePublisher::new();
            publisher.add_observer(renderer(json));
            let gate = ComponentGate::new(installer, component_id.clone(), publisher);
            if gate.is_installed() {
                println!("{} is already installed", component_id);
                return Ok(());
            }
            if gate.ensure_installed().await {
                println!("{} installed", component_id);
                Ok(())
            } else {
                Err(anyhow::anyhow!(DOWNLOAD_FAILED_MESSAGE))
            }
        }
    }
}
