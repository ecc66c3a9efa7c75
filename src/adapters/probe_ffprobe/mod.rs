//! FFprobe adapter for media duration probing

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::DomainError;
use crate::ports::ProbePort;

/// FFprobe-based probe adapter
pub struct FfprobeAdapter {
    binary: PathBuf,
}

impl FfprobeAdapter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Container duration from `-show_entries format=duration -of json` output
pub fn parse_duration_json(json: &str) -> Result<Duration, DomainError> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| DomainError::Probe(format!("ffprobe JSON parse error: {}", e)))?;

    let seconds = output
        .format
        .and_then(|format| format.duration)
        .and_then(|value| value.trim().parse::<f64>().ok())
        .ok_or_else(|| DomainError::Probe("ffprobe reported no duration".to_string()))?;

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(DomainError::Probe(format!("invalid duration: {}", seconds)));
    }
    Ok(Duration::from_secs_f64(seconds))
}

#[async_trait]
impl ProbePort for FfprobeAdapter {
    async fn duration(&self, path: &Path) -> Result<Duration, DomainError> {
        let output = Command::new(&self.binary)
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "json"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                DomainError::Probe(format!(
                    "failed to spawn {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DomainError::Probe(format!(
                "ffprobe exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let duration = parse_duration_json(&String::from_utf8_lossy(&output.stdout))?;
        debug!("Probed duration of {}: {:?}", path.display(), duration);
        Ok(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_json() {
        let json = r#"{ "format": { "duration": "12.480000" } }"#;
        assert_eq!(
            parse_duration_json(json).unwrap(),
            Duration::from_secs_f64(12.48)
        );
    }

    #[test]
    fn test_missing_duration_is_an_error() {
        assert!(matches!(
            parse_duration_json(r#"{ "format": {} }"#),
            Err(DomainError::Probe(_))
        ));
        assert!(parse_duration_json(r#"{}"#).is_err());
        assert!(parse_duration_json(r#"{ "format": { "duration": "N/A" } }"#).is_err());
        assert!(parse_duration_json("not json").is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_probe_error() {
        let adapter = FfprobeAdapter::new("/nonexistent/ffprobe-binary");
        assert!(matches!(
            adapter.duration(Path::new("/tmp/a.avi")).await,
            Err(DomainError::Probe(_))
        ));
    }
}
