use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{AppError, AppResult};

#[async_trait]
pub trait Normalizer: Send + Sync {
    /// Transcodes `input` into mono 16 kHz signed 16-bit PCM at `output`.
    /// Writes exactly one file; never touches the input.
    async fn normalize(&self, input: &Path, output: &Path) -> AppResult<()>;
}

pub struct FfmpegNormalizer {
    binary: PathBuf,
}

impl FfmpegNormalizer {
    pub fn new() -> Self {
        Self::with_binary("ffmpeg")
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfmpegNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Normalizer for FfmpegNormalizer {
    async fn normalize(&self, input: &Path, output: &Path) -> AppResult<()> {
        let launched = Command::new(&self.binary)
            .arg("-i")
            .arg(input)
            .args(["-ar", "16000", "-ac", "1", "-c:a", "pcm_s16le", "-y"])
            .arg(output)
            .output()
            .await;

        let result = match launched {
            Ok(result) => result,
            Err(error) => {
                return Err(AppError::AudioConversion(format!(
                    "failed to launch {}: {error}",
                    self.binary.display()
                )));
            }
        };

        let mut combined = String::from_utf8_lossy(&result.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&result.stderr));

        if !result.status.success() {
            tracing::warn!(status = %result.status, log = %combined.trim(), "ffmpeg conversion failed");
            return Err(AppError::AudioConversion(format!(
                "ffmpeg exited with {}",
                result.status
            )));
        }

        tracing::debug!(log = %combined.trim(), "ffmpeg conversion finished");
        Ok(())
    }
}
