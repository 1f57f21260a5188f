//! Hand-off of the selected clip to downstream consumers.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tclip_engine::SelectionReport;
use tracing::{debug, info};

use crate::error::{WorkerError, WorkerResult};

/// Receives the outcome of a successful selection run.
#[async_trait]
pub trait SelectionConsumer: Send + Sync {
    async fn consume(&self, report: &SelectionReport) -> WorkerResult<()>;

    fn name(&self) -> &'static str;
}

/// Emits the selection as one structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogConsumer;

#[async_trait]
impl SelectionConsumer for LogConsumer {
    async fn consume(&self, report: &SelectionReport) -> WorkerResult<()> {
        let result = &report.result;
        info!(
            clip_id = %result.id,
            url = %result.url,
            title = %result.title,
            views = result.view_count,
            creator = %result.creator_display_name,
            basis = %result.basis,
            fetched = report.counts.fetched,
            after_filter = report.counts.after_filter,
            filter_fallback_used = report.filter_fallback_used,
            "Clip selected"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Writes the selected clip as pretty JSON to a file.
///
/// Parent directories are created. The file is written next to its final
/// path first and renamed into place, so readers never see a partial file.
#[derive(Debug, Clone)]
pub struct JsonFileConsumer {
    path: PathBuf,
}

impl JsonFileConsumer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> WorkerResult<PathBuf> {
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| WorkerError::output(format!("not a file path: {}", self.path.display())))?;
        let mut staging = file_name.to_os_string();
        staging.push(".tmp");
        Ok(self.path.with_file_name(staging))
    }
}

#[async_trait]
impl SelectionConsumer for JsonFileConsumer {
    async fn consume(&self, report: &SelectionReport) -> WorkerResult<()> {
        let body = serde_json::to_string_pretty(&report.result)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let staging = self.staging_path()?;
        tokio::fs::write(&staging, body.as_bytes()).await?;
        tokio::fs::rename(&staging, &self.path).await?;

        debug!(path = %self.path.display(), bytes = body.len(), "Wrote selection");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "json_file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tclip_engine::StageCounts;
    use tclip_models::{Clip, SelectionBasis, SelectionResult};

    fn report() -> SelectionReport {
        let clip = Clip::new("clip-1", "https://clips.twitch.tv/clip-1", 150, "42")
            .with_title("  Big play  ")
            .with_creator_display_name("Streamer");
        SelectionReport {
            result: SelectionResult::from_clip(&clip, SelectionBasis::RawPopularity),
            counts: StageCounts {
                fetched: 3,
                after_filter: 2,
                qualifying_creators: 0,
            },
            winning_creator: None,
            filter_fallback_used: false,
        }
    }

    #[tokio::test]
    async fn test_log_consumer() {
        assert!(LogConsumer.consume(&report()).await.is_ok());
        assert_eq!(LogConsumer.name(), "log");
    }

    #[tokio::test]
    async fn test_json_file_consumer_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/selection.json");
        let consumer = JsonFileConsumer::new(&path);

        consumer.consume(&report()).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: SelectionResult = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.id.as_str(), "clip-1");
        assert_eq!(parsed.title, "Big play");
        assert_eq!(parsed.basis, SelectionBasis::RawPopularity);
        assert!(!path.with_file_name("selection.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_json_file_consumer_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selection.json");
        std::fs::write(&path, "stale").unwrap();

        JsonFileConsumer::new(&path).consume(&report()).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"clip-1\""));
    }

    #[tokio::test]
    async fn test_json_file_consumer_rejects_directory_path() {
        let err = JsonFileConsumer::new("/").consume(&report()).await.unwrap_err();
        assert!(matches!(err, WorkerError::Output(_)));
    }
}
