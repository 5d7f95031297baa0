use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::api::RoomApi;
use crate::config::ExportConfig;
use crate::error::ChorusResult;
use crate::models::RoomId;

/// Derives the transcript file name from a room name.
///
/// Runs of whitespace become a single `_`; an empty name falls back to `room`.
pub fn transcript_file_name(room_name: &str, suffix: &str) -> String {
    let stem = room_name.split_whitespace().collect::<Vec<_>>().join("_");
    let stem = if stem.is_empty() { "room".to_string() } else { stem };
    format!("{}{}", stem, suffix)
}

/// Fetches server-rendered transcripts and saves them to disk.
pub struct TranscriptExporter {
    api: Arc<dyn RoomApi>,
    config: ExportConfig,
}

impl TranscriptExporter {
    pub fn new(api: Arc<dyn RoomApi>, config: ExportConfig) -> Self {
        Self { api, config }
    }

    pub fn file_name(&self, room_name: &str) -> String {
        transcript_file_name(room_name, &self.config.suffix)
    }

    pub fn target_path(&self, room_name: &str) -> PathBuf {
        self.config.directory().join(self.file_name(room_name))
    }

    pub async fn fetch(&self, room_id: RoomId) -> ChorusResult<String> {
        self.api.export_transcript(room_id).await
    }

    /// Fetches the transcript and writes it into the export directory,
    /// overwriting an earlier export of the same room.
    pub async fn export_transcript(&self, room_id: RoomId, room_name: &str) -> ChorusResult<PathBuf> {
        let text = self.fetch(room_id).await?;

        let path = self.target_path(room_name);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&path, text.as_bytes()).await?;

        info!(room_id = room_id, path = %path.display(), bytes = text.len(), "Transcript exported");
        Ok(path)
    }
}
