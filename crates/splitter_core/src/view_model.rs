use crate::{DownloadStatus, JobId, JobState, OutputFormat, Stem};

/// Read-only projection handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub state: JobState,
    pub job_id: Option<JobId>,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub stems: Vec<Stem>,
    pub format: OutputFormat,
    pub progress_percent: u8,
    pub error_message: Option<String>,
    pub available_downloads: Vec<DownloadView>,
    pub downloads: Vec<DownloadRowView>,
    pub can_start: bool,
    pub can_remove: bool,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadView {
    pub stem: Stem,
    pub locator: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRowView {
    pub stem: Stem,
    pub status: DownloadStatus,
}
