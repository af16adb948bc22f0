use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::access::{self, AccessError};
use crate::effect::Effect;
use crate::view_model::{AppViewModel, DownloadRowView, DownloadView};
use crate::{OutputFormat, Stem, StemSet};

pub type JobId = u64;

/// Where a file selection came from. Both sources behave identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSource {
    Picker,
    Drop,
}

/// The audio file chosen by the user. Replaced wholesale on every new pick/drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    content: Arc<[u8]>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, content: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &Arc<[u8]> {
        &self.content
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("size", &self.size())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Idle,
    FileReady,
    Submitting,
    Tracking,
    Completed,
    Failed,
}

/// Stem locators returned by the service when a job is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobHandle {
    pub vocals: Option<String>,
    pub instrumental: Option<String>,
}

/// Download locators of a completed job, limited to the stems requested at submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    vocals_path: Option<String>,
    instrumental_path: Option<String>,
}

impl JobResult {
    fn from_handle(handle: &JobHandle, requested: &StemSet) -> Self {
        let pick = |stem: Stem, path: &Option<String>| {
            if requested.contains(stem) {
                path.clone()
            } else {
                None
            }
        };
        Self {
            vocals_path: pick(Stem::Vocals, &handle.vocals),
            instrumental_path: pick(Stem::Instrumental, &handle.instrumental),
        }
    }

    pub fn path(&self, stem: Stem) -> Option<&str> {
        match stem {
            Stem::Vocals => self.vocals_path.as_deref(),
            Stem::Instrumental => self.instrumental_path.as_deref(),
        }
    }
}

/// Result of the submission network call, as reported back by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted(JobHandle),
    Rejected(String),
    TransportError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    Pending,
    Saved(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Job {
    id: Option<JobId>,
    state: JobState,
    progress: u8,
    submitted_stems: StemSet,
    handle: Option<JobHandle>,
    result: Option<JobResult>,
    error: Option<String>,
    downloads: BTreeMap<Stem, DownloadStatus>,
}

impl Job {
    fn ready() -> Self {
        Self {
            state: JobState::FileReady,
            ..Self::default()
        }
    }
}

/// Single owner of the selection, the live job and the open progress stream.
///
/// Fields are private; every change goes through [`crate::update`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    selection: Option<SelectedFile>,
    stems: StemSet,
    format: OutputFormat,
    job: Job,
    next_job_id: JobId,
    open_stream: Option<JobId>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_state(&self) -> JobState {
        self.job.state
    }

    pub fn current_job_id(&self) -> Option<JobId> {
        self.job.id
    }

    pub fn selection(&self) -> Option<&SelectedFile> {
        self.selection.as_ref()
    }

    pub fn stems(&self) -> &StemSet {
        &self.stems
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn progress_percent(&self) -> u8 {
        self.job.progress
    }

    pub fn error_message(&self) -> Option<&str> {
        self.job.error.as_deref()
    }

    pub fn result(&self) -> Option<&JobResult> {
        self.job.result.as_ref()
    }

    /// Job whose progress stream is currently open, if any.
    pub fn open_stream(&self) -> Option<JobId> {
        self.open_stream
    }

    /// Resolves the download locator for `stem` in `format`.
    ///
    /// Only valid once the job is `Completed` and the stem was requested and returned.
    pub fn resolve_download_target(
        &self,
        stem: Stem,
        format: OutputFormat,
    ) -> Result<String, AccessError> {
        access::resolve_download_target(self.job.state, self.job.result.as_ref(), stem, format)
    }

    pub fn view(&self) -> AppViewModel {
        let available_downloads = if self.job.state == JobState::Completed {
            Stem::ALL
                .into_iter()
                .filter_map(|stem| {
                    self.resolve_download_target(stem, self.format)
                        .ok()
                        .map(|locator| DownloadView { stem, locator })
                })
                .collect()
        } else {
            Vec::new()
        };

        AppViewModel {
            state: self.job.state,
            job_id: self.job.id,
            file_name: self.selection.as_ref().map(|f| f.name().to_string()),
            file_size: self.selection.as_ref().map(SelectedFile::size),
            stems: self.stems.iter().collect(),
            format: self.format,
            progress_percent: self.job.progress,
            error_message: self.job.error.clone(),
            available_downloads,
            downloads: self
                .job
                .downloads
                .iter()
                .map(|(stem, status)| DownloadRowView {
                    stem: *stem,
                    status: status.clone(),
                })
                .collect(),
            can_start: self.can_start(),
            can_remove: self.selection.is_some(),
            dirty: self.dirty,
        }
    }

    pub fn can_start(&self) -> bool {
        self.selection.is_some()
            && matches!(
                self.job.state,
                JobState::FileReady | JobState::Failed | JobState::Completed
            )
    }

    /// Returns whether the state changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// True when `job_id` is the live job and it is in `state`.
    pub(crate) fn is_current(&self, job_id: JobId, state: JobState) -> bool {
        self.job.id == Some(job_id) && self.job.state == state
    }

    /// Emits a close for the open stream, if any. Must run before any terminal transition.
    pub(crate) fn close_stream(&mut self) -> Option<Effect> {
        self.open_stream
            .take()
            .map(|job_id| Effect::CloseProgressStream { job_id })
    }

    pub(crate) fn replace_selection(&mut self, file: SelectedFile) {
        self.selection = Some(file);
        self.job = Job::ready();
        self.mark_dirty();
    }

    pub(crate) fn clear_selection(&mut self) {
        self.selection = None;
        self.job = Job::default();
        self.mark_dirty();
    }

    pub(crate) fn toggle_stem(&mut self, stem: Stem) {
        self.stems.toggle(stem);
        self.mark_dirty();
    }

    /// Re-selecting the current format leaves the dirty flag untouched.
    pub(crate) fn set_format(&mut self, format: OutputFormat) {
        if self.format != format {
            self.format = format;
            self.mark_dirty();
        }
    }

    /// Allocates a fresh job for the current selection and moves to `Submitting`.
    pub(crate) fn begin_submission(&mut self) -> Option<(JobId, SelectedFile, StemSet)> {
        let file = self.selection.clone()?;
        self.next_job_id += 1;
        let job_id = self.next_job_id;
        self.job = Job {
            id: Some(job_id),
            state: JobState::Submitting,
            submitted_stems: self.stems.clone(),
            ..Job::default()
        };
        self.mark_dirty();
        Some((job_id, file, self.stems.clone()))
    }

    pub(crate) fn begin_tracking(&mut self, job_id: JobId, handle: JobHandle) {
        self.job.state = JobState::Tracking;
        self.job.handle = Some(handle);
        self.open_stream = Some(job_id);
        self.mark_dirty();
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.job.state = JobState::Failed;
        self.job.error = Some(message);
        self.job.handle = None;
        self.mark_dirty();
    }

    /// Records a new percent. Returns true once the terminal value has been reached.
    pub(crate) fn record_progress(&mut self, raw: i64) -> bool {
        let percent = raw.clamp(0, 100) as u8;
        if percent > self.job.progress {
            self.job.progress = percent;
            self.mark_dirty();
        }
        percent >= 100
    }

    pub(crate) fn complete(&mut self) {
        let result = self
            .job
            .handle
            .take()
            .map(|handle| JobResult::from_handle(&handle, &self.job.submitted_stems))
            .unwrap_or(JobResult {
                vocals_path: None,
                instrumental_path: None,
            });
        self.job.state = JobState::Completed;
        self.job.progress = 100;
        self.job.result = Some(result);
        self.mark_dirty();
    }

    pub(crate) fn download_status(&self, stem: Stem) -> Option<&DownloadStatus> {
        self.job.downloads.get(&stem)
    }

    pub(crate) fn set_download_status(&mut self, stem: Stem, status: DownloadStatus) {
        self.job.downloads.insert(stem, status);
        self.mark_dirty();
    }
}
